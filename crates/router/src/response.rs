//! The outbound side of the transport seam.
//!
//! [`ResponseWriter`] is the output sink handed to every request's [`Context`](crate::Context).
//! Handlers write the status line, headers and body bytes into it; once the chain finished, the
//! dispatcher turns it into an `http::Response<Bytes>` for the transport to send.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    written: bool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: BytesMut::new(), written: false }
    }

    /// Sets the response status, `200 OK` unless a handler writes another one.
    pub fn write_status(&mut self, status: StatusCode) {
        self.status = status;
        self.written = true;
    }

    /// Sets a header, replacing any previous values with the same name.
    pub fn write_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
        self.written = true;
    }

    /// Appends bytes to the response body.
    pub fn write_body(&mut self, bytes: impl AsRef<[u8]>) {
        self.body.extend_from_slice(bytes.as_ref());
        self.written = true;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.written = true;
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns true if any handler wrote a status, a header or body bytes.
    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Discards everything written so far.
    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.written = false;
    }

    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body.freeze());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}
