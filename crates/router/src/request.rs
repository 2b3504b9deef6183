//! The inbound side of the transport seam.
//!
//! The transport hands the dispatcher a [`Request`]: a fully received `http::Request<Bytes>` plus
//! an optional cancellation signal that fires when the client goes away or the transport gives up
//! on the request.

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri, Version};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct Request {
    inner: http::Request<Bytes>,
    cancellation: Option<CancellationToken>,
}

impl Request {
    /// Creates a request that is never cancelled.
    pub fn new(inner: http::Request<Bytes>) -> Self {
        Self { inner, cancellation: None }
    }

    /// Creates a request observing the transport's cancellation token.
    pub fn with_cancellation(inner: http::Request<Bytes>, cancellation: CancellationToken) -> Self {
        Self { inner, cancellation: Some(cancellation) }
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the raw, not yet normalized, path of the request
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn extensions(&self) -> &Extensions {
        self.inner.extensions()
    }

    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// Returns true once the transport cancelled this request.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub fn into_inner(self) -> http::Request<Bytes> {
        self.inner
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(inner: http::Request<Bytes>) -> Self {
        Request::new(inner)
    }
}
