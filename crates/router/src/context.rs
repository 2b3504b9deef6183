//! Per-request state and the chain executor.
//!
//! A [`Context`] is acquired from the [`ContextPool`](crate::pool::ContextPool) right before a
//! route's chain runs and released right after. It carries:
//! - the bound [`Request`] and [`ResponseWriter`]
//! - the path parameters extracted by the route lookup
//! - a request-scoped key/value bag for handler-to-handler communication
//! - the handler chain, a cursor into it and the abort flag
//!
//! The chain is driven by [`Context::next`]. A handler that wants to run code after the rest of
//! the chain calls `next` once and resumes when it returns:
//!
//! ```
//! use micro_router::Context;
//! use std::time::Instant;
//!
//! async fn timing(ctx: &mut Context) {
//!     let start = Instant::now();
//!     ctx.next().await;
//!     println!("{} took {:?}", ctx.path(), start.elapsed());
//! }
//! ```

use crate::error::BindError;
use crate::handler::Chain;
use crate::request::Request;
use crate::response::ResponseWriter;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

pub struct Context {
    request: Request,
    writer: ResponseWriter,
    handlers: Chain,
    // index of the next handler to run
    index: usize,
    aborted: bool,
    locals: Locals,
}

/// The reusable part of a [`Context`], recycled by the pool between requests.
#[derive(Debug, Default)]
pub(crate) struct Locals {
    pub(crate) params: Params,
    pub(crate) keys: Keys,
}

impl Locals {
    pub(crate) fn clear(&mut self) {
        self.params.clear();
        self.keys.clear();
    }
}

impl Context {
    pub(crate) fn bind(request: Request, writer: ResponseWriter, handlers: Chain, locals: Locals) -> Self {
        Self { request, writer, handlers, index: 0, aborted: false, locals }
    }

    /// Moves the response out, leaving an empty writer behind.
    pub(crate) fn take_writer(&mut self) -> ResponseWriter {
        mem::take(&mut self.writer)
    }

    /// Moves the reusable locals out, leaving empty ones behind.
    pub(crate) fn take_locals(&mut self) -> Locals {
        mem::take(&mut self.locals)
    }

    /// Runs the remaining handlers of the chain.
    ///
    /// Handlers run one after another until the chain is exhausted, a handler calls
    /// [`abort`](Context::abort), or the request is cancelled. Cancellation is only observed
    /// between handlers. Calling `next` on an aborted context does nothing.
    pub async fn next(&mut self) {
        while !self.aborted && self.index < self.handlers.len() && !self.request.is_cancelled() {
            let handler = Arc::clone(&self.handlers[self.index]);
            self.index += 1;
            handler.call(self).await;
        }
    }

    /// Stops the chain: no handler that has not started yet will run.
    ///
    /// Handlers already running, including the ones waiting in `next`, are not interrupted;
    /// they observe the abort through [`is_aborted`](Context::is_aborted) once `next` returns.
    #[inline]
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Number of handlers in the chain bound to this request.
    pub fn chain_len(&self) -> usize {
        self.handlers.len()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the request path as received, before normalization
    pub fn path(&self) -> &str {
        self.request.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Returns the first value of a request header, if it is valid visible ASCII
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.request.headers().get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.request.is_cancelled()
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.request.cancellation()
    }

    /// Gets a path parameter by name, as the raw text of its segment
    pub fn param(&self, name: &str) -> Option<&str> {
        self.locals.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.locals.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.locals.params
    }

    /// Gets the first query string value for `name`
    pub fn query(&self, name: &str) -> Option<String> {
        self.query_pairs().ok()?.into_iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    /// Decodes the whole query string into `(name, value)` pairs, in order.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, BindError> {
        self.bind_query()
    }

    pub fn bind_query<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        let query = self.request.uri().query().unwrap_or_default();
        Ok(serde_urlencoded::from_str(query)?)
    }

    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        let body = self.request.body();
        if body.is_empty() {
            return Err(BindError::EmptyBody);
        }
        Ok(serde_json::from_slice(body)?)
    }

    pub fn bind_form<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        Ok(serde_urlencoded::from_bytes(self.request.body())?)
    }

    /// Returns the parsed `Content-Type` of the request
    pub fn content_type(&self) -> Option<mime::Mime> {
        self.header(header::CONTENT_TYPE).and_then(|value| value.parse().ok())
    }

    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    pub fn status(&mut self, status: StatusCode) {
        self.writer.write_status(status);
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.writer.write_header(name, value);
    }

    pub fn text(&mut self, status: StatusCode, body: impl AsRef<str>) {
        self.write(status, &mime::TEXT_PLAIN_UTF_8, body.as_ref().as_bytes());
    }

    pub fn html(&mut self, status: StatusCode, body: impl AsRef<str>) {
        self.write(status, &mime::TEXT_HTML_UTF_8, body.as_ref().as_bytes());
    }

    /// Writes `value` as a json body; a value that fails to serialize produces a 500 response.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        match serde_json::to_vec(value) {
            Ok(body) => self.write(status, &mime::APPLICATION_JSON, &body),
            Err(e) => {
                error!(cause = %e, path = self.path(), "failed to serialize json response");
                self.writer.reset();
                self.text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
            }
        }
    }

    fn write(&mut self, status: StatusCode, content_type: &mime::Mime, body: &[u8]) {
        let content_type = HeaderValue::from_str(content_type.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        self.writer.write_header(header::CONTENT_TYPE, content_type);
        self.writer.write_status(status);
        self.writer.write_body(body);
    }

    /// Stores `value` under `key` in the request-scoped bag, returning true if it replaced a value.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> bool {
        self.locals.keys.set(key, value)
    }

    /// Gets the value stored under `key`, if there is one of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.locals.keys.get(key)
    }

    /// Removes `key` from the bag, returning true if it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.locals.keys.delete(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.locals.keys.contains_key(key)
    }

    /// The bag itself, for sub-tasks that only need the key/value operations.
    pub fn keys(&self) -> &Keys {
        &self.locals.keys
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("params", &self.locals.params)
            .field("chain_len", &self.handlers.len())
            .field("index", &self.index)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

/// Path parameters extracted from the URL path of a request.
///
/// Names are unique; values are the raw text of the matched segments, without any decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: SmallVec<[(Box<str>, String); 4]>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the value of a path parameter by its name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(key, _)| &**key == name).map(|(_, value)| value.as_str())
    }

    /// Sets `name` to `value`, replacing an existing value for the same name.
    pub fn insert(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(key, _)| &**key == name) {
            Some((_, existing)) => {
                existing.clear();
                existing.push_str(value);
            }
            None => self.entries.push((name.into(), value.to_owned())),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (&**key, value.as_str()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> Extend<(&'a str, &'a str)> for Params {
    fn extend<I: IntoIterator<Item = (&'a str, &'a str)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Params {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut params = Params::new();
        params.extend(iter);
        params
    }
}

type Value = Arc<dyn Any + Send + Sync>;

/// The request-scoped key/value bag.
///
/// All operations take `&self` and are guarded by one lock, so sub-tasks of the same request
/// may use the bag concurrently while they borrow the context.
#[derive(Default)]
pub struct Keys {
    inner: RwLock<HashMap<String, Value>>,
}

impl Keys {
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> bool {
        self.inner.write().insert(key.into(), Arc::new(value)).is_some()
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = Arc::clone(self.inner.read().get(key)?);
        value.downcast::<T>().ok()
    }

    pub fn delete(&self, key: &str) -> bool {
        self.inner.write().remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    // exclusive access, no locking needed; keeps the map's capacity for the next request
    pub(crate) fn clear(&mut self) {
        self.inner.get_mut().clear();
    }
}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.read().keys()).finish()
    }
}
