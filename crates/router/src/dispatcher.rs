//! The single integration point between a transport and the router.
//!
//! A transport calls [`Dispatcher::handle`] once per request, possibly concurrently from many
//! workers. For each request the dispatcher looks the route up, binds a pooled [`Context`]
//! to it, runs the route's chain and returns the response the handlers wrote.
//!
//! [`Context`]: crate::Context

use crate::error::DispatcherBuildError;
use crate::pool::{ContextPool, PoolConfig, PoolStats};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::router::Router;
use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode, header};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Body of the response sent when no route matches.
pub const NOT_FOUND_BODY: &str = "404 page not found";

pub struct DispatcherBuilder {
    router: Option<Router>,
    pool_config: PoolConfig,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self { router: None, pool_config: PoolConfig::default() }
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn pool_config(mut self, pool_config: PoolConfig) -> Self {
        self.pool_config = pool_config;
        self
    }

    pub fn build(self) -> Result<Dispatcher, DispatcherBuildError> {
        let router = self.router.ok_or(DispatcherBuildError::MissingRouter)?;
        Ok(Dispatcher { router, pool: ContextPool::new(self.pool_config) })
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("router", &self.router)
            .field("pool_config", &self.pool_config)
            .finish()
    }
}

/// Routes requests to their handler chains.
pub struct Dispatcher {
    router: Router,
    pool: ContextPool,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Creates a dispatcher with the default pool configuration.
    pub fn new(router: Router) -> Self {
        Self { router, pool: ContextPool::default() }
    }

    /// Handles one request.
    ///
    /// When no route matches `404 page not found` is returned and no handler runs. Otherwise
    /// the route's chain runs to completion, abort or cancellation, and whatever the handlers
    /// wrote becomes the response. A chain that writes nothing yields an empty `200 OK`.
    ///
    /// The pooled context goes back to the pool even if this future is dropped before it
    /// completes or a handler panics.
    pub async fn handle(&self, request: impl Into<Request>) -> Response<Bytes> {
        let request = request.into();

        let Some(route) = self.router.at(request.method(), request.path()) else {
            trace!(method = %request.method(), path = request.path(), "no route matched");
            return not_found();
        };
        trace!(method = %request.method(), path = request.path(), route = route.pattern(), "dispatching request");

        // the matched values borrow the request, copy them before the request moves into the context
        let handlers = Arc::clone(route.handlers());
        let mut locals = self.pool.checkout();
        locals.params.extend(route.params());
        drop(route);

        let mut ctx = self.pool.bind(request, ResponseWriter::new(), handlers, locals);
        ctx.next().await;

        ctx.release().into_response()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").field("router", &self.router).field("pool", &self.pool).finish()
    }
}

fn not_found() -> Response<Bytes> {
    let mut writer = ResponseWriter::new();
    writer.write_status(StatusCode::NOT_FOUND);
    writer.write_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    writer.write_body(NOT_FOUND_BODY);
    writer.into_response()
}
