//! The route table: one [`Tree`] per HTTP method plus the global middleware.
//!
//! A router is assembled in a registration phase through [`RouterBuilder`] and its [`Group`]s,
//! then frozen by [`RouterBuilder::build`]. Every handler chain is fully composed when its route
//! is registered, in the order global middleware, enclosing groups' middleware from the outermost
//! one inwards, then the route's own handlers. The built [`Router`] is immutable and can be
//! shared by any number of request workers without locking.
//!
//! ```
//! use micro_router::{Context, Router, handler_fn};
//! use http::StatusCode;
//!
//! async fn auth(ctx: &mut Context) {
//!     if ctx.header("authorization").is_none() {
//!         ctx.text(StatusCode::UNAUTHORIZED, "unauthorized");
//!         ctx.abort();
//!     }
//! }
//!
//! async fn user(ctx: &mut Context) {
//!     let id = ctx.param("id").unwrap_or_default().to_owned();
//!     ctx.text(StatusCode::OK, id);
//! }
//!
//! let mut builder = Router::builder();
//! let mut api = builder.group("/api", handler_fn(auth));
//! api.get("/users/:id", handler_fn(user));
//!
//! let router = builder.build().unwrap();
//! assert!(router.at(&http::Method::GET, "/api/users/42").is_some());
//! ```

/// Per-method registration shortcuts shared by [`RouterBuilder`] and [`Group`].
macro_rules! method_routes {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Registers a `", stringify!($method), "` route, see [`route`](Self::route).")]
            pub fn $name(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
                self.route(Method::$method, path, handlers)
            }
        )*
    };
}

pub mod group;

pub use group::Group;

use crate::error::RouteError;
use crate::handler::{Chain, Handler, IntoHandlers};
use crate::path;
use crate::tree::{RouteMatch, Tree};
use http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The frozen route table.
pub struct Router {
    trees: Vec<Tree>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Matches `path` against the routes registered for `method`.
    ///
    /// The path is matched as received: redundant slashes and surrounding whitespace are ignored,
    /// percent-encoded text is not decoded. `HEAD` requests only match routes registered for `HEAD`.
    pub fn at<'router, 'req>(&'router self, method: &Method, path: &'req str) -> Option<RouteMatch<'router, 'req>> {
        self.tree(method)?.search(path)
    }

    /// Lists every registered `(method, pattern)` pair, sorted by pattern then method.
    pub fn routes(&self) -> Vec<(&Method, &str)> {
        let mut routes = self
            .trees
            .iter()
            .flat_map(|tree| tree.patterns().into_iter().map(move |pattern| (tree.method(), pattern)))
            .collect::<Vec<_>>();
        routes.sort_unstable_by(|(m1, p1), (m2, p2)| p1.cmp(p2).then_with(|| m1.as_str().cmp(m2.as_str())));
        routes
    }

    // a handful of methods at most, a linear scan beats hashing here
    fn tree(&self, method: &Method) -> Option<&Tree> {
        self.trees.iter().find(|tree| tree.method() == method)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("routes", &self.routes()).finish()
    }
}

/// Collects routes and middleware before the router starts serving.
///
/// Registration methods never fail on the spot: the first [`RouteError`] is recorded and
/// returned by [`build`](RouterBuilder::build), so the whole table can be written fluently.
pub struct RouterBuilder {
    trees: Vec<Tree>,
    middleware: Vec<Arc<dyn Handler>>,
    registered: usize,
    error: Option<RouteError>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self { trees: Vec::new(), middleware: Vec::new(), registered: 0, error: None }
    }

    /// Appends global middleware, run before the handlers of every route registered afterwards.
    pub fn wrap(&mut self, handlers: impl IntoHandlers) -> &mut Self {
        if self.registered > 0 {
            warn!(
                routes = self.registered,
                "global middleware added after routes were registered, it won't apply to those routes"
            );
        }
        self.middleware.extend(handlers.into_handlers());
        self
    }

    /// Registers `handlers` for `method` and `path`, after the global middleware.
    ///
    /// Registering the same method and pattern twice replaces the earlier chain.
    pub fn route(&mut self, method: Method, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.add(method, path, &[], handlers.into_handlers());
        self
    }

    method_routes! {
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        head => HEAD,
        options => OPTIONS,
        connect => CONNECT,
        trace => TRACE,
    }

    /// Opens a group whose routes share the `prefix` and run `handlers` as middleware.
    pub fn group(&mut self, prefix: &str, handlers: impl IntoHandlers) -> Group<'_> {
        Group::new(self, path::normalize(prefix), handlers.into_handlers())
    }

    /// Freezes the route table, or returns the first registration error.
    pub fn build(self) -> Result<Router, RouteError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        debug!(routes = self.registered, methods = self.trees.len(), "router built");
        Ok(Router { trees: self.trees })
    }

    /// Composes global middleware ++ `scoped` ++ `handlers` and inserts the chain into the tree
    /// of `method`.
    pub(crate) fn add(
        &mut self,
        method: Method,
        path: &str,
        scoped: &[Arc<dyn Handler>],
        handlers: Vec<Arc<dyn Handler>>,
    ) {
        if handlers.is_empty() {
            self.record(RouteError::empty_chain(&method, path::normalize(path)));
            return;
        }

        let chain: Chain = self.middleware.iter().chain(scoped).map(Arc::clone).chain(handlers).collect();
        let chain_len = chain.len();

        let result = self.tree_mut(method.clone()).insert(path, chain);
        match result {
            Ok(()) => {
                self.registered += 1;
                debug!(method = %method, path = %path::normalize(path), handlers = chain_len, "route registered");
            }
            Err(e) => self.record(e),
        }
    }

    fn record(&mut self, e: RouteError) {
        error!(cause = %e, "route registration failed");
        self.error.get_or_insert(e);
    }

    fn tree_mut(&mut self, method: Method) -> &mut Tree {
        let index = match self.trees.iter().position(|tree| *tree.method() == method) {
            Some(index) => index,
            None => {
                self.trees.push(Tree::new(method));
                self.trees.len() - 1
            }
        };
        &mut self.trees[index]
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("trees", &self.trees)
            .field("middleware", &self.middleware.len())
            .field("error", &self.error)
            .finish()
    }
}
