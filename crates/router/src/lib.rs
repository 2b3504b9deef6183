//! An embeddable HTTP request router and middleware dispatcher.
//!
//! Routes are registered on a [`RouterBuilder`], optionally through nested [`Group`]s that share
//! a path prefix and middleware, and frozen into a [`Router`]. A [`Dispatcher`] owns the router and
//! a pool of per-request [`Context`]s; the transport hands it one [`Request`] at a time and sends
//! back the `http::Response` it returns.
//!
//! ```
//! use micro_router::middleware::{logger, recover};
//! use micro_router::{Context, Dispatcher, Router, handler_fn};
//! use bytes::Bytes;
//! use http::StatusCode;
//!
//! async fn hello(ctx: &mut Context) {
//!     let name = ctx.param("name").unwrap_or("world").to_owned();
//!     ctx.text(StatusCode::OK, format!("hello {name}"));
//! }
//!
//! futures::executor::block_on(async {
//!     let mut builder = Router::builder();
//!     builder.wrap((recover(), logger())).get("/hello/:name", handler_fn(hello));
//!
//!     let dispatcher = Dispatcher::new(builder.build().unwrap());
//!     let request = http::Request::get("/hello/alice").body(Bytes::new()).unwrap();
//!     let response = dispatcher.handle(request).await;
//!     assert_eq!(response.body().as_ref(), b"hello alice");
//! });
//! ```

mod context;
mod dispatcher;
mod handler;
mod request;
mod response;
mod tree;

pub mod error;
pub mod middleware;
pub mod path;
pub mod pool;
pub mod router;

pub use context::{Context, Keys, Params};
pub use dispatcher::{Dispatcher, DispatcherBuilder, NOT_FOUND_BODY};
pub use handler::{Chain, FnHandler, Handler, HandlerFn, IntoHandlers, handler_fn};
pub use pool::{ContextPool, PoolConfig, PoolStats, PooledContext};
pub use request::Request;
pub use response::ResponseWriter;
pub use router::{Group, Router, RouterBuilder};
pub use tree::{PARAM_SIGIL, RouteMatch};
