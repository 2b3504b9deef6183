//! Ready-made middleware.
//!
//! Both are plain [`Handler`](crate::Handler)s meant for [`RouterBuilder::wrap`]:
//! - [`recover`] turns a panicking handler into a `500 Internal Server Error`, register it first
//!   so it wraps everything else
//! - [`logger`] emits one access event per request
//!
//! [`RouterBuilder::wrap`]: crate::router::RouterBuilder::wrap

mod logger;
mod recover;

pub use logger::{Logger, client_ip, logger};
pub use recover::{INTERNAL_SERVER_ERROR_BODY, Recover, recover};
