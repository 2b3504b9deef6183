use crate::Context;
use crate::handler::Handler;
use async_trait::async_trait;
use futures::FutureExt;
use http::StatusCode;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Body of the response written after a handler panicked.
pub const INTERNAL_SERVER_ERROR_BODY: &str = "Internal Server Error";

/// Panic recovery middleware, see [`recover`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Recover;

/// Runs the rest of the chain and turns a panic into a `500 Internal Server Error`.
///
/// The chain is aborted and anything already written is discarded. Without this middleware a
/// panicking handler unwinds into the transport.
pub fn recover() -> Recover {
    Recover
}

#[async_trait]
impl Handler for Recover {
    async fn call(&self, ctx: &mut Context) {
        let Err(payload) = AssertUnwindSafe(ctx.next()).catch_unwind().await else {
            return;
        };

        error!(
            method = %ctx.method(),
            path = ctx.path(),
            panic = panic_message(payload.as_ref()),
            "handler panicked, responding 500"
        );

        ctx.abort();
        ctx.writer_mut().reset();
        ctx.text(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR_BODY);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return message;
    }
    payload.downcast_ref::<String>().map_or("unknown panic payload", String::as_str)
}

#[cfg(test)]
mod tests {
    use super::{INTERNAL_SERVER_ERROR_BODY, panic_message, recover};
    use crate::{Context, Dispatcher, Router, handler_fn};
    use bytes::Bytes;
    use http::{HeaderValue, StatusCode};
    use std::sync::atomic::{AtomicBool, Ordering};

    static AFTER_RAN: AtomicBool = AtomicBool::new(false);

    async fn half_written_then_panic(ctx: &mut Context) {
        ctx.set_header(http::header::ETAG, HeaderValue::from_static("\"v1\""));
        ctx.text(StatusCode::OK, "partial");
        panic!("boom {}", ctx.param("id").unwrap_or_default());
    }

    async fn never(_ctx: &mut Context) {
        AFTER_RAN.store(true, Ordering::SeqCst);
    }

    async fn fine(ctx: &mut Context) {
        ctx.text(StatusCode::OK, "fine");
    }

    fn dispatcher() -> Dispatcher {
        let mut builder = Router::builder();
        builder
            .wrap(recover())
            .get("/panic/:id", (handler_fn(half_written_then_panic), handler_fn(never)))
            .get("/fine", handler_fn(fine));
        Dispatcher::new(builder.build().unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panic_becomes_500() {
        let dispatcher = dispatcher();

        let response = dispatcher.handle(http::Request::get("/panic/7").body(Bytes::new()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body().as_ref(), INTERNAL_SERVER_ERROR_BODY.as_bytes());
        assert!(response.headers().get(http::header::ETAG).is_none());
        assert!(!AFTER_RAN.load(Ordering::SeqCst));

        // the pooled context is healthy afterwards
        let response = dispatcher.handle(http::Request::get("/fine").body(Bytes::new()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"fine");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
