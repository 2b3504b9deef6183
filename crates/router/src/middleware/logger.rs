use crate::Context;
use crate::handler::Handler;
use crate::request::Request;
use async_trait::async_trait;
use http::header;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

/// Access log middleware, see [`logger`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

/// Logs one `info` event per request once the rest of the chain returned.
///
/// The event carries the method, path, final status, elapsed time, client ip and user agent.
pub fn logger() -> Logger {
    Logger
}

#[async_trait]
impl Handler for Logger {
    async fn call(&self, ctx: &mut Context) {
        let start = Instant::now();

        ctx.next().await;

        let elapsed = start.elapsed();
        let client_ip = client_ip(ctx.request());
        info!(
            method = %ctx.method(),
            path = ctx.path(),
            status = ctx.writer().status().as_u16(),
            elapsed = ?elapsed,
            client_ip = client_ip.as_deref().unwrap_or("-"),
            user_agent = ctx.header(header::USER_AGENT).unwrap_or("-"),
            aborted = ctx.is_aborted(),
            "access"
        );
    }
}

/// Best effort address of the client that sent `request`.
///
/// Takes the first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer address the
/// transport stored as a [`SocketAddr`] request extension.
pub fn client_ip(request: &Request) -> Option<String> {
    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_owned());
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = real_ip {
        return Some(ip.to_owned());
    }

    request.extensions().get::<SocketAddr>().map(|addr| addr.ip().to_string())
}
