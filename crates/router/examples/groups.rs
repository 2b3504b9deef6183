//! Builds a small route table with nested groups and feeds it a few in-memory requests.
//!
//! run with `cargo run --example groups`

use bytes::Bytes;
use http::StatusCode;
use micro_router::middleware::{logger, recover};
use micro_router::{Context, Dispatcher, Router, handler_fn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Deserialize, Serialize, Debug)]
struct User {
    id: String,
    name: String,
}

async fn index(ctx: &mut Context) {
    ctx.html(StatusCode::OK, "<h1>micro-router</h1>");
}

async fn auth(ctx: &mut Context) {
    let user = ctx.header(http::header::AUTHORIZATION).and_then(|value| value.strip_prefix("Bearer ")).map(str::to_owned);
    match user {
        Some(user) => {
            ctx.set("user", user);
        }
        None => {
            ctx.text(StatusCode::UNAUTHORIZED, "missing bearer token");
            ctx.abort();
        }
    }
}

async fn show_user(ctx: &mut Context) {
    let user = User { id: ctx.param("id").unwrap_or_default().to_owned(), name: ctx.query("name").unwrap_or_default() };
    ctx.json(StatusCode::OK, &user);
}

async fn whoami(ctx: &mut Context) {
    let user = ctx.get::<String>("user").map(|user| user.to_string()).unwrap_or_default();
    ctx.text(StatusCode::OK, user);
}

async fn crash(_ctx: &mut Context) {
    panic!("crash requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut builder = Router::builder();
    builder.wrap((recover(), logger())).get("/", handler_fn(index)).get("/crash", handler_fn(crash));

    let mut api = builder.group("/api/v1", handler_fn(auth));
    api.get("/users/:id", handler_fn(show_user)).get("/me", handler_fn(whoami));

    let router = builder.build()?;
    for (method, pattern) in router.routes() {
        info!(%method, pattern, "route");
    }

    let dispatcher = Dispatcher::new(router);
    let requests = [
        http::Request::get("/").body(Bytes::new())?,
        http::Request::get("/api/v1/users/42?name=alice").header("authorization", "Bearer alice").body(Bytes::new())?,
        http::Request::get("/api/v1/me").body(Bytes::new())?,
        http::Request::get("/crash").body(Bytes::new())?,
        http::Request::get("/missing").body(Bytes::new())?,
    ];

    for request in requests {
        let uri = request.uri().clone();
        let response = dispatcher.handle(request).await;
        info!(%uri, status = %response.status(), body = %String::from_utf8_lossy(response.body()), "response");
    }

    info!(stats = ?dispatcher.pool_stats(), "done");
    Ok(())
}
