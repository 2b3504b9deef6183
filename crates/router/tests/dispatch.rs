use bytes::Bytes;
use http::{Method, StatusCode, header};
use micro_router::error::RouteError;
use micro_router::middleware::recover;
use micro_router::{Context, Dispatcher, Request, Router, handler_fn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn get(uri: &str) -> http::Request<Bytes> {
    http::Request::get(uri).body(Bytes::new()).unwrap()
}

fn trail(ctx: &Context, step: &str) {
    let trail = ctx.get::<String>("trail").map(|t| format!("{t},{step}")).unwrap_or_else(|| step.to_owned());
    ctx.set("trail", trail);
}

async fn reply_trail(ctx: &mut Context) {
    trail(ctx, "handler");
    let trail = ctx.get::<String>("trail").unwrap();
    ctx.text(StatusCode::OK, trail.as_str());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nested_group_middleware_runs_outermost_first() {
    async fn global(ctx: &mut Context) {
        trail(ctx, "global");
    }
    async fn api(ctx: &mut Context) {
        trail(ctx, "api");
    }
    async fn admin(ctx: &mut Context) {
        trail(ctx, "admin");
    }
    async fn route_mw(ctx: &mut Context) {
        trail(ctx, "route");
    }

    let mut builder = Router::builder();
    builder.wrap(handler_fn(global));
    {
        let mut api_group = builder.group("/api", handler_fn(api));
        // registered before the outer route on purpose, ordering only depends on nesting
        api_group.group("/admin", handler_fn(admin)).get("/stats", (handler_fn(route_mw), handler_fn(reply_trail)));
        api_group.get("/ping", handler_fn(reply_trail));
    }
    let dispatcher = Dispatcher::new(builder.build().unwrap());

    let response = dispatcher.handle(get("/api/admin/stats")).await;
    assert_eq!(response.body().as_ref(), b"global,api,admin,route,handler");

    let response = dispatcher.handle(get("/api/ping")).await;
    assert_eq!(response.body().as_ref(), b"global,api,handler");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abort_stops_downstream_handlers() {
    async fn first(ctx: &mut Context) {
        trail(ctx, "first");
        ctx.next().await;
        let aborted = ctx.is_aborted();
        trail(ctx, if aborted { "first:saw-abort" } else { "first:no-abort" });
        let trail = ctx.get::<String>("trail").unwrap();
        ctx.set_header(header::HeaderName::from_static("x-trail"), trail.parse().unwrap());
    }
    async fn deny(ctx: &mut Context) {
        trail(ctx, "deny");
        ctx.text(StatusCode::FORBIDDEN, "forbidden");
        ctx.abort();
        // a no-op once aborted
        ctx.next().await;
    }
    async fn pass(ctx: &mut Context) {
        trail(ctx, "pass");
        ctx.next().await;
        let aborted = ctx.is_aborted();
        trail(ctx, if aborted { "pass:saw-abort" } else { "pass:no-abort" });
    }
    async fn last(ctx: &mut Context) {
        trail(ctx, "last");
        ctx.text(StatusCode::OK, "ok");
    }

    let mut builder = Router::builder();
    builder
        .get("/denied", (handler_fn(first), handler_fn(deny), handler_fn(last)))
        .get("/allowed", (handler_fn(first), handler_fn(pass), handler_fn(last)));
    let dispatcher = Dispatcher::new(builder.build().unwrap());

    let response = dispatcher.handle(get("/denied")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.body().as_ref(), b"forbidden");
    assert_eq!(response.headers()["x-trail"], "first,deny,first:saw-abort");

    let response = dispatcher.handle(get("/allowed")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-trail"], "first,pass,last,pass:no-abort,first:no-abort");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn aborted_without_writing_yields_empty_ok() {
    async fn silent_abort(ctx: &mut Context) {
        ctx.abort();
    }

    let mut builder = Router::builder();
    builder.get("/", (handler_fn(silent_abort), handler_fn(reply_trail)));
    let dispatcher = Dispatcher::new(builder.build().unwrap());

    let response = dispatcher.handle(get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.body().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_stops_the_chain_between_handlers() {
    async fn cancel(ctx: &mut Context) {
        ctx.text(StatusCode::ACCEPTED, "accepted");
        if let Some(token) = ctx.cancellation() {
            token.cancel();
        }
        assert!(ctx.is_cancelled());
    }

    let mut builder = Router::builder();
    builder.post("/jobs", (handler_fn(cancel), handler_fn(reply_trail)));
    let dispatcher = Dispatcher::new(builder.build().unwrap());

    let token = CancellationToken::new();
    let request = Request::with_cancellation(http::Request::post("/jobs").body(Bytes::new()).unwrap(), token.clone());
    let response = dispatcher.handle(request).await;

    assert!(token.is_cancelled());
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.body().as_ref(), b"accepted");

    // an already cancelled request runs nothing at all
    let request = Request::with_cancellation(http::Request::post("/jobs").body(Bytes::new()).unwrap(), token);
    let response = dispatcher.handle(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.body().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_keep_their_own_state() {
    async fn remember(ctx: &mut Context) {
        let id = ctx.param("id").unwrap().to_owned();
        assert!(ctx.get::<String>("id").is_none(), "leaked state from another request");
        ctx.set("id", id);
        tokio::task::yield_now().await;
        ctx.next().await;
    }
    async fn echo(ctx: &mut Context) {
        tokio::task::yield_now().await;
        let id = ctx.get::<String>("id").unwrap();
        assert_eq!(ctx.param("id"), Some(id.as_str()));
        ctx.text(StatusCode::OK, id.as_str());
    }

    let mut builder = Router::builder();
    builder.get("/echo/:id", (handler_fn(remember), handler_fn(echo)));
    let dispatcher = Arc::new(Dispatcher::new(builder.build().unwrap()));

    let tasks = (0..200)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                let response = dispatcher.handle(get(&format!("/echo/{i}"))).await;
                assert_eq!(response.body().as_ref(), i.to_string().as_bytes());
            })
        })
        .collect::<Vec<_>>();

    for task in tasks {
        task.await.unwrap();
    }

    let stats = dispatcher.pool_stats();
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.created + stats.reused, 200);
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct NewUser {
    name: String,
    age: u8,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bind_json_and_reply_json() {
    async fn create(ctx: &mut Context) {
        match ctx.bind_json::<NewUser>() {
            Ok(user) => ctx.json(StatusCode::CREATED, &user),
            Err(e) => ctx.text(StatusCode::BAD_REQUEST, e.to_string()),
        }
    }

    let mut builder = Router::builder();
    builder.wrap(recover()).post("/users", handler_fn(create));
    let dispatcher = Dispatcher::new(builder.build().unwrap());

    let body = Bytes::from_static(br#"{"name":"alice","age":30}"#);
    let request = http::Request::post("/users").header(header::CONTENT_TYPE, "application/json").body(body).unwrap();
    let response = dispatcher.handle(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let user: NewUser = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(user, NewUser { name: "alice".into(), age: 30 });

    let request = http::Request::post("/users").body(Bytes::from_static(b"{")).unwrap();
    let response = dispatcher.handle(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn conflicting_routes_fail_before_serving() {
    async fn noop(_ctx: &mut Context) {}

    let mut builder = Router::builder();
    builder.get("/users/:id", handler_fn(noop)).get("/users/:name", handler_fn(noop));

    match builder.build() {
        Err(RouteError::ParamConflict { method, existing, conflicting, .. }) => {
            assert_eq!(method, Method::GET);
            assert_eq!(existing, "id");
            assert_eq!(conflicting, "name");
        }
        other => panic!("expected a parameter conflict, got {other:?}"),
    }
}
