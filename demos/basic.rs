//! Minimal sluice demo — request logging, an auth gate, a request counter,
//! JSON and HTML handlers, and static assets from `./assets`.
//!
//! Run with:
//!   RUST_LOG=info PORT=3000 cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/users/42                       # 401
//!   curl -H 'authorization: Bearer x' http://localhost:3000/users/42
//!   curl -X POST -H 'authorization: Bearer x' http://localhost:3000/users -d '{"name":"ana"}'
//!   curl http://localhost:3000/stats

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sluice::{Context, Flow, Method, MethodFilter, Response, Router, Server, StatusCode, middleware};

#[derive(Deserialize, Serialize)]
struct NewUser {
    name: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let requests = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&requests);

    let app = Router::new()
        .middleware(MethodFilter::Any, "*", middleware::trace)
        .middleware(MethodFilter::Any, "*", move |mut cx: Context| {
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            async move {
                cx.data_mut().insert("request_no", n);
                Flow::Continue(cx)
            }
        })
        .middleware(MethodFilter::Any, "/users", require_auth)
        .get("/", home)
        .get("/users/{id}", get_user)
        .post("/users", create_user)
        .on(Method::Get, "/stats", {
            let requests = Arc::clone(&requests);
            move |cx: Context| {
                let total = requests.load(Ordering::Relaxed);
                async move { cx.json(&serde_json::json!({ "requests": total })) }
            }
        });

    if let Err(e) = Server::from_env().serve(app).await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}

// ANY /users, /users/* — rejects requests without an authorization header.
async fn require_auth(cx: Context) -> Flow {
    if cx.request().header("authorization").is_some() {
        Flow::Continue(cx)
    } else {
        Flow::Respond(
            Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header("www-authenticate", "Bearer")
                .no_body(),
        )
    }
}

// GET /
async fn home(cx: Context) -> Response {
    let n: u64 = cx.data().get_as("request_no").unwrap_or_default();
    cx.html(format!("<h1>sluice</h1><p>request #{n}</p>"))
}

// GET /users/{id}
async fn get_user(cx: Context) -> Response {
    let id = cx.request().param("id").unwrap_or("unknown");
    cx.json(&serde_json::json!({ "id": id, "name": "alice" }))
}

// POST /users — an `Err` here would reach the server as a 500.
async fn create_user(cx: Context) -> Result<Response, serde_json::Error> {
    let Ok(user) = serde_json::from_slice::<NewUser>(cx.request().body()) else {
        return Ok(Response::status(StatusCode::BAD_REQUEST));
    };
    let body = serde_json::to_vec(&user)?;
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(body))
}
