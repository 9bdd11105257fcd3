//! # sluice
//!
//! Declarative routes and middleware, compiled once into a dispatch table,
//! run per request as a short-circuiting pipeline.
//!
//! ## The contract
//!
//! You declare two ordered lists: routes (`method`, `path`, handler) and
//! middleware (`method` or `ANY`, `path` or `*`, function). At startup sluice
//! compiles them into a read-only [`PipelineTable`]: for every route, the
//! middleware that applies to it, in declaration order, in front of its
//! handler. Nothing about the table changes after that.
//!
//! Per request, the matching [`Pipeline`] builds a fresh [`Context`] and runs
//! the middleware one at a time. Any middleware may answer with
//! [`Flow::Respond`], and then nothing after it runs, including the handler.
//! Otherwise it hands the context on with [`Flow::Continue`] and the handler
//! runs last.
//!
//! Middleware applies to a route when:
//!
//! - its path is `"*"`, equal to the route path, or a parent segment of it
//!   (`"/api"` covers `"/api/users"`, not `"/apiv2"`); **and**
//! - its method is `ANY` or equal to the route method.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sluice::{Context, Flow, MethodFilter, Response, Router, Server, StatusCode, middleware};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .middleware(MethodFilter::Any, "*", middleware::trace)
//!         .middleware(MethodFilter::Any, "/admin", require_token)
//!         .get("/users/{id}", get_user)
//!         .get("/admin/stats", stats);
//!
//!     Server::from_env().serve(app).await.unwrap();
//! }
//!
//! async fn require_token(mut cx: Context) -> Flow {
//!     match cx.request().header("authorization").map(str::to_owned) {
//!         Some(token) => {
//!             cx.data_mut().insert("token", token);
//!             Flow::Continue(cx)
//!         }
//!         None => Flow::Respond(Response::status(StatusCode::UNAUTHORIZED)),
//!     }
//! }
//!
//! async fn get_user(cx: Context) -> Response {
//!     let id = cx.request().param("id").unwrap_or("unknown");
//!     cx.json(&serde_json::json!({ "id": id }))
//! }
//!
//! async fn stats(cx: Context) -> Response {
//!     cx.html("<h1>stats</h1>")
//! }
//! ```

mod assets;
mod config;
mod context;
mod declare;
mod error;
mod handler;
mod method;
mod pipeline;
mod request;
mod response;
mod router;
mod server;
mod table;

pub mod middleware;

pub use config::{AssetsConfig, Config, DEFAULT_PORT};
pub use context::{Context, Data};
pub use declare::{MiddlewareDeclaration, PathScope, RouteDeclaration};
pub use error::{BoxError, Error};
pub use handler::{Handler, IntoFlow, IntoResult, Middleware};
pub use method::{Method, MethodFilter, UnknownMethod};
pub use middleware::Flow;
pub use pipeline::Pipeline;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use table::{PipelineTable, duplicates};

pub use http::StatusCode;
