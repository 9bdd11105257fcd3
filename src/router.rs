//! Fluent collection of route and middleware declarations.
//!
//! A [`Router`] is nothing but two ordered lists. Order matters: middleware
//! runs in the order it is declared, and a repeated `(method, path)` route
//! replaces the earlier one. [`compile`](Router::compile) turns the lists into
//! a [`PipelineTable`]; [`Server::serve`](crate::Server::serve) does that for you.

use crate::declare::{MiddlewareDeclaration, PathScope, RouteDeclaration};
use crate::handler::{Handler, Middleware};
use crate::method::{Method, MethodFilter};
use crate::table::PipelineTable;

/// The application's declarations.
///
/// Each method returns `self` so registrations chain naturally:
///
/// ```rust,no_run
/// use sluice::{Context, Flow, Method, MethodFilter, Response, Router, StatusCode};
///
/// async fn list_users(cx: Context) -> Response { cx.json(&["ana", "bo"]) }
/// async fn create_user(_: Context) -> StatusCode { StatusCode::CREATED }
///
/// async fn require_auth(cx: Context) -> Flow {
///     match cx.request().header("authorization") {
///         Some(_) => Flow::Continue(cx),
///         None    => Flow::Respond(Response::status(StatusCode::UNAUTHORIZED)),
///     }
/// }
///
/// let app = Router::new()
///     .middleware(MethodFilter::Any, "/users", require_auth)
///     .get("/users", list_users)
///     .post("/users", create_user);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Router {
    routes: Vec<RouteDeclaration>,
    middlewares: Vec<MiddlewareDeclaration>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from declaration lists built elsewhere.
    pub fn from_declarations(
        routes: Vec<RouteDeclaration>,
        middlewares: Vec<MiddlewareDeclaration>,
    ) -> Self {
        Self { routes, middlewares }
    }

    /// Declare a route for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax and a trailing `{*rest}` catches the
    /// remainder; `cx.request().param("name")` retrieves them.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes.push(RouteDeclaration::new(method, path, handler));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, path, handler)
    }

    /// Declare a middleware for the routes matching `method` and `scope`.
    ///
    /// `method` is a [`Method`] or [`MethodFilter::Any`]. `scope` is a path
    /// (`"/api"` also covers `"/api/…"`) or `"*"` for every route.
    pub fn middleware(
        mut self,
        method: impl Into<MethodFilter>,
        scope: impl Into<PathScope>,
        handler: impl Middleware,
    ) -> Self {
        self.middlewares.push(MiddlewareDeclaration::new(method, scope, handler));
        self
    }

    /// Shorthand for a middleware on every method of every route.
    pub fn wrap(self, handler: impl Middleware) -> Self {
        self.middleware(MethodFilter::Any, PathScope::All, handler)
    }

    pub fn routes(&self) -> &[RouteDeclaration] { &self.routes }
    pub fn middlewares(&self) -> &[MiddlewareDeclaration] { &self.middlewares }

    /// Compiles the declarations. Can be called any number of times; every
    /// result dispatches identically.
    pub fn compile(&self) -> PipelineTable {
        PipelineTable::compile(&self.routes, &self.middlewares)
    }
}
