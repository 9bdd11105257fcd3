//! Route and middleware declarations.
//!
//! Plain data: what to run, for which method, at which path. Built at startup,
//! handed to [`PipelineTable::compile`](crate::PipelineTable::compile), never
//! changed afterwards. [`Router`](crate::Router) is the usual way to collect
//! them, but the lists can also be assembled by hand.

use std::fmt;

use crate::handler::{BoxedHandler, BoxedMiddleware, Handler, Middleware};
use crate::method::{Method, MethodFilter};

/// One `(method, path)` the application serves, and the handler that serves it.
#[derive(Clone)]
pub struct RouteDeclaration {
    method: Method,
    path: String,
    handler: BoxedHandler,
}

impl RouteDeclaration {
    pub fn new(method: Method, path: impl Into<String>, handler: impl Handler) -> Self {
        Self { method, path: path.into(), handler: handler.into_boxed_handler() }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub(crate) fn handler(&self) -> &BoxedHandler { &self.handler }
}

impl fmt::Debug for RouteDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDeclaration")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// A middleware and the subset of routes it applies to.
#[derive(Clone)]
pub struct MiddlewareDeclaration {
    method: MethodFilter,
    scope: PathScope,
    handler: BoxedMiddleware,
}

impl MiddlewareDeclaration {
    /// `method` accepts a [`Method`] or [`MethodFilter::Any`]; `scope` accepts
    /// a path string, where `"*"` means every route.
    pub fn new(
        method: impl Into<MethodFilter>,
        scope: impl Into<PathScope>,
        handler: impl Middleware,
    ) -> Self {
        Self {
            method: method.into(),
            scope: scope.into(),
            handler: handler.into_boxed_middleware(),
        }
    }

    pub fn method(&self) -> MethodFilter { self.method }
    pub fn scope(&self) -> &PathScope { &self.scope }
    pub(crate) fn handler(&self) -> &BoxedMiddleware { &self.handler }
}

impl fmt::Debug for MiddlewareDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareDeclaration")
            .field("method", &self.method)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

// ── PathScope ─────────────────────────────────────────────────────────────────

/// Which route paths a middleware applies to.
///
/// `All` is the `"*"` wildcard. `Path(p)` matches a route path equal to `p`
/// or nested under it: `"/api"` covers `"/api"` and `"/api/users"` but not
/// `"/apiv2"`. Paths are compared as declared, with no normalisation.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum PathScope {
    All,
    Path(String),
}

impl PathScope {
    pub fn matches(&self, route_path: &str) -> bool {
        match self {
            Self::All => true,
            Self::Path(scope) => route_path
                .strip_prefix(scope.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

impl From<&str> for PathScope {
    fn from(path: &str) -> Self {
        match path {
            "*"  => Self::All,
            path => Self::Path(path.to_owned()),
        }
    }
}

impl From<String> for PathScope {
    fn from(path: String) -> Self {
        if path == "*" { Self::All } else { Self::Path(path) }
    }
}

impl fmt::Display for PathScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All        => f.write_str("*"),
            Self::Path(path) => f.write_str(path),
        }
    }
}
