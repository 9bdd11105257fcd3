//! Middleware stack selection.

use crate::declare::MiddlewareDeclaration;
use crate::handler::BoxedMiddleware;
use crate::method::Method;

/// Whether `decl` applies to a route declared as `(method, path)`.
///
/// Both the method filter and the path scope must match.
pub fn applies(decl: &MiddlewareDeclaration, method: Method, path: &str) -> bool {
    decl.method().matches(method) && decl.scope().matches(path)
}

/// The ordered middleware stack for a route declared as `(method, path)`.
///
/// Declaration order is kept as-is and becomes execution order. There is no
/// reordering by specificity.
pub fn select(
    middlewares: &[MiddlewareDeclaration],
    method: Method,
    path: &str,
) -> Vec<BoxedMiddleware> {
    middlewares.iter()
        .filter(|decl| applies(decl, method, path))
        .map(|decl| decl.handler().clone())
        .collect()
}
