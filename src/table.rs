//! The pipeline compiler and the table it produces.
//!
//! Compilation happens once, before the server accepts a connection. After
//! that the table is only read, so concurrent requests share it through an
//! `Arc` with no locking.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::declare::{MiddlewareDeclaration, RouteDeclaration};
use crate::method::Method;
use crate::middleware::select;
use crate::pipeline::Pipeline;

/// Compiled pipelines keyed by declared path, then method.
///
/// Each `(path, method)` holds exactly one pipeline. When the same pair is
/// declared more than once the **last** declaration wins; [`duplicates`]
/// reports the collisions and [`compile`](Self::compile) logs them.
#[derive(Clone, Debug, Default)]
pub struct PipelineTable {
    paths: HashMap<String, HashMap<Method, Pipeline>>,
}

impl PipelineTable {
    /// Builds one pipeline per route declaration.
    ///
    /// Every route gets the middleware whose method filter and path scope
    /// both match it, in declaration order, composed in front of its handler.
    pub fn compile(routes: &[RouteDeclaration], middlewares: &[MiddlewareDeclaration]) -> Self {
        for (path, method) in duplicates(routes) {
            warn!(%method, path = %path, "route declared more than once; the last declaration wins");
        }

        let mut paths: HashMap<String, HashMap<Method, Pipeline>> = HashMap::new();
        for route in routes {
            let stack = select(middlewares, route.method(), route.path());
            debug!(method = %route.method(), path = route.path(), middleware = stack.len(), "compiled route");

            let pipeline = Pipeline::new(stack, route.handler().clone());
            paths.entry(route.path().to_owned())
                .or_default()
                .insert(route.method(), pipeline);
        }

        Self { paths }
    }

    /// Exact lookup. `None` if the path or the method was never declared.
    pub fn get(&self, path: &str, method: Method) -> Option<&Pipeline> {
        self.paths.get(path)?.get(&method)
    }

    /// All pipelines declared at `path`, by method.
    pub fn methods(&self, path: &str) -> Option<&HashMap<Method, Pipeline>> {
        self.paths.get(path)
    }

    /// Number of `(path, method)` entries.
    pub fn len(&self) -> usize {
        self.paths.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub(crate) fn into_paths(self) -> impl Iterator<Item = (String, HashMap<Method, Pipeline>)> {
        self.paths.into_iter()
    }
}

/// Every `(path, method)` pair declared more than once, in first-seen order.
pub fn duplicates(routes: &[RouteDeclaration]) -> Vec<(String, Method)> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut dups = Vec::new();

    for route in routes {
        let key = (route.path(), route.method());
        if !seen.insert(key) && reported.insert(key) {
            dups.push((route.path().to_owned(), route.method()));
        }
    }
    dups
}
