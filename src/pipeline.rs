//! The composed pipeline: a route's middleware stack plus its handler.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, BoxedMiddleware};
use crate::middleware::Flow;
use crate::request::Request;
use crate::response::Response;

/// One executable pipeline, produced once per declared route at compile time.
///
/// Cloning is two `Arc` increments; clones share the same stack and handler.
#[derive(Clone)]
pub struct Pipeline {
    middlewares: Arc<[BoxedMiddleware]>,
    handler: BoxedHandler,
}

impl Pipeline {
    pub(crate) fn new(middlewares: Vec<BoxedMiddleware>, handler: BoxedHandler) -> Self {
        Self { middlewares: middlewares.into(), handler }
    }

    /// Number of middleware that run before the handler.
    pub fn depth(&self) -> usize {
        self.middlewares.len()
    }

    /// Runs the pipeline for one request.
    ///
    /// Builds a fresh [`Context`], then awaits each middleware in order. The
    /// first [`Flow::Respond`] is returned as-is and nothing after it runs.
    /// If every middleware continues, the route handler gets the context and
    /// its response is returned.
    ///
    /// An `Err` from any stage stops the pipeline and comes back as
    /// [`Error::Handler`]. Nothing is retried; each stage runs at most once.
    pub async fn run(&self, request: Request) -> Result<Response, Error> {
        let mut cx = Context::new(request);

        for (stage, middleware) in self.middlewares.iter().enumerate() {
            match middleware.call(cx).await.map_err(Error::Handler)? {
                Flow::Continue(next) => cx = next,
                Flow::Respond(response) => {
                    debug!(stage, status = %response.status_code(), "middleware short-circuited");
                    return Ok(response);
                }
            }
        }

        self.handler.call(cx).await.map_err(Error::Handler)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}
