//! Middleware: the [`Flow`] result, stack selection, and built-ins.
//!
//! Middleware is the right place for cross-cutting concerns: request logging,
//! authentication checks, request counters, cache hits. Each middleware is
//! declared with a [`MethodFilter`](crate::MethodFilter) and a
//! [`PathScope`](crate::PathScope); at compile time every route gets the
//! ordered subset whose filter and scope both match it (see [`select`]).
//!
//! At request time the stack runs strictly in declaration order, one
//! middleware at a time. The first one to return [`Flow::Respond`] ends the
//! request; the route handler only runs if every middleware continued.
//!
//! Built-in middleware:
//! - [`trace`] — logs method and path of every request it sees

mod selector;
mod trace;

pub use selector::{applies, select};
pub use trace::trace;

use crate::context::Context;
use crate::response::Response;

/// The result of one middleware invocation.
#[derive(Debug)]
pub enum Flow {
    /// Hand the context to the next stage.
    Continue(Context),
    /// Stop here. No further middleware and no route handler runs; this
    /// response is the pipeline's result.
    Respond(Response),
}

impl From<Response> for Flow {
    fn from(response: Response) -> Self {
        Self::Respond(response)
    }
}

impl From<Context> for Flow {
    fn from(cx: Context) -> Self {
        Self::Continue(cx)
    }
}
