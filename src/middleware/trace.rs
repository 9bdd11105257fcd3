use tracing::info;

use crate::context::Context;
use crate::middleware::Flow;

/// Logs the request line at `info` and continues.
///
/// Declare it first and for every route to get one line per request:
///
/// ```rust,no_run
/// use sluice::{MethodFilter, Router, middleware};
///
/// let app = Router::new().middleware(MethodFilter::Any, "*", middleware::trace);
/// ```
pub async fn trace(cx: Context) -> Flow {
    let req = cx.request();
    info!(method = %req.method(), path = %req.path(), "request");
    Flow::Continue(cx)
}
