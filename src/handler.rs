//! Handler and middleware traits, and their type erasure.
//!
//! # How async handlers are stored
//!
//! A compiled pipeline holds a list of middleware of *different* concrete
//! types plus one route handler. Rust collections hold one concrete type, so
//! every function is wrapped behind a trait object (`dyn ErasedHandler` /
//! `dyn ErasedMiddleware`) and stored as an `Arc`.
//!
//! ```text
//! async fn auth(cx: Context) -> Flow { … }          ← user writes this
//!        ↓ router.middleware(Method::Get, "/users", auth)
//! auth.into_boxed_middleware()                      ← Middleware blanket impl
//!        ↓
//! Arc::new(FnMiddleware(auth))                      ← heap-allocated wrapper
//!        ↓  stored as BoxedMiddleware = Arc<dyn ErasedMiddleware>
//! middleware.call(cx)  at request time              ← one vtable dispatch
//!        ↓
//! Box::pin(async { auth(cx).await.into_flow() })    ← BoxFuture
//! ```
//!
//! The `Arc` lets the same middleware sit in the stacks of many routes
//! without copying it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::BoxError;
use crate::middleware::Flow;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future.
///
/// `Send + 'static` so the server can run each pipeline on its own tokio task.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface for route handlers.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, cx: Context) -> BoxFuture<Result<Response, BoxError>>;
}

/// Internal dispatch interface for middleware.
#[doc(hidden)]
pub trait ErasedMiddleware {
    fn call(&self, cx: Context) -> BoxFuture<Result<Flow, BoxError>>;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

#[doc(hidden)]
pub type BoxedMiddleware = Arc<dyn ErasedMiddleware + Send + Sync + 'static>;

// ── Return-value conversions ──────────────────────────────────────────────────

/// What a route handler may return.
///
/// Any plain response type finishes the request. `Err` is a failure: the
/// pipeline stops and the server answers `500`.
pub trait IntoResult {
    fn into_result(self) -> Result<Response, BoxError>;
}

impl IntoResult for Response {
    fn into_result(self) -> Result<Response, BoxError> { Ok(self) }
}

impl IntoResult for http::StatusCode {
    fn into_result(self) -> Result<Response, BoxError> { Ok(self.into_response()) }
}

impl IntoResult for String {
    fn into_result(self) -> Result<Response, BoxError> { Ok(self.into_response()) }
}

impl IntoResult for &'static str {
    fn into_result(self) -> Result<Response, BoxError> { Ok(self.into_response()) }
}

impl<R, E> IntoResult for Result<R, E>
where
    R: IntoResponse,
    E: Into<BoxError>,
{
    fn into_result(self) -> Result<Response, BoxError> {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

/// What a middleware may return: a [`Flow`], or a `Result` wrapping one.
pub trait IntoFlow {
    fn into_flow(self) -> Result<Flow, BoxError>;
}

impl IntoFlow for Flow {
    fn into_flow(self) -> Result<Flow, BoxError> { Ok(self) }
}

impl<E: Into<BoxError>> IntoFlow for Result<Flow, E> {
    fn into_flow(self) -> Result<Flow, BoxError> { self.map_err(Into::into) }
}

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` (or
/// closure returning a future) with the shape:
///
/// ```text
/// async fn name(cx: Context) -> impl IntoResult
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// Implemented for every valid middleware function.
///
/// ```text
/// async fn name(cx: Context) -> Flow
/// async fn name(cx: Context) -> Result<Flow, E>
/// ```
///
/// Return `Flow::Continue(cx)` to pass the (possibly modified) context on, or
/// `Flow::Respond(response)` to end the request here.
pub trait Middleware: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_middleware(self) -> BoxedMiddleware;
}

/// Because `Sealed` is private, external crates cannot name it and therefore
/// cannot implement `Handler` or `Middleware` on their own types.
mod private {
    pub trait Sealed {}
}

impl<F, Fut> private::Sealed for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

impl<F, Fut, R> Middleware for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn into_boxed_middleware(self) -> BoxedMiddleware {
        Arc::new(FnMiddleware(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn call(&self, cx: Context) -> BoxFuture<Result<Response, BoxError>> {
        let fut = (self.0)(cx);
        Box::pin(async move { fut.await.into_result() })
    }
}

struct FnMiddleware<F>(F);

impl<F, Fut, R> ErasedMiddleware for FnMiddleware<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn call(&self, cx: Context) -> BoxFuture<Result<Flow, BoxError>> {
        let fut = (self.0)(cx);
        Box::pin(async move { fut.await.into_flow() })
    }
}
