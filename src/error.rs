//! Unified error type.

use std::fmt;

/// A type-erased error raised by a handler or middleware.
///
/// Anything that implements `std::error::Error + Send + Sync` converts into
/// this with `?` or `.into()`, and so do `String` and `&str`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by sluice's fallible operations.
///
/// Application-level outcomes (401, 404, 422, …) are [`Response`](crate::Response)
/// values, not `Error`s. This type covers the rest: the listener failing to
/// bind, declared paths the lookup index rejects, and handlers or middleware
/// that fail instead of responding.
#[derive(Debug)]
pub enum Error {
    /// Binding or accepting on the listener failed.
    Io(std::io::Error),
    /// A declared route path could not be indexed (invalid or conflicting pattern).
    Route(matchit::InsertError),
    /// A middleware or route handler returned `Err` during pipeline execution.
    Handler(BoxError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)      => write!(f, "io: {e}"),
            Self::Route(e)   => write!(f, "route: {e}"),
            Self::Handler(e) => write!(f, "handler: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)      => Some(e),
            Self::Route(e)   => Some(e),
            Self::Handler(e) => Some(&**e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<matchit::InsertError> for Error {
    fn from(e: matchit::InsertError) -> Self {
        Self::Route(e)
    }
}
