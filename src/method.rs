//! HTTP method as a typed enum, plus the method filter used by middleware.
//!
//! Routes are declared against exactly one [`Method`]. Middleware is declared
//! against a [`MethodFilter`], which adds the `ANY` wildcard.
//!
//! Methods outside this set are rejected by the server with
//! `501 Not Implemented` before any pipeline runs.

use std::fmt;
use std::str::FromStr;

/// A known HTTP method (RFC 9110 §9).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }
}

/// Returned when a string or `http::Method` is not in the supported set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown http method `{}`", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            other     => Err(UnknownMethod(other.to_owned())),
        }
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = UnknownMethod;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── MethodFilter ──────────────────────────────────────────────────────────────

/// Which route methods a middleware applies to.
///
/// `Any` is the `ANY` wildcard. It is a sentinel, never compared against a
/// route's method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MethodFilter {
    Any,
    Only(Method),
}

impl MethodFilter {
    pub fn matches(self, method: Method) -> bool {
        match self {
            Self::Any          => true,
            Self::Only(wanted) => wanted == method,
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        Self::Only(method)
    }
}

/// Parses `"ANY"` or any string [`Method`] accepts.
impl FromStr for MethodFilter {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANY" => Ok(Self::Any),
            other => other.parse().map(Self::Only),
        }
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any          => f.write_str("ANY"),
            Self::Only(method) => method.fmt(f),
        }
    }
}
