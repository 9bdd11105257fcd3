//! Per-request context.
//!
//! A fresh [`Context`] is built for every request a pipeline runs. It owns the
//! [`Request`], an initially empty [`Data`] bag that middleware and the route
//! handler use to talk to each other, and two response helpers. Nothing in it
//! outlives the request.

use std::collections::HashMap;

use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::request::Request;
use crate::response::Response;

/// Request-scoped state threaded through one pipeline execution.
///
/// Middleware receives the context by value and hands it back with
/// [`Flow::Continue`](crate::Flow::Continue), so writes to [`data_mut`](Self::data_mut)
/// are visible to every later stage of the same request and to no other request.
#[derive(Debug)]
pub struct Context {
    request: Request,
    data: Data,
}

impl Context {
    /// Wraps `request` with an empty data bag.
    pub fn new(request: Request) -> Self {
        Self { request, data: Data::default() }
    }

    pub fn request(&self) -> &Request { &self.request }
    pub fn data(&self) -> &Data { &self.data }
    pub fn data_mut(&mut self) -> &mut Data { &mut self.data }

    /// `200 OK` with `value` serialised as JSON.
    ///
    /// If serialisation fails (a map with non-string keys, a failing `Serialize`
    /// impl) the error is logged and a bodiless `500` is returned instead.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Response {
        match serde_json::to_vec(value) {
            Ok(bytes) => Response::json(bytes),
            Err(e) => {
                error!(path = %self.request.path(), "json serialisation failed: {e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// `200 OK` with `content` as `text/html; charset=utf-8`.
    pub fn html(&self, content: impl Into<String>) -> Response {
        Response::html(content)
    }
}

// ── Data ──────────────────────────────────────────────────────────────────────

/// Free-form key/value bag scoped to a single request.
///
/// Values are JSON values, so anything `Serialize` can go in and anything
/// `Deserialize` can come back out with [`get_as`](Self::get_as).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Data(HashMap<String, Value>);

impl Data {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Reads `key` and deserialises it into `T`. `None` if absent or the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0.get(key).and_then(|v| T::deserialize(v).ok())
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::method::Method;

    fn cx() -> Context {
        Context::new(Request::new(Method::Get, "/users"))
    }

    #[test]
    fn data_starts_empty() {
        let cx = cx();
        assert!(cx.data().is_empty());
        assert_eq!(cx.request().path(), "/users");
    }

    #[test]
    fn data_round_trips_typed_values() {
        let mut cx = cx();
        cx.data_mut().insert("user", json!({ "id": 7, "name": "ana" }));
        cx.data_mut().insert("hits", 3);

        assert_eq!(cx.data().get_as::<u32>("hits"), Some(3));
        assert_eq!(cx.data().get("user").and_then(|u| u["name"].as_str()), Some("ana"));
        assert_eq!(cx.data().get_as::<String>("hits"), None);
    }

    #[test]
    fn helpers_set_content_type_and_leave_data_alone() {
        let cx = cx();
        let json = cx.json(&json!({ "ok": true }));
        let html = cx.html("<p>hi</p>");

        assert_eq!(json.status_code(), StatusCode::OK);
        assert_eq!(json.header("content-type"), Some("application/json; charset=utf-8"));
        assert_eq!(json.body(), br#"{"ok":true}"#);
        assert_eq!(html.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(html.body(), b"<p>hi</p>");
        assert!(cx.data().is_empty());
    }

    #[test]
    fn json_serialisation_failure_becomes_500() {
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], "non-string key");

        let res = cx().json(&bad);
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.body().is_empty());
    }
}
