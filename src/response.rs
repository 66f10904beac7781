//! Response produced by a dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::request::HeaderVec;

/// Status, headers and body of one dispatched request.
///
/// A fresh `Response` is created when execution of a request starts and is
/// handed to the controller through its
/// [`ActionContext`](crate::controller::ActionContext). Responses are
/// serializable so cache backends can store them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers
    pub headers: HeaderVec,
    /// Response body
    pub body: String,
    /// Wall-clock duration of the dispatch that produced this response
    #[serde(skip)]
    pub elapsed: Option<Duration>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: String::new(),
            elapsed: None,
        }
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON response with a content-type header
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        let mut resp = Self {
            status,
            body: body.to_string(),
            ..Self::default()
        };
        resp.set_header("content-type", "application/json".to_string());
        resp
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}
