//! Request type consumed by the dispatcher.

use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::SystemTime;

use crate::ids::RequestId;
use crate::router::ParamVec;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage: names are `Arc<str>` (cheap to clone, often repeated),
/// values are per-request `String`s.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// One HTTP-style invocation, possibly a sub-request issued by a controller.
///
/// A `Request` arrives at the dispatcher with its `directory`, `controller`
/// and `action` already resolved (see [`crate::router::Resolver`]). The
/// dispatcher only ever borrows it immutably, so the triple cannot change
/// while the request is executing.
///
/// Cloning produces a new request: the copy gets a fresh id and creation
/// time, so a clone dispatched as a sub-request is never taken for the
/// request it was copied from.
#[derive(Debug)]
pub struct Request {
    /// Unique request ID for tracing and stack bookkeeping
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request URI as received (path plus optional query string)
    pub uri: String,
    /// HTTP headers
    pub headers: HeaderVec,
    /// Controller sub-directory (`admin`, `api/v1`), if any
    pub directory: Option<String>,
    /// Controller name
    pub controller: String,
    /// Action name, without the `action_` prefix
    pub action: String,
    /// Route parameters in route order; the values form the positional view
    pub params: ParamVec,
    /// Ambient request parameters (query string / form `params` bag)
    pub query_params: ParamVec,
    /// Creation timestamp
    pub created_at: SystemTime,
}

impl Clone for Request {
    fn clone(&self) -> Self {
        Self {
            request_id: RequestId::new(),
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            directory: self.directory.clone(),
            controller: self.controller.clone(),
            action: self.action.clone(),
            params: self.params.clone(),
            query_params: self.query_params.clone(),
            created_at: SystemTime::now(),
        }
    }
}

impl Request {
    /// Create a request for `uri` with no route information yet.
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            uri: uri.into(),
            headers: HeaderVec::new(),
            directory: None,
            controller: String::new(),
            action: String::new(),
            params: ParamVec::new(),
            query_params: ParamVec::new(),
            created_at: SystemTime::now(),
        }
    }

    /// Shorthand for a GET request already routed to `controller`/`action`.
    #[must_use]
    pub fn get(uri: impl Into<String>, controller: &str, action: &str) -> Self {
        Self::new(Method::GET, uri).routed(None, controller, action)
    }

    /// Set the resolved directory/controller/action triple.
    #[must_use]
    pub fn routed(mut self, directory: Option<&str>, controller: &str, action: &str) -> Self {
        self.directory = directory.filter(|d| !d.is_empty()).map(str::to_string);
        self.controller = controller.to_string();
        self.action = action.to_string();
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query_params.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// The path component of the URI (query string stripped).
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.split_once('?').map_or(self.uri.as_str(), |(p, _)| p)
    }

    /// Get a route parameter by name ("last write wins").
    #[inline]
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get an ambient query parameter by name ("last write wins").
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Route parameter values in route order, for positional action invocation.
    #[must_use]
    pub fn positional_params(&self) -> SmallVec<[&str; 8]> {
        self.params.iter().map(|(_, v)| v.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_a_new_request() {
        let original = Request::get("/users/show/1", "users", "show").with_param("id", "1");
        let copy = original.clone();
        assert_ne!(copy.request_id, original.request_id);
        assert_eq!(copy.uri, original.uri);
        assert_eq!(copy.get_param("id"), Some("1"));
    }

    #[test]
    fn test_routed_drops_empty_directory() {
        let req = Request::new(Method::GET, "/users").routed(Some(""), "users", "index");
        assert_eq!(req.directory, None);
        assert_eq!(req.controller, "users");
    }

    #[test]
    fn test_param_lookup_last_write_wins() {
        let req = Request::get("/x", "x", "index")
            .with_param("id", "1")
            .with_param("id", "2");
        assert_eq!(req.get_param("id"), Some("2"));
        assert_eq!(req.positional_params().as_slice(), &["1", "2"]);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = Request::get("/x", "x", "index").with_header("Accept", "text/plain");
        assert_eq!(req.get_header("accept"), Some("text/plain"));
    }

    #[test]
    fn test_path_strips_query() {
        let req = Request::new(Method::GET, "/a/b?c=d");
        assert_eq!(req.path(), "/a/b");
    }
}
