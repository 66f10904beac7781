use http::Method;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

use crate::request::Request;

/// Maximum number of route/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage: names are `Arc<str>`, values are per-request `String`s.
/// Order is preserved; it defines the positional view of route parameters.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Maps a method + URI to a routed [`Request`].
pub trait Resolver: Send + Sync {
    /// Returns `None` when no route matches.
    fn resolve(&self, method: Method, uri: &str) -> Option<Request>;
}

/// Convention-based resolver: `[/<directory>]/<controller>/<action>/<params...>`.
#[derive(Debug, Clone)]
pub struct SegmentResolver {
    /// Known directories, each stored as its list of path segments
    directories: Vec<Vec<String>>,
    default_controller: String,
    default_action: String,
}

impl Default for SegmentResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            directories: Vec::new(),
            default_controller: "welcome".to_string(),
            default_action: "index".to_string(),
        }
    }

    /// Register a controller directory such as `admin` or `api/v1`.
    #[must_use]
    pub fn with_directory(mut self, directory: &str) -> Self {
        let segments: Vec<String> = directory
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !segments.is_empty() {
            self.directories.push(segments);
            // Longest directory wins when several share a prefix.
            self.directories.sort_by_key(|d| std::cmp::Reverse(d.len()));
        }
        self
    }

    #[must_use]
    pub fn with_defaults(mut self, controller: &str, action: &str) -> Self {
        self.default_controller = controller.to_string();
        self.default_action = action.to_string();
        self
    }

    fn match_directory(&self, segments: &[Cow<'_, str>]) -> Option<usize> {
        self.directories
            .iter()
            .find(|dir| {
                dir.len() <= segments.len()
                    && dir.iter().zip(segments).all(|(d, s)| d.as_str() == &**s)
            })
            .map(Vec::len)
    }
}

/// Segments may not carry characters that have meaning in file names or URIs.
fn valid_segment(segment: &str) -> bool {
    !segment.contains(['.', ',', ';', '\n'])
}

fn decode(raw: &str) -> Option<Cow<'_, str>> {
    urlencoding::decode(raw).ok()
}

fn parse_query(query: &str) -> ParamVec {
    let mut params = ParamVec::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = name.replace('+', " ");
        let value = value.replace('+', " ");
        if let (Some(name), Some(value)) = (decode(&name), decode(&value)) {
            params.push((Arc::from(name.as_ref()), value.into_owned()));
        }
    }
    params
}

impl Resolver for SegmentResolver {
    fn resolve(&self, method: Method, uri: &str) -> Option<Request> {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));

        let mut segments: Vec<Cow<'_, str>> = Vec::new();
        for raw in path.split('/').filter(|s| !s.is_empty()) {
            let segment = decode(raw)?;
            if !valid_segment(&segment) {
                debug!(uri = %uri, segment = %segment, "Rejected URI segment");
                return None;
            }
            segments.push(segment);
        }

        let dir_len = self.match_directory(&segments).unwrap_or(0);
        let directory = (dir_len > 0).then(|| segments[..dir_len].join("/"));
        let mut rest = segments[dir_len..].iter();

        let controller = rest
            .next()
            .map_or(self.default_controller.as_str(), |s| &**s)
            .to_string();
        let action = rest
            .next()
            .map_or(self.default_action.as_str(), |s| &**s)
            .to_string();

        let mut request =
            Request::new(method, uri).routed(directory.as_deref(), &controller, &action);
        for (idx, value) in rest.enumerate() {
            let name: Arc<str> = if idx == 0 {
                Arc::from("id")
            } else {
                Arc::from(format!("p{idx}"))
            };
            request.params.push((name, value.to_string()));
        }
        request.query_params = parse_query(query);

        debug!(
            uri = %uri,
            directory = ?request.directory,
            controller = %request.controller,
            action = %request.action,
            "Resolved URI"
        );
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_uses_defaults() {
        let req = SegmentResolver::new().resolve(Method::GET, "/").unwrap();
        assert_eq!(req.directory, None);
        assert_eq!(req.controller, "welcome");
        assert_eq!(req.action, "index");
        assert!(req.params.is_empty());
    }

    #[test]
    fn test_unknown_leading_segment_is_a_controller() {
        let req = SegmentResolver::new()
            .with_directory("admin")
            .resolve(Method::GET, "/users/list")
            .unwrap();
        assert_eq!(req.directory, None);
        assert_eq!(req.controller, "users");
        assert_eq!(req.action, "list");
    }

    #[test]
    fn test_nested_directory_prefers_longest() {
        let resolver = SegmentResolver::new()
            .with_directory("api")
            .with_directory("api/v1");
        let req = resolver.resolve(Method::GET, "/api/v1/users").unwrap();
        assert_eq!(req.directory.as_deref(), Some("api/v1"));
        assert_eq!(req.controller, "users");
        assert_eq!(req.action, "index");
    }

    #[test]
    fn test_extra_segments_become_positional_params() {
        let req = SegmentResolver::new()
            .resolve(Method::GET, "/blog/archive/2011/05/hello%20world")
            .unwrap();
        assert_eq!(req.get_param("id"), Some("2011"));
        assert_eq!(req.get_param("p1"), Some("05"));
        assert_eq!(req.get_param("p2"), Some("hello world"));
        assert_eq!(req.positional_params().as_slice(), &["2011", "05", "hello world"]);
    }

    #[test]
    fn test_query_string_becomes_ambient_params() {
        let req = SegmentResolver::new()
            .resolve(Method::GET, "/search?q=rust+lang&page=2&flag")
            .unwrap();
        assert_eq!(req.get_query_param("q"), Some("rust lang"));
        assert_eq!(req.get_query_param("page"), Some("2"));
        assert_eq!(req.get_query_param("flag"), Some(""));
        assert_eq!(req.uri, "/search?q=rust+lang&page=2&flag");
    }

    #[test]
    fn test_dotted_segment_is_rejected() {
        assert!(SegmentResolver::new()
            .resolve(Method::GET, "/files/../etc")
            .is_none());
    }
}
