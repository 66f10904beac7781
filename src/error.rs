//! Dispatch error taxonomy and the single error → HTTP status mapping.

use http::StatusCode;
use thiserror::Error;

use crate::response::Response;

/// Broad classification of a dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The handler or route could not be resolved (404)
    NotFound,
    /// Any other internal dispatch fault (500)
    Server,
}

/// Failure of [`Dispatcher::execute`](crate::dispatcher::Dispatcher::execute).
///
/// Controllers return `anyhow::Result`; when a controller propagates a
/// `DispatchError` (typically from a nested sub-request) its own
/// classification is kept.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("The requested URL {uri} was not found on this server.")]
    NotFound { uri: String },

    #[error("Cannot create instances of abstract {handler}")]
    AbstractHandler { handler: String },

    #[error("handler {handler} failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("handler {handler} panicked: {message}")]
    HandlerPanicked { handler: String, message: String },

    #[error("model fallback for {uri} failed: {source}")]
    ModelFailed {
        uri: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::NotFound { .. } => ErrorKind::NotFound,
            DispatchError::Handler { source, .. } => source
                .downcast_ref::<DispatchError>()
                .map_or(ErrorKind::Server, DispatchError::kind),
            DispatchError::AbstractHandler { .. }
            | DispatchError::HandlerPanicked { .. }
            | DispatchError::ModelFailed { .. } => ErrorKind::Server,
        }
    }

    /// HTTP status for this failure: lookup failures are 404, everything else 500.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render the failure as a JSON error response for the entry point.
    #[must_use]
    pub fn into_response(self) -> Response {
        Response::error(self.status().as_u16(), &self.to_string())
    }
}

/// Failure reported by a cache or profiler backend. Never fatal to dispatch.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache entry could not be encoded: {0}")]
    Codec(#[from] serde_json::Error),
}
