//! # mvc-dispatch
//!
//! **mvc-dispatch** executes requests against MVC-style controllers inside the
//! current process: it resolves a routed request to a registered controller,
//! drives the controller through its `before` → action → `after` lifecycle,
//! tracks the request stack across nested sub-requests, and integrates
//! optional response caching and benchmark profiling.
//!
//! ## Architecture
//!
//! - **[`router`]** - turns a method + URI into a routed [`Request`]
//! - **[`registry`]** - explicit `(directory, controller) → factory` handler registry
//! - **[`controller`]** - the controller lifecycle trait and its action context
//! - **[`dispatcher`]** - the execution engine
//! - **[`stack`]** - current / previous / initial request tracking
//! - **[`cache`]** - request fingerprints and response cache backends
//! - **[`profiler`]** - benchmark hooks
//! - **[`model`]** - fallback invocation when no controller action handles a request
//! - **[`error`]** - the error taxonomy and its HTTP status mapping
//! - **[`runtime_config`]** / **[`logging`]** - configuration and structured logging
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Dispatcher
//!     participant Cache
//!     participant Stack as RequestStack
//!     participant Registry
//!     participant Controller
//!
//!     Caller->>Dispatcher: execute(stack, request)
//!     Dispatcher->>Cache: get(fingerprint)
//!     alt Cache hit
//!         Cache-->>Caller: cached Response
//!     end
//!     Dispatcher->>Stack: enter(request)
//!     Dispatcher->>Registry: lookup(controller_<dir_>name)
//!     alt Unknown handler
//!         Dispatcher-->>Caller: NotFound (404)
//!     end
//!     Dispatcher->>Controller: before()
//!     Dispatcher->>Controller: action_<name>(params...)
//!     Controller->>Dispatcher: execute(sub-request) (optional, nested)
//!     Dispatcher->>Controller: after()
//!     Dispatcher->>Stack: restore previous (guard drop)
//!     Dispatcher->>Cache: put(fingerprint, response, lifetime)
//!     Dispatcher-->>Caller: Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use mvc_dispatch::cache::MemoryCache;
//! use mvc_dispatch::controller::{ActionContext, ActionOutcome, Controller};
//! use mvc_dispatch::router::SegmentResolver;
//! use mvc_dispatch::{Dispatcher, HandlerRegistry, RequestStack};
//!
//! #[derive(Default)]
//! struct Users;
//!
//! impl Controller for Users {
//!     fn action(
//!         &mut self,
//!         action: &str,
//!         params: &[&str],
//!         cx: &mut ActionContext<'_>,
//!     ) -> anyhow::Result<ActionOutcome> {
//!         match action {
//!             "list" => cx.response_mut().set_body("alice, bob"),
//!             "show" => cx.response_mut().set_body(format!("user {}", params[0])),
//!             _ => return Ok(ActionOutcome::Missing),
//!         }
//!         Ok(ActionOutcome::Handled)
//!     }
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_default::<Users>(Some("admin"), "users");
//!
//! let dispatcher = Dispatcher::new(registry).with_cache(Arc::new(MemoryCache::new(128)));
//! let resolver = SegmentResolver::new().with_directory("admin");
//!
//! let mut stack = RequestStack::new();
//! let response = dispatcher
//!     .execute_uri(&mut stack, &resolver, Method::GET, "/admin/users/show/7")
//!     .unwrap();
//! assert_eq!(response.body, "user 7");
//! ```

pub mod cache;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod model;
pub mod profiler;
pub mod registry;
pub mod request;
pub mod response;
pub mod router;
pub mod runtime_config;
pub mod stack;

pub use controller::{ActionContext, ActionOutcome, Controller};
pub use dispatcher::Dispatcher;
pub use error::{BackendError, DispatchError, ErrorKind};
pub use registry::HandlerRegistry;
pub use request::Request;
pub use response::Response;
pub use runtime_config::DispatchConfig;
pub use stack::RequestStack;
