//! # Dispatcher Module
//!
//! The dispatcher executes a routed [`Request`](crate::request::Request)
//! against the controller registered for its directory/controller pair and
//! returns the [`Response`](crate::response::Response) the controller built.
//!
//! ## Request Flow
//!
//! 1. If a cache is configured, the request fingerprint is looked up; a hit
//!    is returned as-is
//! 2. The handler identity is built (`controller_<directory_>controller`)
//! 3. With profiling enabled, a benchmark is opened in the `Requests` group
//! 4. The request becomes current on the [`RequestStack`](crate::stack::RequestStack)
//! 5. The registry entry is resolved; unknown identities are a 404, abstract
//!    ones a 500
//! 6. The controller is built and driven through `before`, `action_<name>`
//!    (or its catch-all hook, or the model fallback) and `after`
//! 7. The previous request is restored, the benchmark is stopped (or deleted
//!    on failure), root responses get a default content-type, and cacheable
//!    responses are stored
//!
//! ## Error Handling
//!
//! Every failure surfaces as a [`DispatchError`](crate::error::DispatchError)
//! whose [`status`](crate::error::DispatchError::status) is 404 for lookup
//! failures and 500 otherwise. Controller panics are caught and reported as
//! 500s. Cache and profiler problems never fail a request.
//!
//! ## Nested Requests
//!
//! Controllers issue sub-requests through
//! [`ActionContext::execute`](crate::controller::ActionContext::execute). The
//! sub-request runs synchronously on the same stack, so inside it the outer
//! request is `previous`, and once it returns the outer request is current
//! again.
//!
//! ```rust
//! use mvc_dispatch::controller::{ActionContext, ActionOutcome, Controller};
//! use mvc_dispatch::dispatcher::Dispatcher;
//! use mvc_dispatch::registry::HandlerRegistry;
//! use mvc_dispatch::request::Request;
//! use mvc_dispatch::stack::RequestStack;
//!
//! #[derive(Default)]
//! struct Hello;
//!
//! impl Controller for Hello {
//!     fn action(
//!         &mut self,
//!         action: &str,
//!         params: &[&str],
//!         cx: &mut ActionContext<'_>,
//!     ) -> anyhow::Result<ActionOutcome> {
//!         if action != "index" {
//!             return Ok(ActionOutcome::Missing);
//!         }
//!         let name = params.first().copied().unwrap_or("world");
//!         cx.response_mut().set_body(format!("hello, {name}"));
//!         Ok(ActionOutcome::Handled)
//!     }
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_default::<Hello>(None, "hello");
//! let dispatcher = Dispatcher::new(registry);
//!
//! let mut stack = RequestStack::new();
//! let request = Request::get("/hello/index/rust", "hello", "index").with_param("id", "rust");
//! let response = dispatcher.execute(&mut stack, request).unwrap();
//! assert_eq!(response.body, "hello, rust");
//! assert_eq!(response.get_header("content-type"), Some("text/html; charset=utf-8"));
//! ```

mod core;

pub use core::{Dispatcher, BENCHMARK_GROUP};
