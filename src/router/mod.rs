//! # Router Module
//!
//! Turns a method + URI into a [`Request`](crate::request::Request) whose
//! directory, controller, action and parameters are populated, ready for the
//! dispatcher.
//!
//! ## Overview
//!
//! The dispatcher only consumes the [`Resolver`] trait. [`SegmentResolver`]
//! is the default implementation and follows the classic MVC convention:
//!
//! ```text
//! [/<directory>]/<controller>/<action>/<id>/<p1>/<p2>...
//! ```
//!
//! - A leading segment (or segments) is treated as a directory only when it
//!   was registered with [`SegmentResolver::with_directory`].
//! - A missing controller or action falls back to the configured defaults
//!   (`welcome` / `index`).
//! - Remaining segments become positional parameters named `id`, `p1`, `p2`, ...
//! - The query string is decoded into the request's ambient parameters.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use mvc_dispatch::router::{Resolver, SegmentResolver};
//!
//! let resolver = SegmentResolver::new().with_directory("admin");
//! let req = resolver.resolve(Method::GET, "/admin/users/edit/42?tab=roles").unwrap();
//! assert_eq!(req.directory.as_deref(), Some("admin"));
//! assert_eq!(req.controller, "users");
//! assert_eq!(req.action, "edit");
//! assert_eq!(req.get_param("id"), Some("42"));
//! assert_eq!(req.get_query_param("tab"), Some("roles"));
//! ```

mod core;

pub use core::{ParamVec, Resolver, SegmentResolver, MAX_INLINE_PARAMS};
