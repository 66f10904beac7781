//! Handler registry: explicit `(directory, controller) → factory` mapping.
//!
//! Handler identities follow the naming convention
//! `<prefix><directory_>controller`, e.g. directory `admin` and controller
//! `users` give `controller_admin_users`. Lookups are case-insensitive.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::controller::Controller;
use crate::request::Request;
use crate::runtime_config::{DispatchConfig, DEFAULT_HANDLER_PREFIX};

/// Builds a controller for one request. A construction error sends the
/// dispatcher down the model fallback path.
pub type ControllerFactory =
    Arc<dyn Fn(&Request) -> anyhow::Result<Box<dyn Controller>> + Send + Sync>;

/// A registered identity.
#[derive(Clone)]
pub enum HandlerEntry {
    /// Instantiable controller
    Concrete(ControllerFactory),
    /// Declared but not instantiable (a base controller)
    Abstract,
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerEntry::Concrete(_) => f.write_str("Concrete(..)"),
            HandlerEntry::Abstract => f.write_str("Abstract"),
        }
    }
}

/// Build the handler identity for a directory/controller pair.
///
/// The directory is trimmed of `/`, path separators become `_`, and a
/// trailing `_` is appended. The result is lower-cased.
#[must_use]
pub fn handler_identity(prefix: &str, directory: Option<&str>, controller: &str) -> String {
    let mut identity = String::with_capacity(prefix.len() + controller.len() + 16);
    identity.push_str(prefix);
    if let Some(dir) = directory {
        let dir = dir.trim_matches('/');
        if !dir.is_empty() {
            identity.extend(dir.chars().map(|c| if c == '/' || c == '\\' { '_' } else { c }));
            identity.push('_');
        }
    }
    identity.push_str(controller);
    identity.to_lowercase()
}

/// Name of the controller method implementing `action`.
#[must_use]
pub fn action_method(action: &str) -> String {
    format!("action_{action}")
}

/// Registry of controller factories keyed by handler identity.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    prefix: String,
    entries: HashMap<String, HandlerEntry>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_HANDLER_PREFIX)
    }

    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Registry using the handler prefix from `config`.
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::with_prefix(&config.handler_prefix)
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Identity of `request`'s directory/controller under this registry's prefix.
    #[must_use]
    pub fn identity_for(&self, request: &Request) -> String {
        handler_identity(&self.prefix, request.directory.as_deref(), &request.controller)
    }

    fn insert(&mut self, identity: String, entry: HandlerEntry) {
        if self.entries.insert(identity.clone(), entry).is_some() {
            warn!(
                handler = %identity,
                total_handlers = self.entries.len(),
                "Replaced existing handler"
            );
        } else {
            info!(
                handler = %identity,
                total_handlers = self.entries.len(),
                "Handler registered"
            );
        }
    }

    /// Register a controller factory. Returns the handler identity.
    pub fn register<F>(&mut self, directory: Option<&str>, controller: &str, factory: F) -> String
    where
        F: Fn(&Request) -> anyhow::Result<Box<dyn Controller>> + Send + Sync + 'static,
    {
        let identity = handler_identity(&self.prefix, directory, controller);
        self.insert(identity.clone(), HandlerEntry::Concrete(Arc::new(factory)));
        identity
    }

    /// Register a controller built with `Default` for every request.
    pub fn register_default<C>(&mut self, directory: Option<&str>, controller: &str) -> String
    where
        C: Controller + Default + 'static,
    {
        self.register(directory, controller, |_req| {
            Ok(Box::new(C::default()) as Box<dyn Controller>)
        })
    }

    /// Declare an identity that exists but cannot be instantiated.
    pub fn register_abstract(&mut self, directory: Option<&str>, controller: &str) -> String {
        let identity = handler_identity(&self.prefix, directory, controller);
        self.insert(identity.clone(), HandlerEntry::Abstract);
        identity
    }

    #[must_use]
    pub fn lookup(&self, identity: &str) -> Option<&HandlerEntry> {
        self.entries.get(&identity.to_lowercase())
    }

    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.lookup(identity).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered identities, sorted.
    #[must_use]
    pub fn identities(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ActionContext, ActionOutcome};

    #[derive(Default)]
    struct Noop;

    impl Controller for Noop {
        fn action(
            &mut self,
            _action: &str,
            _params: &[&str],
            _cx: &mut ActionContext<'_>,
        ) -> anyhow::Result<ActionOutcome> {
            Ok(ActionOutcome::Handled)
        }
    }

    #[test]
    fn test_identity_with_directory() {
        assert_eq!(
            handler_identity("controller_", Some("admin"), "users"),
            "controller_admin_users"
        );
        assert_eq!(action_method("list"), "action_list");
    }

    #[test]
    fn test_identity_normalizes_separators() {
        assert_eq!(
            handler_identity("controller_", Some("/api/v1/"), "Users"),
            "controller_api_v1_users"
        );
        assert_eq!(
            handler_identity("controller_", Some("api\\v2"), "users"),
            "controller_api_v2_users"
        );
    }

    #[test]
    fn test_identity_without_directory() {
        assert_eq!(handler_identity("controller_", None, "welcome"), "controller_welcome");
        assert_eq!(handler_identity("controller_", Some("/"), "welcome"), "controller_welcome");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = HandlerRegistry::new();
        registry.register_default::<Noop>(Some("admin"), "users");
        assert!(registry.contains("Controller_Admin_Users"));
        assert!(!registry.contains("controller_users"));
    }

    #[test]
    fn test_abstract_and_replace() {
        let mut registry = HandlerRegistry::new();
        registry.register_abstract(None, "base");
        assert!(matches!(
            registry.lookup("controller_base"),
            Some(HandlerEntry::Abstract)
        ));
        registry.register_default::<Noop>(None, "base");
        assert!(matches!(
            registry.lookup("controller_base"),
            Some(HandlerEntry::Concrete(_))
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.identities(), vec!["controller_base"]);
    }
}
