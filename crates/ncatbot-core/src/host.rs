//! The plugin host contract.
//!
//! Plugin lifecycle and role storage are owned by the host application. The
//! command engine only asks two questions: which plugin instance owns a
//! handler, and whether a user holds a role.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased plugin instance. Handlers downcast it back to their own type.
pub type PluginInstance = Arc<dyn Any + Send + Sync>;

/// Role granted to bot administrators.
pub const ROLE_ADMIN: &str = "admin";
/// Role granted to the bot owner.
pub const ROLE_ROOT: &str = "root";

/// Identifies a registered handler: the owning plugin (if any) and the
/// handler name (the command path for commands).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId {
    pub plugin: Option<String>,
    pub name: String,
}

impl HandlerId {
    pub fn new(plugin: Option<String>, name: impl Into<String>) -> Self {
        Self {
            plugin,
            name: name.into(),
        }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.plugin {
            Some(plugin) => write!(f, "{plugin}::{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Host services the engine consumes.
pub trait PluginHost: Send + Sync {
    /// Returns the plugin instance owning `handler`, if it belongs to one.
    fn find_plugin_instance(&self, _handler: &HandlerId) -> Option<PluginInstance> {
        None
    }

    /// Returns whether `user_id` holds `role`.
    fn user_has_role(&self, user_id: &str, role: &str) -> bool;
}

/// A host with no plugins and no roles.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl PluginHost for NoopHost {
    fn user_has_role(&self, _user_id: &str, _role: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_id_display() {
        assert_eq!(
            HandlerId::new(Some("admin".into()), "admin user ban").to_string(),
            "admin::admin user ban"
        );
        assert_eq!(HandlerId::new(None, "hello").to_string(), "hello");
    }

    #[test]
    fn test_noop_host() {
        assert!(!NoopHost.user_has_role("1", ROLE_ROOT));
        assert!(NoopHost.find_plugin_instance(&HandlerId::new(None, "x")).is_none());
    }
}
