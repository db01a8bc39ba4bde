//! In-process plugin host.
//!
//! Holds loaded plugin instances by name and the role table from the
//! `[roles]` configuration section.

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::RwLock;
use tracing::debug;

use ncatbot_core::{HandlerId, PluginHost, PluginInstance};

/// Maps plugin names to instances and roles to user ids.
#[derive(Default)]
pub struct PluginTable {
    plugins: RwLock<HashMap<String, PluginInstance>>,
    roles: RwLock<HashMap<String, HashSet<String>>>,
}

impl PluginTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the role table from configuration.
    pub fn from_roles(roles: &BTreeMap<String, Vec<String>>) -> Self {
        let table = Self::new();
        {
            let mut map = table.roles.write();
            for (role, users) in roles {
                map.entry(role.clone())
                    .or_default()
                    .extend(users.iter().cloned());
            }
        }
        table
    }

    /// Makes `instance` available to every handler registered under `name`.
    /// Returns the instance previously registered under that name.
    pub fn register_plugin(
        &self,
        name: impl Into<String>,
        instance: PluginInstance,
    ) -> Option<PluginInstance> {
        let name = name.into();
        debug!(plugin = %name, "Registering plugin instance");
        self.plugins.write().insert(name, instance)
    }

    pub fn unregister_plugin(&self, name: &str) -> Option<PluginInstance> {
        self.plugins.write().remove(name)
    }

    pub fn grant(&self, user_id: impl Into<String>, role: impl Into<String>) {
        self.roles
            .write()
            .entry(role.into())
            .or_default()
            .insert(user_id.into());
    }

    /// Returns whether the user held the role.
    pub fn revoke(&self, user_id: &str, role: &str) -> bool {
        self.roles
            .write()
            .get_mut(role)
            .is_some_and(|users| users.remove(user_id))
    }

    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.plugins.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl PluginHost for PluginTable {
    fn find_plugin_instance(&self, handler: &HandlerId) -> Option<PluginInstance> {
        let plugin = handler.plugin.as_deref()?;
        self.plugins.read().get(plugin).cloned()
    }

    fn user_has_role(&self, user_id: &str, role: &str) -> bool {
        self.roles
            .read()
            .get(role)
            .is_some_and(|users| users.contains(user_id))
    }
}

impl std::fmt::Debug for PluginTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginTable")
            .field("plugins", &self.plugin_names())
            .field("roles", &self.roles.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ncatbot_core::{ROLE_ADMIN, ROLE_ROOT};

    use super::*;

    struct Weather {
        city: &'static str,
    }

    #[test]
    fn test_roles_from_config() {
        let roles = BTreeMap::from([
            (ROLE_ADMIN.to_string(), vec!["10001".to_string()]),
            (ROLE_ROOT.to_string(), vec!["10000".to_string()]),
        ]);
        let table = PluginTable::from_roles(&roles);
        assert!(table.user_has_role("10001", ROLE_ADMIN));
        assert!(!table.user_has_role("10001", ROLE_ROOT));
        assert!(!table.user_has_role("99999", ROLE_ADMIN));

        table.grant("99999", ROLE_ADMIN);
        assert!(table.user_has_role("99999", ROLE_ADMIN));
        assert!(table.revoke("99999", ROLE_ADMIN));
        assert!(!table.revoke("99999", ROLE_ADMIN));
    }

    #[test]
    fn test_plugin_lookup() {
        let table = PluginTable::new();
        table.register_plugin("weather", Arc::new(Weather { city: "Hefei" }));

        let owned = HandlerId::new(Some("weather".into()), "weather today");
        let instance = table.find_plugin_instance(&owned).unwrap();
        assert_eq!(instance.downcast_ref::<Weather>().unwrap().city, "Hefei");

        assert!(table.find_plugin_instance(&HandlerId::new(None, "hello")).is_none());
        let other = HandlerId::new(Some("music".into()), "play");
        assert!(table.find_plugin_instance(&other).is_none());

        assert!(table.unregister_plugin("weather").is_some());
        assert!(table.find_plugin_instance(&owned).is_none());
    }
}
