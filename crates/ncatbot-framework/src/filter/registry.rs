use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{AdminFilter, BaseFilter, BoxedFilter, GroupFilter, PrivateFilter, RootFilter};

/// Reusable filters looked up by name at registration time.
///
/// `group`, `private`, `admin` and `root` are always present.
pub struct FilterRegistry {
    filters: RwLock<HashMap<String, BoxedFilter>>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterRegistry {
    pub fn new() -> Self {
        let builtins: [BoxedFilter; 4] = [
            Arc::new(GroupFilter),
            Arc::new(PrivateFilter),
            Arc::new(AdminFilter),
            Arc::new(RootFilter),
        ];
        let filters = builtins
            .into_iter()
            .map(|f| (f.name().to_string(), f))
            .collect();
        Self {
            filters: RwLock::new(filters),
        }
    }

    /// Registers `filter` under `name`, replacing any previous entry.
    pub fn register(&self, name: impl Into<String>, filter: impl BaseFilter + 'static) {
        self.register_boxed(name, Arc::new(filter));
    }

    pub fn register_boxed(&self, name: impl Into<String>, filter: BoxedFilter) {
        let name = name.into();
        debug!(filter = %name, "Registered named filter");
        self.filters.write().insert(name, filter);
    }

    pub fn get(&self, name: &str) -> Option<BoxedFilter> {
        self.filters.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.filters.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CustomFilter;

    #[test]
    fn test_builtins_present() {
        let registry = FilterRegistry::new();
        assert_eq!(registry.names(), vec!["admin", "group", "private", "root"]);
        assert_eq!(registry.get("group").unwrap().name(), "group");
        assert!(registry.get("cooldown").is_none());
    }

    #[test]
    fn test_register_custom() {
        let registry = FilterRegistry::new();
        registry.register("long_text", CustomFilter::simple("long_text", |e| e.plain_text().len() > 10));
        assert!(registry.contains("long_text"));
    }
}
