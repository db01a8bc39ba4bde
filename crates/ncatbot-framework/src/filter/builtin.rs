use ncatbot_core::{MessageEvent, PluginHost, ROLE_ADMIN, ROLE_ROOT};

use super::BaseFilter;

/// Passes group messages only.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupFilter;

impl BaseFilter for GroupFilter {
    fn name(&self) -> &str {
        "group"
    }

    fn check(&self, _host: &dyn PluginHost, event: &MessageEvent) -> bool {
        event.is_group_msg()
    }
}

/// Passes private messages only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivateFilter;

impl BaseFilter for PrivateFilter {
    fn name(&self) -> &str {
        "private"
    }

    fn check(&self, _host: &dyn PluginHost, event: &MessageEvent) -> bool {
        event.is_private_msg()
    }
}

/// Passes senders holding the `admin` or `root` role.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminFilter;

impl BaseFilter for AdminFilter {
    fn name(&self) -> &str {
        "admin"
    }

    fn check(&self, host: &dyn PluginHost, event: &MessageEvent) -> bool {
        host.user_has_role(&event.user_id, ROLE_ADMIN) || host.user_has_role(&event.user_id, ROLE_ROOT)
    }
}

/// Passes senders holding the `root` role.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootFilter;

impl BaseFilter for RootFilter {
    fn name(&self) -> &str {
        "root"
    }

    fn check(&self, host: &dyn PluginHost, event: &MessageEvent) -> bool {
        host.user_has_role(&event.user_id, ROLE_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Roles(&'static [(&'static str, &'static str)]);

    impl PluginHost for Roles {
        fn user_has_role(&self, user_id: &str, role: &str) -> bool {
            self.0.iter().any(|&(u, r)| u == user_id && r == role)
        }
    }

    #[test]
    fn test_message_type_filters() {
        let host = Roles(&[]);
        let group = MessageEvent::group("10", "1", "hi");
        let private = MessageEvent::private("1", "hi");
        assert!(GroupFilter.check(&host, &group));
        assert!(!GroupFilter.check(&host, &private));
        assert!(PrivateFilter.check(&host, &private));
        assert!(!PrivateFilter.check(&host, &group));
    }

    #[test]
    fn test_role_filters() {
        let host = Roles(&[("1", "admin"), ("2", "root")]);
        let admin = MessageEvent::private("1", "x");
        let root = MessageEvent::private("2", "x");
        let nobody = MessageEvent::private("3", "x");

        assert!(AdminFilter.check(&host, &admin));
        assert!(AdminFilter.check(&host, &root));
        assert!(!AdminFilter.check(&host, &nobody));

        assert!(!RootFilter.check(&host, &admin));
        assert!(RootFilter.check(&host, &root));
    }
}
