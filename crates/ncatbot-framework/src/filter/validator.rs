use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, error};

use ncatbot_core::{HandlerId, MessageEvent, PluginHost};

use super::BoxedFilter;

/// Runs a handler's filters against a message.
#[derive(Clone)]
pub struct FilterValidator {
    host: Arc<dyn PluginHost>,
}

impl FilterValidator {
    pub fn new(host: Arc<dyn PluginHost>) -> Self {
        Self { host }
    }

    /// Returns `true` when every filter passes. Stops at the first rejection;
    /// a panicking filter counts as a rejection.
    pub fn validate(&self, handler: &HandlerId, filters: &[BoxedFilter], event: &MessageEvent) -> bool {
        for filter in filters {
            let passed = catch_unwind(AssertUnwindSafe(|| filter.check(self.host.as_ref(), event)));
            match passed {
                Ok(true) => continue,
                Ok(false) => {
                    debug!(handler = %handler, filter = filter.name(), "Filter rejected message");
                    return false;
                }
                Err(_) => {
                    error!(handler = %handler, filter = filter.name(), "Filter panicked, treating as rejection");
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::filter::{AdminFilter, BaseFilter, CustomFilter, GroupFilter};

    struct Admins;

    impl PluginHost for Admins {
        fn user_has_role(&self, user_id: &str, role: &str) -> bool {
            user_id == "1" && role == "admin"
        }
    }

    fn id() -> HandlerId {
        HandlerId::new(None, "test")
    }

    #[test]
    fn test_and_semantics() {
        let validator = FilterValidator::new(Arc::new(Admins));
        let filters: Vec<BoxedFilter> = vec![Arc::new(GroupFilter), Arc::new(AdminFilter)];

        assert!(validator.validate(&id(), &filters, &MessageEvent::group("9", "1", "x")));
        assert!(!validator.validate(&id(), &filters, &MessageEvent::group("9", "2", "x")));
        assert!(!validator.validate(&id(), &filters, &MessageEvent::private("1", "x")));
        assert!(validator.validate(&id(), &[], &MessageEvent::private("2", "x")));
    }

    #[test]
    fn test_short_circuit() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let counting = CustomFilter::simple("count", |_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            true
        });
        let filters: Vec<BoxedFilter> = vec![Arc::new(GroupFilter), Arc::new(counting)];
        let validator = FilterValidator::new(Arc::new(Admins));

        assert!(!validator.validate(&id(), &filters, &MessageEvent::private("1", "x")));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_filter_rejects() {
        let boom = CustomFilter::simple("boom", |_| panic!("boom"));
        assert_eq!(boom.name(), "boom");
        let filters: Vec<BoxedFilter> = vec![Arc::new(boom)];
        let validator = FilterValidator::new(Arc::new(Admins));
        assert!(!validator.validate(&id(), &filters, &MessageEvent::private("1", "x")));
    }
}
