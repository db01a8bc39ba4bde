use std::fmt;
use std::sync::Arc;

use ncatbot_core::{MessageEvent, PluginHost};

use super::BaseFilter;

type SimpleFn = Arc<dyn Fn(&MessageEvent) -> bool + Send + Sync>;
type ContextualFn = Arc<dyn Fn(&dyn PluginHost, &MessageEvent) -> bool + Send + Sync>;

/// A user-supplied predicate. The variant is chosen at construction: `Simple`
/// only sees the event, `Contextual` also sees the host.
#[derive(Clone)]
pub enum CustomFilter {
    Simple { name: String, func: SimpleFn },
    Contextual { name: String, func: ContextualFn },
}

impl CustomFilter {
    pub fn simple<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&MessageEvent) -> bool + Send + Sync + 'static,
    {
        Self::Simple {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn contextual<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&dyn PluginHost, &MessageEvent) -> bool + Send + Sync + 'static,
    {
        Self::Contextual {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl BaseFilter for CustomFilter {
    fn name(&self) -> &str {
        match self {
            Self::Simple { name, .. } | Self::Contextual { name, .. } => name,
        }
    }

    fn check(&self, host: &dyn PluginHost, event: &MessageEvent) -> bool {
        match self {
            Self::Simple { func, .. } => func(event),
            Self::Contextual { func, .. } => func(host, event),
        }
    }
}

impl fmt::Debug for CustomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Simple { .. } => "Simple",
            Self::Contextual { .. } => "Contextual",
        };
        f.debug_struct("CustomFilter")
            .field("kind", &kind)
            .field("name", &self.name())
            .finish()
    }
}
