//! Permission and context filters.
//!
//! A filter is a predicate over the inbound message, optionally consulting the
//! [`PluginHost`] for roles. Handlers carry an ordered list of filters that
//! must all pass:
//!
//! ```rust,ignore
//! registry.command("kick", kick)
//!     .filter(GroupFilter)
//!     .filter(AdminFilter)
//!     .register()?;
//!
//! registry.on_message(welcome)
//!     .name("welcome")
//!     .filter(CustomFilter::simple("has_greeting", |e| e.plain_text().contains("hi")))
//!     .register()?;
//! ```

mod builtin;
mod custom;
mod registry;
mod validator;

use std::fmt;
use std::sync::Arc;

use ncatbot_core::{MessageEvent, PluginHost};

pub use builtin::{AdminFilter, GroupFilter, PrivateFilter, RootFilter};
pub use custom::CustomFilter;
pub use registry::FilterRegistry;
pub use validator::FilterValidator;

/// A predicate deciding whether a handler may run for a message.
pub trait BaseFilter: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn check(&self, host: &dyn PluginHost, event: &MessageEvent) -> bool;
}

/// A type-erased filter that can be shared between handlers.
pub type BoxedFilter = Arc<dyn BaseFilter>;

impl fmt::Debug for dyn BaseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({})", self.name())
    }
}
