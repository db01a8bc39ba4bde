//! The command tree and handler registration.
//!
//! ```text
//! UnifiedRegistry
//! ├── root group
//! │   ├── hello            (alias: hi)
//! │   └── admin/
//! │       └── user         (alias: au)     path = ["admin", "user"]
//! ├── filter functions     (on_message)
//! └── notice / request handlers
//! ```
//!
//! Registration is validate-then-insert under a single write lock: a command
//! whose path or any alias would be a word-prefix of an existing path or
//! alias (or the other way round) is rejected and the tree stays untouched.

use std::collections::BTreeMap;
use std::panic::Location;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use ncatbot_core::{HandlerId, NoticeEvent, RequestEvent};

use crate::command::analyser::{CommandDraft, FunctionAnalyser, validate_name};
use crate::command::spec::{CommandSpec, OptionGroupSpec, OptionSpec, ParameterSpec};
use crate::error::{RegistrationError, RegistrationResult};
use crate::filter::{BaseFilter, BoxedFilter, FilterRegistry};
use crate::handler::{BoxedCommandHandler, BoxedEventHandler, CommandHandler, EventHandler};

// ============================================================================
// Registered entries
// ============================================================================

/// A command as stored in the tree.
#[derive(Debug)]
pub struct RegisteredCommand {
    pub id: HandlerId,
    /// Ancestor group names followed by the command name.
    pub path: Vec<String>,
    pub spec: CommandSpec,
    pub filters: Vec<BoxedFilter>,
    pub location: &'static Location<'static>,
}

impl RegisteredCommand {
    pub fn path_string(&self) -> String {
        self.path.join(" ")
    }
}

/// A message handler selected by filters alone.
pub struct FilterFunction {
    pub id: HandlerId,
    pub func: BoxedCommandHandler,
    pub filters: Vec<BoxedFilter>,
    pub location: &'static Location<'static>,
}

/// A notice or request handler.
pub struct EventHandlerEntry<E> {
    pub id: HandlerId,
    pub handler: BoxedEventHandler<E>,
    pub location: &'static Location<'static>,
}

// ============================================================================
// Tree storage
// ============================================================================

#[derive(Default)]
struct GroupNode {
    description: String,
    commands: BTreeMap<String, Arc<RegisteredCommand>>,
    subgroups: BTreeMap<String, GroupNode>,
}

impl GroupNode {
    fn node(&self, path: &[String]) -> Option<&GroupNode> {
        path.iter()
            .try_fold(self, |node, name| node.subgroups.get(name))
    }

    fn node_mut(&mut self, path: &[String]) -> &mut GroupNode {
        path.iter().fold(self, |node, name| {
            node.subgroups.entry(name.clone()).or_default()
        })
    }

    fn collect_commands(&self, out: &mut Vec<Arc<RegisteredCommand>>) {
        out.extend(self.commands.values().cloned());
        for group in self.subgroups.values() {
            group.collect_commands(out);
        }
    }
}

/// A path or alias competing for the command namespace.
struct PathEntry {
    words: Vec<String>,
    display: String,
    location: &'static Location<'static>,
}

impl PathEntry {
    fn new(words: &[String], display: String, location: &'static Location<'static>) -> Self {
        Self {
            words: words.iter().map(|w| w.to_lowercase()).collect(),
            display,
            location,
        }
    }

    /// Entries for a command's full path and each of its aliases.
    fn for_command(
        path: &[String],
        spec: &CommandSpec,
        location: &'static Location<'static>,
    ) -> Vec<Self> {
        let full = path.join(" ");
        let mut entries = vec![Self::new(path, full.clone(), location)];
        entries.extend(spec.aliases.iter().map(|alias| {
            Self::new(
                std::slice::from_ref(alias),
                format!("{alias} (alias of {full})"),
                location,
            )
        }));
        entries
    }

    fn conflict(&self, existing: &PathEntry) -> Option<RegistrationError> {
        let n = self.words.len().min(existing.words.len());
        if self.words[..n] != existing.words[..n] {
            return None;
        }
        Some(if self.words.len() == existing.words.len() {
            RegistrationError::Duplicate {
                path: self.display.clone(),
                location: self.location.to_string(),
                existing_location: existing.location.to_string(),
            }
        } else {
            RegistrationError::PathConflict {
                path: self.display.clone(),
                location: self.location.to_string(),
                existing: existing.display.clone(),
                existing_location: existing.location.to_string(),
            }
        })
    }
}

struct RegistryInner {
    tree: RwLock<GroupNode>,
    filter_functions: RwLock<Vec<Arc<FilterFunction>>>,
    notice_handlers: RwLock<Vec<Arc<EventHandlerEntry<NoticeEvent>>>>,
    request_handlers: RwLock<Vec<Arc<EventHandlerEntry<RequestEvent>>>>,
    filters: FilterRegistry,
}

/// Event types that can have handlers registered through
/// [`UnifiedRegistry::on_notice`] / [`UnifiedRegistry::on_request`].
pub trait EventSlot: Send + Sync + Sized + 'static {
    #[doc(hidden)]
    fn slot(registry: &UnifiedRegistry) -> &RwLock<Vec<Arc<EventHandlerEntry<Self>>>>;
}

impl EventSlot for NoticeEvent {
    fn slot(registry: &UnifiedRegistry) -> &RwLock<Vec<Arc<EventHandlerEntry<Self>>>> {
        &registry.inner.notice_handlers
    }
}

impl EventSlot for RequestEvent {
    fn slot(registry: &UnifiedRegistry) -> &RwLock<Vec<Arc<EventHandlerEntry<Self>>>> {
        &registry.inner.request_handlers
    }
}

// ============================================================================
// UnifiedRegistry
// ============================================================================

/// Owns every registered command, filter function and event handler.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct UnifiedRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for UnifiedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnifiedRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                tree: RwLock::new(GroupNode::default()),
                filter_functions: RwLock::new(Vec::new()),
                notice_handlers: RwLock::new(Vec::new()),
                request_handlers: RwLock::new(Vec::new()),
                filters: FilterRegistry::new(),
            }),
        }
    }

    /// The root group. Commands registered here have single-word paths.
    pub fn root(&self) -> CommandGroup {
        CommandGroup {
            registry: self.clone(),
            path: Vec::new(),
        }
    }

    /// Returns the top-level group `name`, creating it if needed.
    pub fn group(&self, name: &str) -> CommandGroup {
        self.root().group(name)
    }

    /// Starts registering a top-level command.
    #[track_caller]
    pub fn command(&self, name: &str, handler: impl CommandHandler) -> CommandBuilder {
        self.root().command(name, handler)
    }

    /// Starts registering a pure filter function: a handler that runs for
    /// messages that are not commands, selected by its filters.
    #[track_caller]
    pub fn on_message<H: CommandHandler>(&self, handler: H) -> FilterFunctionBuilder {
        FilterFunctionBuilder {
            registry: self.clone(),
            name: std::any::type_name::<H>().to_string(),
            func: Arc::new(handler),
            filters: Vec::new(),
            plugin: None,
            location: Location::caller(),
        }
    }

    /// Starts registering a notice handler.
    #[track_caller]
    pub fn on_notice<H>(&self, handler: H) -> EventHandlerBuilder<NoticeEvent>
    where
        H: EventHandler<NoticeEvent>,
    {
        EventHandlerBuilder::new(self.clone(), std::any::type_name::<H>(), Arc::new(handler))
    }

    /// Starts registering a request handler.
    #[track_caller]
    pub fn on_request<H>(&self, handler: H) -> EventHandlerBuilder<RequestEvent>
    where
        H: EventHandler<RequestEvent>,
    {
        EventHandlerBuilder::new(self.clone(), std::any::type_name::<H>(), Arc::new(handler))
    }

    /// Named filters usable with `filter_named`.
    pub fn filters(&self) -> &FilterRegistry {
        &self.inner.filters
    }

    /// Every registered command, ordered by path.
    pub fn commands(&self) -> Vec<Arc<RegisteredCommand>> {
        let mut out = Vec::new();
        self.inner.tree.read().collect_commands(&mut out);
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    pub fn filter_functions(&self) -> Vec<Arc<FilterFunction>> {
        self.inner.filter_functions.read().clone()
    }

    pub fn notice_handlers(&self) -> Vec<Arc<EventHandlerEntry<NoticeEvent>>> {
        self.inner.notice_handlers.read().clone()
    }

    pub fn request_handlers(&self) -> Vec<Arc<EventHandlerEntry<RequestEvent>>> {
        self.inner.request_handlers.read().clone()
    }

    /// Finds a command by its exact path.
    pub fn find_command(&self, path: &[&str]) -> Option<Arc<RegisteredCommand>> {
        let (name, groups) = path.split_last()?;
        let groups: Vec<String> = groups.iter().map(|s| s.to_string()).collect();
        self.inner
            .tree
            .read()
            .node(&groups)?
            .commands
            .get(*name)
            .cloned()
    }

    fn resolve_filters(&self, refs: Vec<FilterRef>) -> RegistrationResult<Vec<BoxedFilter>> {
        refs.into_iter()
            .map(|r| match r {
                FilterRef::Direct(filter) => Ok(filter),
                FilterRef::Named(name) => self
                    .inner
                    .filters
                    .get(&name)
                    .ok_or(RegistrationError::UnknownFilter(name)),
            })
            .collect()
    }
}

// ============================================================================
// CommandGroup
// ============================================================================

/// A handle to one group in the command tree.
///
/// The tree is owned by the registry; a handle only records its path, so the
/// parent is always reachable through [`parent`](Self::parent).
#[derive(Clone)]
pub struct CommandGroup {
    registry: UnifiedRegistry,
    path: Vec<String>,
}

impl CommandGroup {
    /// Group name; empty for the root.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn parent(&self) -> Option<CommandGroup> {
        let (_, parent) = self.path.split_last()?;
        Some(CommandGroup {
            registry: self.registry.clone(),
            path: parent.to_vec(),
        })
    }

    /// Returns the subgroup `name`, creating it if needed.
    pub fn group(&self, name: &str) -> CommandGroup {
        let mut path = self.path.clone();
        path.push(name.to_string());
        self.registry.inner.tree.write().node_mut(&path);
        CommandGroup {
            registry: self.registry.clone(),
            path,
        }
    }

    /// Sets the group description shown in help output.
    pub fn describe(self, description: impl Into<String>) -> Self {
        self.registry.inner.tree.write().node_mut(&self.path).description = description.into();
        self
    }

    pub fn description(&self) -> String {
        self.registry
            .inner
            .tree
            .read()
            .node(&self.path)
            .map(|node| node.description.clone())
            .unwrap_or_default()
    }

    /// Commands directly in this group.
    pub fn commands(&self) -> Vec<Arc<RegisteredCommand>> {
        self.registry
            .inner
            .tree
            .read()
            .node(&self.path)
            .map(|node| node.commands.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subgroups(&self) -> Vec<String> {
        self.registry
            .inner
            .tree
            .read()
            .node(&self.path)
            .map(|node| node.subgroups.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Starts registering a command in this group.
    #[track_caller]
    pub fn command(&self, name: &str, handler: impl CommandHandler) -> CommandBuilder {
        CommandBuilder {
            group: self.clone(),
            draft: CommandDraft::new(name, Arc::new(handler)),
            filters: Vec::new(),
            plugin: None,
            location: Location::caller(),
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

enum FilterRef {
    Direct(BoxedFilter),
    Named(String),
}

/// Collects a command declaration; nothing is registered until
/// [`register`](Self::register).
#[must_use = "call `.register()` to add the command"]
pub struct CommandBuilder {
    group: CommandGroup,
    draft: CommandDraft,
    filters: Vec<FilterRef>,
    plugin: Option<String>,
    location: &'static Location<'static>,
}

impl CommandBuilder {
    pub fn alias(mut self, alias: &str) -> Self {
        self.draft.aliases.push(alias.to_string());
        self
    }

    pub fn aliases<'a>(mut self, aliases: impl IntoIterator<Item = &'a str>) -> Self {
        self.draft
            .aliases
            .extend(aliases.into_iter().map(str::to_string));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.draft.description = description.into();
        self
    }

    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.draft.parameters.push(param);
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.draft.options.push(option);
        self
    }

    pub fn option_group(mut self, group: OptionGroupSpec) -> Self {
        self.draft.option_groups.push(group);
        self
    }

    /// Appends a filter; filters run in the order they are added.
    pub fn filter(mut self, filter: impl BaseFilter + 'static) -> Self {
        self.filters.push(FilterRef::Direct(Arc::new(filter)));
        self
    }

    pub fn filter_boxed(mut self, filter: BoxedFilter) -> Self {
        self.filters.push(FilterRef::Direct(filter));
        self
    }

    /// Appends a filter from the registry's [`FilterRegistry`].
    pub fn filter_named(mut self, name: &str) -> Self {
        self.filters.push(FilterRef::Named(name.to_string()));
        self
    }

    /// Names the plugin owning the handler.
    pub fn plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// Analyses the declaration, checks it against the tree and inserts it.
    pub fn register(self) -> RegistrationResult<HandlerId> {
        let Self {
            group,
            draft,
            filters,
            plugin,
            location,
        } = self;

        for name in &group.path {
            validate_name(name)?;
        }
        let spec = FunctionAnalyser::analyse(draft)?;
        let filters = group.registry.resolve_filters(filters)?;

        let mut path = group.path.clone();
        path.push(spec.name.clone());
        let id = HandlerId::new(plugin, path.join(" "));
        let candidates = PathEntry::for_command(&path, &spec, location);

        let mut tree = group.registry.inner.tree.write();

        for (i, entry) in candidates.iter().enumerate() {
            if let Some(err) = candidates[..i].iter().find_map(|prev| entry.conflict(prev)) {
                return Err(err);
            }
        }
        let mut existing = Vec::new();
        tree.collect_commands(&mut existing);
        for command in &existing {
            for current in PathEntry::for_command(&command.path, &command.spec, command.location) {
                if let Some(err) = candidates.iter().find_map(|c| c.conflict(&current)) {
                    return Err(err);
                }
            }
        }

        info!(
            command = %id,
            aliases = ?spec.aliases,
            filters = filters.len(),
            location = %location,
            "Registered command"
        );
        let command = Arc::new(RegisteredCommand {
            id: id.clone(),
            path,
            spec,
            filters,
            location,
        });
        tree.node_mut(&group.path)
            .commands
            .insert(command.spec.name.clone(), command);
        Ok(id)
    }
}

/// Collects a pure filter function declaration.
#[must_use = "call `.register()` to add the filter function"]
pub struct FilterFunctionBuilder {
    registry: UnifiedRegistry,
    name: String,
    func: BoxedCommandHandler,
    filters: Vec<FilterRef>,
    plugin: Option<String>,
    location: &'static Location<'static>,
}

impl FilterFunctionBuilder {
    /// Overrides the handler name used in logs and plugin lookup.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn filter(mut self, filter: impl BaseFilter + 'static) -> Self {
        self.filters.push(FilterRef::Direct(Arc::new(filter)));
        self
    }

    pub fn filter_boxed(mut self, filter: BoxedFilter) -> Self {
        self.filters.push(FilterRef::Direct(filter));
        self
    }

    pub fn filter_named(mut self, name: &str) -> Self {
        self.filters.push(FilterRef::Named(name.to_string()));
        self
    }

    pub fn plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn register(self) -> RegistrationResult<HandlerId> {
        if self.filters.is_empty() {
            return Err(RegistrationError::MissingFilters(self.name));
        }
        let filters = self.registry.resolve_filters(self.filters)?;
        let id = HandlerId::new(self.plugin, self.name);
        debug!(
            handler = %id,
            filters = filters.len(),
            location = %self.location,
            "Registered filter function"
        );
        self.registry
            .inner
            .filter_functions
            .write()
            .push(Arc::new(FilterFunction {
                id: id.clone(),
                func: self.func,
                filters,
                location: self.location,
            }));
        Ok(id)
    }
}

/// Collects a notice or request handler declaration.
#[must_use = "call `.register()` to add the handler"]
pub struct EventHandlerBuilder<E> {
    registry: UnifiedRegistry,
    name: String,
    handler: BoxedEventHandler<E>,
    plugin: Option<String>,
    location: &'static Location<'static>,
}

impl<E: EventSlot> EventHandlerBuilder<E> {
    #[track_caller]
    fn new(registry: UnifiedRegistry, name: &str, handler: BoxedEventHandler<E>) -> Self {
        Self {
            registry,
            name: name.to_string(),
            handler,
            plugin: None,
            location: Location::caller(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn register(self) -> RegistrationResult<HandlerId> {
        if self.name.trim().is_empty() {
            return Err(RegistrationError::InvalidName {
                name: self.name,
                reason: "name is empty",
            });
        }
        let id = HandlerId::new(self.plugin, self.name);
        debug!(handler = %id, location = %self.location, "Registered event handler");
        E::slot(&self.registry).write().push(Arc::new(EventHandlerEntry {
            id: id.clone(),
            handler: self.handler,
            location: self.location,
        }));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::GroupFilter;
    use crate::handler::sync_handler;

    fn noop() -> impl CommandHandler {
        sync_handler(|_| Ok(()))
    }

    #[test]
    fn test_group_is_idempotent() {
        let registry = UnifiedRegistry::new();
        let admin = registry.group("admin").describe("Admin tools");
        let again = registry.group("admin");
        assert_eq!(again.description(), "Admin tools");
        assert_eq!(admin.path(), again.path());
        assert_eq!(registry.root().subgroups(), vec!["admin"]);

        let user = admin.group("user");
        assert_eq!(user.path(), ["admin", "user"]);
        assert_eq!(user.parent().unwrap().name(), "admin");
        assert!(registry.root().parent().is_none());
    }

    #[test]
    fn test_register_nested_command() {
        let registry = UnifiedRegistry::new();
        let id = registry
            .group("admin")
            .command("user", noop())
            .alias("au")
            .plugin("admin_plugin")
            .register()
            .unwrap();
        assert_eq!(id.name, "admin user");
        assert_eq!(id.plugin.as_deref(), Some("admin_plugin"));

        let cmd = registry.find_command(&["admin", "user"]).unwrap();
        assert_eq!(cmd.path, ["admin", "user"]);
        assert!(cmd.spec.aliases.contains("au"));
        assert!(cmd.location.file().ends_with("registry.rs"));
    }

    #[test]
    fn test_duplicate_rejected_without_mutation() {
        let registry = UnifiedRegistry::new();
        registry.command("hello", noop()).alias("hi").register().unwrap();

        let err = registry.command("hello", noop()).register().unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate { .. }));

        let err = registry.command("hey", noop()).alias("hi").register().unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate { .. }));
        assert!(err.to_string().contains("registry.rs"));

        // The rejected command must not be present, not even by its own name.
        assert!(registry.find_command(&["hey"]).is_none());
        assert_eq!(registry.commands().len(), 1);
    }

    #[test]
    fn test_prefix_collision_both_directions() {
        let registry = UnifiedRegistry::new();
        registry.group("admin").command("user", noop()).register().unwrap();

        // ("admin",) is a prefix of ("admin", "user").
        let err = registry.command("admin", noop()).register().unwrap_err();
        assert!(matches!(err, RegistrationError::PathConflict { .. }));

        // ("admin", "user", "ban") extends ("admin", "user").
        let err = registry
            .group("admin")
            .group("user")
            .command("ban", noop())
            .register()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::PathConflict { .. }));

        // An alias equal to a group name collides too.
        let err = registry.command("panel", noop()).alias("admin").register().unwrap_err();
        assert!(matches!(err, RegistrationError::PathConflict { .. }));

        // Case differences do not make paths distinct.
        assert!(registry.command("ADMIN", noop()).register().is_err());
        assert_eq!(registry.commands().len(), 1);
    }

    #[test]
    fn test_alias_conflicts_with_own_name() {
        let registry = UnifiedRegistry::new();
        assert!(registry.command("hi", noop()).alias("hi").register().is_err());
        assert!(registry.commands().is_empty());
    }

    #[test]
    fn test_named_filters_resolved() {
        let registry = UnifiedRegistry::new();
        registry
            .command("kick", noop())
            .filter_named("group")
            .filter_named("admin")
            .register()
            .unwrap();
        let cmd = registry.find_command(&["kick"]).unwrap();
        assert_eq!(cmd.filters.len(), 2);
        assert_eq!(cmd.filters[1].name(), "admin");

        let err = registry.command("ban", noop()).filter_named("nope").register().unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownFilter(name) if name == "nope"));
    }

    #[test]
    fn test_filter_function_requires_filters() {
        let registry = UnifiedRegistry::new();
        let err = registry.on_message(noop()).name("welcome").register().unwrap_err();
        assert!(matches!(err, RegistrationError::MissingFilters(_)));

        let id = registry
            .on_message(noop())
            .name("welcome")
            .filter(GroupFilter)
            .register()
            .unwrap();
        assert_eq!(id.name, "welcome");
        assert_eq!(registry.filter_functions().len(), 1);
    }

    #[test]
    fn test_event_handlers() {
        let registry = UnifiedRegistry::new();
        registry
            .on_notice(|_call: crate::handler::EventCall<NoticeEvent>| async {
                Ok::<(), crate::error::BoxError>(())
            })
            .name("poke")
            .register()
            .unwrap();
        registry
            .on_request(|_call: crate::handler::EventCall<RequestEvent>| async {
                Ok::<(), crate::error::BoxError>(())
            })
            .name("friend_request")
            .register()
            .unwrap();
        assert_eq!(registry.notice_handlers().len(), 1);
        assert_eq!(registry.request_handlers()[0].id.name, "friend_request");
    }
}
