//! The trigger engine: runs every inbound event through the pipeline.
//!
//! ```text
//! message → precheck → tokenize → resolve → bind → filters → handler
//!              │                     │
//!              └──── no command ─────┴──→ pure filter functions
//! ```
//!
//! The engine is lazily initialised: the first event (or an explicit
//! [`TriggerEngine::initialize`]) freezes the registry into an index. After
//! that, lookups take no write lock. Call [`TriggerEngine::reset`] after
//! registering more handlers to rebuild it on the next event.
//!
//! Handler errors and panics never escape: they are logged with the handler
//! identity and reported as [`Outcome::Failed`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use parking_lot::RwLock;
use tower::Service;
use tracing::{Instrument, debug, debug_span, error, info, trace, warn};

use ncatbot_core::{
    ApiCaller, ApiCallerExt, DisabledApiCaller, Event, HandlerId, MessageEvent, NoticeEvent,
    PluginHost, RequestEvent,
};

use crate::command::binder::ArgumentBinder;
use crate::command::help::build_command_help;
use crate::command::preprocess::MessagePreprocessor;
use crate::command::registry::{
    EventHandlerEntry, FilterFunction, RegisteredCommand, UnifiedRegistry,
};
use crate::command::resolver::CommandResolver;
use crate::config::TriggerConfig;
use crate::error::{EngineError, EngineResult, HandlerResult};
use crate::filter::FilterValidator;
use crate::handler::{BoxFuture, EventCall, Invocation};

/// What happened to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A handler ran and returned `Ok`.
    Handled,
    /// Nothing ran: no command, binding failed, or a filter rejected.
    Unhandled,
    /// A handler ran and returned an error or panicked.
    Failed,
}

impl Outcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled)
    }

    /// Folds the outcomes of several handlers run for one event.
    fn merge(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::Failed, _) | (_, Outcome::Failed) => Outcome::Failed,
            (Outcome::Handled, _) | (_, Outcome::Handled) => Outcome::Handled,
            _ => Outcome::Unhandled,
        }
    }
}

/// The registry frozen for lookups.
struct EngineIndex {
    resolver: CommandResolver,
    filter_functions: Vec<Arc<FilterFunction>>,
    notice_handlers: Vec<Arc<EventHandlerEntry<NoticeEvent>>>,
    request_handlers: Vec<Arc<EventHandlerEntry<RequestEvent>>>,
}

impl EngineIndex {
    fn build(registry: &UnifiedRegistry, config: &TriggerConfig) -> Self {
        Self {
            resolver: CommandResolver::build(&registry.commands(), config),
            filter_functions: registry.filter_functions(),
            notice_handlers: registry.notice_handlers(),
            request_handlers: registry.request_handlers(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

/// Runs one handler call, catching both a panic while creating the future and
/// a panic while polling it.
async fn guarded<F>(handler: &HandlerId, call: F) -> Outcome
where
    F: FnOnce() -> BoxFuture<'static, HandlerResult>,
{
    let future = match catch_unwind(AssertUnwindSafe(call)) {
        Ok(future) => future,
        Err(panic) => {
            error!(handler = %handler, panic = panic_message(panic.as_ref()), "Handler panicked");
            return Outcome::Failed;
        }
    };

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => {
            debug!(handler = %handler, "Handler completed");
            Outcome::Handled
        }
        Ok(Err(err)) => {
            error!(handler = %handler, error = %err, "Handler returned an error");
            Outcome::Failed
        }
        Err(panic) => {
            error!(handler = %handler, panic = panic_message(panic.as_ref()), "Handler panicked");
            Outcome::Failed
        }
    }
}

// ============================================================================
// TriggerEngine
// ============================================================================

/// Dispatches events to the handlers of a [`UnifiedRegistry`].
pub struct TriggerEngine {
    registry: UnifiedRegistry,
    host: Arc<dyn PluginHost>,
    api: Arc<dyn ApiCaller>,
    config: TriggerConfig,
    preprocessor: MessagePreprocessor,
    binder: ArgumentBinder,
    validator: FilterValidator,
    index: RwLock<Option<Arc<EngineIndex>>>,
}

impl TriggerEngine {
    /// Creates an engine that cannot call the API until
    /// [`with_api`](Self::with_api) is used.
    pub fn new(registry: UnifiedRegistry, host: Arc<dyn PluginHost>, config: TriggerConfig) -> Self {
        Self {
            registry,
            preprocessor: MessagePreprocessor::new(&config),
            binder: ArgumentBinder::new(config.case_sensitive),
            validator: FilterValidator::new(Arc::clone(&host)),
            host,
            api: Arc::new(DisabledApiCaller),
            config,
            index: RwLock::new(None),
        }
    }

    pub fn with_api(mut self, api: Arc<dyn ApiCaller>) -> Self {
        self.api = api;
        self
    }

    pub fn registry(&self) -> &UnifiedRegistry {
        &self.registry
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<dyn ApiCaller> {
        &self.api
    }

    /// Builds the index now instead of on the first event. Fails when the
    /// configured prefixes overlap.
    pub fn initialize(&self) -> EngineResult<()> {
        self.index().map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.index.read().is_some()
    }

    /// Drops the index; the next event rebuilds it from the registry.
    pub fn reset(&self) {
        if self.index.write().take().is_some() {
            debug!("Trigger engine index dropped");
        }
    }

    fn index(&self) -> EngineResult<Arc<EngineIndex>> {
        if let Some(index) = self.index.read().as_ref() {
            return Ok(Arc::clone(index));
        }

        let mut slot = self.index.write();
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }

        self.config.validate_prefixes()?;
        let index = Arc::new(EngineIndex::build(&self.registry, &self.config));
        info!(
            commands = index.resolver.len(),
            aliases = index.resolver.alias_count(),
            filter_functions = index.filter_functions.len(),
            notice_handlers = index.notice_handlers.len(),
            request_handlers = index.request_handlers.len(),
            "Trigger engine initialized"
        );
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Routes any decoded event to the matching pipeline.
    pub async fn handle_event(&self, event: Event) -> EngineResult<Outcome> {
        match event {
            Event::Message(message) => self.handle_message_event(Arc::new(message)).await,
            Event::Notice(notice) => self.handle_notice_event(Arc::new(notice)).await,
            Event::Request(request) => self.handle_request_event(Arc::new(request)).await,
            Event::Meta(meta) => {
                trace!(meta_event_type = %meta.meta_event_type, "Ignoring meta event");
                Ok(Outcome::Unhandled)
            }
        }
    }

    pub async fn handle_message_event(&self, event: Arc<MessageEvent>) -> EngineResult<Outcome> {
        let index = self.index()?;
        let span = debug_span!(
            "dispatch",
            message_id = %event.message_id,
            user_id = %event.user_id,
            group_id = event.group_id.as_deref().unwrap_or("")
        );
        Ok(self.dispatch_message(&index, event).instrument(span).await)
    }

    pub async fn handle_notice_event(&self, event: Arc<NoticeEvent>) -> EngineResult<Outcome> {
        let index = self.index()?;
        let span = debug_span!("notice", notice_type = %event.notice_type);
        Ok(self
            .run_event_handlers(&index.notice_handlers, event)
            .instrument(span)
            .await)
    }

    pub async fn handle_request_event(&self, event: Arc<RequestEvent>) -> EngineResult<Outcome> {
        let index = self.index()?;
        let span = debug_span!("request", request_type = %event.request_type);
        Ok(self
            .run_event_handlers(&index.request_handlers, event)
            .instrument(span)
            .await)
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    async fn dispatch_message(&self, index: &EngineIndex, event: Arc<MessageEvent>) -> Outcome {
        let Some(pre) = self.preprocessor.precheck(&event) else {
            trace!("Not a command");
            self.scan_filter_functions(index, &event).await;
            return Outcome::Unhandled;
        };

        let Some(matched) = index.resolver.resolve(&pre.command_text) else {
            trace!(text = %pre.command_text, "No command matched");
            self.scan_filter_functions(index, &event).await;
            return Outcome::Unhandled;
        };
        let command = &matched.command;

        let bound = self
            .binder
            .bind(&command.spec, &event, &matched.path_words, &self.config.prefixes);
        if !bound.ok {
            debug!(handler = %command.id, reason = %bound.message, "Argument binding failed");
            if !self.config.unknown_command_silent {
                self.reply_bind_failure(&event, command, &bound.message).await;
            }
            return Outcome::Unhandled;
        }

        if !self.validator.validate(&command.id, &command.filters, &event) {
            return Outcome::Unhandled;
        }

        debug!(handler = %command.id, command = %command.path_string(), "Running command");
        let plugin = self.host.find_plugin_instance(&command.id);
        let (positional, named) = bound.into_args();
        let invocation =
            Invocation::new(plugin, Arc::clone(&event), Arc::clone(&self.api)).with_args(positional, named);
        guarded(&command.id, || command.spec.func.call(invocation)).await
    }

    /// Runs every pure filter function whose filters pass. Returns the merged
    /// outcome, though callers report the message as unhandled.
    async fn scan_filter_functions(&self, index: &EngineIndex, event: &Arc<MessageEvent>) -> Outcome {
        if !self.config.enable_filter_scan_when_no_command {
            return Outcome::Unhandled;
        }

        let mut outcome = Outcome::Unhandled;
        for function in &index.filter_functions {
            if !self.validator.validate(&function.id, &function.filters, event) {
                continue;
            }
            trace!(handler = %function.id, "Running filter function");
            let plugin = self.host.find_plugin_instance(&function.id);
            let invocation = Invocation::new(plugin, Arc::clone(event), Arc::clone(&self.api));
            outcome = outcome.merge(guarded(&function.id, || function.func.call(invocation)).await);
        }
        outcome
    }

    async fn run_event_handlers<E>(&self, handlers: &[Arc<EventHandlerEntry<E>>], event: Arc<E>) -> Outcome
    where
        E: Send + Sync + 'static,
    {
        let mut outcome = Outcome::Unhandled;
        for entry in handlers {
            let call = EventCall {
                plugin: self.host.find_plugin_instance(&entry.id),
                event: Arc::clone(&event),
                api: Arc::clone(&self.api),
            };
            outcome = outcome.merge(guarded(&entry.id, || entry.handler.call(call)).await);
        }
        outcome
    }

    async fn reply_bind_failure(&self, event: &MessageEvent, command: &RegisteredCommand, reason: &str) {
        let prefix = self.config.prefixes.first().map(String::as_str).unwrap_or_default();
        let path = format!("{prefix}{}", command.path_string());
        let text = format!("{reason}\n{}", build_command_help(&path, &command.spec, false));
        if let Err(err) = self.api.reply_text(event, &text).await {
            warn!(handler = %command.id, error = %err, "Failed to send usage reply");
        }
    }
}

impl std::fmt::Debug for TriggerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerEngine")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tower integration
// ============================================================================

/// A [`tower::Service`] over a shared engine, so Tower middleware (timeouts,
/// concurrency limits, ...) can wrap message dispatch.
///
/// ```rust,ignore
/// use tower::ServiceExt;
///
/// let outcome = TriggerService::new(engine).oneshot(event).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TriggerService {
    engine: Arc<TriggerEngine>,
}

impl TriggerService {
    pub fn new(engine: Arc<TriggerEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<TriggerEngine> {
        &self.engine
    }
}

impl Service<MessageEvent> for TriggerService {
    type Response = Outcome;
    type Error = EngineError;
    type Future = BoxFuture<'static, EngineResult<Outcome>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: MessageEvent) -> Self::Future {
        let engine = Arc::clone(&self.engine);
        Box::pin(async move { engine.handle_message_event(Arc::new(event)).await })
    }
}
