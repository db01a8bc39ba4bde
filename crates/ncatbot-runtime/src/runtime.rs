//! Event loop around the trigger engine.
//!
//! The runtime reads raw napcat JSON from a channel, decodes each event and
//! hands it to the [`TriggerEngine`] on its own task. Shutdown stops intake
//! and waits for in-flight handlers.
//!
//! ```rust,ignore
//! use ncatbot_runtime::NcatRuntime;
//!
//! let registry = UnifiedRegistry::new();
//! registry.command("hello", hello).register()?;
//!
//! let runtime = NcatRuntime::builder()
//!     .config_file("config/ncatbot.toml")
//!     .api(api)
//!     .build(registry)?;
//!
//! // `events` is fed by whatever connection delivers napcat events.
//! runtime.run(events).await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use ncatbot_core::{ApiCaller, Event, PluginHost};
use ncatbot_framework::{TriggerEngine, UnifiedRegistry};

use crate::config::{ConfigLoader, NcatConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::host::PluginTable;
use crate::logging;

pub struct NcatRuntime {
    config: NcatConfig,
    engine: Arc<TriggerEngine>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl NcatRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Initializes logging and builds an engine whose roles come from
    /// `config.roles`. API calls stay disabled.
    pub fn from_config(config: NcatConfig, registry: UnifiedRegistry) -> Self {
        logging::init_from_config(&config.logging);

        let host = Arc::new(PluginTable::from_roles(&config.roles));
        let engine = TriggerEngine::new(registry, host, config.trigger.clone());

        info!(
            log_level = %config.logging.level,
            prefixes = ?config.trigger.prefixes,
            "Runtime initialized from configuration"
        );
        Self::from_parts(config, engine)
    }

    /// Wraps an already configured engine. Logging is left alone.
    pub fn from_parts(config: NcatConfig, engine: TriggerEngine) -> Self {
        Self {
            config,
            engine: Arc::new(engine),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &NcatConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<TriggerEngine> {
        &self.engine
    }

    /// Cancelling this token makes [`run`](Self::run) return.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of events still being handled.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Builds the engine index now rather than on the first event.
    pub fn initialize(&self) -> RuntimeResult<()> {
        self.engine.initialize()?;
        Ok(())
    }

    /// Spawns handling of `event`. Returns `false` once shutdown has begun.
    pub fn dispatch(&self, event: Event) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }

        let engine = Arc::clone(&self.engine);
        self.tracker.spawn(async move {
            let post_type = event.post_type();
            match engine.handle_event(event).await {
                Ok(outcome) => trace!(post_type, ?outcome, "Event handled"),
                Err(e) => error!(post_type, error = %e, "Engine rejected event"),
            }
        });
        true
    }

    /// Decodes one raw napcat event and dispatches it.
    pub fn dispatch_json(&self, raw: &str) -> RuntimeResult<()> {
        let event = Event::from_json(raw)?;
        if self.dispatch(event) {
            Ok(())
        } else {
            Err(RuntimeError::ShuttingDown)
        }
    }

    /// Runs until Ctrl+C, SIGTERM, cancellation or the end of `events`.
    pub async fn run(&self, events: mpsc::Receiver<String>) -> RuntimeResult<()> {
        self.run_until(events, wait_for_signal()).await
    }

    /// Runs until `signal` completes, the shutdown token is cancelled or
    /// `events` is closed. In-flight handlers are awaited before returning.
    pub async fn run_until<F>(
        &self,
        mut events: mpsc::Receiver<String>,
        signal: F,
    ) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.initialize()?;
        info!("NcatBot runtime is running");

        let mut signal = pin!(signal);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Shutdown token cancelled");
                    break;
                }
                _ = &mut signal => {
                    info!("Shutdown signal received");
                    break;
                }
                raw = events.recv() => match raw {
                    Some(raw) => {
                        if let Err(e) = self.dispatch_json(&raw) {
                            warn!(error = %e, "Dropping event");
                        }
                    }
                    None => {
                        info!("Event source closed");
                        break;
                    }
                },
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Stops accepting events and waits for running handlers.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        if !self.tracker.is_empty() {
            debug!(tasks = self.tracker.len(), "Waiting for in-flight handlers");
        }
        self.tracker.wait().await;
        info!("Runtime stopped");
    }
}

impl std::fmt::Debug for NcatRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NcatRuntime")
            .field("engine", &self.engine)
            .field("active_tasks", &self.tracker.len())
            .field("shutting_down", &self.shutdown.is_cancelled())
            .finish()
    }
}

/// Completes on Ctrl+C or SIGTERM. Never completes if neither can be
/// listened for.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads configuration, then assembles the host, API caller and engine.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    host: Option<Arc<dyn PluginHost>>,
    api: Option<Arc<dyn ApiCaller>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            host: None,
            api: None,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: NcatConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Replaces the [`PluginTable`] built from `[roles]`.
    pub fn host(mut self, host: Arc<dyn PluginHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn api(mut self, api: Arc<dyn ApiCaller>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn build(self, registry: UnifiedRegistry) -> RuntimeResult<NcatRuntime> {
        let config = self.config_loader.load()?;
        logging::init_from_config(&config.logging);

        let host = self
            .host
            .unwrap_or_else(|| Arc::new(PluginTable::from_roles(&config.roles)));
        let mut engine = TriggerEngine::new(registry, host, config.trigger.clone());
        if let Some(api) = self.api {
            engine = engine.with_api(api);
        }

        info!(
            log_level = %config.logging.level,
            prefixes = ?config.trigger.prefixes,
            "Runtime built"
        );
        Ok(NcatRuntime::from_parts(config, engine))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
