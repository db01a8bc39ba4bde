//! # NcatBot
//!
//! Command and filter triggering for napcat (OneBot v11) bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────────────────────────────┐
//! │ NcatRuntime  │────▶│ TriggerEngine                              │
//! │ (raw events) │     │  preprocess ─▶ resolve ─▶ bind ─▶ filters  │──▶ handler
//! └──────────────┘     │  no command ─▶ pure filter functions       │──▶ handler
//!                      └────────────────────────────────────────────┘
//! ```
//!
//! - **Registry**: commands, command groups, pure filter functions and
//!   notice/request handlers, checked for conflicts when registered
//! - **Engine**: turns one message into at most one command invocation
//! - **Runtime**: configuration, logging, and the event loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ncatbot::prelude::*;
//!
//! async fn calc(inv: Invocation) -> HandlerResult {
//!     let a: i64 = inv.arg("a")?;
//!     let b: i64 = inv.arg("b")?;
//!     inv.api().reply_text(inv.event(), &(a + b).to_string()).await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BoxError> {
//!     let registry = UnifiedRegistry::new();
//!     registry
//!         .command("calc", calc)
//!         .param(ParameterSpec::int("a"))
//!         .param(ParameterSpec::int("b"))
//!         .register()?;
//!
//!     let runtime = NcatRuntime::builder().api(api).build(registry)?;
//!     runtime.run(events).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use ncatbot_core as core;
pub use ncatbot_framework as framework;
pub use ncatbot_runtime as runtime;

/// Everything a bot binary usually needs.
pub mod prelude {
    pub use ncatbot_framework::prelude::*;

    pub use ncatbot_runtime::{NcatConfig, NcatRuntime, PluginTable};

    pub use ncatbot_core::{Event, HandlerId, ROLE_ADMIN, ROLE_ROOT};

    pub use ncatbot_runtime::prelude::*;
}
