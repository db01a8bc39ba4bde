//! # NcatBot Framework
//!
//! The command and filter trigger engine.
//!
//! This layer provides:
//! - A registry of commands, command groups, pure filter functions and
//!   notice/request handlers, validated at registration
//! - A tokenizer and argument binder for `/cmd word "quoted" --opt=v -abc`
//!   command lines over multi-segment messages
//! - Built-in and custom filters with AND semantics
//! - The [`TriggerEngine`] that runs the whole pipeline per event
//!
//! ```rust,ignore
//! use ncatbot_framework::prelude::*;
//!
//! let registry = UnifiedRegistry::new();
//! registry.command("calc", calc)
//!     .param(ParameterSpec::int("a"))
//!     .param(ParameterSpec::int("b"))
//!     .register()?;
//!
//! let engine = TriggerEngine::new(registry, host, TriggerConfig::default())
//!     .with_api(api);
//! engine.handle_message_event(Arc::new(event)).await?;
//! ```

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod handler;

pub use command::{
    ArgValue, ArgumentBinder, BindResult, CommandGroup, CommandResolver, CommandSpec,
    OptionGroupSpec, OptionSpec, ParamType, ParameterSpec, RegisteredCommand, UnifiedRegistry,
    build_command_help, tokenize,
};
pub use config::TriggerConfig;
pub use engine::{Outcome, TriggerEngine, TriggerService};
pub use error::{
    BoxError, EngineError, EngineResult, ExtractError, ExtractResult, HandlerResult,
    RegistrationError, RegistrationResult,
};
pub use filter::{
    AdminFilter, BaseFilter, BoxedFilter, CustomFilter, FilterRegistry, GroupFilter,
    PrivateFilter, RootFilter,
};
pub use handler::{
    BoxFuture, BoxedCommandHandler, BoxedEventHandler, CommandHandler, EventCall, EventHandler,
    FromArg, Invocation, sync_handler,
};

/// Everything needed to declare handlers.
pub mod prelude {
    pub use crate::command::{
        ArgValue, OptionGroupSpec, OptionSpec, ParamType, ParameterSpec, UnifiedRegistry,
    };
    pub use crate::config::TriggerConfig;
    pub use crate::engine::{Outcome, TriggerEngine};
    pub use crate::error::{BoxError, HandlerResult};
    pub use crate::filter::{
        AdminFilter, BaseFilter, CustomFilter, GroupFilter, PrivateFilter, RootFilter,
    };
    pub use crate::handler::{EventCall, Invocation, sync_handler};
    pub use ncatbot_core::{
        ApiCaller, ApiCallerExt, Message, MessageEvent, NoticeEvent, PluginHost, RequestEvent,
        Segment, SegmentKind,
    };
}
