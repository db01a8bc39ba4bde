//! Core types for the NcatBot command engine.
//!
//! This crate holds what every other crate agrees on:
//!
//! - [`message`]: OneBot v11 segments and messages
//! - [`event`]: inbound events decoded from napcat JSON
//! - [`api`]: the [`ApiCaller`] contract for outbound calls
//! - [`host`]: the [`PluginHost`] contract for plugin lookup and roles
//! - [`error`]: shared error types

pub mod api;
pub mod error;
pub mod event;
pub mod host;
pub mod message;

pub use api::{ApiCaller, ApiCallerExt, DisabledApiCaller};
pub use error::{ApiError, ApiResult, EventError, EventResult};
pub use event::{Event, MessageEvent, MessageType, MetaEvent, NoticeEvent, RequestEvent, Sender};
pub use host::{HandlerId, NoopHost, PluginHost, PluginInstance, ROLE_ADMIN, ROLE_ROOT};
pub use message::{Message, Segment, SegmentKind};
