//! Handlers and the values they receive.
//!
//! Every handler, sync or async, is normalised to a function returning a
//! [`BoxFuture`] of [`HandlerResult`]:
//!
//! ```rust,ignore
//! async fn calc(inv: Invocation) -> HandlerResult {
//!     let a: i64 = inv.arg("a")?;
//!     let b: i64 = inv.arg("b")?;
//!     inv.reply(format!("{}", a + b)).await?;
//!     Ok(())
//! }
//!
//! registry.command("calc", calc)
//!     .param(ParameterSpec::int("a"))
//!     .param(ParameterSpec::int("b"))
//!     .register()?;
//!
//! registry.command("ping", sync_handler(|_inv| Ok(()))).register()?;
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future;
use serde_json::Value;

use ncatbot_core::{ApiCaller, ApiCallerExt, ApiResult, Message, MessageEvent, PluginInstance, Segment};

use crate::command::spec::ArgValue;
use crate::error::{ExtractError, ExtractResult, HandlerResult};

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Invocation
// ============================================================================

/// Everything a command or filter function receives for one message.
#[derive(Clone)]
pub struct Invocation {
    plugin: Option<PluginInstance>,
    event: Arc<MessageEvent>,
    api: Arc<dyn ApiCaller>,
    positional: Vec<(String, ArgValue)>,
    named: BTreeMap<String, ArgValue>,
}

impl Invocation {
    pub fn new(
        plugin: Option<PluginInstance>,
        event: Arc<MessageEvent>,
        api: Arc<dyn ApiCaller>,
    ) -> Self {
        Self {
            plugin,
            event,
            api,
            positional: Vec::new(),
            named: BTreeMap::new(),
        }
    }

    /// Attaches bound arguments. `positional` pairs each value with its
    /// parameter name.
    pub fn with_args(
        mut self,
        positional: Vec<(String, ArgValue)>,
        named: BTreeMap<String, ArgValue>,
    ) -> Self {
        self.positional = positional;
        self.named = named;
        self
    }

    pub fn event(&self) -> &MessageEvent {
        &self.event
    }

    pub fn api(&self) -> &Arc<dyn ApiCaller> {
        &self.api
    }

    /// The owning plugin instance, downcast to `P`.
    pub fn plugin<P: Any + Send + Sync>(&self) -> ExtractResult<Arc<P>> {
        self.plugin
            .clone()
            .ok_or(ExtractError::PluginMismatch)?
            .downcast::<P>()
            .map_err(|_| ExtractError::PluginMismatch)
    }

    pub fn plugin_instance(&self) -> Option<&PluginInstance> {
        self.plugin.as_ref()
    }

    /// Positional argument values in parameter order.
    pub fn positional_args(&self) -> impl Iterator<Item = &ArgValue> {
        self.positional.iter().map(|(_, v)| v)
    }

    pub fn named_args(&self) -> &BTreeMap<String, ArgValue> {
        &self.named
    }

    /// Looks an argument up by name, named arguments first.
    pub fn value(&self, name: &str) -> Option<&ArgValue> {
        self.named.get(name).or_else(|| {
            self.positional
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
        })
    }

    /// Extracts a typed argument by name.
    pub fn arg<T: FromArg>(&self, name: &str) -> ExtractResult<T> {
        let value = self
            .value(name)
            .ok_or_else(|| ExtractError::Missing(name.to_string()))?;
        T::from_arg(value).ok_or_else(|| ExtractError::TypeMismatch {
            name: name.to_string(),
            expected: T::TYPE_NAME,
            got: value.type_name(),
        })
    }

    /// Replies with plain text to where the message came from.
    pub async fn reply(&self, text: impl AsRef<str>) -> ApiResult<Value> {
        self.api.reply_text(&self.event, text.as_ref()).await
    }

    /// Replies with a rich message.
    pub async fn reply_message(&self, message: Message) -> ApiResult<Value> {
        self.api.reply(&self.event, message).await
    }
}

// ============================================================================
// FromArg
// ============================================================================

/// Conversion from a bound [`ArgValue`] into a concrete type.
pub trait FromArg: Sized {
    const TYPE_NAME: &'static str;

    fn from_arg(value: &ArgValue) -> Option<Self>;
}

impl FromArg for String {
    const TYPE_NAME: &'static str = "text";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromArg for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FromArg for i32 {
    const TYPE_NAME: &'static str = "int";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromArg for u64 {
    const TYPE_NAME: &'static str = "int";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_i64().and_then(|i| u64::try_from(i).ok())
    }
}

impl FromArg for f64 {
    const TYPE_NAME: &'static str = "float";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromArg for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromArg for Segment {
    const TYPE_NAME: &'static str = "segment";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_segment().cloned()
    }
}

impl FromArg for ArgValue {
    const TYPE_NAME: &'static str = "any";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        Some(value.clone())
    }
}

// ============================================================================
// CommandHandler
// ============================================================================

/// A command or pure filter function.
///
/// Implemented for every `Fn(Invocation) -> impl Future<Output = HandlerResult>`.
pub trait CommandHandler: Send + Sync + 'static {
    fn call(&self, invocation: Invocation) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> CommandHandler for F
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, invocation: Invocation) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(invocation))
    }
}

/// A type-erased handler that can be stored in collections.
pub type BoxedCommandHandler = Arc<dyn CommandHandler>;

/// Wraps a blocking closure into a handler returning an already-completed
/// future. The closure runs on the dispatching task.
pub fn sync_handler<F>(f: F) -> impl CommandHandler
where
    F: Fn(Invocation) -> HandlerResult + Send + Sync + 'static,
{
    move |invocation: Invocation| future::ready(f(invocation))
}

// ============================================================================
// EventHandler
// ============================================================================

/// What a notice or request handler receives.
#[derive(Clone)]
pub struct EventCall<E> {
    pub plugin: Option<PluginInstance>,
    pub event: Arc<E>,
    pub api: Arc<dyn ApiCaller>,
}

/// A handler for non-message events.
pub trait EventHandler<E>: Send + Sync + 'static {
    fn call(&self, call: EventCall<E>) -> BoxFuture<'static, HandlerResult>;
}

impl<E, F, Fut> EventHandler<E> for F
where
    E: Send + Sync + 'static,
    F: Fn(EventCall<E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, call: EventCall<E>) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(call))
    }
}

pub type BoxedEventHandler<E> = Arc<dyn EventHandler<E>>;

#[cfg(test)]
mod tests {
    use super::*;
    use ncatbot_core::DisabledApiCaller;

    fn invocation() -> Invocation {
        Invocation::new(
            None,
            Arc::new(MessageEvent::private("1", "/calc 1 2")),
            Arc::new(DisabledApiCaller),
        )
        .with_args(
            vec![("a".into(), ArgValue::Integer(10)), ("b".into(), ArgValue::Integer(20))],
            BTreeMap::from([("verbose".to_string(), ArgValue::Boolean(true))]),
        )
    }

    #[test]
    fn test_typed_args() {
        let inv = invocation();
        assert_eq!(inv.arg::<i64>("a").unwrap(), 10);
        assert_eq!(inv.arg::<i32>("b").unwrap(), 20);
        assert_eq!(inv.arg::<f64>("b").unwrap(), 20.0);
        assert!(inv.arg::<bool>("verbose").unwrap());
        assert!(matches!(inv.arg::<String>("a"), Err(ExtractError::TypeMismatch { .. })));
        assert!(matches!(inv.arg::<i64>("c"), Err(ExtractError::Missing(_))));
        assert_eq!(inv.positional_args().count(), 2);
    }

    #[test]
    fn test_plugin_downcast() {
        struct Counter;
        let inv = Invocation::new(
            Some(Arc::new(Counter)),
            Arc::new(MessageEvent::private("1", "x")),
            Arc::new(DisabledApiCaller),
        );
        assert!(inv.plugin::<Counter>().is_ok());
        assert!(inv.plugin::<String>().is_err());
        assert!(invocation().plugin::<Counter>().is_err());
    }

    #[test]
    fn test_sync_handler_completes() {
        let handler = sync_handler(|inv| {
            assert_eq!(inv.arg::<i64>("a")?, 10);
            Ok(())
        });
        assert!(tokio_test::block_on(handler.call(invocation())).is_ok());
    }
}
