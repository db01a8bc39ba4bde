//! Outbound API calls.
//!
//! The transport that actually talks to napcat lives outside this workspace;
//! it is consumed through [`ApiCaller`]. [`ApiCallerExt`] adds the handful of
//! message-sending helpers the engine and handlers need.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::event::MessageEvent;
use crate::message::Message;

// =============================================================================
// ApiCaller
// =============================================================================

/// Issues a protocol action and returns its response data.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// Makes an API call.
    ///
    /// # Arguments
    /// * `action` – Protocol action name (e.g. `"send_private_msg"`).
    /// * `params` – JSON parameters for the action.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the call fails, times out, or the
    /// connection is lost.
    async fn call(&self, _action: &str, _params: Value) -> ApiResult<Value> {
        Err(ApiError::NotSupported)
    }
}

/// [`ApiCaller`] that rejects every call. Used when no transport is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledApiCaller;

#[async_trait]
impl ApiCaller for DisabledApiCaller {}

// =============================================================================
// ApiCallerExt
// =============================================================================

/// Message-sending helpers on top of [`ApiCaller::call`].
#[async_trait]
pub trait ApiCallerExt: ApiCaller {
    async fn send_private_msg(&self, user_id: &str, message: Message) -> ApiResult<Value> {
        self.call(
            "send_private_msg",
            json!({ "user_id": user_id, "message": message }),
        )
        .await
    }

    async fn send_group_msg(&self, group_id: &str, message: Message) -> ApiResult<Value> {
        self.call(
            "send_group_msg",
            json!({ "group_id": group_id, "message": message }),
        )
        .await
    }

    /// Sends `message` back to where `event` came from: the group for group
    /// messages, the sender otherwise.
    async fn reply(&self, event: &MessageEvent, message: Message) -> ApiResult<Value> {
        if event.is_group_msg() {
            let group_id = event
                .group_id
                .as_deref()
                .ok_or(ApiError::MissingSession("group_id"))?;
            debug!(group_id, "Replying to group message");
            self.send_group_msg(group_id, message).await
        } else {
            debug!(user_id = %event.user_id, "Replying to private message");
            self.send_private_msg(&event.user_id, message).await
        }
    }

    /// Replies with plain text.
    async fn reply_text(&self, event: &MessageEvent, text: &str) -> ApiResult<Value> {
        self.reply(event, Message::from_text(text)).await
    }
}

impl<T: ApiCaller + ?Sized> ApiCallerExt for T {}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl ApiCaller for Recorder {
        async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((action.to_string(), params));
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn test_reply_routes_by_message_type() {
        let api = Recorder::default();
        api.reply_text(&MessageEvent::group("7", "1", "hi"), "pong")
            .await
            .unwrap();
        api.reply_text(&MessageEvent::private("1", "hi"), "pong")
            .await
            .unwrap();

        let calls = api.calls.lock().unwrap();
        assert_eq!(calls[0].0, "send_group_msg");
        assert_eq!(calls[0].1["group_id"], "7");
        assert_eq!(calls[1].0, "send_private_msg");
        assert_eq!(calls[1].1["user_id"], "1");
        assert_eq!(calls[1].1["message"][0]["data"]["text"], "pong");
    }

    #[tokio::test]
    async fn test_disabled_caller_rejects() {
        let result = DisabledApiCaller.call("get_login_info", Value::Null).await;
        assert!(matches!(result, Err(ApiError::NotSupported)));
    }
}
