//! Inbound OneBot v11 events as delivered by napcat.
//!
//! ```text
//! Event (post_type)
//! ├── Message  { message_type: private | group, user_id, group_id, message, ... }
//! ├── Notice   { notice_type, sub_type, user_id, group_id, ... }
//! ├── Request  { request_type, sub_type, user_id, comment, flag, ... }
//! └── Meta     { meta_event_type, ... }
//! ```
//!
//! Ids are normalised to strings whether the implementation sends them as
//! numbers or as strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{EventError, EventResult};
use crate::message::Message;

fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_id(deserializer)?.unwrap_or_default())
}

fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Int(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Str(s) => s,
        Id::Int(i) => i.to_string(),
    }))
}

// ============================================================================
// Event
// ============================================================================

/// Any inbound event, discriminated by `post_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "post_type", rename_all = "snake_case")]
pub enum Event {
    #[serde(alias = "message_sent")]
    Message(MessageEvent),
    Notice(NoticeEvent),
    Request(RequestEvent),
    #[serde(rename = "meta_event")]
    Meta(MetaEvent),
}

impl Event {
    /// Decodes an event from its JSON text.
    pub fn from_json(raw: &str) -> EventResult<Self> {
        serde_json::from_str(raw).map_err(EventError::from)
    }

    /// Decodes an event from an already parsed JSON value.
    pub fn from_value(value: Value) -> EventResult<Self> {
        serde_json::from_value(value).map_err(EventError::from)
    }

    pub fn post_type(&self) -> &'static str {
        match self {
            Event::Message(_) => "message",
            Event::Notice(_) => "notice",
            Event::Request(_) => "request",
            Event::Meta(_) => "meta_event",
        }
    }

    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Event::Message(msg) => Some(msg),
            _ => None,
        }
    }
}

// ============================================================================
// MessageEvent
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Private,
    Group,
}

/// Sender information attached to message events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default, deserialize_with = "opt_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
    /// Group role (`owner`, `admin`, `member`).
    #[serde(default)]
    pub role: Option<String>,
}

/// A private or group chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(default, deserialize_with = "id")]
    pub self_id: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub sub_type: String,
    #[serde(default, deserialize_with = "id")]
    pub message_id: String,
    #[serde(deserialize_with = "id")]
    pub user_id: String,
    #[serde(default, deserialize_with = "opt_id")]
    pub group_id: Option<String>,
    pub message: Message,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default)]
    pub sender: Sender,
}

impl MessageEvent {
    /// Builds a private message event.
    pub fn private(user_id: impl Into<String>, message: impl Into<Message>) -> Self {
        let message = message.into();
        Self {
            time: 0,
            self_id: String::new(),
            message_type: MessageType::Private,
            sub_type: "friend".to_string(),
            message_id: String::new(),
            user_id: user_id.into(),
            group_id: None,
            raw_message: message.to_string(),
            message,
            sender: Sender::default(),
        }
    }

    /// Builds a group message event.
    pub fn group(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        message: impl Into<Message>,
    ) -> Self {
        let message = message.into();
        Self {
            time: 0,
            self_id: String::new(),
            message_type: MessageType::Group,
            sub_type: "normal".to_string(),
            message_id: String::new(),
            user_id: user_id.into(),
            group_id: Some(group_id.into()),
            raw_message: message.to_string(),
            message,
            sender: Sender::default(),
        }
    }

    pub fn is_group_msg(&self) -> bool {
        self.message_type == MessageType::Group
    }

    pub fn is_private_msg(&self) -> bool {
        self.message_type == MessageType::Private
    }

    /// Plain text of the message, non-text segments dropped.
    pub fn plain_text(&self) -> String {
        self.message.plain_text()
    }
}

// ============================================================================
// Other events
// ============================================================================

/// A notice (group member change, poke, recall, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(default, deserialize_with = "id")]
    pub self_id: String,
    pub notice_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub group_id: Option<String>,
    /// Fields specific to the notice type.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A friend or group request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(default, deserialize_with = "id")]
    pub self_id: String,
    pub request_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(deserialize_with = "id")]
    pub user_id: String,
    #[serde(default, deserialize_with = "opt_id")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub flag: String,
}

/// Lifecycle and heartbeat events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(default, deserialize_with = "id")]
    pub self_id: String,
    pub meta_event_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Segment;
    use serde_json::json;

    #[test]
    fn test_decode_group_message() {
        let event = Event::from_value(json!({
            "post_type": "message",
            "message_type": "group",
            "time": 1700000000,
            "self_id": 10000,
            "sub_type": "normal",
            "message_id": 42,
            "user_id": 123456,
            "group_id": 654321,
            "message": [
                { "type": "text", "data": { "text": "/calc 1 2" } },
                { "type": "at", "data": { "qq": "10000" } }
            ],
            "raw_message": "/calc 1 2[CQ:at,qq=10000]",
            "sender": { "user_id": 123456, "nickname": "alice" }
        }))
        .unwrap();

        let msg = event.as_message().unwrap();
        assert!(msg.is_group_msg());
        assert_eq!(msg.user_id, "123456");
        assert_eq!(msg.group_id.as_deref(), Some("654321"));
        assert_eq!(msg.message.len(), 2);
        assert_eq!(msg.message.as_slice()[1], Segment::at("10000"));
        assert_eq!(msg.sender.nickname.as_deref(), Some("alice"));
    }

    #[test]
    fn test_decode_notice_keeps_extra_fields() {
        let event = Event::from_json(
            r#"{"post_type":"notice","notice_type":"notify","sub_type":"poke",
                "user_id":1,"group_id":2,"target_id":3,"self_id":9}"#,
        )
        .unwrap();
        let Event::Notice(notice) = event else {
            panic!("expected notice");
        };
        assert_eq!(notice.sub_type.as_deref(), Some("poke"));
        assert_eq!(notice.extra.get("target_id"), Some(&json!(3)));
    }

    #[test]
    fn test_decode_rejects_unknown_post_type() {
        assert!(Event::from_json(r#"{"post_type":"bogus"}"#).is_err());
    }

    #[test]
    fn test_private_constructor() {
        let event = MessageEvent::private("1", "/hello");
        assert!(event.is_private_msg());
        assert_eq!(event.raw_message, "/hello");
        assert_eq!(event.plain_text(), "/hello");
    }
}
