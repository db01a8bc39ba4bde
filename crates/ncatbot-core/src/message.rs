//! OneBot v11 message segments and messages.
//!
//! A message is an ordered list of segments. Text segments carry the command
//! line; every other segment (images, mentions, faces, ...) is an opaque
//! element that command parameters may consume by kind.
//!
//! # Example
//!
//! ```rust
//! use ncatbot_core::{Message, Segment};
//!
//! let msg = Message::new()
//!     .text("/kick ")
//!     .at("10001000")
//!     .text(" spamming");
//!
//! assert_eq!(msg.len(), 3);
//! assert_eq!(msg.plain_text(), "/kick  spamming");
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Segment data
// ============================================================================

/// Plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

/// QQ face / emoji.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
}

/// A media payload (image, record or video).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaData {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// An @mention. `qq` is `"all"` for an @all mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtData {
    #[serde(deserialize_with = "id_string")]
    pub qq: String,
}

/// A reference to a replied-to message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyData {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
}

/// A JSON card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonData {
    pub data: String,
}

/// A segment type this crate does not model, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Accepts both `"123"` and `123`, since implementations disagree on id types.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Int(i) => i.to_string(),
    })
}

// ============================================================================
// Segment
// ============================================================================

/// A single message segment in the `{"type": ..., "data": {...}}` wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    Text(TextData),
    Face(FaceData),
    Image(MediaData),
    Record(MediaData),
    Video(MediaData),
    At(AtData),
    Reply(ReplyData),
    Json(JsonData),
    #[serde(untagged)]
    Other(RawSegment),
}

/// The kind of a segment, used as a parameter type for non-text arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Text,
    Face,
    Image,
    Record,
    Video,
    At,
    Reply,
    Json,
    Other,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Text => "text",
            SegmentKind::Face => "face",
            SegmentKind::Image => "image",
            SegmentKind::Record => "record",
            SegmentKind::Video => "video",
            SegmentKind::At => "at",
            SegmentKind::Reply => "reply",
            SegmentKind::Json => "json",
            SegmentKind::Other => "other",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Segment {
    /// Creates a text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text(TextData { text: text.into() })
    }

    /// Creates a face segment.
    pub fn face(id: impl Into<String>) -> Self {
        Segment::Face(FaceData { id: id.into() })
    }

    /// Creates an image segment from a file path or URL.
    pub fn image(file: impl Into<String>) -> Self {
        Segment::Image(MediaData {
            file: file.into(),
            url: None,
            summary: None,
        })
    }

    /// Creates a voice segment.
    pub fn record(file: impl Into<String>) -> Self {
        Segment::Record(MediaData {
            file: file.into(),
            url: None,
            summary: None,
        })
    }

    /// Creates a video segment.
    pub fn video(file: impl Into<String>) -> Self {
        Segment::Video(MediaData {
            file: file.into(),
            url: None,
            summary: None,
        })
    }

    /// Creates an @mention segment.
    pub fn at(qq: impl Into<String>) -> Self {
        Segment::At(AtData { qq: qq.into() })
    }

    /// Creates a reply segment.
    pub fn reply(id: impl Into<String>) -> Self {
        Segment::Reply(ReplyData { id: id.into() })
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Text(_) => SegmentKind::Text,
            Segment::Face(_) => SegmentKind::Face,
            Segment::Image(_) => SegmentKind::Image,
            Segment::Record(_) => SegmentKind::Record,
            Segment::Video(_) => SegmentKind::Video,
            Segment::At(_) => SegmentKind::At,
            Segment::Reply(_) => SegmentKind::Reply,
            Segment::Json(_) => SegmentKind::Json,
            Segment::Other(_) => SegmentKind::Other,
        }
    }

    /// Returns the wire type name (`"text"`, `"image"`, ...).
    pub fn segment_type(&self) -> &str {
        match self {
            Segment::Other(raw) => &raw.kind,
            other => other.kind().as_str(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Segment::Text(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Text(data) => f.write_str(&data.text),
            Segment::Face(data) => write!(f, "[face:{}]", data.id),
            Segment::Image(data) => write!(f, "[image:{}]", data.file),
            Segment::Record(data) => write!(f, "[record:{}]", data.file),
            Segment::Video(data) => write!(f, "[video:{}]", data.file),
            Segment::At(data) if data.qq == "all" => f.write_str("@all"),
            Segment::At(data) => write!(f, "@{}", data.qq),
            Segment::Reply(data) => write!(f, "[reply:{}]", data.id),
            Segment::Json(_) => f.write_str("[json]"),
            Segment::Other(raw) => write!(f, "[{}]", raw.kind),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// An ordered list of segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Message(Vec<Segment>);

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // `message_format = "string"` delivers a bare string.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MessageFormat {
            Array(Vec<Segment>),
            String(String),
        }

        Ok(match MessageFormat::deserialize(deserializer)? {
            MessageFormat::Array(segments) => Message(segments),
            MessageFormat::String(text) => Message::from_text(text),
        })
    }
}

impl Message {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self(vec![Segment::text(text)])
    }

    /// Appends a text segment.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.0.push(Segment::text(text));
        self
    }

    /// Appends an image segment.
    pub fn image(mut self, file: impl Into<String>) -> Self {
        self.0.push(Segment::image(file));
        self
    }

    /// Appends an @mention segment.
    pub fn at(mut self, qq: impl Into<String>) -> Self {
        self.0.push(Segment::at(qq));
        self
    }

    /// Appends an arbitrary segment.
    pub fn segment(mut self, segment: Segment) -> Self {
        self.0.push(segment);
        self
    }

    pub fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.0.first()
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.0
    }

    /// Concatenates all text segments.
    pub fn plain_text(&self) -> String {
        self.0.iter().filter_map(Segment::as_text).collect()
    }
}

impl From<Vec<Segment>> for Message {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segment_wire_shape() {
        let seg: Segment = serde_json::from_value(json!({
            "type": "at",
            "data": { "qq": 123456 }
        }))
        .unwrap();
        assert_eq!(seg, Segment::at("123456"));
        assert_eq!(seg.kind(), SegmentKind::At);

        let value = serde_json::to_value(Segment::text("hi")).unwrap();
        assert_eq!(value, json!({ "type": "text", "data": { "text": "hi" } }));
    }

    #[test]
    fn test_unknown_segment_is_kept() {
        let seg: Segment = serde_json::from_value(json!({
            "type": "mface",
            "data": { "emoji_id": "x" }
        }))
        .unwrap();
        assert_eq!(seg.kind(), SegmentKind::Other);
        assert_eq!(seg.segment_type(), "mface");
    }

    #[test]
    fn test_message_accepts_string_format() {
        let msg: Message = serde_json::from_value(json!("/hello")).unwrap();
        assert_eq!(msg, Message::from_text("/hello"));
    }

    #[test]
    fn test_plain_text_skips_non_text() {
        let msg = Message::new().text("a ").image("x.png").text("b");
        assert_eq!(msg.plain_text(), "a b");
        assert_eq!(msg.to_string(), "a [image:x.png]b");
    }
}
