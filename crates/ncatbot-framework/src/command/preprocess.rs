//! First-segment extraction and prefix check.

use ncatbot_core::{MessageEvent, Segment};

use crate::config::{TriggerConfig, match_prefix};

/// The command line found at the start of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessResult {
    /// Text of the first segment with leading whitespace removed. The prefix
    /// is kept; the resolver strips it.
    pub command_text: String,
    /// The prefix the text starts with, if any.
    pub prefix: Option<String>,
}

/// Decides whether a message can be a command at all.
#[derive(Debug, Clone)]
pub struct MessagePreprocessor {
    require_prefix: bool,
    prefixes: Vec<String>,
    case_sensitive: bool,
}

impl MessagePreprocessor {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            require_prefix: config.require_prefix,
            prefixes: config.prefixes.clone(),
            case_sensitive: config.case_sensitive,
        }
    }

    /// Returns `None` when the first segment is not text, is blank, or lacks a
    /// required prefix.
    pub fn precheck(&self, event: &MessageEvent) -> Option<PreprocessResult> {
        let Some(Segment::Text(first)) = event.message.first() else {
            return None;
        };
        let text = first.text.trim_start();
        if text.is_empty() {
            return None;
        }

        let prefix = match_prefix(text, &self.prefixes, self.case_sensitive).map(|(p, _)| p);
        if self.require_prefix && prefix.is_none() {
            return None;
        }

        Some(PreprocessResult {
            command_text: text.to_string(),
            prefix: prefix.map(str::to_string),
        })
    }
}
