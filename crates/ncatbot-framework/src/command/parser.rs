//! Whole-message parsing for the binder.
//!
//! Text segments are tokenized; options and `--name=value` assignments are
//! pulled out as switches, everything else stays in order as elements:
//!
//! ```text
//! [text "/send "] [image] [text " hello -v --to=bob"]
//!   → elements: Text("/send"), Segment(image), Text("hello")
//!     switches: v, to=bob
//! ```
//!
//! Both lists keep message order.

use ncatbot_core::{Message, Segment};

use crate::command::tokenizer::{Token, tokenize};
use crate::config::match_prefix;

/// One positional element of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text(String),
    Segment(Segment),
}

impl Element {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Element::Text(s) => Some(s),
            Element::Segment(_) => None,
        }
    }
}

/// An option flag (`-v`, `--force`) or assignment (`--to=bob`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub name: String,
    pub value: Option<String>,
}

/// A message split into positional elements and switches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCommand {
    pub elements: Vec<Element>,
    pub switches: Vec<Switch>,
}

impl ParsedCommand {
    pub fn parse(message: &Message) -> Self {
        Self::parse_command(message, &[], false)
    }

    /// Like [`parse`](Self::parse), but drops a leading command prefix from
    /// the first text segment, so `bot ping` with prefix `"bot "` starts at
    /// `ping`.
    pub fn parse_command(message: &Message, prefixes: &[String], case_sensitive: bool) -> Self {
        let mut parsed = Self::default();
        for (i, segment) in message.into_iter().enumerate() {
            match segment {
                Segment::Text(data) => {
                    let mut text = data.text.as_str();
                    if i == 0
                        && let Some((_, rest)) =
                            match_prefix(text.trim_start(), prefixes, case_sensitive)
                    {
                        text = rest;
                    }
                    for token in tokenize(text) {
                        parsed.push_token(token);
                    }
                }
                other => parsed.elements.push(Element::Segment(other.clone())),
            }
        }
        parsed
    }

    /// Whether `name` was given as a bare flag.
    pub fn has_flag(&self, name: &str) -> bool {
        self.switches
            .iter()
            .any(|s| s.name == name && s.value.is_none())
    }

    /// The last value assigned to `name`.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.switches
            .iter()
            .rev()
            .find(|s| s.name == name)
            .and_then(|s| s.value.as_deref())
    }

    fn push_token(&mut self, token: Token) {
        match token {
            Token::Word(text) | Token::Quoted(text) => self.elements.push(Element::Text(text)),
            Token::LongOption { name, value } => self.switches.push(Switch { name, value }),
            Token::ShortOption { name, value } => self.switches.push(Switch {
                name: name.to_string(),
                value,
            }),
        }
    }
}
