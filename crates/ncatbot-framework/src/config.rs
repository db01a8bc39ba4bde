//! Trigger configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// How inbound messages are recognised as commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Only messages starting with one of `prefixes` are commands.
    pub require_prefix: bool,
    /// Command prefixes. None may be a prefix of another.
    pub prefixes: Vec<String>,
    /// Match command words and prefixes case-sensitively.
    pub case_sensitive: bool,
    /// Stay quiet when a matched command fails to bind its arguments.
    pub unknown_command_silent: bool,
    /// Run pure filter functions for messages that are not commands.
    pub enable_filter_scan_when_no_command: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            require_prefix: true,
            prefixes: vec!["/".to_string(), "!".to_string()],
            case_sensitive: false,
            unknown_command_silent: true,
            enable_filter_scan_when_no_command: true,
        }
    }
}

impl TriggerConfig {
    pub fn require_prefix(mut self, require: bool) -> Self {
        self.require_prefix = require;
        self
    }

    pub fn prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn unknown_command_silent(mut self, silent: bool) -> Self {
        self.unknown_command_silent = silent;
        self
    }

    pub fn enable_filter_scan(mut self, enable: bool) -> Self {
        self.enable_filter_scan_when_no_command = enable;
        self
    }

    /// Checks that no prefix is empty and none is a prefix of another.
    pub fn validate_prefixes(&self) -> EngineResult<()> {
        if self.require_prefix && self.prefixes.is_empty() {
            return Err(EngineError::config("require_prefix is set but no prefixes are configured"));
        }
        for (i, a) in self.prefixes.iter().enumerate() {
            if a.is_empty() {
                return Err(EngineError::config("empty command prefix"));
            }
            for b in &self.prefixes[i + 1..] {
                if strip_prefix(a, b, self.case_sensitive).is_some()
                    || strip_prefix(b, a, self.case_sensitive).is_some()
                {
                    return Err(EngineError::PrefixOverlap {
                        first: a.clone(),
                        second: b.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Strips `prefix` from the start of `text`, optionally ignoring case.
pub(crate) fn strip_prefix<'t>(text: &'t str, prefix: &str, case_sensitive: bool) -> Option<&'t str> {
    if case_sensitive {
        return text.strip_prefix(prefix);
    }
    let mut rest = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = rest.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let offset = rest.next().map_or(text.len(), |(i, _)| i);
    Some(&text[offset..])
}

/// Strips the first matching prefix, returning it with the remainder.
pub(crate) fn match_prefix<'t, 'p>(
    text: &'t str,
    prefixes: &'p [String],
    case_sensitive: bool,
) -> Option<(&'p str, &'t str)> {
    prefixes
        .iter()
        .find_map(|p| strip_prefix(text, p, case_sensitive).map(|rest| (p.as_str(), rest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TriggerConfig::default();
        assert!(config.require_prefix);
        assert_eq!(config.prefixes, vec!["/", "!"]);
        assert!(!config.case_sensitive);
        assert!(config.unknown_command_silent);
        assert!(config.enable_filter_scan_when_no_command);
        assert!(config.validate_prefixes().is_ok());
    }

    #[test]
    fn test_overlapping_prefixes_rejected() {
        let config = TriggerConfig::default().prefixes(["/", "//"]);
        assert!(matches!(
            config.validate_prefixes(),
            Err(EngineError::PrefixOverlap { .. })
        ));

        let config = TriggerConfig::default().prefixes(["Bot", "bot"]);
        assert!(config.validate_prefixes().is_err());
        assert!(config.case_sensitive(true).validate_prefixes().is_ok());
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let config = TriggerConfig::default().prefixes([""]);
        assert!(config.validate_prefixes().is_err());
    }

    #[test]
    fn test_strip_prefix_ignores_case() {
        assert_eq!(strip_prefix("BOT hello", "bot ", false), Some("hello"));
        assert_eq!(strip_prefix("BOT hello", "bot ", true), None);
        assert_eq!(strip_prefix("/", "/", false), Some(""));
        assert_eq!(strip_prefix("", "/", false), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: TriggerConfig =
            serde_json::from_str(r##"{"prefixes": ["#"], "case_sensitive": true}"##).unwrap();
        assert_eq!(config.prefixes, vec!["#"]);
        assert!(config.case_sensitive);
        assert!(config.require_prefix);
    }
}
