//! Command specifications.
//!
//! A [`CommandSpec`] describes everything the binder needs to turn a message
//! into arguments: positional [`ParameterSpec`]s, [`OptionSpec`]s and
//! [`OptionGroupSpec`]s. Specs are produced once at registration by the
//! analyser and are immutable afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use ncatbot_core::{Segment, SegmentKind};

use crate::handler::BoxedCommandHandler;

// ============================================================================
// ParamType / ArgValue
// ============================================================================

/// The declared type of a parameter or option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// One word.
    Text,
    Integer,
    Float,
    Boolean,
    /// All remaining contiguous text, joined by spaces.
    Sentence,
    /// A non-text segment of the given kind.
    Segment(SegmentKind),
}

impl ParamType {
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Text => "text",
            ParamType::Integer => "int",
            ParamType::Float => "float",
            ParamType::Boolean => "bool",
            ParamType::Sentence => "sentence",
            ParamType::Segment(kind) => kind.as_str(),
        }
    }

    pub fn is_segment(&self) -> bool {
        matches!(self, ParamType::Segment(_))
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bound argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Segment(Segment),
}

impl ArgValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Text(_) => "text",
            ArgValue::Integer(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::Boolean(_) => "bool",
            ArgValue::Segment(seg) => seg.kind().as_str(),
        }
    }

    /// Whether this value is acceptable for a parameter of type `ty`.
    pub fn fits(&self, ty: ParamType) -> bool {
        match (self, ty) {
            (ArgValue::Text(_), ParamType::Text | ParamType::Sentence) => true,
            (ArgValue::Integer(_), ParamType::Integer | ParamType::Float) => true,
            (ArgValue::Float(_), ParamType::Float) => true,
            (ArgValue::Boolean(_), ParamType::Boolean) => true,
            (ArgValue::Segment(seg), ParamType::Segment(kind)) => seg.kind() == kind,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Float(f) => Some(*f),
            ArgValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            ArgValue::Segment(seg) => Some(seg),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => f.write_str(s),
            ArgValue::Integer(i) => write!(f, "{i}"),
            ArgValue::Float(v) => write!(f, "{v}"),
            ArgValue::Boolean(b) => write!(f, "{b}"),
            ArgValue::Segment(seg) => write!(f, "{seg}"),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Text(s)
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        ArgValue::Integer(i)
    }
}

impl From<i32> for ArgValue {
    fn from(i: i32) -> Self {
        ArgValue::Integer(i64::from(i))
    }
}

impl From<f64> for ArgValue {
    fn from(f: f64) -> Self {
        ArgValue::Float(f)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Boolean(b)
    }
}

impl From<Segment> for ArgValue {
    fn from(seg: Segment) -> Self {
        ArgValue::Segment(seg)
    }
}

/// A predicate run on a converted argument.
pub type Validator = Arc<dyn Fn(&ArgValue) -> bool + Send + Sync>;

// ============================================================================
// ParameterSpec
// ============================================================================

/// One declared parameter of a command.
#[derive(Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub ty: ParamType,
    /// `None` makes the parameter required.
    pub default: Option<ArgValue>,
    pub description: String,
    pub choices: Option<Vec<ArgValue>>,
    pub validator: Option<Validator>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            description: String::new(),
            choices: None,
            validator: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Text)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    pub fn sentence(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Sentence)
    }

    pub fn segment(name: impl Into<String>, kind: SegmentKind) -> Self {
        Self::new(name, ParamType::Segment(kind))
    }

    pub fn with_default(mut self, value: impl Into<ArgValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ArgValue>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&ArgValue) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSpec")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("default", &self.default)
            .field("choices", &self.choices)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

// ============================================================================
// OptionSpec
// ============================================================================

/// A `-x` / `--name` option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    /// `None` for flags; the type of `--name=value` otherwise.
    pub value_type: Option<ParamType>,
    pub default_value: Option<ArgValue>,
    pub group_id: Option<u32>,
    pub description: String,
}

impl OptionSpec {
    /// An option with no names yet. Add at least one with [`short`](Self::short)
    /// or [`long`](Self::long).
    pub fn new() -> Self {
        Self {
            short_name: None,
            long_name: None,
            value_type: None,
            default_value: None,
            group_id: None,
            description: String::new(),
        }
    }

    /// A flag with both a short and a long name.
    pub fn flag(short: &str, long: &str) -> Self {
        Self::new().short(short).long(long)
    }

    /// Sets the short name; leading dashes are ignored.
    pub fn short(mut self, name: &str) -> Self {
        self.short_name = Some(name.trim_start_matches('-').to_string());
        self
    }

    /// Sets the long name; leading dashes are ignored.
    pub fn long(mut self, name: &str) -> Self {
        self.long_name = Some(name.trim_start_matches('-').to_string());
        self
    }

    /// Turns the flag into an option taking `=value` of type `ty`.
    pub fn value(mut self, ty: ParamType) -> Self {
        self.value_type = Some(ty);
        self
    }

    pub fn default_value(mut self, value: impl Into<ArgValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Places the option in a mutually exclusive option group.
    pub fn group(mut self, group_id: u32) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_flag(&self) -> bool {
        self.value_type.is_none()
    }

    pub fn needs_value(&self) -> bool {
        self.value_type.is_some()
    }

    /// Long name if present, else short name.
    pub fn name(&self) -> &str {
        self.long_name
            .as_deref()
            .or(self.short_name.as_deref())
            .unwrap_or_default()
    }

    /// Key under which the option appears in the named arguments.
    pub fn binding_name(&self) -> String {
        self.name().replace('-', "_")
    }

    /// Whether `name` (as written after the dashes) selects this option.
    pub fn matches(&self, name: &str) -> bool {
        self.short_name.as_deref() == Some(name) || self.long_name.as_deref() == Some(name)
    }

    /// The value used when the option is absent.
    pub fn absent_value(&self) -> Option<ArgValue> {
        match (&self.default_value, self.is_flag()) {
            (Some(value), _) => Some(value.clone()),
            (None, true) => Some(ArgValue::Boolean(false)),
            (None, false) => None,
        }
    }
}

impl Default for OptionSpec {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// OptionGroupSpec
// ============================================================================

/// A set of choice flags (`--json`, `--csv`, ...) that select one value for
/// the group's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionGroupSpec {
    pub group_id: u32,
    pub name: String,
    pub choices: Vec<String>,
    pub default: String,
    pub mutually_exclusive: bool,
    pub description: String,
}

impl OptionGroupSpec {
    pub fn new<I, S>(group_id: u32, name: impl Into<String>, choices: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_id,
            name: name.into(),
            choices: choices.into_iter().map(Into::into).collect(),
            default: default.into(),
            mutually_exclusive: true,
            description: String::new(),
        }
    }

    pub fn mutually_exclusive(mut self, exclusive: bool) -> Self {
        self.mutually_exclusive = exclusive;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn binding_name(&self) -> String {
        self.name.replace('-', "_")
    }
}

// ============================================================================
// CommandSpec
// ============================================================================

/// The analysed, immutable description of one command.
#[derive(Clone)]
pub struct CommandSpec {
    pub name: String,
    pub aliases: BTreeSet<String>,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub options: Vec<OptionSpec>,
    pub option_groups: Vec<OptionGroupSpec>,
    pub func: BoxedCommandHandler,
}

impl CommandSpec {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Finds the option selected by `name` (short or long, without dashes).
    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.matches(name))
    }

    /// Finds the option group offering `choice`.
    pub fn group_for_choice(&self, choice: &str) -> Option<&OptionGroupSpec> {
        self.option_groups
            .iter()
            .find(|g| g.choices.iter().any(|c| c == choice))
    }

    pub fn option_group(&self, group_id: u32) -> Option<&OptionGroupSpec> {
        self.option_groups.iter().find(|g| g.group_id == group_id)
    }

    /// Whether parameter `name` is filled by an option or option group instead
    /// of positionally.
    pub fn is_option_bound(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.binding_name() == name)
            || self.option_groups.iter().any(|g| g.binding_name() == name)
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("options", &self.options)
            .field("option_groups", &self.option_groups)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_required_derived() {
        assert!(ParameterSpec::text("app").is_required());
        assert!(!ParameterSpec::text("env").with_default("dev").is_required());
    }

    #[test]
    fn test_option_names() {
        let opt = OptionSpec::new().short("-v").long("--dry-run");
        assert_eq!(opt.short_name.as_deref(), Some("v"));
        assert_eq!(opt.name(), "dry-run");
        assert_eq!(opt.binding_name(), "dry_run");
        assert!(opt.matches("v"));
        assert!(opt.matches("dry-run"));
        assert!(!opt.matches("dry_run"));
        assert_eq!(opt.absent_value(), Some(ArgValue::Boolean(false)));

        let port = OptionSpec::new().long("port").value(ParamType::Integer);
        assert!(port.needs_value());
        assert_eq!(port.absent_value(), None);
    }

    #[test]
    fn test_value_fits() {
        assert!(ArgValue::Integer(1).fits(ParamType::Float));
        assert!(!ArgValue::Float(1.0).fits(ParamType::Integer));
        assert!(ArgValue::Segment(Segment::image("a")).fits(ParamType::Segment(SegmentKind::Image)));
        assert!(!ArgValue::Segment(Segment::at("1")).fits(ParamType::Segment(SegmentKind::Image)));
    }
}
