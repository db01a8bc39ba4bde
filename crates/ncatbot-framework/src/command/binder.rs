//! Binds a parsed message to a command's declared parameters.
//!
//! Binding happens in two passes. Options, option-group choices and
//! `--name=value` assignments are routed by name first; the remaining
//! parameters are then filled positionally:
//!
//! - text, int, float and bool parameters take the next unconsumed word;
//! - sentence parameters join the following run of words;
//! - segment parameters take the next unconsumed non-text element.
//!
//! Binding never panics. Any failure yields `ok = false` with a message
//! suitable for showing to the user.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use ncatbot_core::MessageEvent;

use crate::command::parser::{Element, ParsedCommand};
use crate::command::spec::{ArgValue, CommandSpec, OptionGroupSpec, ParamType, ParameterSpec};

/// The outcome of binding one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindResult {
    pub ok: bool,
    pub positional_args: Vec<ArgValue>,
    pub named_args: BTreeMap<String, ArgValue>,
    /// Why binding failed; empty on success.
    pub message: String,
    positional_names: Vec<String>,
}

impl BindResult {
    fn failure(message: String) -> Self {
        Self {
            ok: false,
            message,
            ..Self::default()
        }
    }

    /// Parameter names matching `positional_args`, in order.
    pub fn positional_names(&self) -> &[String] {
        &self.positional_names
    }

    /// Positional arguments paired with their parameter names.
    pub fn into_args(self) -> (Vec<(String, ArgValue)>, BTreeMap<String, ArgValue>) {
        let positional = self
            .positional_names
            .into_iter()
            .zip(self.positional_args)
            .collect();
        (positional, self.named_args)
    }
}

type BindError = String;

/// Converts one word to a value of type `ty`.
pub fn convert(raw: &str, ty: ParamType) -> Result<ArgValue, BindError> {
    match ty {
        ParamType::Text | ParamType::Sentence => Ok(ArgValue::Text(raw.to_string())),
        ParamType::Integer => raw
            .parse::<i64>()
            .map(ArgValue::Integer)
            .map_err(|_| format!("'{raw}' is not a valid int")),
        ParamType::Float => raw
            .parse::<f64>()
            .map(ArgValue::Float)
            .map_err(|_| format!("'{raw}' is not a valid float")),
        ParamType::Boolean => Ok(ArgValue::Boolean(
            !(raw.eq_ignore_ascii_case("false") || raw == "0"),
        )),
        ParamType::Segment(kind) => Err(format!("a {kind} cannot be given as text")),
    }
}

fn option_display(name: &str) -> String {
    if name.chars().count() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

/// Runs a parameter's choices and validator on a supplied value.
fn check_value(param: &ParameterSpec, value: &ArgValue) -> Result<(), BindError> {
    if let Some(choices) = &param.choices
        && !choices.contains(value)
    {
        let allowed: Vec<String> = choices.iter().map(ToString::to_string).collect();
        return Err(format!(
            "parameter '{}' must be one of: {}; got '{value}'",
            param.name,
            allowed.join(", ")
        ));
    }
    if let Some(validator) = &param.validator
        && !validator(value)
    {
        return Err(format!("invalid value '{value}' for parameter '{}'", param.name));
    }
    Ok(())
}

fn convert_for(param: &ParameterSpec, raw: &str) -> Result<ArgValue, BindError> {
    let value = convert(raw, param.ty).map_err(|reason| {
        format!(
            "parameter '{}' expects {}: {reason}",
            param.name, param.ty
        )
    })?;
    check_value(param, &value)?;
    Ok(value)
}

/// Tracks which member selected each option group.
#[derive(Default)]
struct GroupSelection<'a> {
    chosen: HashMap<u32, &'a str>,
}

impl<'a> GroupSelection<'a> {
    fn select(&mut self, group: &OptionGroupSpec, member: &'a str) -> Result<(), BindError> {
        match self.chosen.insert(group.group_id, member) {
            Some(previous) if previous != member && group.mutually_exclusive => Err(format!(
                "{} and {} cannot be used together",
                option_display(previous),
                option_display(member)
            )),
            _ => Ok(()),
        }
    }
}

/// Binds messages to command specs.
#[derive(Debug, Clone, Default)]
pub struct ArgumentBinder {
    case_sensitive: bool,
}

impl ArgumentBinder {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    /// Binds `event`'s message to `spec`. `path_words` are the command words
    /// the resolver matched; a leading prefix from `prefixes` is dropped first.
    pub fn bind(
        &self,
        spec: &CommandSpec,
        event: &MessageEvent,
        path_words: &[String],
        prefixes: &[String],
    ) -> BindResult {
        let parsed = ParsedCommand::parse_command(&event.message, prefixes, self.case_sensitive);
        let result = self
            .skip_path(&parsed.elements, path_words)
            .and_then(|elements| {
                let mut named = BTreeMap::new();
                self.bind_named(spec, &parsed, &mut named)?;
                let positional = self.bind_positional(spec, elements, &named)?;
                Ok((positional, named))
            });

        match result {
            Ok((positional, named_args)) => {
                trace!(command = %spec.name, ?positional, ?named_args, "Bound arguments");
                let (positional_names, positional_args) = positional.into_iter().unzip();
                BindResult {
                    ok: true,
                    positional_args,
                    named_args,
                    message: String::new(),
                    positional_names,
                }
            }
            Err(message) => {
                trace!(command = %spec.name, %message, "Binding failed");
                BindResult::failure(message)
            }
        }
    }

    fn words_equal(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.to_lowercase() == b.to_lowercase()
        }
    }

    /// Skips the leading elements spelling the command path. The prefix is
    /// already gone.
    fn skip_path<'e>(
        &self,
        elements: &'e [Element],
        path_words: &[String],
    ) -> Result<&'e [Element], BindError> {
        for (i, word) in path_words.iter().enumerate() {
            let text = elements
                .get(i)
                .and_then(Element::as_text)
                .ok_or_else(|| format!("expected command word '{word}'"))?;
            if !self.words_equal(text, word) {
                return Err(format!("expected command word '{word}', got '{text}'"));
            }
        }
        Ok(&elements[path_words.len()..])
    }

    fn bind_named<'p>(
        &self,
        spec: &CommandSpec,
        parsed: &'p ParsedCommand,
        named: &mut BTreeMap<String, ArgValue>,
    ) -> Result<(), BindError> {
        let mut groups = GroupSelection::default();

        // Message order: a later choice in a non-exclusive group replaces an earlier one.
        for switch in &parsed.switches {
            match &switch.value {
                None => Self::bind_flag(spec, &switch.name, &mut groups, named)?,
                Some(raw) => Self::bind_assignment(spec, &switch.name, raw, &mut groups, named)?,
            }
        }

        // Back-fill absent options and groups.
        for option in &spec.options {
            let key = option.binding_name();
            if named.contains_key(&key) {
                continue;
            }
            let default = spec
                .parameter(&key)
                .and_then(|p| p.default.clone())
                .or_else(|| option.absent_value());
            if let Some(default) = default {
                named.insert(key, default);
            }
        }
        for group in &spec.option_groups {
            named
                .entry(group.binding_name())
                .or_insert_with(|| ArgValue::Text(group.default.clone()));
        }
        Ok(())
    }

    fn bind_flag<'p>(
        spec: &CommandSpec,
        name: &'p str,
        groups: &mut GroupSelection<'p>,
        named: &mut BTreeMap<String, ArgValue>,
    ) -> Result<(), BindError> {
        if let Some(option) = spec.option(name) {
            if option.needs_value() {
                return Err(format!(
                    "option {} requires a value ({}=VALUE)",
                    option_display(name),
                    option_display(name)
                ));
            }
            if let Some(group) = option.group_id.and_then(|id| spec.option_group(id)) {
                groups.select(group, name)?;
            }
            named.insert(option.binding_name(), ArgValue::Boolean(true));
        } else if let Some(group) = spec.group_for_choice(name) {
            groups.select(group, name)?;
            named.insert(group.binding_name(), ArgValue::Text(name.to_string()));
        } else if let Some(param) = spec
            .parameter(&name.replace('-', "_"))
            .filter(|p| p.ty == ParamType::Boolean)
        {
            named.insert(param.name.clone(), ArgValue::Boolean(true));
        } else {
            return Err(format!("unknown option {}", option_display(name)));
        }
        Ok(())
    }

    fn bind_assignment<'p>(
        spec: &CommandSpec,
        name: &'p str,
        raw: &'p str,
        groups: &mut GroupSelection<'p>,
        named: &mut BTreeMap<String, ArgValue>,
    ) -> Result<(), BindError> {
        let key = name.replace('-', "_");
        if let Some(option) = spec.option(name) {
            let ty = option.value_type.unwrap_or(ParamType::Boolean);
            let value = match spec.parameter(&option.binding_name()) {
                Some(param) => convert_for(param, raw)?,
                None => convert(raw, ty).map_err(|reason| {
                    format!("option {} expects {ty}: {reason}", option_display(name))
                })?,
            };
            if let Some(group) = option.group_id.and_then(|id| spec.option_group(id)) {
                groups.select(group, name)?;
            }
            named.insert(option.binding_name(), value);
        } else if let Some(group) = spec.option_groups.iter().find(|g| g.binding_name() == key) {
            if !group.choices.iter().any(|c| c == raw) {
                return Err(format!(
                    "{} must be one of: {}; got '{raw}'",
                    option_display(name),
                    group.choices.join(", ")
                ));
            }
            groups.select(group, raw)?;
            named.insert(group.binding_name(), ArgValue::Text(raw.to_string()));
        } else if let Some(param) = spec.parameter(&key) {
            let value = convert_for(param, raw)?;
            named.insert(param.name.clone(), value);
        } else {
            return Err(format!("unknown parameter {}", option_display(name)));
        }
        Ok(())
    }

    fn bind_positional(
        &self,
        spec: &CommandSpec,
        elements: &[Element],
        named: &BTreeMap<String, ArgValue>,
    ) -> Result<Vec<(String, ArgValue)>, BindError> {
        let mut consumed = vec![false; elements.len()];
        let mut bound = Vec::new();

        let params = spec
            .parameters
            .iter()
            .filter(|p| !spec.is_option_bound(&p.name) && !named.contains_key(&p.name));

        for param in params {
            let next_text = (0..elements.len())
                .find(|&i| !consumed[i] && matches!(elements[i], Element::Text(_)));

            let value = match param.ty {
                ParamType::Segment(kind) => {
                    let next = (0..elements.len())
                        .find(|&i| !consumed[i] && matches!(elements[i], Element::Segment(_)));
                    match next.map(|i| (i, &elements[i])) {
                        Some((i, Element::Segment(seg))) if seg.kind() == kind => {
                            consumed[i] = true;
                            let value = ArgValue::Segment(seg.clone());
                            check_value(param, &value)?;
                            Some(value)
                        }
                        Some((_, Element::Segment(other))) if param.is_required() => {
                            return Err(format!(
                                "parameter '{}' expects {kind}, got {}",
                                param.name,
                                other.kind()
                            ));
                        }
                        _ => None,
                    }
                }
                ParamType::Sentence => match next_text {
                    Some(start) => {
                        let mut words = Vec::new();
                        for (i, element) in elements.iter().enumerate().skip(start) {
                            match element {
                                Element::Text(word) if !consumed[i] => {
                                    consumed[i] = true;
                                    words.push(word.as_str());
                                }
                                _ => break,
                            }
                        }
                        Some(convert_for(param, &words.join(" "))?)
                    }
                    None => None,
                },
                _ => match next_text {
                    Some(i) => {
                        consumed[i] = true;
                        let raw = elements[i].as_text().unwrap_or_default();
                        Some(convert_for(param, raw)?)
                    }
                    None => None,
                },
            };

            let value = match (value, &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(format!(
                        "missing required parameter '{}' ({})",
                        param.name, param.ty
                    ));
                }
            };
            bound.push((param.name.clone(), value));
        }

        Ok(bound)
    }
}
