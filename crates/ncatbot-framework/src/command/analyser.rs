//! Registration-time validation of command declarations.
//!
//! Handlers declare their parameters explicitly; the analyser checks the
//! declaration as a whole and freezes it into a [`CommandSpec`].

use std::collections::{BTreeSet, HashSet};

use tracing::trace;

use crate::command::spec::{
    ArgValue, CommandSpec, OptionGroupSpec, OptionSpec, ParamType, ParameterSpec,
};
use crate::error::{RegistrationError, RegistrationResult};
use crate::handler::BoxedCommandHandler;

/// A command declaration as collected by the registration builder.
pub struct CommandDraft {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub options: Vec<OptionSpec>,
    pub option_groups: Vec<OptionGroupSpec>,
    pub func: BoxedCommandHandler,
}

impl CommandDraft {
    pub fn new(name: impl Into<String>, func: BoxedCommandHandler) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            parameters: Vec::new(),
            options: Vec::new(),
            option_groups: Vec::new(),
            func,
        }
    }
}

/// Turns a [`CommandDraft`] into a [`CommandSpec`].
pub struct FunctionAnalyser;

impl FunctionAnalyser {
    pub fn analyse(draft: CommandDraft) -> RegistrationResult<CommandSpec> {
        validate_name(&draft.name)?;
        let mut aliases = BTreeSet::new();
        for alias in &draft.aliases {
            validate_name(alias)?;
            if !aliases.insert(alias.clone()) {
                return Err(RegistrationError::duplicate_name(&draft.name, alias));
            }
        }

        let spec = CommandSpec {
            name: draft.name,
            aliases,
            description: draft.description,
            parameters: draft.parameters,
            options: draft.options,
            option_groups: draft.option_groups,
            func: draft.func,
        };

        check_option_groups(&spec)?;
        check_options(&spec)?;
        check_parameters(&spec)?;

        trace!(
            command = %spec.name,
            parameters = spec.parameters.len(),
            options = spec.options.len(),
            groups = spec.option_groups.len(),
            "Analysed command"
        );
        Ok(spec)
    }
}

pub(crate) fn validate_name(name: &str) -> RegistrationResult<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.chars().any(char::is_whitespace) {
        "name contains whitespace"
    } else if name.starts_with('-') {
        "name starts with '-'"
    } else {
        return Ok(());
    };
    Err(RegistrationError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

fn is_valid_long_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_alphabetic)
        && !name.chars().any(|c| c.is_whitespace() || c == '=')
}

fn check_option_groups(spec: &CommandSpec) -> RegistrationResult<()> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    let mut choices = HashSet::new();

    for group in &spec.option_groups {
        if !ids.insert(group.group_id) {
            return Err(RegistrationError::duplicate_name(
                &spec.name,
                &format!("option group {}", group.group_id),
            ));
        }
        if !names.insert(group.binding_name()) {
            return Err(RegistrationError::duplicate_name(&spec.name, &group.name));
        }
        if group.choices.is_empty() {
            return Err(RegistrationError::invalid_option(
                &spec.name,
                format!("option group '{}' has no choices", group.name),
            ));
        }
        for choice in &group.choices {
            if !is_valid_long_name(choice) {
                return Err(RegistrationError::invalid_option(
                    &spec.name,
                    format!("'{choice}' is not a valid choice name"),
                ));
            }
            if !choices.insert(choice.as_str()) {
                return Err(RegistrationError::duplicate_name(&spec.name, choice));
            }
        }
        if !group.choices.contains(&group.default) {
            return Err(RegistrationError::OptionGroupDefault {
                command: spec.name.clone(),
                group: group.name.clone(),
                default: group.default.clone(),
            });
        }
    }
    Ok(())
}

fn check_options(spec: &CommandSpec) -> RegistrationResult<()> {
    let mut seen = HashSet::new();
    let mut bindings: HashSet<String> =
        spec.option_groups.iter().map(OptionGroupSpec::binding_name).collect();

    for option in &spec.options {
        if option.short_name.is_none() && option.long_name.is_none() {
            return Err(RegistrationError::invalid_option(
                &spec.name,
                "option has neither a short nor a long name",
            ));
        }
        if let Some(short) = &option.short_name {
            let mut chars = short.chars();
            if !(chars.next().is_some_and(char::is_alphabetic) && chars.next().is_none()) {
                return Err(RegistrationError::invalid_option(
                    &spec.name,
                    format!("short name '-{short}' must be a single letter"),
                ));
            }
            if !seen.insert(short.clone()) {
                return Err(RegistrationError::duplicate_name(&spec.name, short));
            }
        }
        if let Some(long) = &option.long_name {
            if !is_valid_long_name(long) {
                return Err(RegistrationError::invalid_option(
                    &spec.name,
                    format!("'--{long}' is not a valid long name"),
                ));
            }
            if !seen.insert(long.clone()) || spec.group_for_choice(long).is_some() {
                return Err(RegistrationError::duplicate_name(&spec.name, long));
            }
        }
        if !bindings.insert(option.binding_name()) {
            return Err(RegistrationError::duplicate_name(&spec.name, option.name()));
        }

        if let Some(group_id) = option.group_id
            && spec.option_group(group_id).is_none()
        {
            return Err(RegistrationError::UnknownOptionGroup {
                command: spec.name.clone(),
                group_id,
            });
        }

        let expected = option.value_type.unwrap_or(ParamType::Boolean);
        if matches!(expected, ParamType::Sentence | ParamType::Segment(_)) {
            return Err(RegistrationError::invalid_option(
                &spec.name,
                format!("'{}' cannot take a {expected} value", option.name()),
            ));
        }
        if let Some(default) = &option.default_value
            && !default.fits(expected)
        {
            return Err(RegistrationError::InvalidDefault {
                command: spec.name.clone(),
                parameter: option.name().to_string(),
                expected,
            });
        }
        if let Some(param) = spec.parameter(&option.binding_name())
            && !(param.ty == expected
                || (param.ty == ParamType::Float && expected == ParamType::Integer))
        {
            return Err(RegistrationError::invalid_option(
                &spec.name,
                format!(
                    "'{}' yields {expected} but parameter '{}' is {}",
                    option.name(),
                    param.name,
                    param.ty
                ),
            ));
        }
    }
    Ok(())
}

fn check_parameters(spec: &CommandSpec) -> RegistrationResult<()> {
    let mut names = HashSet::new();
    let mut first_optional: Option<&str> = None;

    for param in &spec.parameters {
        if !names.insert(param.name.as_str()) {
            return Err(RegistrationError::duplicate_name(&spec.name, &param.name));
        }

        // Option-group parameters hold the chosen choice name.
        let group_bound = spec
            .option_groups
            .iter()
            .any(|g| g.binding_name() == param.name);
        let invalid_default = |value: &ArgValue| {
            let fits = if group_bound {
                matches!(value, ArgValue::Text(_))
            } else {
                value.fits(param.ty)
            };
            (!fits).then(|| RegistrationError::InvalidDefault {
                command: spec.name.clone(),
                parameter: param.name.clone(),
                expected: param.ty,
            })
        };
        if let Some(err) = param.default.as_ref().and_then(invalid_default) {
            return Err(err);
        }
        if let Some(err) = param.choices.iter().flatten().find_map(invalid_default) {
            return Err(err);
        }

        if spec.is_option_bound(&param.name) {
            continue;
        }
        match (param.is_required(), first_optional) {
            (true, Some(optional)) => {
                return Err(RegistrationError::ParameterOrder {
                    command: spec.name.clone(),
                    required: param.name.clone(),
                    optional: optional.to_string(),
                });
            }
            (false, None) => first_optional = Some(&param.name),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::handler::sync_handler;

    fn draft(name: &str) -> CommandDraft {
        CommandDraft::new(name, Arc::new(sync_handler(|_| Ok(()))))
    }

    #[test]
    fn test_valid_deploy() {
        let mut d = draft("deploy");
        d.aliases.push("dp".into());
        d.parameters = vec![
            ParameterSpec::text("app"),
            ParameterSpec::text("env").with_default("dev"),
            ParameterSpec::boolean("verbose").with_default(false),
        ];
        d.options = vec![OptionSpec::flag("v", "verbose")];
        let spec = FunctionAnalyser::analyse(d).unwrap();
        assert_eq!(spec.parameters.len(), 3);
        assert!(spec.aliases.contains("dp"));
    }

    #[test]
    fn test_required_after_optional() {
        let mut d = draft("bad");
        d.parameters = vec![
            ParameterSpec::text("a").with_default("x"),
            ParameterSpec::text("b"),
        ];
        assert!(matches!(
            FunctionAnalyser::analyse(d),
            Err(RegistrationError::ParameterOrder { .. })
        ));
    }

    #[test]
    fn test_option_bound_params_skip_order_check() {
        let mut d = draft("export");
        d.parameters = vec![
            ParameterSpec::text("format").with_default("json"),
            ParameterSpec::text("table"),
        ];
        d.option_groups = vec![OptionGroupSpec::new(1, "format", ["json", "csv"], "json")];
        assert!(FunctionAnalyser::analyse(d).is_ok());
    }

    #[test]
    fn test_duplicate_names() {
        let mut d = draft("dup");
        d.parameters = vec![ParameterSpec::text("a"), ParameterSpec::int("a")];
        assert!(matches!(
            FunctionAnalyser::analyse(d),
            Err(RegistrationError::DuplicateName { .. })
        ));

        let mut d = draft("dup");
        d.options = vec![OptionSpec::flag("v", "verbose"), OptionSpec::new().short("v")];
        assert!(matches!(
            FunctionAnalyser::analyse(d),
            Err(RegistrationError::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_option_checks() {
        let mut d = draft("opt");
        d.options = vec![OptionSpec::new()];
        assert!(matches!(
            FunctionAnalyser::analyse(d),
            Err(RegistrationError::InvalidOption { .. })
        ));

        let mut d = draft("opt");
        d.options = vec![OptionSpec::new().short("vv")];
        assert!(FunctionAnalyser::analyse(d).is_err());

        let mut d = draft("opt");
        d.options = vec![OptionSpec::new().long("fmt").group(9)];
        assert!(matches!(
            FunctionAnalyser::analyse(d),
            Err(RegistrationError::UnknownOptionGroup { group_id: 9, .. })
        ));

        let mut d = draft("opt");
        d.parameters = vec![ParameterSpec::int("verbose").with_default(0)];
        d.options = vec![OptionSpec::flag("v", "verbose")];
        assert!(FunctionAnalyser::analyse(d).is_err());
    }

    #[test]
    fn test_group_default_must_be_choice() {
        let mut d = draft("export");
        d.option_groups = vec![OptionGroupSpec::new(1, "format", ["json", "csv"], "xml")];
        assert!(matches!(
            FunctionAnalyser::analyse(d),
            Err(RegistrationError::OptionGroupDefault { .. })
        ));
    }

    #[test]
    fn test_default_type_checked() {
        let mut d = draft("calc");
        d.parameters = vec![ParameterSpec::int("a").with_default("ten")];
        assert!(matches!(
            FunctionAnalyser::analyse(d),
            Err(RegistrationError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn test_invalid_names() {
        assert!(FunctionAnalyser::analyse(draft("")).is_err());
        assert!(FunctionAnalyser::analyse(draft("two words")).is_err());
        let mut d = draft("ok");
        d.aliases.push("--x".into());
        assert!(FunctionAnalyser::analyse(d).is_err());
    }
}
