//! Help text for commands.
//!
//! ```text
//! /deploy <app: text> [env: text="dev"] [-v|--verbose]
//! Example: /deploy text text -v
//! Example: /deploy text
//! ```

use crate::command::spec::{ArgValue, CommandSpec, OptionSpec, ParamType, ParameterSpec};

fn sample_value(param: &ParameterSpec) -> &'static str {
    let name = param.name.to_lowercase();
    match param.ty {
        ParamType::Text if name.contains("name") => "alice",
        ParamType::Text if name.contains("user") => "user",
        ParamType::Text if name.contains("title") => "title",
        ParamType::Text => "text",
        ParamType::Integer if name.contains("age") => "25",
        ParamType::Integer if name.contains("count") => "10",
        ParamType::Integer => "123",
        ParamType::Float if name.contains("price") => "99.99",
        ParamType::Float if name.contains("rate") => "0.85",
        ParamType::Float => "3.14",
        ParamType::Boolean => "true",
        ParamType::Sentence => "a whole sentence with spaces",
        ParamType::Segment(kind) => match kind.as_str() {
            "at" => "@someone",
            "image" => "[image]",
            "face" => "[face]",
            "video" => "[video]",
            "record" => "[voice]",
            "reply" => "[reply]",
            _ => "[segment]",
        },
    }
}

fn option_usage(option: &OptionSpec) -> String {
    let names: Vec<String> = [
        option.short_name.as_ref().map(|s| format!("-{s}")),
        option.long_name.as_ref().map(|l| format!("--{l}")),
    ]
    .into_iter()
    .flatten()
    .collect();
    let names = names.join("|");
    match option.value_type {
        Some(ty) => format!("[{names}=<{ty}>]"),
        None => format!("[{names}]"),
    }
}

fn positional(spec: &CommandSpec) -> impl Iterator<Item = &ParameterSpec> {
    spec.parameters
        .iter()
        .filter(|p| !spec.is_option_bound(&p.name))
}

/// `/path <a: int> [env: text="dev"] [-v|--verbose] [--json|--csv]`
pub fn command_signature(path: &str, spec: &CommandSpec) -> String {
    let mut out = path.to_string();
    for param in positional(spec) {
        match &param.default {
            Some(ArgValue::Text(text)) => {
                out.push_str(&format!(" [{}: {}=\"{text}\"]", param.name, param.ty));
            }
            Some(default) => out.push_str(&format!(" [{}: {}={default}]", param.name, param.ty)),
            None => out.push_str(&format!(" <{}: {}>", param.name, param.ty)),
        }
    }
    for option in &spec.options {
        out.push(' ');
        out.push_str(&option_usage(option));
    }
    for group in &spec.option_groups {
        let choices: Vec<String> = group.choices.iter().map(|c| format!("--{c}")).collect();
        out.push_str(&format!(" [{}]", choices.join("|")));
    }
    out
}

fn example_line<'a>(path: &str, params: impl Iterator<Item = &'a ParameterSpec>) -> String {
    let mut parts = vec![path.to_string()];
    parts.extend(params.map(|p| sample_value(p).to_string()));
    parts.join(" ")
}

/// One example using every positional parameter, plus one using only the
/// required ones when that differs.
pub fn usage_examples(path: &str, spec: &CommandSpec) -> String {
    let params: Vec<&ParameterSpec> = positional(spec).collect();
    let full = example_line(path, params.iter().copied());
    let mut examples = vec![full.clone()];

    let required = params.iter().filter(|p| p.is_required()).count();
    if required > 0 && required < params.len() {
        let minimal = example_line(path, params.iter().copied().filter(|p| p.is_required()));
        if minimal != full {
            examples.push(minimal);
        }
    }

    examples
        .iter()
        .map(|e| format!("Example: {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The signature followed by examples, or only the examples when `simple`.
pub fn build_command_help(path: &str, spec: &CommandSpec, simple: bool) -> String {
    let examples = usage_examples(path, spec);
    if simple {
        return examples;
    }
    let mut help = command_signature(path, spec);
    if !spec.description.is_empty() {
        help.push('\n');
        help.push_str(&spec.description);
    }
    help.push('\n');
    help.push_str(&examples);
    help
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ncatbot_core::SegmentKind;

    use super::*;
    use crate::command::analyser::{CommandDraft, FunctionAnalyser};
    use crate::command::spec::{OptionGroupSpec, OptionSpec};
    use crate::handler::sync_handler;

    fn deploy() -> CommandSpec {
        let mut draft = CommandDraft::new("deploy", Arc::new(sync_handler(|_| Ok(()))));
        draft.parameters = vec![
            ParameterSpec::text("app"),
            ParameterSpec::text("env").with_default("dev"),
            ParameterSpec::int("count").with_default(1),
            ParameterSpec::boolean("verbose").with_default(false),
        ];
        draft.options = vec![
            OptionSpec::flag("v", "verbose"),
            OptionSpec::new().long("port").value(ParamType::Integer),
        ];
        draft.option_groups = vec![OptionGroupSpec::new(1, "format", ["json", "csv"], "json")];
        FunctionAnalyser::analyse(draft).unwrap()
    }

    #[test]
    fn test_signature() {
        assert_eq!(
            command_signature("/deploy", &deploy()),
            r#"/deploy <app: text> [env: text="dev"] [count: int=1] [-v|--verbose] [--port=<int>] [--json|--csv]"#
        );
    }

    #[test]
    fn test_examples() {
        assert_eq!(
            usage_examples("/deploy", &deploy()),
            "Example: /deploy text text 10\nExample: /deploy text"
        );

        let mut draft = CommandDraft::new("kick", Arc::new(sync_handler(|_| Ok(()))));
        draft.parameters = vec![ParameterSpec::segment("user", SegmentKind::At)];
        let kick = FunctionAnalyser::analyse(draft).unwrap();
        assert_eq!(usage_examples("/kick", &kick), "Example: /kick @someone");
    }

    #[test]
    fn test_simple_and_full_help() {
        let hello = FunctionAnalyser::analyse(CommandDraft::new(
            "hello",
            Arc::new(sync_handler(|_| Ok(()))),
        ))
        .unwrap();
        assert_eq!(build_command_help("/hello", &hello, true), "Example: /hello");
        assert_eq!(build_command_help("/hello", &hello, false), "/hello\nExample: /hello");
    }
}
