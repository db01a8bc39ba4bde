//! The command layer: from raw message text to a bound handler call.
//!
//! ```text
//! MessageEvent
//!   → MessagePreprocessor   (first segment text, prefix check)
//!   → tokenize              (words, quoted strings, options)
//!   → CommandResolver       (path / alias lookup)
//!   → ArgumentBinder        (typed positional + named arguments)
//! ```
//!
//! Commands are declared through [`UnifiedRegistry`] and validated by
//! [`FunctionAnalyser`] when registered.

pub mod analyser;
pub mod binder;
pub mod help;
pub mod parser;
pub mod preprocess;
pub mod registry;
pub mod resolver;
pub mod spec;
pub mod tokenizer;

pub use analyser::{CommandDraft, FunctionAnalyser};
pub use binder::{ArgumentBinder, BindResult};
pub use help::{build_command_help, command_signature, usage_examples};
pub use parser::{Element, ParsedCommand};
pub use preprocess::{MessagePreprocessor, PreprocessResult};
pub use registry::{
    CommandBuilder, CommandGroup, EventHandlerBuilder, EventHandlerEntry, FilterFunction,
    FilterFunctionBuilder, RegisteredCommand, UnifiedRegistry,
};
pub use resolver::{CommandResolver, Match};
pub use spec::{
    ArgValue, CommandSpec, OptionGroupSpec, OptionSpec, ParamType, ParameterSpec, Validator,
};
pub use tokenizer::{Token, tokenize};
