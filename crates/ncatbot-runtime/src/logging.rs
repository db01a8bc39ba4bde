//! Logging setup for NcatBot.
//!
//! One `fmt` layer plus an [`EnvFilter`], both driven by the `[logging]`
//! section. The trigger engine opens a `dispatch` span per message (target
//! `ncatbot_framework::engine`); [`LoggingBuilder::trace_dispatch`] turns on
//! the directive and span events needed to see each command's path through
//! resolution, binding and its handler, with timing.
//!
//! ```rust,ignore
//! use ncatbot_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .directive("ncatbot_framework::command=trace")
//!     .trace_dispatch()
//!     .init();
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use tracing::level_filters::LevelFilter;
use tracing::subscriber::Subscriber;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// Target of the engine's per-message spans.
pub const DISPATCH_TARGET: &str = "ncatbot_framework::engine";

const DEFAULT_LOG_FILE: &str = "ncatbot.log";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Cannot open log file: {0}")]
    File(#[from] InitError),

    #[error("Cannot install subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Maps the configured span events onto `fmt` span events.
pub fn fmt_span(config: &SpanEventConfig) -> FmtSpan {
    [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(on, _)| *on)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

/// Installs the global subscriber described by `config`.
///
/// An already installed subscriber is kept. A log file that cannot be opened
/// is reported on stderr, since no subscriber exists yet to report it.
pub fn init_from_config(config: &LoggingConfig) {
    if let Err(LoggingError::File(e)) = LoggingBuilder::from_config(config).try_init() {
        eprintln!("ncatbot: logging disabled, {e}");
    }
}

// =============================================================================
// LoggingBuilder
// =============================================================================

#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: LevelFilter,
    directives: Vec<String>,
    span_events: FmtSpan,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    thread_ids: bool,
    file_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            level: LevelFilter::INFO,
            directives: Vec::new(),
            span_events: FmtSpan::NONE,
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            thread_ids: false,
            file_location: false,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        let builder = Self {
            level: LevelFilter::from(config.level.to_tracing_level()),
            directives: filters
                .into_iter()
                .map(|(module, level)| format!("{module}={level}"))
                .collect(),
            span_events: fmt_span(&config.span_events),
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
        };
        if config.trace_dispatch {
            builder.trace_dispatch()
        } else {
            builder
        }
    }

    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Adds a filter directive such as `ncatbot_framework::command=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Logs every dispatched event: the engine's debug events, and the close
    /// of each `dispatch` span with its busy and idle time.
    pub fn trace_dispatch(mut self) -> Self {
        self.directives.push(format!("{DISPATCH_TARGET}=debug"));
        self.span_events |= FmtSpan::CLOSE;
        self
    }

    pub fn span_events(mut self, events: FmtSpan) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Writes to `path` and switches output to [`LogOutput::File`].
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self.output = LogOutput::File;
        self
    }

    pub fn thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    pub fn file_location(mut self, enabled: bool) -> Self {
        self.file_location = enabled;
        self
    }

    /// The configured level is the default; `RUST_LOG` and then the builder's
    /// directives refine it. Returns the directives that failed to parse.
    fn build_filter(&self) -> (EnvFilter, Vec<String>) {
        let mut filter = EnvFilter::builder()
            .with_default_directive(self.level.into())
            .from_env_lossy();
        let mut rejected = Vec::new();
        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(_) => rejected.push(directive.clone()),
            }
        }
        (filter, rejected)
    }

    /// `None` when file output was asked for without a path.
    fn make_writer(&self) -> Result<Option<BoxMakeWriter>, InitError> {
        let writer = match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(path)) => BoxMakeWriter::new(open_log_file(path)?),
            (LogOutput::File, None) => return Ok(None),
        };
        Ok(Some(writer))
    }

    fn fmt_layer<S>(&self, writer: BoxMakeWriter) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_span_events(self.span_events.clone())
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);
        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => layer.compact().boxed(),
        }
    }

    pub fn init(self) {
        let _ = self.try_init();
    }

    pub fn try_init(self) -> Result<(), LoggingError> {
        let (filter, rejected) = self.build_filter();
        let writer = self.make_writer()?;
        let missing_path = writer.is_none();
        let layer = self.fmt_layer(writer.unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout)));

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()?;

        if missing_path {
            warn!("File output requested but no file path configured, using stdout");
        }
        for directive in rejected {
            warn!(%directive, "Ignoring invalid log directive");
        }
        Ok(())
    }
}

fn open_log_file(path: &Path) -> Result<RollingFileAppender, InitError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map_or_else(|| DEFAULT_LOG_FILE.into(), |n| n.to_string_lossy().into_owned());
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
}
