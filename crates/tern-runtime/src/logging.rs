//! Logging setup on top of `tracing-subscriber`.
//!
//! The client emits two kinds of spans:
//!
//! - [`API_CALL_SPAN`] (`debug`) around every call, with `method` and
//!   `http_method` fields;
//! - [`PLUGIN_ENABLE_SPAN`] (`info`) around every plugin enable routine, with
//!   `plugin` and `version` fields.
//!
//! `logging.span_events` decides whether their open/close lifecycle is
//! printed, and [`LoggingBuilder::span_level`] raises verbosity for
//! everything recorded inside one of them.
//!
//! ```rust,ignore
//! use tern_runtime::config::{LogLevel, load_config};
//! use tern_runtime::logging::{API_CALL_SPAN, LoggingBuilder};
//!
//! let config = load_config()?;
//! LoggingBuilder::from_config(&config.logging)
//!     .span_level(API_CALL_SPAN, LogLevel::Trace)
//!     .init();
//! ```

use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig};

/// Span opened around each API call.
pub const API_CALL_SPAN: &str = "api_call";

/// Span opened around each plugin enable routine.
pub const PLUGIN_ENABLE_SPAN: &str = "plugin_enable";

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

fn fmt_span(config: &SpanEventConfig) -> FmtSpan {
    [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, flag)| acc | flag)
}

/// Subscriber settings, seeded from [`LoggingConfig`].
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: LogLevel,
    directives: Vec<String>,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    span_events: FmtSpan,
    thread_ids: bool,
    file_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::from_config(&LoggingConfig::default())
    }
}

impl LoggingBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder mirroring `config`.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut directives: Vec<String> = config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={level}"))
            .collect();
        directives.sort();

        Self {
            level: config.level,
            directives,
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            span_events: fmt_span(&config.span_events),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
        }
    }

    /// Sets the global level.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Adds a raw filter directive, e.g. `"tern_transport=trace"`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Records everything inside spans named `span` at `level` or above.
    pub fn span_level(self, span: &str, level: LogLevel) -> Self {
        self.directive(format!("[{span}]={level}"))
    }

    /// Sets the line layout.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the destination; `File` needs [`file_path`](Self::file_path).
    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Sets the log file.
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// `RUST_LOG` replaces the configured level. Directives that do not
    /// parse are dropped.
    fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));
        for directive in &self.directives {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    }

    /// Returns the writer and, when the requested output was unusable, a
    /// note to log once the subscriber is up.
    fn writer(&self) -> (BoxMakeWriter, Option<String>) {
        match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) => (BoxMakeWriter::new(std::io::stdout), None),
            (LogOutput::Stderr, _) => (BoxMakeWriter::new(std::io::stderr), None),
            (LogOutput::File, Some(path)) => {
                let dir = path
                    .parent()
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("tern.log");
                match RollingFileAppender::builder()
                    .rotation(Rotation::NEVER)
                    .filename_prefix(name)
                    .build(dir)
                {
                    Ok(appender) => (BoxMakeWriter::new(appender), None),
                    Err(e) => (
                        BoxMakeWriter::new(std::io::stdout),
                        Some(format!(
                            "cannot open log file {}, logging to stdout: {e}",
                            path.display()
                        )),
                    ),
                }
            }
            (LogOutput::File, None) => (
                BoxMakeWriter::new(std::io::stdout),
                Some("file output has no file_path, logging to stdout".to_string()),
            ),
        }
    }

    fn layer(&self) -> (Box<dyn Layer<Registry> + Send + Sync>, Option<String>) {
        let (writer, note) = self.writer();
        let base = fmt::layer()
            .with_writer(writer)
            .with_span_events(self.span_events.clone())
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        let (layer, fallback): (Box<dyn Layer<Registry> + Send + Sync>, Option<String>) =
            match self.format {
                LogFormat::Compact => (base.compact().boxed(), None),
                LogFormat::Full => (base.boxed(), None),
                LogFormat::Pretty => (base.pretty().boxed(), None),
                #[cfg(feature = "json-log")]
                LogFormat::Json => (base.json().boxed(), None),
                #[cfg(not(feature = "json-log"))]
                LogFormat::Json => (
                    base.compact().boxed(),
                    Some("json format needs the `json-log` feature, using compact".to_string()),
                ),
            };
        (layer, note.or(fallback))
    }

    /// Installs the subscriber, ignoring an existing one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`TryInitError`] if a global subscriber is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (layer, note) = self.layer();
        tracing_subscriber::registry()
            .with(layer)
            .with(self.filter())
            .try_init()?;
        if let Some(note) = note {
            warn!("{note}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_mirrors_settings() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            thread_ids: true,
            file_location: true,
            span_events: SpanEventConfig {
                new: true,
                close: true,
                ..SpanEventConfig::default()
            },
            ..LoggingConfig::default()
        };
        config
            .filters
            .insert("tern_transport".to_string(), "trace".to_string());
        config
            .filters
            .insert("tern_framework".to_string(), "warn".to_string());

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, LogLevel::Debug);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert_eq!(builder.span_events, FmtSpan::NEW | FmtSpan::CLOSE);
        assert!(builder.thread_ids && builder.file_location);
        assert_eq!(
            builder.directives,
            vec!["tern_framework=warn", "tern_transport=trace"]
        );
    }

    #[test]
    fn test_span_level_targets_named_span() {
        let builder = LoggingBuilder::new()
            .span_level(API_CALL_SPAN, LogLevel::Trace)
            .span_level(PLUGIN_ENABLE_SPAN, LogLevel::Debug);
        assert_eq!(
            builder.directives,
            vec!["[api_call]=trace", "[plugin_enable]=debug"]
        );
        for directive in &builder.directives {
            assert!(directive.parse::<tracing_subscriber::filter::Directive>().is_ok());
        }
    }

    #[test]
    fn test_no_span_events_by_default() {
        assert_eq!(LoggingBuilder::new().span_events, FmtSpan::NONE);
        let all = SpanEventConfig {
            new: true,
            enter: true,
            exit: true,
            close: true,
        };
        assert_eq!(fmt_span(&all), FmtSpan::FULL);
    }

    #[test]
    fn test_file_output_without_path_falls_back() {
        let builder = LoggingBuilder::new().output(LogOutput::File);
        assert!(builder.writer().1.is_some());

        let dir = tempfile::TempDir::new().unwrap();
        let builder = builder.file_path(dir.path().join("tern.log"));
        assert!(builder.writer().1.is_none());
        assert!(dir.path().join("tern.log").exists());
    }
}
