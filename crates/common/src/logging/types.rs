//! Settings the subscriber is built from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// How often the log file is rolled over.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(value: LogRotation) -> Self {
        match value {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Configuration for the stdout logging layer
#[derive(Debug, Clone)]
pub struct StdoutConfig {
    pub format: LogFormat,
    /// Span events to emit, none by default.
    pub fmt_span: FmtSpan,
}

impl Default for StdoutConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            fmt_span: FmtSpan::NONE,
        }
    }
}

/// Rolling log file output.
#[derive(Debug, Clone)]
pub struct FileLoggingConfig {
    /// Created on demand by the appender.
    pub directory: PathBuf,
    /// Base filename prefix (e.g., "dexchain" -> "dexchain.2026-01-01")
    pub file_name_prefix: String,
    pub rotation: LogRotation,
    pub format: LogFormat,
}

impl FileLoggingConfig {
    pub fn new(directory: PathBuf, file_name_prefix: String) -> Self {
        Self {
            directory,
            file_name_prefix,
            rotation: LogRotation::Daily,
            format: LogFormat::Compact,
        }
    }

    pub fn with_rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Everything [`init`](super::init) needs.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `dexchain_consensus_logic=debug`.
    pub default_directive: String,
    pub stdout_config: StdoutConfig,
    pub file_logging_config: Option<FileLoggingConfig>,
}

impl LoggerConfig {
    pub fn new(service_name: String) -> Self {
        Self {
            service_name,
            default_directive: "info".to_owned(),
            stdout_config: StdoutConfig::default(),
            file_logging_config: None,
        }
    }

    pub fn with_default_directive(mut self, directive: String) -> Self {
        self.default_directive = directive;
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.stdout_config.format = if enabled {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };
        self
    }

    pub fn with_file_logging(mut self, config: FileLoggingConfig) -> Self {
        self.file_logging_config = Some(config);
        self
    }

    /// Span lifecycle events written as log lines.
    pub fn with_fmt_span(mut self, fmt_span: FmtSpan) -> Self {
        self.stdout_config.fmt_span = fmt_span;
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new("dexchain".to_owned())
    }
}
