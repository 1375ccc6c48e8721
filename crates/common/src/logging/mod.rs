//! Logging subsystem: structured stdout output and optional rolling log
//! files, filtered through `RUST_LOG`.

mod manager;
mod types;

#[cfg(test)]
mod tests;

pub use manager::{build_filter, init};
pub use types::{FileLoggingConfig, LogFormat, LogRotation, LoggerConfig, StdoutConfig};

// Re-export tracing-appender types for convenience
pub use tracing_appender::rolling::Rotation;
