//! Unit tests for the logging subsystem.

use std::path::PathBuf;

use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::format::FmtSpan;

use super::types::*;

#[test]
fn test_logger_config_defaults() {
    let config = LoggerConfig::default();
    assert_eq!(config.service_name, "dexchain");
    assert_eq!(config.default_directive, "info");
    assert_eq!(config.stdout_config.format, LogFormat::Compact);
    assert!(config.file_logging_config.is_none());
}

#[test]
fn test_logger_config_builder_pattern() {
    let file = FileLoggingConfig::new(PathBuf::from("/tmp/logs"), "node".to_owned())
        .with_rotation(LogRotation::Hourly)
        .with_format(LogFormat::Json);
    let config = LoggerConfig::new("test-node".to_owned())
        .with_default_directive("dexchain_market=trace".to_owned())
        .with_json_logging(true)
        .with_fmt_span(FmtSpan::CLOSE)
        .with_file_logging(file);

    assert_eq!(config.stdout_config.format, LogFormat::Json);
    assert_eq!(config.default_directive, "dexchain_market=trace");
    let file = config.file_logging_config.expect("file logging");
    assert_eq!(file.rotation, LogRotation::Hourly);
    assert_eq!(file.format, LogFormat::Json);
    assert_eq!(file.file_name_prefix, "node");
}

#[test]
fn test_rotation_mapping() {
    assert_eq!(Rotation::from(LogRotation::Daily), Rotation::DAILY);
    assert_eq!(Rotation::from(LogRotation::Never), Rotation::NEVER);
    assert_eq!(LogRotation::default(), LogRotation::Daily);
}
