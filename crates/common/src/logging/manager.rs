//! Logging initialization.

use tracing::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    filter::{Directive, LevelFilter},
    fmt::layer,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

use super::types::{LogFormat, LoggerConfig};

/// Filter taking `RUST_LOG` when set and `default_directive` otherwise.  An
/// unparsable default falls back to INFO.
pub fn build_filter(default_directive: &str) -> EnvFilter {
    let directive = default_directive
        .parse::<Directive>()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy()
}

/// Installs the global subscriber.  Fails if one is already installed.
pub fn init(config: LoggerConfig) -> Result<(), TryInitError> {
    let filt = build_filter(&config.default_directive);

    let stdout_sub = match config.stdout_config.format {
        LogFormat::Json => layer()
            .json()
            .with_span_events(config.stdout_config.fmt_span.clone())
            .with_filter(filt)
            .boxed(),
        LogFormat::Compact => layer()
            .compact()
            .with_span_events(config.stdout_config.fmt_span.clone())
            .with_filter(filt)
            .boxed(),
    };

    let file_layer = config.file_logging_config.as_ref().map(|file_config| {
        let file_appender = RollingFileAppender::new(
            file_config.rotation.into(),
            &file_config.directory,
            &file_config.file_name_prefix,
        );
        let filt = build_filter(&config.default_directive);

        match file_config.format {
            LogFormat::Json => layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(filt)
                .boxed(),
            LogFormat::Compact => layer()
                .compact()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(filt)
                .boxed(),
        }
    });

    tracing_subscriber::registry()
        .with(stdout_sub)
        .with(file_layer)
        .try_init()?;

    info!(
        service_name = %config.service_name,
        file_logging = config.file_logging_config.is_some(),
        "logging initialized"
    );
    Ok(())
}
