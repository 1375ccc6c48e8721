//! Node configuration, read from a TOML file.

mod config;
mod overrides;

pub use config::{ClientConfig, Config, ConfigError, LoggingConfig};
