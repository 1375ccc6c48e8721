use std::{
    fs, io,
    path::{Path, PathBuf},
};

use dexchain_common::logging::{FileLoggingConfig, LogFormat, LogRotation, LoggerConfig};
use dexchain_mempool::MempoolConfig;
use dexchain_params::ChainParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::value::Table;

use crate::overrides::{apply_override, parse_override};

/// Default value for `datadir` in [`ClientConfig`].
const DEFAULT_DATADIR: &str = "dexchain-data";

/// Default value for `genesis` in [`ClientConfig`].
const DEFAULT_GENESIS_FILE: &str = "genesis.json";

/// Base service name logs are reported under.
const SERVICE_NAME: &str = "dexchain-node";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid override: '{0}'")]
    InvalidOverride(String),

    #[error("can't traverse into non-table key: {0}")]
    TraverseNonTable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// The data directory where the block database resides.
    #[serde(default = "default_datadir")]
    pub datadir: PathBuf,

    /// JSON genesis description the chain starts from.
    #[serde(default = "default_genesis_file")]
    pub genesis: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            datadir: default_datadir(),
            genesis: default_genesis_file(),
        }
    }
}

fn default_datadir() -> PathBuf {
    DEFAULT_DATADIR.into()
}

fn default_genesis_file() -> PathBuf {
    DEFAULT_GENESIS_FILE.into()
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Service label to append to the service name (e.g., "prod", "dev").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_label: Option<String>,

    /// Filter used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Directory path for file-based logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Prefix for log file names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<LogRotation>,

    /// Use JSON format for logs instead of compact format.
    #[serde(default)]
    pub json_format: bool,
}

impl LoggingConfig {
    pub fn service_name(&self) -> String {
        match &self.service_label {
            Some(label) => format!("{SERVICE_NAME}%{label}"),
            None => SERVICE_NAME.to_owned(),
        }
    }

    pub fn to_logger_config(&self) -> LoggerConfig {
        let mut config =
            LoggerConfig::new(self.service_name()).with_json_logging(self.json_format);
        if let Some(filter) = &self.filter {
            config = config.with_default_directive(filter.clone());
        }
        if let Some(dir) = &self.log_dir {
            let prefix = self
                .log_file_prefix
                .clone()
                .unwrap_or_else(|| SERVICE_NAME.to_owned());
            let format = if self.json_format {
                LogFormat::Json
            } else {
                LogFormat::Compact
            };
            let file = FileLoggingConfig::new(dir.clone(), prefix)
                .with_rotation(self.rotation.unwrap_or_default())
                .with_format(format);
            config = config.with_file_logging(file);
        }
        config
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    /// Consensus parameters; anything left out takes the mainnet value.
    #[serde(default)]
    pub chain: ChainParams,

    #[serde(default)]
    pub mempool: MempoolConfig,

    /// Logging configuration (optional section in TOML).
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_overrides(path, &[])
    }

    /// Reads the file at `path` and applies `section.key=value` overrides on
    /// top of it, later ones winning.
    pub fn load_with_overrides(path: &Path, overrides: &[String]) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_with_overrides(&raw, overrides)
    }

    pub fn from_toml_with_overrides(s: &str, overrides: &[String]) -> Result<Self, ConfigError> {
        let mut table: Table = toml::from_str(s)?;
        for o in overrides {
            let (path, value) = parse_override(o)?;
            apply_override(&path, value, &mut table)?;
        }
        Ok(toml::Value::Table(table).try_into()?)
    }
}

#[cfg(test)]
mod test {
    use dexchain_params::constants::{BLOCK_INTERVAL_SEC, MAX_PENDING_QUEUE_SIZE};

    use super::*;

    #[test]
    fn test_config_load() {
        let config_string = r#"
            [client]
            datadir = "/path/to/data/directory"
            genesis = "/etc/dexchain/genesis.json"

            [chain]
            num_delegates = 17
            max_undo_history = 68

            [chain.forks]
            market_v2 = 10

            [mempool]
            max_tx_count = 500

            [logging]
            service_label = "dev"
            log_dir = "/var/log/dexchain"
            rotation = "hourly"
            json_format = true
        "#;

        let config = Config::from_toml_str(config_string).expect("parse config");
        assert_eq!(config.client.datadir, PathBuf::from("/path/to/data/directory"));
        assert_eq!(config.chain.num_delegates, 17);
        assert_eq!(config.chain.block_interval_sec, BLOCK_INTERVAL_SEC);
        assert_eq!(config.chain.market_version_at(10), 2);
        assert_eq!(config.mempool.max_tx_count, 500);

        let logger = config.logging.to_logger_config();
        assert_eq!(logger.service_name, "dexchain-node%dev");
        assert_eq!(logger.stdout_config.format, LogFormat::Json);
        let file = logger.file_logging_config.expect("file logging");
        assert_eq!(file.file_name_prefix, "dexchain-node");
        assert_eq!(file.rotation, LogRotation::Hourly);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").expect("parse empty config");
        assert_eq!(config, Config::default());
        assert_eq!(config.client.genesis, PathBuf::from(DEFAULT_GENESIS_FILE));
        assert_eq!(config.mempool.max_tx_count, MAX_PENDING_QUEUE_SIZE);
        assert!(config.logging.to_logger_config().file_logging_config.is_none());
    }

    #[test]
    fn test_overrides_win() {
        let overrides = vec![
            "client.datadir=/tmp/dx".to_owned(),
            "chain.num_delegates=5".to_owned(),
            "logging.json_format=true".to_owned(),
        ];
        let config = Config::from_toml_with_overrides("[chain]\nnum_delegates = 3", &overrides)
            .expect("apply overrides");
        assert_eq!(config.client.datadir, PathBuf::from("/tmp/dx"));
        assert_eq!(config.chain.num_delegates, 5);
        assert!(config.logging.json_format);

        let bad = Config::from_toml_with_overrides("", &["chain.num_delegates".to_owned()]);
        assert!(matches!(bad, Err(ConfigError::InvalidOverride(_))));
    }

    #[test]
    fn test_bad_config_rejected() {
        let res = Config::from_toml_str("[chain]\nnum_delegates = \"many\"");
        assert!(matches!(res, Err(ConfigError::Parse(_))));
    }
}
