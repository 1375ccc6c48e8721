//! Error types for initialization and configuration.

use std::{io, path::PathBuf};

use dexchain_config::ConfigError;
use dexchain_consensus_logic::ChainError;
use dexchain_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum InitError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("path is not valid utf-8: {0:?}")]
    InvalidPath(PathBuf),

    #[error("config: {0}")]
    MalformedConfig(#[from] ConfigError),

    #[error("unparsable genesis file: {0}")]
    UnparsableGenesis(#[source] serde_json::Error),

    #[error("unparsable block on line {line}: {source}")]
    UnparsableBlock {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("db: {0}")]
    Db(#[from] DbError),

    #[error("chain: {0}")]
    Chain(#[from] ChainError),
}
