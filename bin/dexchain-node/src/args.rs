//! CLI argument parsing.

use std::path::{Path, PathBuf};

use argh::FromArgs;

use crate::errors::InitError;

#[derive(Clone, Debug, FromArgs)]
#[argh(description = "dexchain ledger node")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    pub(crate) config: PathBuf,

    /// Data directory path that will override the path in the config toml.
    #[argh(
        option,
        short = 'd',
        description = "datadir path used mainly for databases"
    )]
    pub(crate) datadir: Option<PathBuf>,

    /// Genesis file that will override the one in the config toml.
    #[argh(option, short = 'g', description = "genesis json")]
    pub(crate) genesis: Option<PathBuf>,

    /// Blocks to import, one JSON encoded block per line.
    #[argh(option, short = 'i', description = "file of blocks to import")]
    pub(crate) import: Option<PathBuf>,

    /// Other generic overrides to the config toml.
    /// Will be used, for example, as `-o chain.num_delegates=17 -o mempool.max_tx_count=500`
    #[argh(option, short = 'o', description = "generic config overrides")]
    pub(crate) overrides: Vec<String>,
}

impl Args {
    /// Get strings of overrides gathered from user and internal attributes.
    pub(crate) fn get_all_overrides(&self) -> Result<Vec<String>, InitError> {
        let mut overrides = self.overrides.clone();
        if let Some(datadir) = &self.datadir {
            overrides.push(format!("client.datadir={}", path_str(datadir)?));
        }
        if let Some(genesis) = &self.genesis {
            overrides.push(format!("client.genesis={}", path_str(genesis)?));
        }
        Ok(overrides)
    }
}

fn path_str(path: &Path) -> Result<&str, InitError> {
    path.to_str()
        .ok_or_else(|| InitError::InvalidPath(path.to_path_buf()))
}
