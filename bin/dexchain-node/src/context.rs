//! Node context initialization and configuration loading.

use std::{fs, path::Path, sync::Arc};

use dexchain_config::Config;
use dexchain_consensus_logic::{ChainDatabase, SystemClock};
use dexchain_db::SledBlockDb;
use dexchain_params::GenesisConfig;
use tracing::*;

use crate::{args::Args, errors::InitError};

pub(crate) type NodeChain = ChainDatabase<SledBlockDb, SystemClock>;

/// Loads the config toml, with command line overrides applied on top.
pub(crate) fn load_config(args: &Args) -> Result<Config, InitError> {
    let overrides = args.get_all_overrides()?;
    Ok(Config::load_with_overrides(&args.config, &overrides)?)
}

pub(crate) fn load_genesis(path: &Path) -> Result<GenesisConfig, InitError> {
    let raw = fs::read_to_string(path)?;
    GenesisConfig::from_json(&raw).map_err(InitError::UnparsableGenesis)
}

/// Opens the block database under the datadir and rebuilds the ledger from
/// the main chain it holds.
pub(crate) fn init_chain(config: &Config) -> Result<NodeChain, InitError> {
    let genesis = load_genesis(&config.client.genesis)?;
    info!(chain_id = %genesis.chain_id(), "loaded genesis");

    fs::create_dir_all(&config.client.datadir)?;
    let db = SledBlockDb::open(&config.client.datadir.join("blocks"))?;

    let chain = ChainDatabase::open(
        Arc::new(db),
        &genesis,
        config.chain.clone(),
        config.mempool.clone(),
        Arc::new(SystemClock),
    )?;
    Ok(chain)
}
