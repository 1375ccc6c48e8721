//! Dexchain node binary entrypoint.

use anyhow::{anyhow, Result};
use argh::from_env;
use dexchain_common::logging;
use tracing::*;

use crate::args::Args;

mod args;
mod context;
mod errors;
mod import;

fn main() -> Result<()> {
    let args: Args = from_env();

    // Load config early to initialize logging with config settings
    let config =
        context::load_config(&args).map_err(|e| anyhow!("Failed to load configuration: {e}"))?;
    logging::init(config.logging.to_logger_config())?;

    let mut chain = context::init_chain(&config)
        .map_err(|e| anyhow!("Failed to initialize chain: {e}"))?;

    if let Some(path) = &args.import {
        let summary = import::import_blocks(&mut chain, path)?;
        info!(accepted = summary.accepted, rejected = summary.rejected, "import finished");
    }

    let head = chain.head();
    info!(
        head = %head.id,
        block_num = %head.block_num,
        timestamp = %head.timestamp,
        pending = chain.pool().len(),
        "chain ready"
    );
    Ok(())
}
