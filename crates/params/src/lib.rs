//! Consensus parameters: constants, per-network tunables, the market fork
//! schedule and the genesis description.

pub mod constants;

mod chain;
mod genesis;

pub use chain::{ChainParams, ForkSchedule, MarketVersion};
pub use genesis::{
    GenesisAsset, GenesisBalance, GenesisConfig, GenesisDelegate, GenesisError,
};
