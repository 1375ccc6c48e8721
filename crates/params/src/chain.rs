use dexchain_primitives::amount::Amount;
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Market engine rule generation, 1 through 7.
pub type MarketVersion = u8;

/// Block heights at which each market engine generation activates.  Blocks
/// below `market_v2` run the first generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkSchedule {
    #[serde(default = "default_v2")]
    pub market_v2: u32,
    #[serde(default = "default_v3")]
    pub market_v3: u32,
    #[serde(default = "default_v4")]
    pub market_v4: u32,
    #[serde(default = "default_v5")]
    pub market_v5: u32,
    #[serde(default = "default_v6")]
    pub market_v6: u32,
    #[serde(default = "default_v7")]
    pub market_v7: u32,
}

fn default_v2() -> u32 {
    MARKET_V2_FORK_HEIGHT
}

fn default_v3() -> u32 {
    MARKET_V3_FORK_HEIGHT
}

fn default_v4() -> u32 {
    MARKET_V4_FORK_HEIGHT
}

fn default_v5() -> u32 {
    MARKET_V5_FORK_HEIGHT
}

fn default_v6() -> u32 {
    MARKET_V6_FORK_HEIGHT
}

fn default_v7() -> u32 {
    MARKET_V7_FORK_HEIGHT
}

impl Default for ForkSchedule {
    fn default() -> Self {
        Self {
            market_v2: default_v2(),
            market_v3: default_v3(),
            market_v4: default_v4(),
            market_v5: default_v5(),
            market_v6: default_v6(),
            market_v7: default_v7(),
        }
    }
}

impl ForkSchedule {
    /// Schedule where `version` is active from the first block.  Later
    /// generations never activate.
    pub fn fixed(version: MarketVersion) -> Self {
        let at = |v: MarketVersion| if v <= version { 0 } else { u32::MAX };
        Self {
            market_v2: at(2),
            market_v3: at(3),
            market_v4: at(4),
            market_v5: at(5),
            market_v6: at(6),
            market_v7: at(7),
        }
    }

    /// Market engine generation used when applying block `height`.
    pub fn market_version_at(&self, height: u32) -> MarketVersion {
        let steps = [
            (self.market_v7, 7),
            (self.market_v6, 6),
            (self.market_v5, 5),
            (self.market_v4, 4),
            (self.market_v3, 3),
            (self.market_v2, 2),
        ];
        steps
            .into_iter()
            .find(|(h, _)| height >= *h)
            .map(|(_, v)| v)
            .unwrap_or(1)
    }
}

/// Per network tunables.  Everything defaults to the mainnet constants so a
/// TOML file only has to list what it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    #[serde(default = "default_block_interval")]
    pub block_interval_sec: u32,
    #[serde(default = "default_num_delegates")]
    pub num_delegates: u32,
    #[serde(default = "default_max_undo_history")]
    pub max_undo_history: u32,
    #[serde(default = "default_max_expiration")]
    pub max_transaction_expiration_sec: u32,
    #[serde(default = "default_delegate_fee")]
    pub delegate_registration_fee: Amount,
    #[serde(default = "default_asset_fee")]
    pub asset_registration_fee: Amount,
    /// Initial fee rate per kilobyte, stored as a chain property at genesis.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Amount,
    #[serde(default = "default_min_feeds")]
    pub min_feeds: u32,
    #[serde(default = "default_initial_reward")]
    pub initial_block_reward: Amount,
    #[serde(default = "default_halving")]
    pub reward_halving_interval: u32,
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,
    #[serde(default)]
    pub forks: ForkSchedule,
}

fn default_block_interval() -> u32 {
    BLOCK_INTERVAL_SEC
}

fn default_num_delegates() -> u32 {
    NUM_DELEGATES
}

fn default_max_undo_history() -> u32 {
    MAX_UNDO_HISTORY
}

fn default_max_expiration() -> u32 {
    MAX_TRANSACTION_EXPIRATION_SEC
}

fn default_delegate_fee() -> Amount {
    DELEGATE_REGISTRATION_FEE
}

fn default_asset_fee() -> Amount {
    ASSET_REGISTRATION_FEE
}

fn default_fee_rate() -> Amount {
    DEFAULT_FEE_RATE
}

fn default_min_feeds() -> u32 {
    MIN_FEEDS
}

fn default_initial_reward() -> Amount {
    INITIAL_BLOCK_REWARD
}

fn default_halving() -> u32 {
    REWARD_HALVING_INTERVAL
}

fn default_max_block_size() -> usize {
    MAX_BLOCK_SIZE
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            block_interval_sec: default_block_interval(),
            num_delegates: default_num_delegates(),
            max_undo_history: default_max_undo_history(),
            max_transaction_expiration_sec: default_max_expiration(),
            delegate_registration_fee: default_delegate_fee(),
            asset_registration_fee: default_asset_fee(),
            fee_rate: default_fee_rate(),
            min_feeds: default_min_feeds(),
            initial_block_reward: default_initial_reward(),
            reward_halving_interval: default_halving(),
            max_block_size: default_max_block_size(),
            forks: ForkSchedule::default(),
        }
    }
}

impl ChainParams {
    pub fn blocks_per_hour(&self) -> u32 {
        (SECONDS_PER_HOUR / self.block_interval_sec.max(1)).max(1)
    }

    /// Block reward before the delegate's pay rate is applied.
    pub fn block_reward(&self, block_num: u32) -> Amount {
        let halvings = block_num / self.reward_halving_interval.max(1);
        if halvings >= 63 {
            return 0;
        }
        self.initial_block_reward >> halvings
    }

    pub fn market_version_at(&self, height: u32) -> MarketVersion {
        self.forks.market_version_at(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_version_at_default_schedule() {
        let forks = ForkSchedule::default();
        assert_eq!(forks.market_version_at(0), 1);
        assert_eq!(forks.market_version_at(MARKET_V2_FORK_HEIGHT - 1), 1);
        assert_eq!(forks.market_version_at(MARKET_V2_FORK_HEIGHT), 2);
        assert_eq!(forks.market_version_at(MARKET_V3_FORK_HEIGHT), 3);
        assert_eq!(forks.market_version_at(MARKET_V5_FORK_HEIGHT + 10), 5);
        assert_eq!(forks.market_version_at(u32::MAX), 7);
    }

    #[test]
    fn test_fixed_schedule() {
        for v in 1..=7 {
            let forks = ForkSchedule::fixed(v);
            assert_eq!(forks.market_version_at(0), v);
            assert_eq!(forks.market_version_at(1_000_000), v);
        }
    }

    #[test]
    fn test_block_reward_halving() {
        let params = ChainParams {
            initial_block_reward: 1000,
            reward_halving_interval: 10,
            ..Default::default()
        };
        assert_eq!(params.block_reward(0), 1000);
        assert_eq!(params.block_reward(9), 1000);
        assert_eq!(params.block_reward(10), 500);
        assert_eq!(params.block_reward(25), 250);
        assert_eq!(params.block_reward(u32::MAX), 0);
    }

    #[test]
    fn test_params_from_partial_toml() {
        let params: ChainParams = toml::from_str(
            r#"
            block_interval_sec = 5
            fee_rate = 1

            [forks]
            market_v2 = 100
            "#,
        )
        .expect("parse params");
        assert_eq!(params.block_interval_sec, 5);
        assert_eq!(params.fee_rate, 1);
        assert_eq!(params.num_delegates, NUM_DELEGATES);
        assert_eq!(params.forks.market_v2, 100);
        assert_eq!(params.forks.market_v3, MARKET_V3_FORK_HEIGHT);
        assert_eq!(params.blocks_per_hour(), 720);
    }
}
