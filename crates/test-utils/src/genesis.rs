use dexchain_params::{
    constants::PRECISION, GenesisAsset, GenesisBalance, GenesisConfig, GenesisDelegate,
};
use dexchain_primitives::time::Timestamp;

use crate::keys::{address, public};

pub const GENESIS_TIME: Timestamp = Timestamp::from_secs(1_400_000_000);

/// Genesis with `delegates` delegates named `init0..`, owned by test keys
/// `1..=delegates`, each also holding a funded balance.  Keys above
/// `delegates` are free for the test to use.
pub fn test_genesis(delegates: u8) -> GenesisConfig {
    GenesisConfig {
        timestamp: GENESIS_TIME,
        base_asset: GenesisAsset {
            symbol: "DXC".to_owned(),
            name: "Test shares".to_owned(),
            description: String::new(),
            precision: PRECISION,
        },
        delegates: (1..=delegates)
            .map(|n| GenesisDelegate {
                name: format!("init{}", n - 1),
                owner: public(n),
                pay_rate: 100,
            })
            .collect(),
        balances: (1..=delegates)
            .map(|n| GenesisBalance {
                owner: address(n),
                amount: 1_000_000 * PRECISION,
            })
            .collect(),
        market_assets: vec![GenesisAsset {
            symbol: "USD".to_owned(),
            name: "Test dollars".to_owned(),
            description: String::new(),
            precision: PRECISION,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_valid() {
        let g = test_genesis(5);
        g.validate(10).unwrap();
        assert_eq!(g.delegates.len(), 5);
        assert_eq!(g.chain_id(), test_genesis(5).chain_id());
    }
}
