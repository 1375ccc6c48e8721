use dexchain_params::{
    constants::{MARGIN_CALL_FEE_BPS, MAX_SHORT_PERIOD_SEC, MINIMUM_SHORT_ORDER_SIZE},
    MarketVersion,
};
use dexchain_primitives::amount::Amount;

/// Highest price a short is allowed to execute at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShortPriceCap {
    /// Trailing center price of the market.
    CenterPrice,

    /// Feed price scaled by `num / den`.
    FeedMultiple { num: u128, den: u128 },

    /// Shorts execute at the feed price, bounded by their own limit.
    Feed,
}

/// Rules of one market engine generation.  Every historical generation is a
/// constant below, selected by block height.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MarketRuleset {
    pub version: MarketVersion,

    /// Share of the collateral counted when computing the call price, as
    /// `(num, den)`.
    pub collateral_ratio: (u128, u128),

    pub short_cap: ShortPriceCap,

    /// Whether positions accrue interest at their APR.
    pub charges_interest: bool,

    /// Positions expire and get called after this long.
    pub short_period_sec: Option<u32>,

    /// Shorts with less escrow than this are cancelled.  Zero disables.
    pub min_short_order: Amount,

    /// Fee on collateral returned after a margin call, in basis points.
    pub margin_call_fee_bps: u32,
}

impl MarketRuleset {
    /// Margin call triggers use the best bid instead of a feed.
    pub fn calls_against_bid(&self) -> bool {
        matches!(self.short_cap, ShortPriceCap::CenterPrice)
    }

    pub fn uses_feed(&self) -> bool {
        !self.calls_against_bid()
    }
}

pub const MARKET_V1: MarketRuleset = MarketRuleset {
    version: 1,
    collateral_ratio: (3, 4),
    short_cap: ShortPriceCap::CenterPrice,
    charges_interest: false,
    short_period_sec: None,
    min_short_order: 0,
    margin_call_fee_bps: 0,
};

pub const MARKET_V2: MarketRuleset = MarketRuleset {
    version: 2,
    short_cap: ShortPriceCap::FeedMultiple { num: 10, den: 9 },
    ..MARKET_V1
};

pub const MARKET_V3: MarketRuleset = MarketRuleset {
    version: 3,
    collateral_ratio: (2, 3),
    short_cap: ShortPriceCap::FeedMultiple { num: 4, den: 3 },
    ..MARKET_V2
};

pub const MARKET_V4: MarketRuleset = MarketRuleset {
    version: 4,
    short_cap: ShortPriceCap::Feed,
    charges_interest: true,
    ..MARKET_V3
};

pub const MARKET_V5: MarketRuleset = MarketRuleset {
    version: 5,
    short_period_sec: Some(MAX_SHORT_PERIOD_SEC),
    ..MARKET_V4
};

pub const MARKET_V6: MarketRuleset = MarketRuleset {
    version: 6,
    min_short_order: MINIMUM_SHORT_ORDER_SIZE,
    ..MARKET_V5
};

pub const MARKET_V7: MarketRuleset = MarketRuleset {
    version: 7,
    margin_call_fee_bps: MARGIN_CALL_FEE_BPS,
    ..MARKET_V6
};

/// Ruleset of a generation.  Out of range versions clamp to the nearest one.
pub fn ruleset_for_version(version: MarketVersion) -> &'static MarketRuleset {
    match version {
        0 | 1 => &MARKET_V1,
        2 => &MARKET_V2,
        3 => &MARKET_V3,
        4 => &MARKET_V4,
        5 => &MARKET_V5,
        6 => &MARKET_V6,
        _ => &MARKET_V7,
    }
}

#[cfg(test)]
mod tests {
    use dexchain_params::ForkSchedule;

    use super::*;

    #[test]
    fn test_rulesets_tighten_monotonically() {
        let all: Vec<_> = (1..=7).map(ruleset_for_version).collect();
        for (i, rs) in all.iter().enumerate() {
            assert_eq!(rs.version as usize, i + 1);
        }
        assert_eq!(all[1].collateral_ratio, (3, 4));
        assert_eq!(all[2].collateral_ratio, (2, 3));
        assert!(!all[2].charges_interest);
        assert!(all[3].charges_interest);
        assert_eq!(all[3].short_period_sec, None);
        assert_eq!(all[4].short_period_sec, Some(MAX_SHORT_PERIOD_SEC));
        assert_eq!(all[4].min_short_order, 0);
        assert_eq!(all[5].min_short_order, MINIMUM_SHORT_ORDER_SIZE);
        assert_eq!(all[5].margin_call_fee_bps, 0);
        assert_eq!(all[6].margin_call_fee_bps, MARGIN_CALL_FEE_BPS);
    }

    #[test]
    fn test_selection_by_height() {
        let forks = ForkSchedule::default();
        let at = |h| ruleset_for_version(forks.market_version_at(h)).version;
        assert_eq!(at(1), 1);
        assert_eq!(at(forks.market_v2 - 1), 1);
        assert_eq!(at(forks.market_v2), 2);
        assert_eq!(at(forks.market_v7), 7);
        assert!(ruleset_for_version(1).calls_against_bid());
        assert!(ruleset_for_version(2).uses_feed());
    }
}
