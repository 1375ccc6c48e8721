//! Order matching for the on-chain exchange.
//!
//! One [`MarketEngine`] run per dirty market per block, parameterized by the
//! [`MarketRuleset`] in force at the block height.

mod collateral;
mod engine;
mod errors;
mod feed;
mod history;
mod interest;
mod ruleset;

pub use collateral::{call_price, rekey_collateral};
pub use engine::{execute_dirty_markets, MarketEngine};
pub use errors::{MarketError, MarketResult};
pub use feed::active_feed_price;
pub use interest::{interest_owed, interest_paid};
pub use ruleset::{ruleset_for_version, MarketRuleset, ShortPriceCap};
