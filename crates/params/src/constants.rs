//! Consensus constants.  Anything that nodes must agree on and that is not
//! tunable per network lives here.

use dexchain_primitives::amount::Amount;

/// Base asset precision, one whole coin in share units.
pub const PRECISION: Amount = 100_000;

pub const BLOCK_INTERVAL_SEC: u32 = 10;
pub const NUM_DELEGATES: u32 = 101;
pub const MAX_UNDO_HISTORY: u32 = NUM_DELEGATES * 4;

pub const MAX_TRANSACTION_EXPIRATION_SEC: u32 = 60 * 60 * 24 * 2;

/// Upper bound for any asset's supply.
pub const MAX_SHARES: Amount = 1_000_000_000_000_000;

pub const MIN_NAME_SIZE: usize = 1;
pub const MAX_NAME_SIZE: usize = 63;
pub const MAX_NAME_DATA_SIZE: usize = 64 * 1024;
pub const MIN_SYMBOL_SIZE: usize = 3;
pub const MAX_SYMBOL_SIZE: usize = 5;
pub const MAX_ASSET_NAME_SIZE: usize = 127;
pub const MAX_ASSET_DESCRIPTION_SIZE: usize = 1024;
pub const MAX_BURN_MESSAGE_SIZE: usize = 128;

pub const BLOCKS_PER_HOUR: u32 = 60 * 60 / BLOCK_INTERVAL_SEC;
pub const BLOCKS_PER_DAY: u32 = BLOCKS_PER_HOUR * 24;
pub const BLOCKS_PER_YEAR: u32 = BLOCKS_PER_DAY * 365;

pub const SECONDS_PER_HOUR: u32 = 60 * 60;
pub const SECONDS_PER_DAY: u32 = SECONDS_PER_HOUR * 24;
pub const SECONDS_PER_YEAR: u32 = SECONDS_PER_DAY * 365;

pub const DELEGATE_REGISTRATION_FEE: Amount = BLOCKS_PER_DAY as Amount / 12;
pub const ASSET_REGISTRATION_FEE: Amount = BLOCKS_PER_DAY as Amount * 14;

/// Relay fee per kilobyte of serialized transaction.
pub const DEFAULT_FEE_RATE: Amount = 10_000;

pub const MAX_SLATE_SIZE: usize = NUM_DELEGATES as usize;

/// Feeds required before a market-issued asset's median price is trusted.
pub const MIN_FEEDS: u32 = NUM_DELEGATES / 2 + 1;

/// Feeds older than this no longer count toward the median.
pub const MAX_FEED_AGE_SEC: u32 = SECONDS_PER_DAY;

pub const MAX_SHORT_PERIOD_SEC: u32 = 30 * SECONDS_PER_DAY;
pub const MINIMUM_SHORT_ORDER_SIZE: Amount = PRECISION * 100;

/// Largest interest rate a short may ask for, in basis points per year.
pub const MAX_SHORT_APR_BPS: u32 = 5_000;

/// Share of the returned collateral kept by the network on a margin call, in
/// basis points.
pub const MARGIN_CALL_FEE_BPS: u32 = 500;

pub const INITIAL_BLOCK_REWARD: Amount = 50 * PRECISION;
pub const REWARD_HALVING_INTERVAL: u32 = BLOCKS_PER_YEAR;

pub const MAX_BLOCK_SIZE: usize = 512 * 1024;
pub const MAX_PENDING_QUEUE_SIZE: usize = 10_000;

pub const RECENT_OPERATIONS_LEN: usize = 20;

/// Default market engine activation heights.
pub const MARKET_V2_FORK_HEIGHT: u32 = 274_000;
pub const MARKET_V3_FORK_HEIGHT: u32 = 316_001;
pub const MARKET_V4_FORK_HEIGHT: u32 = 340_000;
pub const MARKET_V5_FORK_HEIGHT: u32 = 357_000;
pub const MARKET_V6_FORK_HEIGHT: u32 = 400_000;
pub const MARKET_V7_FORK_HEIGHT: u32 = 431_000;
