use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Seconds since the UNIX epoch.  Block times are aligned to the block
/// interval, so 32 bits are plenty and keep records small.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u32);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);
    pub const MAX: Timestamp = Timestamp(u32::MAX);

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn secs(&self) -> u32 {
        self.0
    }

    pub fn saturating_add_secs(&self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn saturating_sub_secs(&self, secs: u32) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn secs_since(&self, earlier: Timestamp) -> u32 {
        self.0.saturating_sub(earlier.0)
    }

    /// Rounds down to a multiple of `interval`.
    pub fn align_down(&self, interval: u32) -> Self {
        if interval == 0 {
            return *self;
        }
        Self(self.0 - self.0 % interval)
    }

    pub fn is_aligned(&self, interval: u32) -> bool {
        interval != 0 && self.0 % interval == 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        let t = Timestamp::from_secs(1234);
        assert_eq!(t.align_down(10), Timestamp::from_secs(1230));
        assert!(!t.is_aligned(10));
        assert!(Timestamp::from_secs(1230).is_aligned(10));
        assert_eq!(t.align_down(0), t);
    }

    #[test]
    fn test_secs_since_saturates() {
        let a = Timestamp::from_secs(100);
        let b = Timestamp::from_secs(150);
        assert_eq!(b.secs_since(a), 50);
        assert_eq!(a.secs_since(b), 0);
    }
}
