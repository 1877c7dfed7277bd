//! Block height: the logical clock supplied by the host ledger.
//!
//! Heights only ever grow. Every "wait" in the engine (voting windows,
//! timelocks) is a comparison against the height of the current call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A block height.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// The genesis height.
    pub const GENESIS: Self = Self(0);

    pub fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The height `blocks` after this one, saturating at `u64::MAX`.
    pub fn saturating_add(self, blocks: u64) -> Self {
        Self(self.0.saturating_add(blocks))
    }

    /// Blocks elapsed since this height (relative to `now`), zero if `now` is earlier.
    pub fn elapsed_since(&self, now: BlockHeight) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether `now` is at or past this height.
    pub fn is_reached(&self, now: BlockHeight) -> bool {
        now >= *self
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for BlockHeight {
    fn from(height: u64) -> Self {
        Self(height)
    }
}
