//! Nullable chain: deterministic block clock for testing.

use concord_types::{Address, BlockHeight, RequestContext};
use std::cell::Cell;

/// A deterministic block counter.
///
/// Height only advances when you tell it to.
pub struct NullChain {
    current: Cell<u64>,
}

impl NullChain {
    pub fn new(initial_height: u64) -> Self {
        Self {
            current: Cell::new(initial_height),
        }
    }

    /// Get the current height.
    pub fn height(&self) -> BlockHeight {
        BlockHeight::new(self.current.get())
    }

    /// Advance by a number of blocks, stopping at `u64::MAX`.
    pub fn advance(&self, blocks: u64) {
        self.current.set(self.current.get().saturating_add(blocks));
    }

    /// Jump to a specific height.
    pub fn set(&self, height: u64) {
        self.current.set(height);
    }

    /// Build a request context for `caller` at the current height.
    pub fn ctx(&self, caller: impl Into<Address>) -> RequestContext {
        RequestContext::new(caller, self.height())
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_height() {
        let chain = NullChain::new(10);
        chain.advance(5);
        assert_eq!(chain.height(), BlockHeight::new(15));
        chain.set(3);
        assert_eq!(chain.ctx("alice").block, BlockHeight::new(3));
    }

    #[test]
    fn advance_saturates_at_max_height() {
        let chain = NullChain::new(10);
        chain.advance(u64::MAX);
        assert_eq!(chain.height(), BlockHeight::new(u64::MAX));
        chain.advance(1);
        assert_eq!(chain.height(), BlockHeight::new(u64::MAX));
    }
}
