//! Nullable host infrastructure for deterministic testing.
//!
//! The governance engine consumes three things from its host: the caller
//! identity, the current block height, and a native value-transfer
//! primitive. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real host adapters for nullables in tests and replays.

pub mod chain;
pub mod ledger;

pub use chain::NullChain;
pub use ledger::NullLedger;
