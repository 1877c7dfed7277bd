//! Native value-transfer primitive supplied by the host.

use crate::address::Address;
use thiserror::Error;

/// Errors reported by a [`NativeLedger`] transfer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("account {account} has {available}, needs {needed}")]
    InsufficientFunds {
        account: Address,
        needed: u128,
        available: u128,
    },

    #[error("transfer to {0} was rejected")]
    Rejected(Address),

    #[error("balance overflow on {0}")]
    Overflow(Address),
}

/// Moves native value between accounts.
///
/// Implementations must leave balances untouched when returning an error.
/// Engines that need all-or-nothing semantics across several transfers
/// work on a clone and keep it only if every step succeeds, hence `Clone`.
pub trait NativeLedger: Clone {
    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError>;

    /// Current balance of `account`.
    fn balance_of(&self, account: &Address) -> u128;
}
