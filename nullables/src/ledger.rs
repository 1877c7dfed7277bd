//! Nullable ledger: in-memory native balances.

use concord_types::{Address, LedgerError, NativeLedger};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// An in-memory implementation of [`NativeLedger`].
///
/// Accounts can be marked as rejecting incoming transfers to exercise
/// rollback paths.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NullLedger {
    balances: BTreeMap<Address, u128>,
    rejecting: BTreeSet<Address>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style funding for test setup.
    pub fn with_balance(mut self, account: impl Into<Address>, amount: u128) -> Self {
        self.fund(account, amount);
        self
    }

    /// Mint `amount` into `account` out of thin air.
    pub fn fund(&mut self, account: impl Into<Address>, amount: u128) {
        let entry = self.balances.entry(account.into()).or_default();
        *entry = entry.saturating_add(amount);
    }

    /// Make every future transfer into `account` fail.
    pub fn reject_incoming(&mut self, account: impl Into<Address>) {
        self.rejecting.insert(account.into());
    }

    /// Accept transfers into `account` again.
    pub fn accept_incoming(&mut self, account: &Address) {
        self.rejecting.remove(account);
    }

    /// All non-zero balances.
    pub fn balances(&self) -> &BTreeMap<Address, u128> {
        &self.balances
    }

    /// Sum of every balance; constant across transfers.
    pub fn total_supply(&self) -> u128 {
        self.balances.values().sum()
    }
}

impl NativeLedger for NullLedger {
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError> {
        if self.rejecting.contains(to) {
            return Err(LedgerError::Rejected(to.clone()));
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from.clone(),
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.clone()))?;
        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        self.balances.retain(|_, balance| *balance > 0);
        Ok(())
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_moves_value() {
        let mut ledger = NullLedger::new().with_balance("alice", 100);
        ledger
            .transfer(&"alice".into(), &"bob".into(), 40)
            .unwrap();
        assert_eq!(ledger.balance_of(&"alice".into()), 60);
        assert_eq!(ledger.balance_of(&"bob".into()), 40);
        assert_eq!(ledger.total_supply(), 100);
    }

    #[test]
    fn insufficient_funds_leaves_balances_untouched() {
        let mut ledger = NullLedger::new().with_balance("alice", 10);
        let err = ledger
            .transfer(&"alice".into(), &"bob".into(), 11)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: "alice".into(),
                needed: 11,
                available: 10,
            }
        );
        assert_eq!(ledger.balance_of(&"alice".into()), 10);
        assert_eq!(ledger.balance_of(&"bob".into()), 0);
    }

    #[test]
    fn rejecting_account_refuses_transfer() {
        let mut ledger = NullLedger::new().with_balance("alice", 10);
        ledger.reject_incoming("bob");
        assert!(matches!(
            ledger.transfer(&"alice".into(), &"bob".into(), 1),
            Err(LedgerError::Rejected(_))
        ));
        ledger.accept_incoming(&"bob".into());
        assert!(ledger.transfer(&"alice".into(), &"bob".into(), 1).is_ok());
    }
}
