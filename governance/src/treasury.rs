//! Treasury: the balance disbursable by funding proposals.

use crate::error::GovernanceError;
use serde::{Deserialize, Serialize};

/// Engine-held balances.
///
/// The native value behind `balance` and `forfeited_deposits` sits in the
/// engine's own account on the host ledger, together with the deposits of
/// proposals that are still open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    balance: u128,
    forfeited_deposits: u128,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> u128 {
        self.balance
    }

    /// Deposits of rejected proposals, kept locked in the engine account.
    pub fn forfeited_deposits(&self) -> u128 {
        self.forfeited_deposits
    }

    pub fn credit(&mut self, amount: u128) -> Result<(), GovernanceError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(GovernanceError::Overflow)?;
        Ok(())
    }

    /// Take `amount` out; the balance never goes negative.
    pub fn debit(&mut self, amount: u128) -> Result<(), GovernanceError> {
        if amount > self.balance {
            return Err(GovernanceError::invalid(format!(
                "treasury holds {}, proposal needs {}",
                self.balance, amount
            )));
        }
        self.balance -= amount;
        Ok(())
    }

    pub(crate) fn lock_forfeit(&mut self, amount: u128) -> Result<(), GovernanceError> {
        self.forfeited_deposits = self
            .forfeited_deposits
            .checked_add(amount)
            .ok_or(GovernanceError::Overflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_beyond_balance_fails_without_change() {
        let mut treasury = Treasury::new();
        treasury.credit(100).unwrap();
        assert!(matches!(
            treasury.debit(101),
            Err(GovernanceError::InvalidProposal(_))
        ));
        assert_eq!(treasury.balance(), 100);
        treasury.debit(100).unwrap();
        assert_eq!(treasury.balance(), 0);
    }

    #[test]
    fn forfeits_do_not_touch_balance() {
        let mut treasury = Treasury::new();
        treasury.lock_forfeit(7).unwrap();
        assert_eq!(treasury.forfeited_deposits(), 7);
        assert_eq!(treasury.balance(), 0);
    }
}
