//! Vote delegation: entrust voting power to another member.
//!
//! Delegation is single-level: a delegate votes with their own base power
//! plus everything delegated directly to them. Power delegated to a member
//! who has in turn delegated is not forwarded; it simply cannot be
//! exercised until one of the two undelegates.

use crate::error::GovernanceError;
use crate::member::MembershipRegistry;
use concord_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregate power delegated to each delegate.
///
/// For every delegate `D`, `delegated_power(D)` equals the sum of base
/// power over members whose `delegated_to` is `D`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DelegationLedger {
    /// Delegate → total delegated power.
    aggregates: BTreeMap<Address, u128>,
    /// Delegate → set of direct delegators.
    delegators: BTreeMap<Address, BTreeSet<Address>>,
}

impl DelegationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the ledger from the delegation pointers in `registry`.
    pub fn rebuild(registry: &MembershipRegistry) -> Result<Self, GovernanceError> {
        let mut ledger = Self::new();
        for member in registry.iter() {
            if let Some(delegate) = &member.delegated_to {
                ledger.credit(delegate, &member.address, member.voting_power)?;
            }
        }
        Ok(ledger)
    }

    /// Delegate `from`'s vote to `to`, moving it off any prior delegate.
    ///
    /// Both parties must be registered, active members.
    pub fn delegate(
        &mut self,
        registry: &mut MembershipRegistry,
        from: &Address,
        to: &Address,
    ) -> Result<Option<Address>, GovernanceError> {
        let delegator = registry
            .get_active(from)
            .ok_or_else(|| GovernanceError::MemberNotFound(from.clone()))?;
        if registry.get_active(to).is_none() {
            return Err(GovernanceError::MemberNotFound(to.clone()));
        }
        if from == to {
            return Err(GovernanceError::InvalidTarget);
        }
        let power = delegator.voting_power;
        let previous = delegator.delegated_to.clone();

        if let Some(old_to) = &previous {
            self.debit(old_to, from, power)?;
        }
        self.credit(to, from, power)?;
        registry.set_delegate(from, Some(to.clone()))?;
        Ok(previous)
    }

    /// Remove `from`'s delegation. Returns the former delegate.
    pub fn undelegate(
        &mut self,
        registry: &mut MembershipRegistry,
        from: &Address,
    ) -> Result<Address, GovernanceError> {
        let member = registry
            .get(from)
            .ok_or_else(|| GovernanceError::MemberNotFound(from.clone()))?;
        let delegate = member
            .delegated_to
            .clone()
            .ok_or_else(|| GovernanceError::NoDelegation(from.clone()))?;
        self.debit(&delegate, from, member.voting_power)?;
        registry.set_delegate(from, None)?;
        Ok(delegate)
    }

    /// Carry a delegator's base-power change over to their delegate.
    pub fn reweigh(
        &mut self,
        delegate: &Address,
        old_power: u128,
        new_power: u128,
    ) -> Result<(), GovernanceError> {
        let aggregate = self
            .aggregates
            .get_mut(delegate)
            .ok_or_else(|| GovernanceError::NoDelegation(delegate.clone()))?;
        *aggregate = aggregate
            .checked_sub(old_power)
            .and_then(|a| a.checked_add(new_power))
            .ok_or(GovernanceError::Overflow)?;
        Ok(())
    }

    /// Total power delegated to `delegate` (zero if none).
    pub fn delegated_power(&self, delegate: &Address) -> u128 {
        self.aggregates.get(delegate).copied().unwrap_or(0)
    }

    /// Members that directly delegated to `delegate`.
    pub fn delegators(&self, delegate: &Address) -> Vec<&Address> {
        self.delegators
            .get(delegate)
            .map(|s| s.iter().collect())
            .unwrap_or_default()
    }

    /// All delegates with a non-empty delegator set.
    pub fn delegates(&self) -> impl Iterator<Item = (&Address, u128)> {
        self.delegators
            .keys()
            .map(|d| (d, self.delegated_power(d)))
    }

    fn credit(
        &mut self,
        delegate: &Address,
        delegator: &Address,
        power: u128,
    ) -> Result<(), GovernanceError> {
        let aggregate = self.aggregates.entry(delegate.clone()).or_default();
        *aggregate = aggregate
            .checked_add(power)
            .ok_or(GovernanceError::Overflow)?;
        self.delegators
            .entry(delegate.clone())
            .or_default()
            .insert(delegator.clone());
        Ok(())
    }

    fn debit(
        &mut self,
        delegate: &Address,
        delegator: &Address,
        power: u128,
    ) -> Result<(), GovernanceError> {
        let aggregate = self
            .aggregates
            .get_mut(delegate)
            .ok_or_else(|| GovernanceError::NoDelegation(delegator.clone()))?;
        *aggregate = aggregate
            .checked_sub(power)
            .ok_or(GovernanceError::Overflow)?;
        if let Some(set) = self.delegators.get_mut(delegate) {
            set.remove(delegator);
            if set.is_empty() {
                self.delegators.remove(delegate);
                self.aggregates.remove(delegate);
            }
        }
        Ok(())
    }
}
