//! Membership registry: who may govern and with how much weight.

use crate::error::GovernanceError;
use concord_types::{Address, BlockHeight};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A governing member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub address: Address,
    /// Base voting power, excluding anything delegated to this member.
    pub voting_power: u128,
    pub joined_at: BlockHeight,
    /// The member currently exercising this member's vote, if any.
    pub delegated_to: Option<Address>,
    pub is_active: bool,
}

/// Registry of members keyed by address, plus the running power total.
///
/// `total_voting_power` is maintained incrementally and always equals the
/// sum of `voting_power` over active members.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MembershipRegistry {
    members: BTreeMap<Address, Member>,
    total_voting_power: u128,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new active, undelegated member.
    pub fn add(
        &mut self,
        address: Address,
        power: u128,
        joined_at: BlockHeight,
    ) -> Result<&Member, GovernanceError> {
        if self.members.contains_key(&address) {
            return Err(GovernanceError::MemberExists(address));
        }
        if power == 0 {
            return Err(GovernanceError::InvalidPower);
        }
        self.total_voting_power = self
            .total_voting_power
            .checked_add(power)
            .ok_or(GovernanceError::Overflow)?;
        let member = Member {
            address: address.clone(),
            voting_power: power,
            joined_at,
            delegated_to: None,
            is_active: true,
        };
        Ok(self.members.entry(address).or_insert(member))
    }

    /// Replace a member's base power. Returns the previous power.
    pub fn set_power(
        &mut self,
        address: &Address,
        new_power: u128,
    ) -> Result<u128, GovernanceError> {
        let member = self
            .members
            .get_mut(address)
            .ok_or_else(|| GovernanceError::MemberNotFound(address.clone()))?;
        let old_power = member.voting_power;
        if member.is_active {
            self.total_voting_power = self
                .total_voting_power
                .checked_sub(old_power)
                .and_then(|t| t.checked_add(new_power))
                .ok_or(GovernanceError::Overflow)?;
        }
        member.voting_power = new_power;
        Ok(old_power)
    }

    /// Point `address`'s delegation at `delegate` (or clear it).
    pub(crate) fn set_delegate(
        &mut self,
        address: &Address,
        delegate: Option<Address>,
    ) -> Result<(), GovernanceError> {
        let member = self
            .members
            .get_mut(address)
            .ok_or_else(|| GovernanceError::MemberNotFound(address.clone()))?;
        member.delegated_to = delegate;
        Ok(())
    }

    pub fn get(&self, address: &Address) -> Option<&Member> {
        self.members.get(address)
    }

    /// Look up a member that is registered and active.
    pub fn get_active(&self, address: &Address) -> Option<&Member> {
        self.members.get(address).filter(|m| m.is_active)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.members.contains_key(address)
    }

    pub fn total_voting_power(&self) -> u128 {
        self.total_voting_power
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// All members in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Sum of active members' power computed by a full scan.
    pub fn recount_voting_power(&self) -> Option<u128> {
        self.members
            .values()
            .filter(|m| m.is_active)
            .try_fold(0u128, |acc, m| acc.checked_add(m.voting_power))
    }
}
