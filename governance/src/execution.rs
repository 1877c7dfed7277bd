//! Finalization and timelocked, type-dispatched execution.

use crate::error::GovernanceError;
use crate::event::GovernanceEvent;
use crate::params::GovernableParam;
use crate::proposal::{ProposalKind, ProposalState};
use crate::state::GovernanceState;
use crate::tally::{self, TallyResult};
use concord_types::{Address, BlockHeight, NativeLedger, ProposalId, RequestContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// A passed proposal waiting out its timelock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub ready_at: BlockHeight,
}

/// Passed proposals keyed by id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionQueue {
    entries: BTreeMap<ProposalId, QueueEntry>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&mut self, id: ProposalId, ready_at: BlockHeight) {
        self.entries.insert(id, QueueEntry { ready_at });
    }

    pub(crate) fn remove(&mut self, id: ProposalId) -> Option<QueueEntry> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: ProposalId) -> Option<&QueueEntry> {
        self.entries.get(&id)
    }

    /// Entries whose timelock has elapsed at `now`.
    pub fn ready(&self, now: BlockHeight) -> Vec<ProposalId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.ready_at.is_reached(now))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Queued proposal ids in order.
    pub fn ids(&self) -> impl Iterator<Item = ProposalId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What [`GovernanceState::execute`] changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionEffect {
    Disbursed { recipient: Address, amount: u128 },
    ParameterSet { param: GovernableParam, old_value: u128, new_value: u128 },
    UnknownParameter { name: String },
    MemberAdded { member: Address, power: u128 },
    MemberReweighed { member: Address, old_power: u128, new_power: u128 },
    None,
}

impl GovernanceState {
    /// Evaluate the current tally of `id` against the live thresholds.
    pub fn tally(&self, id: ProposalId) -> Result<TallyResult, GovernanceError> {
        let proposal = self.proposals.get(id)?;
        Ok(tally::evaluate(
            proposal.yes_votes,
            proposal.no_votes,
            self.members.total_voting_power(),
            &self.params,
        ))
    }

    /// Close voting on `id`: queue it if it passed, reject it otherwise.
    pub(crate) fn finalize<L: NativeLedger>(
        &mut self,
        ctx: &RequestContext,
        id: ProposalId,
        ledger: &mut L,
        account: &Address,
    ) -> Result<ProposalState, GovernanceError> {
        let proposal = self.proposals.get(id)?;
        if proposal.state != ProposalState::Active {
            return Err(GovernanceError::InvalidState {
                proposal: id,
                state: proposal.state,
                expected: ProposalState::Active,
            });
        }
        if ctx.block <= proposal.end_block {
            return Err(GovernanceError::VotingNotEnded(id));
        }

        let passed = self.tally(id)?.passed();
        let proposal = self.proposals.get_mut(id)?;
        let proposer = proposal.proposer.clone();
        let deposit = proposal.deposit;

        if passed {
            proposal.state = ProposalState::Passed;
            let ready_at = ctx.block.saturating_add(self.params.timelock_duration);
            self.queue.enqueue(id, ready_at);
            if deposit > 0 {
                ledger.transfer(account, &proposer, deposit)?;
                self.emit(GovernanceEvent::DepositRefunded {
                    proposal: id,
                    proposer,
                    amount: deposit,
                });
            }
            self.emit(GovernanceEvent::ProposalFinalized {
                proposal: id,
                outcome: ProposalState::Passed,
                ready_at: Some(ready_at),
            });
            Ok(ProposalState::Passed)
        } else {
            proposal.state = ProposalState::Rejected;
            if deposit > 0 {
                self.treasury.lock_forfeit(deposit)?;
                self.emit(GovernanceEvent::DepositForfeited {
                    proposal: id,
                    amount: deposit,
                });
            }
            self.emit(GovernanceEvent::ProposalFinalized {
                proposal: id,
                outcome: ProposalState::Rejected,
                ready_at: None,
            });
            Ok(ProposalState::Rejected)
        }
    }

    /// Apply the effect of a passed proposal whose timelock has elapsed.
    pub(crate) fn execute<L: NativeLedger>(
        &mut self,
        ctx: &RequestContext,
        id: ProposalId,
        ledger: &mut L,
        account: &Address,
    ) -> Result<ExecutionEffect, GovernanceError> {
        let proposal = self.proposals.get(id)?;
        if proposal.state != ProposalState::Passed {
            return Err(GovernanceError::ProposalNotPassed(id));
        }
        let entry = *self.queue.get(id).ok_or(GovernanceError::NotQueued(id))?;
        if !entry.ready_at.is_reached(ctx.block) {
            return Err(GovernanceError::TimelockActive {
                proposal: id,
                ready_at: entry.ready_at,
            });
        }
        let kind = proposal.kind;
        let amount = proposal.amount;
        let recipient = proposal.recipient.clone();

        let effect = match kind {
            ProposalKind::Funding => self.execute_funding(id, amount, recipient, ledger, account)?,
            ProposalKind::Parameter => self.execute_parameter(id)?,
            ProposalKind::Membership => self.execute_membership(id, ctx.block)?,
            ProposalKind::General => ExecutionEffect::None,
        };

        self.queue.remove(id);
        let proposal = self.proposals.get_mut(id)?;
        proposal.state = ProposalState::Executed;
        proposal.executed_at = Some(ctx.block);
        self.emit(GovernanceEvent::ProposalExecuted {
            proposal: id,
            at: ctx.block,
        });
        Ok(effect)
    }

    fn execute_funding<L: NativeLedger>(
        &mut self,
        id: ProposalId,
        amount: u128,
        recipient: Option<Address>,
        ledger: &mut L,
        account: &Address,
    ) -> Result<ExecutionEffect, GovernanceError> {
        if amount > self.treasury.balance() {
            return Err(GovernanceError::invalid(format!(
                "treasury holds {}, proposal {} needs {}",
                self.treasury.balance(),
                id,
                amount
            )));
        }
        let recipient = recipient.ok_or_else(|| {
            GovernanceError::invalid(format!("funding proposal {id} has no recipient"))
        })?;
        ledger.transfer(account, &recipient, amount)?;
        self.treasury.debit(amount)?;
        self.emit(GovernanceEvent::TreasuryDisbursed {
            proposal: id,
            recipient: recipient.clone(),
            amount,
        });
        Ok(ExecutionEffect::Disbursed { recipient, amount })
    }

    fn execute_parameter(&mut self, id: ProposalId) -> Result<ExecutionEffect, GovernanceError> {
        let change = self
            .proposals
            .parameter_change(id)
            .cloned()
            .ok_or(GovernanceError::PayloadMissing(id))?;
        let Some(param) = GovernableParam::from_name(&change.param) else {
            warn!(proposal = %id, param = %change.param, "unknown parameter, nothing changed");
            return Ok(ExecutionEffect::UnknownParameter { name: change.param });
        };
        let old_value = self.params.get(param);
        self.params.set(param, change.new_value)?;
        self.emit(GovernanceEvent::ParameterChanged {
            param: param.name().to_string(),
            old_value,
            new_value: change.new_value,
        });
        Ok(ExecutionEffect::ParameterSet {
            param,
            old_value,
            new_value: change.new_value,
        })
    }

    fn execute_membership(
        &mut self,
        id: ProposalId,
        now: BlockHeight,
    ) -> Result<ExecutionEffect, GovernanceError> {
        let change = self
            .proposals
            .membership_change(id)
            .cloned()
            .ok_or(GovernanceError::PayloadMissing(id))?;
        if change.is_addition {
            self.add_member(change.member.clone(), change.new_power, now)?;
            Ok(ExecutionEffect::MemberAdded {
                member: change.member,
                power: change.new_power,
            })
        } else {
            let old_power = self.set_member_power(&change.member, change.new_power)?;
            Ok(ExecutionEffect::MemberReweighed {
                member: change.member,
                old_power,
                new_power: change.new_power,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_lists_only_elapsed_entries() {
        let mut queue = ExecutionQueue::new();
        queue.enqueue(ProposalId::new(1), BlockHeight::new(10));
        queue.enqueue(ProposalId::new(2), BlockHeight::new(20));

        assert!(queue.ready(BlockHeight::new(9)).is_empty());
        assert_eq!(queue.ready(BlockHeight::new(10)), vec![ProposalId::new(1)]);
        assert_eq!(queue.ready(BlockHeight::new(25)).len(), 2);

        assert!(queue.remove(ProposalId::new(1)).is_some());
        assert_eq!(queue.len(), 1);
    }
}
