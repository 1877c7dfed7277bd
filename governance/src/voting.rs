//! Vote casting: effective-power snapshots and double-vote prevention.

use crate::error::GovernanceError;
use crate::event::GovernanceEvent;
use crate::state::GovernanceState;
use concord_types::{Address, BlockHeight, ProposalId, RequestContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A recorded vote. The weight is fixed at cast time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub weight: u128,
    pub support: bool,
    pub voted_at: BlockHeight,
}

/// Votes keyed by proposal, then voter.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoteBook {
    votes: BTreeMap<ProposalId, BTreeMap<Address, Vote>>,
}

impl VoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `vote` unless `voter` already voted on `proposal`.
    pub fn record(
        &mut self,
        proposal: ProposalId,
        voter: &Address,
        vote: Vote,
    ) -> Result<(), GovernanceError> {
        let ballots = self.votes.entry(proposal).or_default();
        if ballots.contains_key(voter) {
            return Err(GovernanceError::AlreadyVoted {
                proposal,
                voter: voter.clone(),
            });
        }
        ballots.insert(voter.clone(), vote);
        Ok(())
    }

    pub fn get(&self, proposal: ProposalId, voter: &Address) -> Option<&Vote> {
        self.votes.get(&proposal).and_then(|b| b.get(voter))
    }

    pub fn has_voted(&self, proposal: ProposalId, voter: &Address) -> bool {
        self.get(proposal, voter).is_some()
    }

    /// Proposals with at least one recorded vote.
    pub fn proposal_ids(&self) -> impl Iterator<Item = ProposalId> + '_ {
        self.votes.keys().copied()
    }

    /// All votes on `proposal` in voter order.
    pub fn for_proposal(&self, proposal: ProposalId) -> impl Iterator<Item = (&Address, &Vote)> {
        self.votes
            .get(&proposal)
            .into_iter()
            .flat_map(|ballots| ballots.iter())
    }
}

impl GovernanceState {
    /// Cast the caller's vote with their current effective power.
    pub(crate) fn cast_vote(
        &mut self,
        ctx: &RequestContext,
        proposal_id: ProposalId,
        support: bool,
    ) -> Result<Vote, GovernanceError> {
        let proposal = self.proposals.get(proposal_id)?;
        if !proposal.is_open_at(ctx.block) {
            return Err(GovernanceError::VotingClosed(proposal_id));
        }

        let voter = self
            .members
            .get_active(&ctx.caller)
            .ok_or_else(|| GovernanceError::NotActiveMember(ctx.caller.clone()))?;
        if let Some(delegate) = &voter.delegated_to {
            return Err(GovernanceError::DelegatedVoter {
                voter: ctx.caller.clone(),
                delegate: delegate.clone(),
            });
        }
        if self.votes.has_voted(proposal_id, &ctx.caller) {
            return Err(GovernanceError::AlreadyVoted {
                proposal: proposal_id,
                voter: ctx.caller.clone(),
            });
        }

        let weight = self.effective_voting_power(&ctx.caller)?;
        if weight == 0 {
            return Err(GovernanceError::InsufficientVotingPower(ctx.caller.clone()));
        }

        let vote = Vote {
            weight,
            support,
            voted_at: ctx.block,
        };
        self.votes.record(proposal_id, &ctx.caller, vote.clone())?;

        let proposal = self.proposals.get_mut(proposal_id)?;
        let tally = if support {
            &mut proposal.yes_votes
        } else {
            &mut proposal.no_votes
        };
        *tally = tally.checked_add(weight).ok_or(GovernanceError::Overflow)?;

        self.emit(GovernanceEvent::VoteCast {
            proposal: proposal_id,
            voter: ctx.caller.clone(),
            support,
            weight,
        });
        Ok(vote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_record_is_rejected_regardless_of_support() {
        let mut book = VoteBook::new();
        let id = ProposalId::new(1);
        let voter = Address::new("alice");
        let vote = |support| Vote {
            weight: 10,
            support,
            voted_at: BlockHeight::new(3),
        };

        book.record(id, &voter, vote(true)).unwrap();
        for support in [true, false] {
            assert_eq!(
                book.record(id, &voter, vote(support)).unwrap_err(),
                GovernanceError::AlreadyVoted {
                    proposal: id,
                    voter: voter.clone(),
                }
            );
        }
        assert!(book.get(id, &voter).unwrap().support);
        assert_eq!(book.for_proposal(id).count(), 1);
        assert!(!book.has_voted(ProposalId::new(2), &voter));
    }
}
