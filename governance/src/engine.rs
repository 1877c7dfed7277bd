//! Governance engine: the public operation surface.
//!
//! Every mutating operation runs as one transaction: it is applied to a
//! scratch copy of the state and of the host ledger, and the copies replace
//! the live ones only if the whole operation succeeds. A failed call leaves
//! no trace, not even buffered events.
//!
//! Operations take `&mut self`, so an engine is single-writer by
//! construction. Hosts that share one across threads wrap it in a lock.

use crate::config::GovernanceConfig;
use crate::error::GovernanceError;
use crate::event::GovernanceEvent;
use crate::execution::{ExecutionEffect, QueueEntry};
use crate::member::Member;
use crate::params::{GovernableParam, GovernanceParams};
use crate::proposal::{
    MembershipChange, ParameterChange, Proposal, ProposalDraft, ProposalState,
};
use crate::state::GovernanceState;
use crate::tally;
use crate::voting::Vote;
use concord_types::{Address, BlockHeight, NativeLedger, ProposalId, RequestContext};
use tracing::{debug, info, warn};

pub struct GovernanceEngine<L> {
    admin: Address,
    account: Address,
    state: GovernanceState,
    ledger: L,
}

impl<L: NativeLedger> GovernanceEngine<L> {
    /// Build an engine from `config`, registering genesis members at height 0.
    pub fn new(config: GovernanceConfig, ledger: L) -> Result<Self, GovernanceError> {
        config.validate()?;
        let mut state = GovernanceState::new(config.params);
        for genesis in config.members {
            state.add_member(genesis.address, genesis.power.into(), BlockHeight::GENESIS)?;
        }
        state.events.clear();
        info!(
            admin = %config.admin,
            members = state.members.len(),
            total_power = state.members.total_voting_power(),
            "governance engine initialised"
        );
        Ok(Self {
            admin: config.admin,
            account: config.account,
            state,
            ledger,
        })
    }

    /// Resume from a saved state.
    pub fn from_state(
        admin: Address,
        account: Address,
        state: GovernanceState,
        ledger: L,
    ) -> Result<Self, GovernanceError> {
        state.check_invariants()?;
        Ok(Self {
            admin,
            account,
            state,
            ledger,
        })
    }

    /// Run `op` against scratch copies; commit both only on success.
    fn transact<T>(
        &mut self,
        name: &'static str,
        ctx: &RequestContext,
        op: impl FnOnce(&mut GovernanceState, &mut L, &Address) -> Result<T, GovernanceError>,
    ) -> Result<T, GovernanceError> {
        let mut state = self.state.clone();
        let mut ledger = self.ledger.clone();
        match op(&mut state, &mut ledger, &self.account) {
            Ok(value) => {
                self.state = state;
                self.ledger = ledger;
                Ok(value)
            }
            Err(err) => {
                warn!(op = name, caller = %ctx.caller, block = %ctx.block, error = %err, "rolled back");
                Err(err)
            }
        }
    }

    fn require_admin(&self, ctx: &RequestContext) -> Result<(), GovernanceError> {
        if ctx.caller != self.admin {
            return Err(GovernanceError::AdministratorOnly(ctx.caller.clone()));
        }
        Ok(())
    }

    // ── Administration ────────────────────────────────────────────────

    /// Register a member. Administrator only.
    pub fn add_member(
        &mut self,
        ctx: &RequestContext,
        address: Address,
        power: u128,
    ) -> Result<Member, GovernanceError> {
        self.require_admin(ctx)?;
        let member = self.transact("add_member", ctx, |state, _, _| {
            state.add_member(address, power, ctx.block)
        })?;
        info!(member = %member.address, power, total = self.state.members.total_voting_power(), "member added");
        Ok(member)
    }

    /// Set the voting period in blocks. Administrator only.
    pub fn set_voting_period(
        &mut self,
        ctx: &RequestContext,
        period: u64,
    ) -> Result<(), GovernanceError> {
        self.require_admin(ctx)?;
        self.transact("set_voting_period", ctx, |state, _, _| {
            let old = state.params.voting_period;
            let mut params = state.params.clone();
            params.voting_period = period;
            params.validate()?;
            state.params = params;
            state.emit(GovernanceEvent::ParameterChanged {
                param: GovernableParam::VotingPeriod.name().to_string(),
                old_value: old.into(),
                new_value: period.into(),
            });
            Ok(())
        })?;
        info!(period, "voting period set");
        Ok(())
    }

    /// Set the quorum in basis points. Administrator only.
    pub fn set_quorum(&mut self, ctx: &RequestContext, bps: u32) -> Result<(), GovernanceError> {
        self.require_admin(ctx)?;
        self.transact("set_quorum", ctx, |state, _, _| {
            let old = state.params.quorum_bps;
            let mut params = state.params.clone();
            params.quorum_bps = bps;
            params.validate()?;
            state.params = params;
            state.emit(GovernanceEvent::ParameterChanged {
                param: GovernableParam::QuorumBps.name().to_string(),
                old_value: old.into(),
                new_value: bps.into(),
            });
            Ok(())
        })?;
        info!(bps, "quorum set");
        Ok(())
    }

    // ── Delegation ────────────────────────────────────────────────────

    /// Let `target` vote with the caller's power.
    pub fn delegate_votes(
        &mut self,
        ctx: &RequestContext,
        target: &Address,
    ) -> Result<(), GovernanceError> {
        let previous = self.transact("delegate_votes", ctx, |state, _, _| {
            state.delegate(ctx, target)
        })?;
        debug!(delegator = %ctx.caller, delegate = %target, ?previous, "delegated");
        Ok(())
    }

    /// Take the caller's power back from their delegate.
    pub fn undelegate_votes(&mut self, ctx: &RequestContext) -> Result<(), GovernanceError> {
        let delegate =
            self.transact("undelegate_votes", ctx, |state, _, _| state.undelegate(ctx))?;
        debug!(delegator = %ctx.caller, %delegate, "undelegated");
        Ok(())
    }

    // ── Proposals ─────────────────────────────────────────────────────

    /// Submit a funding or general proposal, locking the deposit.
    pub fn create_proposal(
        &mut self,
        ctx: &RequestContext,
        draft: ProposalDraft,
    ) -> Result<ProposalId, GovernanceError> {
        let kind = draft.kind;
        let id = self.transact("create_proposal", ctx, |state, ledger, account| {
            state.create_plain_proposal(ctx, draft, ledger, account)
        })?;
        info!(proposal = %id, proposer = %ctx.caller, ?kind, "proposal created");
        Ok(id)
    }

    /// Submit a proposal that overwrites a governance parameter.
    pub fn create_parameter_change_proposal(
        &mut self,
        ctx: &RequestContext,
        title: impl Into<String>,
        description: impl Into<String>,
        param: impl Into<String>,
        new_value: u128,
    ) -> Result<ProposalId, GovernanceError> {
        let change = ParameterChange {
            param: param.into(),
            new_value,
        };
        let (title, description) = (title.into(), description.into());
        let id = self.transact("create_parameter_change_proposal", ctx, |state, ledger, account| {
            state.create_parameter_change_proposal(ctx, title, description, change, ledger, account)
        })?;
        info!(proposal = %id, proposer = %ctx.caller, "parameter proposal created");
        Ok(id)
    }

    /// Submit a proposal that adds a member or changes a member's power.
    pub fn create_membership_change_proposal(
        &mut self,
        ctx: &RequestContext,
        title: impl Into<String>,
        description: impl Into<String>,
        member: Address,
        new_power: u128,
        is_addition: bool,
    ) -> Result<ProposalId, GovernanceError> {
        let change = MembershipChange {
            member,
            new_power,
            is_addition,
        };
        let (title, description) = (title.into(), description.into());
        let id = self.transact("create_membership_change_proposal", ctx, |state, ledger, account| {
            state.create_membership_change_proposal(ctx, title, description, change, ledger, account)
        })?;
        info!(proposal = %id, proposer = %ctx.caller, "membership proposal created");
        Ok(id)
    }

    /// Vote on an active proposal with the caller's effective power.
    pub fn cast_vote(
        &mut self,
        ctx: &RequestContext,
        proposal: ProposalId,
        support: bool,
    ) -> Result<Vote, GovernanceError> {
        let vote = self.transact("cast_vote", ctx, |state, _, _| {
            state.cast_vote(ctx, proposal, support)
        })?;
        debug!(proposal = %proposal, voter = %ctx.caller, support, weight = vote.weight, "vote cast");
        Ok(vote)
    }

    /// Close voting; queue the proposal if it passed.
    pub fn finalize_proposal(
        &mut self,
        ctx: &RequestContext,
        proposal: ProposalId,
    ) -> Result<ProposalState, GovernanceError> {
        let outcome = self.transact("finalize_proposal", ctx, |state, ledger, account| {
            state.finalize(ctx, proposal, ledger, account)
        })?;
        info!(proposal = %proposal, %outcome, "proposal finalized");
        Ok(outcome)
    }

    /// Apply a passed proposal once its timelock has elapsed.
    pub fn execute_proposal(
        &mut self,
        ctx: &RequestContext,
        proposal: ProposalId,
    ) -> Result<ExecutionEffect, GovernanceError> {
        let effect = self.transact("execute_proposal", ctx, |state, ledger, account| {
            state.execute(ctx, proposal, ledger, account)
        })?;
        info!(proposal = %proposal, ?effect, "proposal executed");
        Ok(effect)
    }

    // ── Treasury ──────────────────────────────────────────────────────

    /// Move `amount` from the caller into the treasury. Returns the new balance.
    pub fn deposit_to_treasury(
        &mut self,
        ctx: &RequestContext,
        amount: u128,
    ) -> Result<u128, GovernanceError> {
        let balance = self.transact("deposit_to_treasury", ctx, |state, ledger, account| {
            state.deposit_to_treasury(ctx, amount, ledger, account)
        })?;
        info!(from = %ctx.caller, amount, balance, "treasury deposit");
        Ok(balance)
    }

    // ── Queries ───────────────────────────────────────────────────────

    pub fn get_member(&self, address: &Address) -> Result<&Member, GovernanceError> {
        self.state
            .members
            .get(address)
            .ok_or_else(|| GovernanceError::MemberNotFound(address.clone()))
    }

    pub fn get_proposal(&self, id: ProposalId) -> Result<&Proposal, GovernanceError> {
        self.state.proposals.get(id)
    }

    pub fn get_vote(&self, id: ProposalId, voter: &Address) -> Result<&Vote, GovernanceError> {
        self.state
            .votes
            .get(id, voter)
            .ok_or_else(|| GovernanceError::VoteNotFound {
                proposal: id,
                voter: voter.clone(),
            })
    }

    /// Base power of `address`, regardless of delegation.
    pub fn get_voting_power(&self, address: &Address) -> Result<u128, GovernanceError> {
        Ok(self.get_member(address)?.voting_power)
    }

    /// Base power plus power delegated to `address`.
    pub fn get_effective_voting_power(&self, address: &Address) -> Result<u128, GovernanceError> {
        self.state.effective_voting_power(address)
    }

    /// Power delegated to `address` by others.
    pub fn get_delegated_power(&self, address: &Address) -> u128 {
        self.state.delegations.delegated_power(address)
    }

    pub fn get_treasury_balance(&self) -> u128 {
        self.state.treasury.balance()
    }

    /// Deposits of rejected proposals, held by the engine account.
    pub fn forfeited_deposits(&self) -> u128 {
        self.state.treasury.forfeited_deposits()
    }

    /// Votes needed for quorum at the current total power.
    pub fn calculate_quorum(&self) -> u128 {
        tally::quorum(
            self.state.members.total_voting_power(),
            self.state.params.quorum_bps,
        )
    }

    /// Whether the current tally of `id` clears quorum and approval.
    pub fn has_proposal_passed(&self, id: ProposalId) -> Result<bool, GovernanceError> {
        Ok(self.state.tally(id)?.passed())
    }

    pub fn get_queue_entry(&self, id: ProposalId) -> Option<&QueueEntry> {
        self.state.queue.get(id)
    }

    pub fn get_parameter_change(&self, id: ProposalId) -> Option<&ParameterChange> {
        self.state.proposals.parameter_change(id)
    }

    pub fn get_membership_change(&self, id: ProposalId) -> Option<&MembershipChange> {
        self.state.proposals.membership_change(id)
    }

    pub fn get_params(&self) -> &GovernanceParams {
        &self.state.params
    }

    pub fn total_voting_power(&self) -> u128 {
        self.state.members.total_voting_power()
    }

    pub fn proposal_count(&self) -> u64 {
        self.state.proposals.count()
    }

    pub fn list_proposals(&self, state: Option<ProposalState>) -> Vec<&Proposal> {
        self.state.proposals.list(state)
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    pub fn state(&self) -> &GovernanceState {
        &self.state
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable access to the host ledger, for hosts that move value outside the engine.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// Take the events of every operation committed since the last drain.
    pub fn drain_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.state.events)
    }
}
