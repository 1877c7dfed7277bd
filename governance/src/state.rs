//! The complete governance state and the operations that span stores.
//!
//! `GovernanceState` owns every store by value and is `Clone`, which is
//! what lets the engine run each operation against a scratch copy.

use crate::delegation::DelegationLedger;
use crate::error::GovernanceError;
use crate::event::GovernanceEvent;
use crate::execution::ExecutionQueue;
use crate::member::{Member, MembershipRegistry};
use crate::params::{GovernableParam, GovernanceParams};
use crate::proposal::{
    MembershipChange, ParameterChange, ProposalDraft, ProposalKind, ProposalState, ProposalStore,
};
use crate::treasury::Treasury;
use crate::voting::VoteBook;
use concord_types::{Address, BlockHeight, NativeLedger, ProposalId, RequestContext};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceState {
    pub(crate) params: GovernanceParams,
    pub(crate) members: MembershipRegistry,
    /// Derived from member delegation pointers; rebuilt on load.
    #[serde(skip)]
    pub(crate) delegations: DelegationLedger,
    pub(crate) proposals: ProposalStore,
    pub(crate) votes: VoteBook,
    pub(crate) queue: ExecutionQueue,
    pub(crate) treasury: Treasury,
    #[serde(skip)]
    pub(crate) events: Vec<GovernanceEvent>,
}

impl GovernanceState {
    pub fn new(params: GovernanceParams) -> Self {
        Self {
            params,
            members: MembershipRegistry::new(),
            delegations: DelegationLedger::new(),
            proposals: ProposalStore::new(),
            votes: VoteBook::new(),
            queue: ExecutionQueue::new(),
            treasury: Treasury::new(),
            events: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, event: GovernanceEvent) {
        self.events.push(event);
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn members(&self) -> &MembershipRegistry {
        &self.members
    }

    pub fn delegations(&self) -> &DelegationLedger {
        &self.delegations
    }

    pub fn proposals(&self) -> &ProposalStore {
        &self.proposals
    }

    pub fn votes(&self) -> &VoteBook {
        &self.votes
    }

    pub fn queue(&self) -> &ExecutionQueue {
        &self.queue
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    // ── Membership ────────────────────────────────────────────────────

    pub(crate) fn add_member(
        &mut self,
        address: Address,
        power: u128,
        now: BlockHeight,
    ) -> Result<Member, GovernanceError> {
        let member = self.members.add(address, power, now)?.clone();
        self.emit(GovernanceEvent::MemberAdded {
            member: member.address.clone(),
            power,
        });
        Ok(member)
    }

    /// Change a member's base power, keeping the total and any delegate
    /// aggregate in step. Returns the previous power.
    pub(crate) fn set_member_power(
        &mut self,
        address: &Address,
        new_power: u128,
    ) -> Result<u128, GovernanceError> {
        let old_power = self.members.set_power(address, new_power)?;
        let delegate = self
            .members
            .get(address)
            .and_then(|m| m.delegated_to.clone());
        if let Some(delegate) = delegate {
            self.delegations.reweigh(&delegate, old_power, new_power)?;
        }
        self.emit(GovernanceEvent::MemberPowerChanged {
            member: address.clone(),
            old_power,
            new_power,
        });
        Ok(old_power)
    }

    // ── Delegation ────────────────────────────────────────────────────

    pub(crate) fn delegate(
        &mut self,
        ctx: &RequestContext,
        target: &Address,
    ) -> Result<Option<Address>, GovernanceError> {
        let previous = self
            .delegations
            .delegate(&mut self.members, &ctx.caller, target)?;
        self.emit(GovernanceEvent::Delegated {
            delegator: ctx.caller.clone(),
            delegate: target.clone(),
            previous: previous.clone(),
        });
        Ok(previous)
    }

    pub(crate) fn undelegate(&mut self, ctx: &RequestContext) -> Result<Address, GovernanceError> {
        let delegate = self.delegations.undelegate(&mut self.members, &ctx.caller)?;
        self.emit(GovernanceEvent::Undelegated {
            delegator: ctx.caller.clone(),
            delegate: delegate.clone(),
        });
        Ok(delegate)
    }

    /// Base power plus everything delegated to `address`.
    pub fn effective_voting_power(&self, address: &Address) -> Result<u128, GovernanceError> {
        let member = self
            .members
            .get(address)
            .ok_or_else(|| GovernanceError::MemberNotFound(address.clone()))?;
        member
            .voting_power
            .checked_add(self.delegations.delegated_power(address))
            .ok_or(GovernanceError::Overflow)
    }

    // ── Proposals ─────────────────────────────────────────────────────

    /// Validate the proposer, lock the deposit and store the proposal.
    pub(crate) fn create_proposal<L: NativeLedger>(
        &mut self,
        ctx: &RequestContext,
        draft: ProposalDraft,
        ledger: &mut L,
        account: &Address,
    ) -> Result<ProposalId, GovernanceError> {
        let proposer = self
            .members
            .get_active(&ctx.caller)
            .ok_or_else(|| GovernanceError::NotActiveMember(ctx.caller.clone()))?;
        if proposer.voting_power == 0 {
            return Err(GovernanceError::InsufficientVotingPower(ctx.caller.clone()));
        }
        draft.validate()?;

        let deposit = u128::from(self.params.proposal_deposit);
        if deposit > 0 {
            ledger.transfer(&ctx.caller, account, deposit)?;
        }
        let kind = draft.kind;
        let id = self.proposals.insert(
            ctx.caller.clone(),
            draft,
            ctx.block,
            self.params.voting_period,
            deposit,
        )?;
        let end_block = self.proposals.get(id)?.end_block;
        self.emit(GovernanceEvent::ProposalCreated {
            proposal: id,
            proposer: ctx.caller.clone(),
            kind,
            end_block,
        });
        Ok(id)
    }

    /// Untyped creation: only funding and general proposals carry no payload.
    pub(crate) fn create_plain_proposal<L: NativeLedger>(
        &mut self,
        ctx: &RequestContext,
        draft: ProposalDraft,
        ledger: &mut L,
        account: &Address,
    ) -> Result<ProposalId, GovernanceError> {
        match draft.kind {
            ProposalKind::Funding | ProposalKind::General => {}
            ProposalKind::Parameter | ProposalKind::Membership => {
                return Err(GovernanceError::invalid(
                    "parameter and membership proposals need a payload",
                ));
            }
        }
        self.create_proposal(ctx, draft, ledger, account)
    }

    pub(crate) fn create_parameter_change_proposal<L: NativeLedger>(
        &mut self,
        ctx: &RequestContext,
        title: String,
        description: String,
        change: ParameterChange,
        ledger: &mut L,
        account: &Address,
    ) -> Result<ProposalId, GovernanceError> {
        // Unknown names are accepted here and ignored on execution.
        if let Some(param) = GovernableParam::from_name(&change.param) {
            param.check(change.new_value)?;
        }
        let draft = ProposalDraft::new(title, description, ProposalKind::Parameter);
        let id = self.create_proposal(ctx, draft, ledger, account)?;
        self.proposals.attach_parameter_change(id, change);
        Ok(id)
    }

    pub(crate) fn create_membership_change_proposal<L: NativeLedger>(
        &mut self,
        ctx: &RequestContext,
        title: String,
        description: String,
        change: MembershipChange,
        ledger: &mut L,
        account: &Address,
    ) -> Result<ProposalId, GovernanceError> {
        if change.is_addition && change.new_power == 0 {
            return Err(GovernanceError::invalid("new member needs positive power"));
        }
        let draft = ProposalDraft::new(title, description, ProposalKind::Membership);
        let id = self.create_proposal(ctx, draft, ledger, account)?;
        self.proposals.attach_membership_change(id, change);
        Ok(id)
    }

    // ── Treasury ──────────────────────────────────────────────────────

    pub(crate) fn deposit_to_treasury<L: NativeLedger>(
        &mut self,
        ctx: &RequestContext,
        amount: u128,
        ledger: &mut L,
        account: &Address,
    ) -> Result<u128, GovernanceError> {
        if amount == 0 {
            return Err(GovernanceError::invalid("deposit amount must be positive"));
        }
        ledger.transfer(&ctx.caller, account, amount)?;
        self.treasury.credit(amount)?;
        self.emit(GovernanceEvent::TreasuryDeposited {
            from: ctx.caller.clone(),
            amount,
        });
        Ok(self.treasury.balance())
    }

    // ── Integrity ─────────────────────────────────────────────────────

    /// Check the aggregate invariants by full recount, and that every vote
    /// and queue entry refers to a stored proposal.
    pub fn check_invariants(&self) -> Result<(), GovernanceError> {
        let recount = self
            .members
            .recount_voting_power()
            .ok_or(GovernanceError::Overflow)?;
        if recount != self.members.total_voting_power() {
            return Err(GovernanceError::Snapshot(format!(
                "total voting power {} disagrees with recount {}",
                self.members.total_voting_power(),
                recount
            )));
        }
        self.proposals.check_consistency()?;
        if let Some(id) = self.votes.proposal_ids().find(|id| !self.proposals.contains(*id)) {
            return Err(GovernanceError::Snapshot(format!(
                "votes recorded for missing proposal {id}"
            )));
        }
        for id in self.queue.ids() {
            let state = self
                .proposals
                .get(id)
                .map_err(|_| GovernanceError::Snapshot(format!("queued proposal {id} missing")))?
                .state;
            if state != ProposalState::Passed {
                return Err(GovernanceError::Snapshot(format!(
                    "queued proposal {id} is {state}, not passed"
                )));
            }
        }

        let rebuilt = DelegationLedger::rebuild(&self.members)?;
        for member in self.members.iter() {
            let expected = rebuilt.delegated_power(&member.address);
            let actual = self.delegations.delegated_power(&member.address);
            if expected != actual {
                return Err(GovernanceError::Snapshot(format!(
                    "delegate {} aggregate {} disagrees with recount {}",
                    member.address, actual, expected
                )));
            }
        }
        Ok(())
    }

    /// Serialize the state for persistence.
    pub fn save_state(&self) -> Result<Vec<u8>, GovernanceError> {
        bincode::serialize(self).map_err(|e| GovernanceError::Snapshot(e.to_string()))
    }

    /// Restore state saved by [`Self::save_state`], rebuilding derived indexes.
    pub fn load_state(data: &[u8]) -> Result<Self, GovernanceError> {
        let mut state: Self =
            bincode::deserialize(data).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        state.delegations = DelegationLedger::rebuild(&state.members)?;
        state.check_invariants()?;
        Ok(state)
    }
}

impl Default for GovernanceState {
    fn default() -> Self {
        Self::new(GovernanceParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_nullables::NullLedger;

    fn addr(name: &str) -> Address {
        Address::new(name)
    }

    fn state_with(members: &[(&str, u128)]) -> GovernanceState {
        let mut state = GovernanceState::default();
        for (name, power) in members {
            state
                .add_member(addr(name), *power, BlockHeight::GENESIS)
                .unwrap();
        }
        state
    }

    #[test]
    fn set_member_power_follows_delegation() {
        let mut state = state_with(&[("alice", 100), ("bob", 50)]);
        state
            .delegate(&RequestContext::new("bob", 1), &addr("alice"))
            .unwrap();

        state.set_member_power(&addr("bob"), 20).unwrap();
        assert_eq!(state.delegations.delegated_power(&addr("alice")), 20);
        assert_eq!(state.effective_voting_power(&addr("alice")).unwrap(), 120);
        assert_eq!(state.members.total_voting_power(), 120);
        state.check_invariants().unwrap();
    }

    #[test]
    fn effective_power_of_unknown_member() {
        let state = state_with(&[]);
        assert_eq!(
            state.effective_voting_power(&addr("ghost")).unwrap_err(),
            GovernanceError::MemberNotFound(addr("ghost"))
        );
    }

    #[test]
    fn snapshot_round_trip_rebuilds_delegations() {
        let mut state = state_with(&[("alice", 100), ("bob", 50), ("carol", 25)]);
        state
            .delegate(&RequestContext::new("bob", 1), &addr("alice"))
            .unwrap();
        state
            .delegate(&RequestContext::new("carol", 1), &addr("alice"))
            .unwrap();
        let mut ledger = NullLedger::new().with_balance("alice", 1_000);
        state
            .create_plain_proposal(
                &RequestContext::new("alice", 2),
                ProposalDraft::new("hello", "", ProposalKind::General),
                &mut ledger,
                &addr("vault"),
            )
            .unwrap();

        let bytes = state.save_state().unwrap();
        let restored = GovernanceState::load_state(&bytes).unwrap();

        assert_eq!(restored.delegations.delegated_power(&addr("alice")), 75);
        assert_eq!(restored.members.total_voting_power(), 175);
        assert_eq!(restored.proposals.count(), 1);
        assert!(restored.events.is_empty());
    }

    #[test]
    fn snapshot_with_rewound_proposal_counter_rejected() {
        let mut state = state_with(&[("alice", 100)]);
        let mut ledger = NullLedger::new().with_balance("alice", 1_000);
        state
            .create_plain_proposal(
                &RequestContext::new("alice", 1),
                ProposalDraft::new("first", "", ProposalKind::General),
                &mut ledger,
                &addr("vault"),
            )
            .unwrap();
        state.proposals.rewind_next_id(ProposalId::FIRST);

        let bytes = state.save_state().unwrap();
        assert!(matches!(
            GovernanceState::load_state(&bytes),
            Err(GovernanceError::Snapshot(_))
        ));
    }

    #[test]
    fn snapshot_with_dangling_vote_or_queue_entry_rejected() {
        let mut state = state_with(&[("alice", 100)]);
        let ghost = ProposalId::new(7);
        state
            .votes
            .record(
                ghost,
                &addr("alice"),
                crate::voting::Vote {
                    weight: 100,
                    support: true,
                    voted_at: BlockHeight::new(1),
                },
            )
            .unwrap();
        assert!(matches!(
            GovernanceState::load_state(&state.save_state().unwrap()),
            Err(GovernanceError::Snapshot(_))
        ));

        let mut state = state_with(&[("alice", 100)]);
        state.queue.enqueue(ghost, BlockHeight::new(9));
        assert!(matches!(
            GovernanceState::load_state(&state.save_state().unwrap()),
            Err(GovernanceError::Snapshot(_))
        ));
    }

    #[test]
    fn garbage_snapshot_rejected() {
        assert!(matches!(
            GovernanceState::load_state(&[0xff, 0x01]),
            Err(GovernanceError::Snapshot(_))
        ));
    }

    #[test]
    fn typed_kinds_need_typed_constructor() {
        let mut state = state_with(&[("alice", 100)]);
        let mut ledger = NullLedger::new().with_balance("alice", 1_000);
        let err = state
            .create_plain_proposal(
                &RequestContext::new("alice", 1),
                ProposalDraft::new("tweak", "", ProposalKind::Parameter),
                &mut ledger,
                &addr("vault"),
            )
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidProposal(_)));
    }
}
