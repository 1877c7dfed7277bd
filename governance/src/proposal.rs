//! Governance proposals, their typed payloads, and the proposal store.

use crate::error::GovernanceError;
use concord_types::{Address, BlockHeight, ProposalId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What executing a proposal does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalKind {
    /// Pay `amount` from the treasury to `recipient`.
    Funding,
    /// Overwrite a governance parameter.
    Parameter,
    /// Add a member or change a member's power.
    Membership,
    /// Signalling only; no side effect.
    General,
}

/// Lifecycle of a proposal.
///
/// `Active → Passed | Rejected` on finalization, `Passed → Executed` on
/// execution. `Cancelled` exists for record compatibility; no operation
/// produces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    Active,
    Passed,
    Rejected,
    Executed,
    Cancelled,
}

impl ProposalState {
    /// No further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Executed | Self::Cancelled)
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Passed => write!(f, "passed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Executed => write!(f, "executed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub title: String,
    pub description: String,
    pub kind: ProposalKind,
    /// Disbursement for funding proposals; informational otherwise.
    pub amount: u128,
    pub recipient: Option<Address>,
    pub start_block: BlockHeight,
    /// Last block at which votes are accepted.
    pub end_block: BlockHeight,
    pub yes_votes: u128,
    pub no_votes: u128,
    pub state: ProposalState,
    pub executed_at: Option<BlockHeight>,
    /// Native value locked by the proposer at creation.
    pub deposit: u128,
}

impl Proposal {
    /// Total weight cast either way.
    pub fn votes_cast(&self) -> u128 {
        self.yes_votes.saturating_add(self.no_votes)
    }

    /// Whether a vote at `now` falls inside the voting window.
    pub fn is_open_at(&self, now: BlockHeight) -> bool {
        self.state == ProposalState::Active && now <= self.end_block
    }
}

/// Payload of a parameter-change proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterChange {
    /// Parameter name as submitted; see [`crate::GovernableParam::name`].
    pub param: String,
    pub new_value: u128,
}

/// Payload of a membership-change proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    pub member: Address,
    pub new_power: u128,
    /// Add `member` rather than re-weigh an existing one.
    pub is_addition: bool,
}

/// Fields supplied by the proposer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub kind: ProposalKind,
    pub amount: u128,
    pub recipient: Option<Address>,
}

impl ProposalDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>, kind: ProposalKind) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind,
            amount: 0,
            recipient: None,
        }
    }

    /// A funding draft paying `amount` to `recipient`.
    pub fn funding(
        title: impl Into<String>,
        description: impl Into<String>,
        amount: u128,
        recipient: Address,
    ) -> Self {
        Self {
            amount,
            recipient: Some(recipient),
            ..Self::new(title, description, ProposalKind::Funding)
        }
    }

    pub(crate) fn validate(&self) -> Result<(), GovernanceError> {
        if self.title.trim().is_empty() {
            return Err(GovernanceError::invalid("title must not be empty"));
        }
        if self.kind == ProposalKind::Funding && self.amount == 0 {
            return Err(GovernanceError::invalid("funding amount must be positive"));
        }
        Ok(())
    }
}

/// Proposal records and their typed payloads, keyed by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposalStore {
    next_id: ProposalId,
    proposals: BTreeMap<ProposalId, Proposal>,
    parameter_changes: BTreeMap<ProposalId, ParameterChange>,
    membership_changes: BTreeMap<ProposalId, MembershipChange>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self {
            next_id: ProposalId::FIRST,
            proposals: BTreeMap::new(),
            parameter_changes: BTreeMap::new(),
            membership_changes: BTreeMap::new(),
        }
    }

    /// Store a new Active proposal under the next sequential id.
    pub(crate) fn insert(
        &mut self,
        proposer: Address,
        draft: ProposalDraft,
        now: BlockHeight,
        voting_period: u64,
        deposit: u128,
    ) -> Result<ProposalId, GovernanceError> {
        let id = self.next_id;
        self.next_id = id.checked_next().ok_or(GovernanceError::Overflow)?;
        let proposal = Proposal {
            id,
            proposer,
            title: draft.title,
            description: draft.description,
            kind: draft.kind,
            amount: draft.amount,
            recipient: draft.recipient,
            start_block: now,
            end_block: now.saturating_add(voting_period),
            yes_votes: 0,
            no_votes: 0,
            state: ProposalState::Active,
            executed_at: None,
            deposit,
        };
        self.proposals.insert(id, proposal);
        Ok(id)
    }

    pub(crate) fn attach_parameter_change(&mut self, id: ProposalId, change: ParameterChange) {
        self.parameter_changes.insert(id, change);
    }

    pub(crate) fn attach_membership_change(&mut self, id: ProposalId, change: MembershipChange) {
        self.membership_changes.insert(id, change);
    }

    pub fn get(&self, id: ProposalId) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: ProposalId) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    pub fn parameter_change(&self, id: ProposalId) -> Option<&ParameterChange> {
        self.parameter_changes.get(&id)
    }

    pub fn membership_change(&self, id: ProposalId) -> Option<&MembershipChange> {
        self.membership_changes.get(&id)
    }

    /// Number of proposals ever created.
    pub fn count(&self) -> u64 {
        self.next_id.as_u64() - ProposalId::FIRST.as_u64()
    }

    /// Check that ids are never reused and payloads belong to stored proposals.
    pub fn check_consistency(&self) -> Result<(), GovernanceError> {
        if let Some((&last, _)) = self.proposals.last_key_value() {
            if self.next_id <= last {
                return Err(GovernanceError::Snapshot(format!(
                    "next proposal id {} would reuse stored id {}",
                    self.next_id, last
                )));
            }
        }
        for (id, proposal) in &self.proposals {
            if proposal.id != *id {
                return Err(GovernanceError::Snapshot(format!(
                    "proposal stored under {} carries id {}",
                    id, proposal.id
                )));
            }
        }
        let orphan = self
            .parameter_changes
            .keys()
            .chain(self.membership_changes.keys())
            .find(|id| !self.proposals.contains_key(*id));
        if let Some(id) = orphan {
            return Err(GovernanceError::Snapshot(format!(
                "payload for missing proposal {id}"
            )));
        }
        Ok(())
    }

    pub fn contains(&self, id: ProposalId) -> bool {
        self.proposals.contains_key(&id)
    }

    #[cfg(test)]
    pub(crate) fn rewind_next_id(&mut self, next_id: ProposalId) {
        self.next_id = next_id;
    }

    /// Proposals in id order, optionally restricted to one state.
    pub fn list(&self, state: Option<ProposalState>) -> Vec<&Proposal> {
        self.proposals
            .values()
            .filter(|p| state.map_or(true, |s| p.state == s))
            .collect()
    }
}

impl Default for ProposalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(kind: ProposalKind) -> ProposalDraft {
        ProposalDraft::new("title", "body", kind)
    }

    #[test]
    fn ids_are_sequential() {
        let mut store = ProposalStore::new();
        let a = store
            .insert(Address::new("alice"), draft(ProposalKind::General), BlockHeight::new(5), 10, 0)
            .unwrap();
        let b = store
            .insert(Address::new("alice"), draft(ProposalKind::General), BlockHeight::new(6), 10, 0)
            .unwrap();
        assert_eq!(a, ProposalId::new(1));
        assert_eq!(b, ProposalId::new(2));
        assert_eq!(store.count(), 2);

        let first = store.get(a).unwrap();
        assert_eq!(first.start_block, BlockHeight::new(5));
        assert_eq!(first.end_block, BlockHeight::new(15));
        assert_eq!(first.state, ProposalState::Active);
        assert_eq!(first.votes_cast(), 0);
    }

    #[test]
    fn missing_proposal_is_not_found() {
        let store = ProposalStore::new();
        assert_eq!(
            store.get(ProposalId::new(9)).unwrap_err(),
            GovernanceError::ProposalNotFound(ProposalId::new(9))
        );
    }

    #[test]
    fn list_filters_by_state() {
        let mut store = ProposalStore::new();
        let a = store
            .insert(Address::new("a"), draft(ProposalKind::General), BlockHeight::GENESIS, 1, 0)
            .unwrap();
        store
            .insert(Address::new("a"), draft(ProposalKind::General), BlockHeight::GENESIS, 1, 0)
            .unwrap();
        store.get_mut(a).unwrap().state = ProposalState::Rejected;

        assert_eq!(store.list(None).len(), 2);
        assert_eq!(store.list(Some(ProposalState::Active)).len(), 1);
        assert_eq!(store.list(Some(ProposalState::Rejected))[0].id, a);
    }

    #[test]
    fn draft_validation() {
        assert!(draft(ProposalKind::General).validate().is_ok());
        assert!(ProposalDraft::new("  ", "", ProposalKind::General)
            .validate()
            .is_err());
        assert!(draft(ProposalKind::Funding).validate().is_err());
        assert!(ProposalDraft::funding("pay", "", 5, Address::new("bob"))
            .validate()
            .is_ok());
    }

    #[test]
    fn open_window_is_inclusive_of_end_block() {
        let mut store = ProposalStore::new();
        let id = store
            .insert(Address::new("a"), draft(ProposalKind::General), BlockHeight::new(10), 5, 0)
            .unwrap();
        let proposal = store.get(id).unwrap();
        assert!(proposal.is_open_at(BlockHeight::new(15)));
        assert!(!proposal.is_open_at(BlockHeight::new(16)));
        assert!(ProposalState::Executed.is_terminal());
        assert!(!ProposalState::Passed.is_terminal());
    }
}
