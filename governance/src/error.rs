use concord_types::{Address, BlockHeight, LedgerError, ProposalId};
use thiserror::Error;

use crate::proposal::ProposalState;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("{0} is not the administrator")]
    AdministratorOnly(Address),

    #[error("member {0} not found")]
    MemberNotFound(Address),

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {0} is not queued for execution")]
    NotQueued(ProposalId),

    #[error("no payload recorded for proposal {0}")]
    PayloadMissing(ProposalId),

    #[error("{0} has not delegated")]
    NoDelegation(Address),

    #[error("vote by {voter} on proposal {proposal} not found")]
    VoteNotFound { proposal: ProposalId, voter: Address },

    #[error("{0} is not an active member")]
    NotActiveMember(Address),

    #[error("{voter} has delegated to {delegate} and cannot vote directly")]
    DelegatedVoter { voter: Address, delegate: Address },

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("{voter} has already voted on proposal {proposal}")]
    AlreadyVoted { proposal: ProposalId, voter: Address },

    #[error("voting on proposal {0} is closed")]
    VotingClosed(ProposalId),

    #[error("voting on proposal {0} has not ended yet")]
    VotingNotEnded(ProposalId),

    #[error("proposal {proposal} is timelocked until {ready_at}")]
    TimelockActive {
        proposal: ProposalId,
        ready_at: BlockHeight,
    },

    #[error("proposal {0} has not passed")]
    ProposalNotPassed(ProposalId),

    #[error("{0} has no voting power")]
    InsufficientVotingPower(Address),

    #[error("member {0} already exists")]
    MemberExists(Address),

    #[error("proposal {proposal} is {state}, expected {expected}")]
    InvalidState {
        proposal: ProposalId,
        state: ProposalState,
        expected: ProposalState,
    },

    #[error("voting power must be positive")]
    InvalidPower,

    #[error("cannot delegate to self")]
    InvalidTarget,

    #[error("value transfer failed: {0}")]
    TransferFailed(#[from] LedgerError),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// The failure category of a [`GovernanceError`], without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AdministratorOnly,
    NotFound,
    Unauthorized,
    InvalidProposal,
    AlreadyVoted,
    VotingClosed,
    ProposalNotPassed,
    InsufficientVotingPower,
    MemberExists,
    InvalidState,
    InvalidPower,
    InvalidTarget,
    TransferFailed,
    Overflow,
    Config,
    Snapshot,
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AdministratorOnly(_) => ErrorKind::AdministratorOnly,
            Self::MemberNotFound(_)
            | Self::ProposalNotFound(_)
            | Self::NotQueued(_)
            | Self::PayloadMissing(_)
            | Self::NoDelegation(_)
            | Self::VoteNotFound { .. } => ErrorKind::NotFound,
            Self::NotActiveMember(_) | Self::DelegatedVoter { .. } => ErrorKind::Unauthorized,
            Self::InvalidProposal(_) => ErrorKind::InvalidProposal,
            Self::AlreadyVoted { .. } => ErrorKind::AlreadyVoted,
            Self::VotingClosed(_) | Self::VotingNotEnded(_) | Self::TimelockActive { .. } => {
                ErrorKind::VotingClosed
            }
            Self::ProposalNotPassed(_) => ErrorKind::ProposalNotPassed,
            Self::InsufficientVotingPower(_) => ErrorKind::InsufficientVotingPower,
            Self::MemberExists(_) => ErrorKind::MemberExists,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::InvalidPower => ErrorKind::InvalidPower,
            Self::InvalidTarget => ErrorKind::InvalidTarget,
            Self::TransferFailed(_) => ErrorKind::TransferFailed,
            Self::Overflow => ErrorKind::Overflow,
            Self::Config(_) => ErrorKind::Config,
            Self::Snapshot(_) => ErrorKind::Snapshot,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidProposal(reason.into())
    }
}
