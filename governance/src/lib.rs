//! Member governance for Concord.
//!
//! Process: Proposal (deposit locked) → Voting window → Finalization
//! (quorum + approval) → Timelock → Execution (funding, parameter,
//! membership, or general).
//!
//! Key principle: voting power is weighted per member and may be delegated
//! one level to another member. Votes snapshot the voter's effective power
//! when cast.

pub mod config;
pub mod delegation;
pub mod engine;
pub mod error;
pub mod event;
pub mod execution;
pub mod member;
pub mod params;
pub mod proposal;
pub mod state;
pub mod tally;
pub mod treasury;
pub mod voting;

pub use config::{GenesisMember, GovernanceConfig};
pub use delegation::DelegationLedger;
pub use engine::GovernanceEngine;
pub use error::{ErrorKind, GovernanceError};
pub use event::GovernanceEvent;
pub use execution::{ExecutionEffect, ExecutionQueue, QueueEntry};
pub use member::{Member, MembershipRegistry};
pub use params::{GovernableParam, GovernanceParams, BPS_DENOMINATOR};
pub use proposal::{
    MembershipChange, ParameterChange, Proposal, ProposalDraft, ProposalKind, ProposalState,
    ProposalStore,
};
pub use state::GovernanceState;
pub use tally::TallyResult;
pub use treasury::Treasury;
pub use voting::{Vote, VoteBook};
