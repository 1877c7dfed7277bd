//! Events emitted by committed governance operations.

use crate::proposal::{ProposalKind, ProposalState};
use concord_types::{Address, BlockHeight, ProposalId};
use serde::{Deserialize, Serialize};

/// A state change the host may want to index or relay.
///
/// Events are buffered inside the engine state, so an operation that
/// fails leaves no events behind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GovernanceEvent {
    MemberAdded {
        member: Address,
        power: u128,
    },
    MemberPowerChanged {
        member: Address,
        old_power: u128,
        new_power: u128,
    },
    Delegated {
        delegator: Address,
        delegate: Address,
        previous: Option<Address>,
    },
    Undelegated {
        delegator: Address,
        delegate: Address,
    },
    ProposalCreated {
        proposal: ProposalId,
        proposer: Address,
        kind: ProposalKind,
        end_block: BlockHeight,
    },
    VoteCast {
        proposal: ProposalId,
        voter: Address,
        support: bool,
        weight: u128,
    },
    ProposalFinalized {
        proposal: ProposalId,
        outcome: ProposalState,
        ready_at: Option<BlockHeight>,
    },
    ProposalExecuted {
        proposal: ProposalId,
        at: BlockHeight,
    },
    ParameterChanged {
        param: String,
        old_value: u128,
        new_value: u128,
    },
    TreasuryDeposited {
        from: Address,
        amount: u128,
    },
    TreasuryDisbursed {
        proposal: ProposalId,
        recipient: Address,
        amount: u128,
    },
    DepositRefunded {
        proposal: ProposalId,
        proposer: Address,
        amount: u128,
    },
    DepositForfeited {
        proposal: ProposalId,
        amount: u128,
    },
}
