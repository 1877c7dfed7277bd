//! Governance parameters and the names a parameter proposal may target.
//!
//! Every parameter can be changed by an executed parameter proposal,
//! including the thresholds that govern that same proposal process.

use crate::error::GovernanceError;
use serde::{Deserialize, Serialize};

/// Basis-point denominator: 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// The mutable knobs of the governance process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Length of the voting window in blocks.
    pub voting_period: u64,

    /// Minimum turnout as a fraction of total voting power (basis points).
    pub quorum_bps: u32,

    /// Minimum yes share of votes cast (basis points).
    pub approval_threshold_bps: u32,

    /// Native value a proposer locks when submitting a proposal.
    pub proposal_deposit: u64,

    /// Blocks between a proposal passing and becoming executable.
    pub timelock_duration: u64,
}

impl GovernanceParams {
    /// Roughly one week of voting and two days of timelock at 15s blocks.
    pub fn standard() -> Self {
        Self {
            voting_period: 40_320,
            quorum_bps: 2_000,               // 20%
            approval_threshold_bps: 5_100,   // 51%
            proposal_deposit: 100,
            timelock_duration: 11_520,
        }
    }

    /// Reject combinations that would make every proposal unpassable or
    /// every voting window empty.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.voting_period == 0 {
            return Err(GovernanceError::invalid("voting period must be at least one block"));
        }
        check_bps("quorum", self.quorum_bps)?;
        check_bps("approval threshold", self.approval_threshold_bps)?;
        Ok(())
    }

    /// Current value of `param`, widened to `u128`.
    pub fn get(&self, param: GovernableParam) -> u128 {
        match param {
            GovernableParam::VotingPeriod => self.voting_period.into(),
            GovernableParam::QuorumBps => self.quorum_bps.into(),
            GovernableParam::ApprovalThresholdBps => self.approval_threshold_bps.into(),
            GovernableParam::ProposalDeposit => self.proposal_deposit.into(),
            GovernableParam::TimelockDuration => self.timelock_duration.into(),
        }
    }

    /// Overwrite `param` with `value`, checking it fits the field.
    pub fn set(&mut self, param: GovernableParam, value: u128) -> Result<(), GovernanceError> {
        param.check(value)?;
        match param {
            GovernableParam::VotingPeriod => self.voting_period = narrow(param, value)?,
            GovernableParam::QuorumBps => self.quorum_bps = narrow(param, value)?,
            GovernableParam::ApprovalThresholdBps => {
                self.approval_threshold_bps = narrow(param, value)?
            }
            GovernableParam::ProposalDeposit => self.proposal_deposit = narrow(param, value)?,
            GovernableParam::TimelockDuration => self.timelock_duration = narrow(param, value)?,
        }
        Ok(())
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self::standard()
    }
}

/// Parameters a parameter-change proposal can name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GovernableParam {
    VotingPeriod,
    QuorumBps,
    ApprovalThresholdBps,
    ProposalDeposit,
    TimelockDuration,
}

impl GovernableParam {
    pub const ALL: [Self; 5] = [
        Self::VotingPeriod,
        Self::QuorumBps,
        Self::ApprovalThresholdBps,
        Self::ProposalDeposit,
        Self::TimelockDuration,
    ];

    /// Canonical name used in proposals and events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VotingPeriod => "votingPeriod",
            Self::QuorumBps => "quorumBasisPoints",
            Self::ApprovalThresholdBps => "approvalThresholdBasisPoints",
            Self::ProposalDeposit => "proposalDeposit",
            Self::TimelockDuration => "timelockDuration",
        }
    }

    /// Name of the matching `GovernanceParams` field, accepted as an alias.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::VotingPeriod => "voting_period",
            Self::QuorumBps => "quorum_bps",
            Self::ApprovalThresholdBps => "approval_threshold_bps",
            Self::ProposalDeposit => "proposal_deposit",
            Self::TimelockDuration => "timelock_duration",
        }
    }

    /// Look a parameter up by canonical name or field alias. Matching is
    /// exact; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == name || p.field_name() == name)
    }

    /// Range check for a proposed value.
    pub fn check(&self, value: u128) -> Result<(), GovernanceError> {
        match self {
            Self::VotingPeriod if value == 0 => Err(GovernanceError::invalid(
                "voting period must be at least one block",
            )),
            Self::QuorumBps | Self::ApprovalThresholdBps => {
                let bps = u32::try_from(value).unwrap_or(u32::MAX);
                check_bps(self.name(), bps)
            }
            Self::VotingPeriod | Self::TimelockDuration | Self::ProposalDeposit => {
                u64::try_from(value).map(|_| ()).map_err(|_| {
                    GovernanceError::invalid(format!("{} does not fit in 64 bits", self.name()))
                })
            }
        }
    }
}

fn check_bps(what: &str, bps: u32) -> Result<(), GovernanceError> {
    if bps > BPS_DENOMINATOR {
        return Err(GovernanceError::invalid(format!(
            "{what} of {bps} bps exceeds {BPS_DENOMINATOR}"
        )));
    }
    Ok(())
}

fn narrow<T: TryFrom<u128>>(param: GovernableParam, value: u128) -> Result<T, GovernanceError> {
    T::try_from(value)
        .map_err(|_| GovernanceError::invalid(format!("{} out of range", param.name())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for param in GovernableParam::ALL {
            assert_eq!(GovernableParam::from_name(param.name()), Some(param));
            assert_eq!(GovernableParam::from_name(param.field_name()), Some(param));
        }
        assert_eq!(
            GovernableParam::from_name("quorumBasisPoints"),
            Some(GovernableParam::QuorumBps)
        );
        assert_eq!(GovernableParam::from_name("votingperiod"), None);
        assert_eq!(GovernableParam::from_name("VotingPeriod"), None);
        assert_eq!(GovernableParam::from_name(""), None);
    }

    #[test]
    fn set_overwrites_value() {
        let mut params = GovernanceParams::standard();
        params.set(GovernableParam::TimelockDuration, 7).unwrap();
        params.set(GovernableParam::ProposalDeposit, 1_000_000).unwrap();
        assert_eq!(params.timelock_duration, 7);
        assert_eq!(params.get(GovernableParam::ProposalDeposit), 1_000_000);
    }

    #[test]
    fn bps_above_denominator_rejected() {
        let mut params = GovernanceParams::standard();
        let err = params.set(GovernableParam::QuorumBps, 10_001).unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidProposal(_)));
        assert_eq!(params.quorum_bps, 2_000);
        params.set(GovernableParam::ApprovalThresholdBps, 10_000).unwrap();
    }

    #[test]
    fn zero_voting_period_rejected() {
        let mut params = GovernanceParams::standard();
        assert!(params.set(GovernableParam::VotingPeriod, 0).is_err());
        params.voting_period = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn oversized_duration_rejected() {
        let mut params = GovernanceParams::standard();
        let too_big = u128::from(u64::MAX) + 1;
        assert!(params.set(GovernableParam::TimelockDuration, too_big).is_err());
    }
}
