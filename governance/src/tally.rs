//! Quorum and approval arithmetic.
//!
//! Turnout is measured against total voting power; approval is measured
//! against votes cast. Both comparisons are inclusive.

use crate::params::{GovernanceParams, BPS_DENOMINATOR};

/// `floor(value * bps / 10_000)` without intermediate overflow.
pub fn apply_bps(value: u128, bps: u32) -> u128 {
    let denom = u128::from(BPS_DENOMINATOR);
    let bps = u128::from(bps);
    (value / denom) * bps + (value % denom) * bps / denom
}

/// Minimum votes cast for a binding outcome.
pub fn quorum(total_voting_power: u128, quorum_bps: u32) -> u128 {
    apply_bps(total_voting_power, quorum_bps)
}

/// Outcome of evaluating a tally against the thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TallyResult {
    pub votes_cast: u128,
    pub quorum: u128,
    pub required_yes: u128,
    pub quorum_met: bool,
    pub approved: bool,
}

impl TallyResult {
    pub fn passed(&self) -> bool {
        self.quorum_met && self.approved
    }
}

/// Evaluate `yes`/`no` against `params` given the current total power.
pub fn evaluate(
    yes: u128,
    no: u128,
    total_voting_power: u128,
    params: &GovernanceParams,
) -> TallyResult {
    let votes_cast = yes.saturating_add(no);
    let quorum = quorum(total_voting_power, params.quorum_bps);
    let required_yes = apply_bps(votes_cast, params.approval_threshold_bps);
    TallyResult {
        votes_cast,
        quorum,
        required_yes,
        quorum_met: votes_cast >= quorum,
        approved: yes >= required_yes,
    }
}
