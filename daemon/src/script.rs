//! Replay scripts: a JSON list of steps driven against an engine backed
//! by in-memory chain and ledger nullables.
//!
//! ```json
//! { "steps": [
//!     { "op": "fund", "account": "alice", "amount": 1000 },
//!     { "op": "propose", "caller": "alice", "title": "hello", "kind": "General" },
//!     { "op": "vote", "caller": "alice", "proposal": 1, "support": true },
//!     { "op": "advance", "blocks": 20 },
//!     { "op": "finalize", "caller": "alice", "proposal": 1 }
//! ] }
//! ```
//!
//! Amounts are `u64` in scripts; the engine widens them.

use concord_governance::{
    GovernanceEngine, GovernanceError, GovernanceEvent, ProposalDraft, ProposalKind,
};
use concord_nullables::{NullChain, NullLedger};
use concord_types::{Address, ProposalId};
use concord_utils::OpStats;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Mint native units into an account on the in-memory ledger.
    Fund { account: Address, amount: u64 },
    Advance { blocks: u64 },
    SetBlock { block: u64 },
    AddMember { caller: Address, member: Address, power: u64 },
    SetVotingPeriod { caller: Address, period: u64 },
    SetQuorum { caller: Address, bps: u32 },
    Delegate { caller: Address, to: Address },
    Undelegate { caller: Address },
    Propose {
        caller: Address,
        title: String,
        #[serde(default)]
        description: String,
        kind: ProposalKind,
        #[serde(default)]
        amount: u64,
        #[serde(default)]
        recipient: Option<Address>,
    },
    ProposeParameter {
        caller: Address,
        title: String,
        #[serde(default)]
        description: String,
        param: String,
        value: u64,
    },
    ProposeMembership {
        caller: Address,
        title: String,
        #[serde(default)]
        description: String,
        member: Address,
        power: u64,
        is_addition: bool,
    },
    Vote { caller: Address, proposal: u64, support: bool },
    Finalize { caller: Address, proposal: u64 },
    Execute { caller: Address, proposal: u64 },
    Deposit { caller: Address, amount: u64 },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fund { .. } => "fund",
            Self::Advance { .. } => "advance",
            Self::SetBlock { .. } => "set_block",
            Self::AddMember { .. } => "add_member",
            Self::SetVotingPeriod { .. } => "set_voting_period",
            Self::SetQuorum { .. } => "set_quorum",
            Self::Delegate { .. } => "delegate",
            Self::Undelegate { .. } => "undelegate",
            Self::Propose { .. } => "propose",
            Self::ProposeParameter { .. } => "propose_parameter",
            Self::ProposeMembership { .. } => "propose_membership",
            Self::Vote { .. } => "vote",
            Self::Finalize { .. } => "finalize",
            Self::Execute { .. } => "execute",
            Self::Deposit { .. } => "deposit",
        }
    }
}

/// What happened when a step ran.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Committed {
        detail: String,
        events: Vec<GovernanceEvent>,
    },
    RolledBack {
        kind: String,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub block: u64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Drives an engine step by step and records every outcome.
pub struct Replayer {
    pub engine: GovernanceEngine<NullLedger>,
    pub chain: NullChain,
    pub stats: OpStats,
}

impl Replayer {
    pub fn new(engine: GovernanceEngine<NullLedger>, start_block: u64) -> Self {
        Self {
            engine,
            chain: NullChain::new(start_block),
            stats: OpStats::new(),
        }
    }

    pub fn run(&mut self, script: &Script) -> Vec<StepReport> {
        script
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| self.step(index, step))
            .collect()
    }

    pub fn step(&mut self, index: usize, step: &Step) -> StepReport {
        let block = self.chain.height().as_u64();
        let outcome = match self.apply(step) {
            Ok(detail) => {
                self.stats.record(step.name(), true);
                Outcome::Committed {
                    detail,
                    events: self.engine.drain_events(),
                }
            }
            Err(err) => {
                self.stats.record(step.name(), false);
                Outcome::RolledBack {
                    kind: format!("{:?}", err.kind()),
                    error: err.to_string(),
                }
            }
        };
        debug!(index, op = step.name(), block, "step replayed");
        StepReport {
            index,
            op: step.name(),
            block,
            outcome,
        }
    }

    fn apply(&mut self, step: &Step) -> Result<String, GovernanceError> {
        let chain = &self.chain;
        let engine = &mut self.engine;
        let detail = match step {
            Step::Fund { account, amount } => {
                engine.ledger_mut().fund(account.clone(), u128::from(*amount));
                format!("funded {account} with {amount}")
            }
            Step::Advance { blocks } => {
                chain.advance(*blocks);
                format!("at block {}", chain.height())
            }
            Step::SetBlock { block } => {
                chain.set(*block);
                format!("at block {}", chain.height())
            }
            Step::AddMember {
                caller,
                member,
                power,
            } => {
                let added = engine.add_member(&chain.ctx(caller.clone()), member.clone(), (*power).into())?;
                format!("{} joined with power {}", added.address, added.voting_power)
            }
            Step::SetVotingPeriod { caller, period } => {
                engine.set_voting_period(&chain.ctx(caller.clone()), *period)?;
                format!("voting period {period}")
            }
            Step::SetQuorum { caller, bps } => {
                engine.set_quorum(&chain.ctx(caller.clone()), *bps)?;
                format!("quorum {bps} bps")
            }
            Step::Delegate { caller, to } => {
                engine.delegate_votes(&chain.ctx(caller.clone()), to)?;
                format!("{caller} delegated to {to}")
            }
            Step::Undelegate { caller } => {
                engine.undelegate_votes(&chain.ctx(caller.clone()))?;
                format!("{caller} undelegated")
            }
            Step::Propose {
                caller,
                title,
                description,
                kind,
                amount,
                recipient,
            } => {
                let draft = ProposalDraft {
                    amount: (*amount).into(),
                    recipient: recipient.clone(),
                    ..ProposalDraft::new(title.clone(), description.clone(), *kind)
                };
                let id = engine.create_proposal(&chain.ctx(caller.clone()), draft)?;
                format!("proposal {id} created")
            }
            Step::ProposeParameter {
                caller,
                title,
                description,
                param,
                value,
            } => {
                let id = engine.create_parameter_change_proposal(
                    &chain.ctx(caller.clone()),
                    title.clone(),
                    description.clone(),
                    param.clone(),
                    (*value).into(),
                )?;
                format!("proposal {id} created")
            }
            Step::ProposeMembership {
                caller,
                title,
                description,
                member,
                power,
                is_addition,
            } => {
                let id = engine.create_membership_change_proposal(
                    &chain.ctx(caller.clone()),
                    title.clone(),
                    description.clone(),
                    member.clone(),
                    (*power).into(),
                    *is_addition,
                )?;
                format!("proposal {id} created")
            }
            Step::Vote {
                caller,
                proposal,
                support,
            } => {
                let vote =
                    engine.cast_vote(&chain.ctx(caller.clone()), ProposalId::new(*proposal), *support)?;
                format!("{caller} voted {support} with weight {}", vote.weight)
            }
            Step::Finalize { caller, proposal } => {
                let outcome =
                    engine.finalize_proposal(&chain.ctx(caller.clone()), ProposalId::new(*proposal))?;
                format!("proposal {proposal} {outcome}")
            }
            Step::Execute { caller, proposal } => {
                let effect =
                    engine.execute_proposal(&chain.ctx(caller.clone()), ProposalId::new(*proposal))?;
                format!("proposal {proposal} executed: {effect:?}")
            }
            Step::Deposit { caller, amount } => {
                let balance =
                    engine.deposit_to_treasury(&chain.ctx(caller.clone()), (*amount).into())?;
                format!("treasury balance {balance}")
            }
        };
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_governance::{GovernanceConfig, GovernanceParams, ProposalState};

    fn replayer() -> Replayer {
        let params = GovernanceParams {
            voting_period: 5,
            timelock_duration: 2,
            ..GovernanceParams::standard()
        };
        let config = GovernanceConfig::default()
            .with_params(params)
            .with_member("alice", 60)
            .with_member("bob", 40);
        Replayer::new(GovernanceEngine::new(config, NullLedger::new()).unwrap(), 1)
    }

    fn parse(json: &str) -> Script {
        serde_json::from_str(json).expect("script should parse")
    }

    #[test]
    fn parses_tagged_steps() {
        let script = parse(
            r#"{ "steps": [
                { "op": "fund", "account": "alice", "amount": 500 },
                { "op": "propose", "caller": "alice", "title": "t", "kind": "Funding",
                  "amount": 10, "recipient": "carol" },
                { "op": "vote", "caller": "bob", "proposal": 1, "support": false }
            ] }"#,
        );
        assert_eq!(script.steps.len(), 3);
        assert_eq!(
            script.steps[2],
            Step::Vote {
                caller: Address::new("bob"),
                proposal: 1,
                support: false,
            }
        );
        assert_eq!(script.steps[1].name(), "propose");
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(serde_json::from_str::<Script>(r#"{"steps":[{"op":"cancel"}]}"#).is_err());
    }

    #[test]
    fn full_lifecycle_replays() {
        let script = parse(
            r#"{ "steps": [
                { "op": "fund", "account": "alice", "amount": 1000 },
                { "op": "fund", "account": "donor", "amount": 1000 },
                { "op": "deposit", "caller": "donor", "amount": 300 },
                { "op": "propose", "caller": "alice", "title": "grant", "kind": "Funding",
                  "amount": 120, "recipient": "carol" },
                { "op": "vote", "caller": "alice", "proposal": 1, "support": true },
                { "op": "vote", "caller": "alice", "proposal": 1, "support": true },
                { "op": "advance", "blocks": 6 },
                { "op": "finalize", "caller": "bob", "proposal": 1 },
                { "op": "execute", "caller": "bob", "proposal": 1 },
                { "op": "advance", "blocks": 2 },
                { "op": "execute", "caller": "bob", "proposal": 1 }
            ] }"#,
        );
        let mut replayer = replayer();
        let reports = replayer.run(&script);

        assert!(matches!(reports[5].outcome, Outcome::RolledBack { ref kind, .. } if kind == "AlreadyVoted"));
        assert!(matches!(reports[8].outcome, Outcome::RolledBack { ref kind, .. } if kind == "VotingClosed"));
        assert!(matches!(reports[10].outcome, Outcome::Committed { .. }));

        let engine = &replayer.engine;
        assert_eq!(engine.get_proposal(ProposalId::new(1)).unwrap().state, ProposalState::Executed);
        assert_eq!(engine.get_treasury_balance(), 180);
        assert_eq!(replayer.stats.total().rolled_back, 2);
        assert_eq!(replayer.stats.get("execute").committed, 1);
    }

    #[test]
    fn report_serializes_flat() {
        let mut replayer = replayer();
        let report = replayer.step(0, &Step::Undelegate { caller: Address::new("alice") });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["op"], "undelegate");
        assert_eq!(json["outcome"], "rolled_back");
        assert_eq!(json["kind"], "NotFound");
    }
}
