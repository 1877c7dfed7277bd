#![no_main]

use arbitrary::Arbitrary;
use concord_governance::{GovernanceConfig, GovernanceEngine, ProposalDraft, ProposalKind};
use concord_nullables::{NullChain, NullLedger};
use concord_types::{Address, ProposalId};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 4] = ["alice", "bob", "carol", "dave"];

#[derive(Debug, Arbitrary)]
enum Op {
    Delegate(u8, u8),
    Undelegate(u8),
    Propose(u8, u16),
    Vote(u8, u8, bool),
    Advance(u8),
    Finalize(u8),
    Execute(u8),
    Deposit(u8, u16),
    Membership(u8, u8, u16, bool),
}

fn who(i: u8) -> &'static str {
    NAMES[usize::from(i) % NAMES.len()]
}

fuzz_target!(|ops: Vec<Op>| {
    let mut config = GovernanceConfig::default();
    config.params.voting_period = 3;
    config.params.timelock_duration = 2;
    config.params.proposal_deposit = 1;
    let mut ledger = NullLedger::new();
    for (i, name) in NAMES.iter().enumerate() {
        config = config.with_member(*name, 10 + i as u64 * 7);
        ledger.fund(*name, 1_000);
    }
    let mut engine = GovernanceEngine::new(config, ledger).expect("engine");
    let chain = NullChain::new(1);

    for op in ops.iter().take(256) {
        let _ = match op {
            Op::Delegate(a, b) => engine
                .delegate_votes(&chain.ctx(who(*a)), &Address::new(who(*b)))
                .map(drop),
            Op::Undelegate(a) => engine.undelegate_votes(&chain.ctx(who(*a))).map(drop),
            // Even amounts make general proposals, odd ones funding.
            Op::Propose(a, amount) => {
                let draft = if amount % 2 == 0 {
                    ProposalDraft::new("g", "", ProposalKind::General)
                } else {
                    ProposalDraft::funding("f", "", u128::from(*amount), Address::new("sink"))
                };
                engine.create_proposal(&chain.ctx(who(*a)), draft).map(drop)
            }
            Op::Vote(a, id, support) => engine
                .cast_vote(&chain.ctx(who(*a)), ProposalId::new(u64::from(*id)), *support)
                .map(drop),
            Op::Advance(blocks) => {
                chain.advance(u64::from(*blocks % 8));
                Ok(())
            }
            Op::Finalize(id) => engine
                .finalize_proposal(&chain.ctx("keeper"), ProposalId::new(u64::from(*id)))
                .map(drop),
            Op::Execute(id) => engine
                .execute_proposal(&chain.ctx("keeper"), ProposalId::new(u64::from(*id)))
                .map(drop),
            Op::Deposit(a, amount) => engine
                .deposit_to_treasury(&chain.ctx(who(*a)), u128::from(*amount))
                .map(drop),
            Op::Membership(a, b, power, add) => engine
                .create_membership_change_proposal(
                    &chain.ctx(who(*a)),
                    "m",
                    "",
                    Address::new(who(*b)),
                    u128::from(*power),
                    *add,
                )
                .map(drop),
        };
        engine
            .state()
            .check_invariants()
            .expect("invariants hold after every operation");
    }
});
