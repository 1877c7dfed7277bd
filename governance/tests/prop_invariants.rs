//! Property tests: aggregate invariants hold under arbitrary operation
//! sequences, and a failed operation leaves the state byte-for-byte intact.

use concord_governance::{GovernanceConfig, GovernanceEngine, GovernanceParams, ProposalDraft, ProposalKind};
use concord_nullables::{NullChain, NullLedger};
use concord_types::{Address, ProposalId};
use proptest::prelude::*;

const NAMES: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

#[derive(Debug, Clone)]
enum Op {
    Delegate(usize, usize),
    Undelegate(usize),
    Propose(usize),
    Vote(usize, u64, bool),
    Advance(u64),
    Finalize(u64),
    Execute(u64),
    Reweigh(usize, u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let who = 0..NAMES.len();
    prop_oneof![
        (who.clone(), 0..NAMES.len()).prop_map(|(a, b)| Op::Delegate(a, b)),
        who.clone().prop_map(Op::Undelegate),
        who.clone().prop_map(Op::Propose),
        (who.clone(), 1..6u64, any::<bool>()).prop_map(|(a, id, s)| Op::Vote(a, id, s)),
        (1..8u64).prop_map(Op::Advance),
        (1..6u64).prop_map(Op::Finalize),
        (1..6u64).prop_map(Op::Execute),
        (who, 1..500u64).prop_map(|(a, p)| Op::Reweigh(a, p)),
    ]
}

fn setup(powers: &[u64]) -> (GovernanceEngine<NullLedger>, NullChain) {
    let params = GovernanceParams {
        voting_period: 4,
        quorum_bps: 2_000,
        approval_threshold_bps: 5_100,
        proposal_deposit: 5,
        timelock_duration: 2,
    };
    let mut config = GovernanceConfig::default().with_params(params);
    let mut ledger = NullLedger::new();
    for (name, power) in NAMES.iter().zip(powers) {
        config = config.with_member(*name, *power);
        ledger.fund(*name, 50);
    }
    (
        GovernanceEngine::new(config, ledger).expect("engine"),
        NullChain::new(1),
    )
}

fn apply(engine: &mut GovernanceEngine<NullLedger>, chain: &NullChain, op: &Op) -> bool {
    let name = |i: usize| NAMES[i];
    match op {
        Op::Delegate(a, b) => engine
            .delegate_votes(&chain.ctx(name(*a)), &Address::new(name(*b)))
            .is_ok(),
        Op::Undelegate(a) => engine.undelegate_votes(&chain.ctx(name(*a))).is_ok(),
        Op::Propose(a) => engine
            .create_proposal(
                &chain.ctx(name(*a)),
                ProposalDraft::new("p", "", ProposalKind::General),
            )
            .is_ok(),
        Op::Vote(a, id, support) => engine
            .cast_vote(&chain.ctx(name(*a)), ProposalId::new(*id), *support)
            .is_ok(),
        Op::Advance(blocks) => {
            chain.advance(*blocks);
            true
        }
        Op::Finalize(id) => engine
            .finalize_proposal(&chain.ctx("keeper"), ProposalId::new(*id))
            .is_ok(),
        Op::Execute(id) => engine
            .execute_proposal(&chain.ctx("keeper"), ProposalId::new(*id))
            .is_ok(),
        Op::Reweigh(a, power) => engine
            .create_membership_change_proposal(
                &chain.ctx(name(*a)),
                "reweigh",
                "",
                Address::new(name((*a + 1) % NAMES.len())),
                u128::from(*power),
                false,
            )
            .is_ok(),
    }
}

proptest! {
    #[test]
    fn aggregates_match_recount(
        powers in prop::collection::vec(1..1_000u64, NAMES.len()),
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let (mut engine, chain) = setup(&powers);
        let supply = engine.ledger().total_supply();

        for op in &ops {
            apply(&mut engine, &chain, op);

            engine.state().check_invariants().unwrap();
            let sum: u128 = engine.state().members().iter().map(|m| m.voting_power).sum();
            prop_assert_eq!(engine.total_voting_power(), sum);
            for member in engine.state().members().iter() {
                let delegated: u128 = engine
                    .state()
                    .members()
                    .iter()
                    .filter(|m| m.delegated_to.as_ref() == Some(&member.address))
                    .map(|m| m.voting_power)
                    .sum();
                prop_assert_eq!(engine.get_delegated_power(&member.address), delegated);
                if let Some(delegate) = &member.delegated_to {
                    prop_assert_ne!(delegate, &member.address);
                }
            }
            prop_assert_eq!(engine.ledger().total_supply(), supply);
        }
    }

    #[test]
    fn failed_operations_leave_no_trace(
        powers in prop::collection::vec(1..1_000u64, NAMES.len()),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let (mut engine, chain) = setup(&powers);
        engine.drain_events();

        for op in &ops {
            let before = engine.state().save_state().unwrap();
            let balances = engine.ledger().balances().clone();
            if !apply(&mut engine, &chain, op) {
                prop_assert_eq!(engine.state().save_state().unwrap(), before);
                prop_assert_eq!(engine.ledger().balances(), &balances);
                prop_assert!(engine.drain_events().is_empty());
            }
            engine.drain_events();
        }
    }

    #[test]
    fn proposal_ids_are_dense(
        powers in prop::collection::vec(1..1_000u64, NAMES.len()),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let (mut engine, chain) = setup(&powers);
        for op in &ops {
            apply(&mut engine, &chain, op);
        }
        let ids: Vec<u64> = engine.list_proposals(None).iter().map(|p| p.id.as_u64()).collect();
        let expected: Vec<u64> = (1..=engine.proposal_count()).collect();
        prop_assert_eq!(ids, expected);
        for proposal in engine.list_proposals(None) {
            prop_assert!(proposal.end_block > proposal.start_block);
        }
    }
}
