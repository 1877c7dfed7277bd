#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Loading a snapshot must reject malformed bytes without panicking.
    // Anything that loads must satisfy the aggregate invariants.
    if let Ok(state) = concord_governance::GovernanceState::load_state(data) {
        state.check_invariants().expect("loaded state must be consistent");
    }

    let _ = bincode::deserialize::<concord_types::Address>(data);
    let _ = bincode::deserialize::<concord_types::BlockHeight>(data);
});
