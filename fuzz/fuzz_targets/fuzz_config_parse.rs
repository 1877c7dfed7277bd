#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // A config that parses must build an engine.
    if let Ok(config) = concord_governance::GovernanceConfig::from_toml_str(text) {
        let ledger = concord_nullables::NullLedger::new();
        concord_governance::GovernanceEngine::new(config, ledger)
            .expect("validated config must start an engine");
    }
});
