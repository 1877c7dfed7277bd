//! Concord command-line host.
//!
//! Loads a governance configuration, replays a script of operations
//! against an engine backed by in-memory host nullables, and prints
//! per-step outcomes and the resulting state as JSON.

mod script;

use anyhow::Context;
use clap::Parser;
use concord_governance::{GovernanceConfig, GovernanceEngine, GovernanceParams, GovernanceState};
use concord_nullables::NullLedger;
use concord_utils::{init_logging, LogFormat};
use script::{Replayer, Script};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "concord", about = "Concord member governance engine")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long, env = "CONCORD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "CONCORD_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value_t = LogFormat::Human, env = "CONCORD_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Replay a JSON script of governance operations.
    Replay {
        script: PathBuf,

        /// Block height the replay starts at.
        #[arg(long, default_value_t = 1)]
        start_block: u64,

        /// Write a binary snapshot of the final state here.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Print a snapshot written by `replay --save` as JSON.
    Inspect { snapshot: PathBuf },
    /// Print an example configuration file.
    InitConfig,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GovernanceConfig> {
    match path {
        Some(path) => {
            let config = GovernanceConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(GovernanceConfig::default()),
    }
}

/// Replay `script` against a fresh engine built from `config`, optionally
/// saving the final state to `save`. Returns the JSON report.
fn replay(
    config: GovernanceConfig,
    script: &Path,
    start_block: u64,
    save: Option<&Path>,
) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let parsed: Script = serde_json::from_str(&raw)
        .with_context(|| format!("parsing script {}", script.display()))?;

    let engine = GovernanceEngine::new(config, NullLedger::new())?;
    let mut replayer = Replayer::new(engine, start_block);
    let reports = replayer.run(&parsed);

    let engine = &replayer.engine;
    let total = replayer.stats.total();
    tracing::info!(
        steps = reports.len(),
        committed = total.committed,
        rolled_back = total.rolled_back,
        "replay finished"
    );

    if let Some(path) = save {
        let bytes = engine.state().save_state()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        tracing::info!("Saved snapshot to {}", path.display());
    }

    Ok(json!({
        "steps": reports,
        "stats": replayer.stats,
        "final_block": replayer.chain.height(),
        "state": engine.state(),
        "ledger": engine.ledger().balances(),
    }))
}

/// Load a snapshot written by `replay --save`.
fn inspect(snapshot: &Path) -> anyhow::Result<GovernanceState> {
    let bytes = std::fs::read(snapshot)
        .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
    Ok(GovernanceState::load_state(&bytes)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level);

    match cli.command {
        Command::Replay {
            script,
            start_block,
            save,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let output = replay(config, &script, start_block, save.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Inspect { snapshot } => {
            let state = inspect(&snapshot)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::InitConfig => {
            let config = GovernanceConfig::default()
                .with_params(GovernanceParams::standard())
                .with_member("alice", 100)
                .with_member("bob", 50);
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_types::{Address, ProposalId};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
        [params]
        voting_period = 3
        timelock_duration = 1
        proposal_deposit = 0

        [[members]]
        address = "alice"
        power = 80

        [[members]]
        address = "bob"
        power = 20
    "#;

    const SCRIPT: &str = r#"{ "steps": [
        { "op": "delegate", "caller": "bob", "to": "alice" },
        { "op": "propose", "caller": "alice", "title": "hello", "kind": "General" },
        { "op": "vote", "caller": "alice", "proposal": 1, "support": true },
        { "op": "advance", "blocks": 18446744073709551615 },
        { "op": "finalize", "caller": "bob", "proposal": 1 }
    ] }"#;

    fn temp_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn replay_save_then_inspect() {
        let config_file = temp_with(CONFIG);
        let script_file = temp_with(SCRIPT);
        let snapshot = NamedTempFile::new().unwrap();

        let config = load_config(Some(&config_file.path().to_path_buf())).unwrap();
        let report = replay(config, script_file.path(), 1, Some(snapshot.path())).unwrap();
        assert_eq!(report["stats"]["counters"]["finalize"]["committed"], 1);
        assert_eq!(report["final_block"], u64::MAX);

        let state = inspect(snapshot.path()).unwrap();
        assert_eq!(state.members().total_voting_power(), 100);
        assert_eq!(state.delegations().delegated_power(&Address::new("alice")), 20);
        assert_eq!(
            state.proposals().get(ProposalId::new(1)).unwrap().yes_votes,
            100
        );
        assert!(state.queue().get(ProposalId::new(1)).is_some());
    }

    #[test]
    fn inspect_rejects_corrupt_snapshot() {
        let snapshot = temp_with("not a snapshot");
        assert!(inspect(snapshot.path()).is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let path = PathBuf::from("/nonexistent/concord.toml");
        assert!(load_config(Some(&path)).is_err());
    }
}
