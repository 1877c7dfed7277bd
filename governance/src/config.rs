//! Engine configuration with TOML file support.

use crate::error::GovernanceError;
use crate::params::GovernanceParams;
use concord_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// A member present from genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisMember {
    pub address: Address,
    pub power: u64,
}

/// Configuration for a governance engine.
///
/// Can be loaded from a TOML file via [`GovernanceConfig::from_toml_file`]
/// or built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Identity allowed to add members and set parameters directly.
    #[serde(default = "default_admin")]
    pub admin: Address,

    /// Host-ledger account holding the treasury and locked deposits.
    #[serde(default = "default_account")]
    pub account: Address,

    /// Initial governance parameters.
    #[serde(default)]
    pub params: GovernanceParams,

    /// Members registered at genesis.
    #[serde(default)]
    pub members: Vec<GenesisMember>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_admin() -> Address {
    Address::new("admin")
}

fn default_account() -> Address {
    Address::new("concord:treasury")
}

// ── Impl ───────────────────────────────────────────────────────────────

impl GovernanceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GovernanceError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GovernanceError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GovernanceError> {
        let config: Self = toml::from_str(s).map_err(|e| GovernanceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, GovernanceError> {
        toml::to_string_pretty(self).map_err(|e| GovernanceError::Config(e.to_string()))
    }

    /// Reject parameter sets and genesis lists the engine could not start from.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        self.params
            .validate()
            .map_err(|e| GovernanceError::Config(e.to_string()))?;
        let mut seen = BTreeSet::new();
        for member in &self.members {
            if member.power == 0 {
                return Err(GovernanceError::Config(format!(
                    "genesis member {} has zero power",
                    member.address
                )));
            }
            if !seen.insert(&member.address) {
                return Err(GovernanceError::Config(format!(
                    "genesis member {} listed twice",
                    member.address
                )));
            }
        }
        if self.admin == self.account {
            return Err(GovernanceError::Config(
                "admin and engine account must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder-style genesis member.
    pub fn with_member(mut self, address: impl Into<Address>, power: u64) -> Self {
        self.members.push(GenesisMember {
            address: address.into(),
            power,
        });
        self
    }

    pub fn with_params(mut self, params: GovernanceParams) -> Self {
        self.params = params;
        self
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            account: default_account(),
            params: GovernanceParams::default(),
            members: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = GovernanceConfig::default().with_member("alice", 100);
        let toml_str = config.to_toml_string().unwrap();
        let parsed = GovernanceConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.admin, config.admin);
        assert_eq!(parsed.params, config.params);
        assert_eq!(parsed.members, config.members);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = GovernanceConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.admin, Address::new("admin"));
        assert_eq!(config.params, GovernanceParams::standard());
        assert!(config.members.is_empty());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            admin = "root"

            [params]
            voting_period = 10
            quorum_bps = 2500

            [[members]]
            address = "alice"
            power = 100

            [[members]]
            address = "bob"
            power = 50
        "#;
        let config = GovernanceConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.admin, Address::new("root"));
        assert_eq!(config.params.voting_period, 10);
        assert_eq!(config.params.quorum_bps, 2_500);
        assert_eq!(config.params.approval_threshold_bps, 5_100); // default
        assert_eq!(config.members.len(), 2);
    }

    #[test]
    fn invalid_params_rejected() {
        let err = GovernanceConfig::from_toml_str("[params]\nquorum_bps = 20000\n").unwrap_err();
        assert!(matches!(err, GovernanceError::Config(_)));
    }

    #[test]
    fn duplicate_genesis_member_rejected() {
        let config = GovernanceConfig::default()
            .with_member("alice", 1)
            .with_member("alice", 2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "account = \"vault\"").unwrap();
        let config = GovernanceConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.account, Address::new("vault"));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = GovernanceConfig::from_toml_file("/nonexistent/concord.toml");
        assert!(matches!(result, Err(GovernanceError::Config(_))));
    }
}
