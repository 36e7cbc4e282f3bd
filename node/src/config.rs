//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};

use instalock_consensus::{LocalVoter, LockConfig};
use instalock_types::{InstalockError, LockParams, Outpoint, VoterId};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a lock-participating node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network-wide switch for transaction locking.
    #[serde(default = "default_true")]
    pub enable_instantsend: bool,

    /// Whether finalized locks are reported to block validation and wallets.
    #[serde(default = "default_true")]
    pub enable_block_filtering: bool,

    /// Value ceiling for a lock request, in whole coins.
    #[serde(default = "default_max_value")]
    pub max_value: u64,

    /// Confirmations credited to a locked transaction.
    #[serde(default = "default_depth")]
    pub instantsend_depth: u32,

    /// Command run when a transaction locks; `%s` is replaced by the txid.
    #[serde(default)]
    pub instantsend_notify: Option<String>,

    /// Hex-encoded 32-byte seed of the local voter key. Enables local voting.
    #[serde(default)]
    pub voter_key_seed: Option<String>,

    /// Collateral outpoint identifying the local voter, as `txid-index`.
    #[serde(default)]
    pub voter_outpoint: Option<String>,

    /// Seconds between maintenance sweeps.
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Protocol constants (fixed per network, not read from TOML).
    #[serde(skip)]
    pub params: LockParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_max_value() -> u64 {
    1000
}

fn default_depth() -> u32 {
    5
}

fn default_maintenance_interval() -> u64 {
    60
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<(), NodeError> {
        if self.maintenance_interval_secs == 0 {
            return Err(NodeError::Config(
                "maintenance_interval_secs must be positive".into(),
            ));
        }
        self.log_format()?;
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    /// The lock manager's view of this configuration.
    pub fn to_lock_config(&self) -> LockConfig {
        LockConfig {
            params: self.params.clone(),
            enabled: self.enable_instantsend,
            block_filtering: self.enable_block_filtering,
            max_value_coins: self.max_value,
            depth: self.instantsend_depth,
        }
    }

    /// The local voter, if both a key seed and a collateral outpoint are configured.
    pub fn local_voter(&self) -> Result<Option<LocalVoter>, NodeError> {
        let (seed, outpoint) = match (&self.voter_key_seed, &self.voter_outpoint) {
            (None, None) => return Ok(None),
            (Some(seed), Some(outpoint)) => (seed, outpoint),
            _ => {
                return Err(NodeError::InvalidVoterKey(
                    "voter_key_seed and voter_outpoint must be set together".into(),
                ))
            }
        };

        let bytes = hex::decode(seed).map_err(|e| NodeError::InvalidVoterKey(e.to_string()))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| NodeError::InvalidVoterKey("seed must be 32 bytes".into()))?;

        let collateral: Outpoint = outpoint
            .parse()
            .map_err(|e: InstalockError| NodeError::InvalidVoterKey(e.to_string()))?;

        Ok(Some(LocalVoter {
            id: VoterId::new(collateral),
            keys: instalock_crypto::keypair_from_seed(&seed),
        }))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            enable_instantsend: true,
            enable_block_filtering: true,
            max_value: default_max_value(),
            instantsend_depth: default_depth(),
            instantsend_notify: None,
            voter_key_seed: None,
            voter_outpoint: None,
            maintenance_interval_secs: default_maintenance_interval(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            params: LockParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().expect("serialize");
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.max_value, config.max_value);
        assert_eq!(parsed.instantsend_depth, config.instantsend_depth);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert!(config.enable_instantsend);
        assert!(config.enable_block_filtering);
        assert_eq!(config.max_value, 1000);
        assert_eq!(config.instantsend_depth, 5);
        assert_eq!(config.log_format, "human");
        assert!(config.local_voter().expect("no voter").is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            enable_instantsend = false
            max_value = 500
            instantsend_notify = "echo %s"
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        let lock = config.to_lock_config();
        assert!(!lock.enabled);
        assert_eq!(lock.max_value_coins, 500);
        assert_eq!(config.instantsend_notify.as_deref(), Some("echo %s"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn unknown_log_format_rejected() {
        let result = NodeConfig::from_toml_str(r#"log_format = "xml""#);
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn zero_interval_rejected() {
        let result = NodeConfig::from_toml_str("maintenance_interval_secs = 0");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/instalock.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "instantsend_depth = 7").expect("write");
        let config =
            NodeConfig::from_toml_file(file.path().to_str().expect("utf8")).expect("load");
        assert_eq!(config.instantsend_depth, 7);
    }

    #[test]
    fn local_voter_from_seed_and_outpoint() {
        let txid = "ab".repeat(32);
        let config = NodeConfig {
            voter_key_seed: Some("01".repeat(32)),
            voter_outpoint: Some(format!("{txid}-3")),
            ..NodeConfig::default()
        };
        let voter = config.local_voter().expect("valid").expect("configured");
        assert_eq!(voter.id.collateral().index, 3);
        assert_eq!(
            voter.keys.public,
            instalock_crypto::keypair_from_seed(&[1; 32]).public
        );
    }

    #[test]
    fn half_configured_voter_rejected() {
        let config = NodeConfig {
            voter_key_seed: Some("01".repeat(32)),
            ..NodeConfig::default()
        };
        assert!(matches!(
            config.local_voter(),
            Err(NodeError::InvalidVoterKey(_))
        ));
    }

    #[test]
    fn short_seed_rejected() {
        let config = NodeConfig {
            voter_key_seed: Some("0102".into()),
            voter_outpoint: Some(format!("{}-0", "ab".repeat(32))),
            ..NodeConfig::default()
        };
        assert!(matches!(
            config.local_voter(),
            Err(NodeError::InvalidVoterKey(_))
        ));
    }

    #[test]
    fn malformed_outpoint_rejected() {
        let config = NodeConfig {
            voter_key_seed: Some("01".repeat(32)),
            voter_outpoint: Some("nothex-1".into()),
            ..NodeConfig::default()
        };
        assert!(matches!(
            config.local_voter(),
            Err(NodeError::InvalidVoterKey(_))
        ));
    }
}
