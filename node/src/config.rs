//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tessera_crypto::PublicKey;
use tessera_types::{GenesisTxInfo, NetworkId, TxId};

use crate::{LogFormat, NodeError};

/// Where a node gets its blocks from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Direct, authoritative access to the underlying chain.
    #[default]
    Full,
    /// Blocks relayed by peers, re-derived locally.
    Lite,
}

/// Replaces the network's built-in genesis transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisOverride {
    pub tx_id: TxId,
    pub block_height: u32,
}

/// Configuration for a ledger node.
///
/// Loaded from TOML via [`NodeConfig::from_toml_file`] or built in code for
/// tests. Every component receives what it needs from here at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_network")]
    pub network: NetworkId,

    #[serde(default)]
    pub role: NodeRole,

    /// Directory for the persisted ledger and snapshots.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub genesis: Option<GenesisOverride>,

    /// Blocks discarded when the chain stops connecting.
    #[serde(default = "default_rollback_window")]
    pub rollback_window: u32,

    /// Recovery attempts before the node reports persistent divergence.
    #[serde(default = "default_max_reorg_attempts")]
    pub max_reorg_attempts: u32,

    /// Time unit of the recovery backoff; attempt `n` waits `n²` units.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Snapshots are taken at heights that are multiples of this.
    #[serde(default = "default_snapshot_grid")]
    pub snapshot_grid: u32,

    /// Blocks kept in the undo journal.
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,

    /// Blocks covered by the recent-blocks hash.
    #[serde(default = "default_state_hash_window")]
    pub state_hash_window: usize,

    /// Hex Ed25519 keys allowed to sign block-window hashes.
    #[serde(default)]
    pub oracle_pub_keys: Vec<String>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Regtest
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tessera_data")
}

fn default_rollback_window() -> u32 {
    10
}

fn default_max_reorg_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_snapshot_grid() -> u32 {
    20
}

fn default_undo_depth() -> usize {
    tessera_ledger::DEFAULT_UNDO_DEPTH
}

fn default_state_hash_window() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Reject settings the controller cannot honour.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.rollback_window == 0 {
            return Err(NodeError::Config("rollback_window must be at least 1".into()));
        }
        if self.rollback_window as usize > self.undo_depth {
            return Err(NodeError::Config(format!(
                "rollback_window {} exceeds undo_depth {}",
                self.rollback_window, self.undo_depth
            )));
        }
        if self.snapshot_grid == 0 {
            return Err(NodeError::Config("snapshot_grid must be at least 1".into()));
        }
        if self.state_hash_window == 0 {
            return Err(NodeError::Config("state_hash_window must be at least 1".into()));
        }
        self.oracle_keys().map(|_| ())
    }

    /// The genesis transaction this node derives supply from.
    pub fn genesis_info(&self) -> GenesisTxInfo {
        self.genesis.map_or_else(
            || self.network.genesis(),
            |g| GenesisTxInfo::new(g.tx_id, g.block_height),
        )
    }

    pub fn retry_unit(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn oracle_keys(&self) -> Result<Vec<PublicKey>, NodeError> {
        self.oracle_pub_keys
            .iter()
            .map(|k| {
                k.parse::<PublicKey>()
                    .map_err(|e| NodeError::Config(format!("oracle key {k}: {e}")))
            })
            .collect()
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.bin")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            role: NodeRole::default(),
            data_dir: default_data_dir(),
            genesis: None,
            rollback_window: default_rollback_window(),
            max_reorg_attempts: default_max_reorg_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            snapshot_grid: default_snapshot_grid(),
            undo_depth: default_undo_depth(),
            state_hash_window: default_state_hash_window(),
            oracle_pub_keys: Vec::new(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
