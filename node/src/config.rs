//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use quorum_network::{PushTrackerConfig, ReconcilerConfig};
use quorum_types::EntryType;
use quorum_utils::LogFormat;

use crate::NodeError;

/// Configuration for a quorum node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the validator registry.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub votes: VotesConfig,

    #[serde(default)]
    pub gossip: GossipConfig,
}

/// Vote pool and vote-category gossip settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesConfig {
    /// Hashes remembered for duplicate rejection.
    #[serde(default = "default_known_hash_capacity")]
    pub known_hash_capacity: usize,

    /// Concurrent pulls allowed per vote hash before deferring.
    #[serde(default = "default_max_parallel_pulls")]
    pub max_parallel_pulls: u32,

    /// How long a vote pull may stay unanswered before it is retried.
    #[serde(default = "default_pull_timeout_ms")]
    pub pull_timeout_ms: u64,

    /// Alternative peers remembered per vote hash.
    #[serde(default = "default_max_pending_per_hash")]
    pub max_pending_per_hash: usize,
}

/// Push-pull reconciliation settings shared by all categories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipConfig {
    #[serde(default = "default_request_queue_capacity")]
    pub request_queue_capacity: usize,

    #[serde(default = "default_pending_push_ttl_secs")]
    pub pending_push_ttl_secs: u64,

    #[serde(default = "default_pending_sweep_interval_secs")]
    pub pending_sweep_interval_secs: u64,

    /// Categories that must have a holder before the node starts.
    #[serde(default = "default_required_categories")]
    pub required_categories: Vec<EntryType>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./quorum_data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_known_hash_capacity() -> usize {
    quorum_consensus::MAX_KNOWN_VOTES
}

fn default_max_parallel_pulls() -> u32 {
    3
}

fn default_pull_timeout_ms() -> u64 {
    5_000
}

fn default_max_pending_per_hash() -> usize {
    quorum_network::push_tracker::DEFAULT_MAX_PENDING_PER_HASH
}

fn default_request_queue_capacity() -> usize {
    quorum_network::reconciler::REQUEST_QUEUE_CAPACITY
}

fn default_pending_push_ttl_secs() -> u64 {
    quorum_network::reconciler::PENDING_PUSH_TTL.as_secs()
}

fn default_pending_sweep_interval_secs() -> u64 {
    quorum_network::reconciler::PENDING_SWEEP_INTERVAL.as_secs()
}

fn default_required_categories() -> Vec<EntryType> {
    vec![EntryType::Vote]
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
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }
}

impl VotesConfig {
    pub fn pull_timeout(&self) -> Duration {
        Duration::from_millis(self.pull_timeout_ms)
    }

    pub fn push_tracker_config(&self) -> PushTrackerConfig {
        PushTrackerConfig {
            pull_timeout: self.pull_timeout(),
            max_pending_per_hash: self.max_pending_per_hash,
            ..PushTrackerConfig::default()
        }
    }
}

impl GossipConfig {
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            request_queue_capacity: self.request_queue_capacity,
            pending_push_ttl: Duration::from_secs(self.pending_push_ttl_secs),
            pending_sweep_interval: Duration::from_secs(self.pending_sweep_interval_secs),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            votes: VotesConfig::default(),
            gossip: GossipConfig::default(),
        }
    }
}

impl Default for VotesConfig {
    fn default() -> Self {
        Self {
            known_hash_capacity: default_known_hash_capacity(),
            max_parallel_pulls: default_max_parallel_pulls(),
            pull_timeout_ms: default_pull_timeout_ms(),
            max_pending_per_hash: default_max_pending_per_hash(),
        }
    }
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            request_queue_capacity: default_request_queue_capacity(),
            pending_push_ttl_secs: default_pending_push_ttl_secs(),
            pending_sweep_interval_secs: default_pending_sweep_interval_secs(),
            required_categories: default_required_categories(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.votes, config.votes);
        assert_eq!(parsed.gossip, config.gossip);
        assert_eq!(parsed.data_dir, config.data_dir);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.data_dir, PathBuf::from("./quorum_data"));
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.votes.known_hash_capacity, 100_000);
        assert_eq!(config.votes.max_parallel_pulls, 3);
        assert_eq!(config.gossip.request_queue_capacity, 5_000);
        assert_eq!(config.gossip.pending_push_ttl_secs, 180);
        assert_eq!(config.gossip.pending_sweep_interval_secs, 300);
        assert_eq!(config.gossip.required_categories, vec![EntryType::Vote]);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            log_format = "json"

            [votes]
            max_parallel_pulls = 5

            [gossip]
            required_categories = ["vote", "block"]
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.votes.max_parallel_pulls, 5);
        assert_eq!(config.votes.pull_timeout_ms, 5_000); // default
        assert_eq!(
            config.gossip.required_categories,
            vec![EntryType::Vote, EntryType::Block]
        );
    }

    #[test]
    fn derived_component_configs() {
        let config = NodeConfig::default();
        let reconciler = config.gossip.reconciler_config();
        assert_eq!(reconciler.pending_push_ttl, Duration::from_secs(180));
        assert_eq!(reconciler.pending_sweep_interval, Duration::from_secs(300));
        let tracker = config.votes.push_tracker_config();
        assert_eq!(tracker.pull_timeout, Duration::from_secs(5));
        assert_eq!(tracker.max_pending_per_hash, 16);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let result = NodeConfig::from_toml_str("[gossip]\nrequired_categories = [\"gossip\"]");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/quorum.toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }
}
