//! Quorum validator node — wires the validator registry, the round-scoped
//! vote pool and push-pull gossip reconciliation together.
//!
//! - [`config`] — TOML configuration.
//! - [`vote_holder`] — the vote pool as the `vote` gossip category holder.
//! - [`metrics`] — Prometheus export of pool and reconciler counters.
//! - [`node`] — [`QuorumNode`], construction and background tasks.

pub mod config;
pub mod error;
pub mod metrics;
pub mod node;
pub mod vote_holder;

pub use config::{GossipConfig, NodeConfig, VotesConfig};
pub use error::NodeError;
pub use metrics::NodeMetrics;
pub use node::QuorumNode;
pub use quorum_utils::{init_logging, LogFormat};
pub use vote_holder::VoteEntryHolder;
