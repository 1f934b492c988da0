//! Prometheus metrics for the quorum node.
//!
//! The vote pool and the gossip reconciler keep their own atomic counters;
//! [`NodeMetrics::refresh`] copies them, together with the current queue and
//! index sizes, into a dedicated [`Registry`] that a scrape endpoint can
//! encode into the Prometheus text exposition format.

use prometheus::{
    register_int_gauge_vec_with_registry, register_int_gauge_with_registry, Encoder, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};

use quorum_consensus::VotePool;
use quorum_network::{GossipReconciler, PushTracker};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Event totals, labelled by event name ───────────────────────────
    pub vote_events: IntGaugeVec,
    pub gossip_events: IntGaugeVec,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Votes currently held across all open rounds.
    pub votes_pooled: IntGauge,
    /// Hashes in the duplicate-rejection window.
    pub known_hashes: IntGauge,
    /// Highest completed round, or -1 before the first completion.
    pub completed_round: IntGauge,
    /// Pending push records (live or awaiting the sweeper).
    pub pending_pushes: IntGauge,
    /// Items the vote push tracker is retrying.
    pub tracked_pulls: IntGauge,
    /// Validators in the registry.
    pub validator_count: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let vote_events = register_int_gauge_vec_with_registry!(
            Opts::new("quorum_vote_pool_events", "Vote pool submissions by outcome"),
            &["event"],
            registry
        )?;

        let gossip_events = register_int_gauge_vec_with_registry!(
            Opts::new(
                "quorum_gossip_events",
                "Gossip reconciler announcements and pulls by outcome"
            ),
            &["event"],
            registry
        )?;

        let votes_pooled = register_int_gauge_with_registry!(
            Opts::new("quorum_votes_pooled", "Votes held for open rounds"),
            registry
        )?;

        let known_hashes = register_int_gauge_with_registry!(
            Opts::new(
                "quorum_known_vote_hashes",
                "Hashes in the duplicate-rejection window"
            ),
            registry
        )?;

        let completed_round = register_int_gauge_with_registry!(
            Opts::new("quorum_completed_round", "Highest completed round"),
            registry
        )?;
        completed_round.set(-1);

        let pending_pushes = register_int_gauge_with_registry!(
            Opts::new("quorum_pending_pushes", "Pending push records"),
            registry
        )?;

        let tracked_pulls = register_int_gauge_with_registry!(
            Opts::new("quorum_tracked_pulls", "Vote pulls awaiting completion"),
            registry
        )?;

        let validator_count = register_int_gauge_with_registry!(
            Opts::new("quorum_validator_count", "Validators in the registry"),
            registry
        )?;

        Ok(Self {
            registry,
            vote_events,
            gossip_events,
            votes_pooled,
            known_hashes,
            completed_round,
            pending_pushes,
            tracked_pulls,
            validator_count,
        })
    }

    /// Copy the live counters and sizes into the registry.
    pub fn refresh(&self, pool: &VotePool, reconciler: &GossipReconciler, tracker: &PushTracker) {
        for (event, value) in pool.stats().snapshot() {
            self.vote_events
                .with_label_values(&[event])
                .set(saturating_i64(value));
        }
        for (event, value) in reconciler.stats().snapshot() {
            self.gossip_events
                .with_label_values(&[event])
                .set(saturating_i64(value));
        }
        self.votes_pooled.set(saturating_i64(pool.len() as u64));
        self.known_hashes.set(saturating_i64(pool.known_len() as u64));
        self.completed_round
            .set(pool.completed_round().map_or(-1, saturating_i64));
        self.pending_pushes
            .set(saturating_i64(reconciler.pending_len() as u64));
        self.tracked_pulls.set(saturating_i64(tracker.tracked() as u64));
    }

    /// Encode every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
