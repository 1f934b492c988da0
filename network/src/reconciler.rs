//! Gossip reconciler — turns many "peer P has item X" announcements into a
//! small, bounded number of pull requests.
//!
//! For each announced [`PushPullKey`] not already held locally, a pending
//! push record counts how many pulls have been dispatched within the
//! current window. The first announcement creates the record and pulls
//! immediately; later ones pull again until the holder's
//! `max_parallel_pulls` is reached, after which they are handed to the
//! holder's pending tracker (or dropped if it has none). Records expire
//! `pending_push_ttl` after creation, which re-enables fresh pulls for
//! items that stalled.
//!
//! Pull requests go onto a bounded queue drained by the transport. A full
//! queue drops the newest request; announcement handlers never block.

use quorum_types::{EntryType, PeerId, PushPullKey, ShardId};
use quorum_utils::{StatsCounter, ThrottledLog};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::holder::{EntryHolder, PendingTracker, RetryRequest, StoredEntry};
use crate::NetworkError;

/// Default outbound pull-request queue capacity.
pub const REQUEST_QUEUE_CAPACITY: usize = 5_000;

/// Default lifetime of a pending push record.
pub const PENDING_PUSH_TTL: Duration = Duration::from_secs(3 * 60);

/// Default cadence of the expired-record sweep.
pub const PENDING_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const STAT_LOCAL_HITS: &str = "local_hits";
pub const STAT_PULLS_ENQUEUED: &str = "pulls_enqueued";
pub const STAT_PULLS_DROPPED: &str = "pulls_dropped";
pub const STAT_PENDING_ROUTED: &str = "pending_routed";
pub const STAT_LOAD_SHED: &str = "load_shed";
pub const STAT_RETRIES: &str = "retries";

pub const RECONCILER_STATS: &[&str] = &[
    STAT_LOCAL_HITS,
    STAT_PULLS_ENQUEUED,
    STAT_PULLS_DROPPED,
    STAT_PENDING_ROUTED,
    STAT_LOAD_SHED,
    STAT_RETRIES,
];

#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    pub request_queue_capacity: usize,
    pub pending_push_ttl: Duration,
    pub pending_sweep_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            request_queue_capacity: REQUEST_QUEUE_CAPACITY,
            pending_push_ttl: PENDING_PUSH_TTL,
            pending_sweep_interval: PENDING_SWEEP_INTERVAL,
        }
    }
}

/// Ask `peer` for the item identified by `key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequest {
    pub peer: PeerId,
    pub key: PushPullKey,
}

/// What an announcement resulted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// Item already stored locally; nothing to do.
    AlreadyStored,
    /// A pull request was queued.
    Requested,
    /// A pull was due but the request queue was full; the request was dropped.
    QueueFull,
    /// Pull cap reached; the announcement went to the pending tracker.
    Deferred,
    /// Pull cap reached and the holder has no tracker; dropped.
    Shed,
}

struct PendingPush {
    attempts: AtomicU32,
    created: Instant,
}

impl PendingPush {
    fn new(now: Instant) -> Self {
        Self {
            attempts: AtomicU32::new(1),
            created: now,
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created) >= ttl
    }
}

/// Collects entry holders and validates the wiring before any traffic flows.
pub struct GossipReconcilerBuilder {
    config: ReconcilerConfig,
    holders: HashMap<EntryType, Arc<dyn EntryHolder>>,
    duplicate: Option<EntryType>,
}

impl GossipReconcilerBuilder {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            holders: HashMap::new(),
            duplicate: None,
        }
    }

    /// Bind `entry_type` to `holder`.
    pub fn register(mut self, entry_type: EntryType, holder: Arc<dyn EntryHolder>) -> Self {
        if self.holders.insert(entry_type, holder).is_some() && self.duplicate.is_none() {
            self.duplicate = Some(entry_type);
        }
        self
    }

    /// Fail unless every category in `required` has exactly one holder.
    pub fn build(self, required: &[EntryType]) -> Result<GossipReconciler, NetworkError> {
        if let Some(entry_type) = self.duplicate {
            return Err(NetworkError::DuplicateCategory(entry_type));
        }
        if let Some(missing) = required.iter().find(|t| !self.holders.contains_key(*t)) {
            return Err(NetworkError::UnregisteredCategory(*missing));
        }
        let mut categories: Vec<_> = self.holders.keys().map(EntryType::as_str).collect();
        categories.sort_unstable();
        tracing::info!(categories = ?categories, "gossip reconciler wired");
        Ok(GossipReconciler::new(self.config, self.holders))
    }
}

pub struct GossipReconciler {
    config: ReconcilerConfig,
    holders: HashMap<EntryType, Arc<dyn EntryHolder>>,
    /// Guarded get-or-insert: at most one first dispatch per key per window.
    pending: Mutex<HashMap<PushPullKey, Arc<PendingPush>>>,
    requests_tx: mpsc::Sender<PullRequest>,
    requests_rx: Mutex<Option<mpsc::Receiver<PullRequest>>>,
    stats: StatsCounter,
    skipped_log: ThrottledLog,
}

impl GossipReconciler {
    pub fn builder(config: ReconcilerConfig) -> GossipReconcilerBuilder {
        GossipReconcilerBuilder::new(config)
    }

    fn new(config: ReconcilerConfig, holders: HashMap<EntryType, Arc<dyn EntryHolder>>) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel(config.request_queue_capacity.max(1));
        Self {
            config,
            holders,
            pending: Mutex::new(HashMap::new()),
            requests_tx,
            requests_rx: Mutex::new(Some(requests_rx)),
            stats: StatsCounter::new(RECONCILER_STATS),
            skipped_log: ThrottledLog::new(
                "gossip_reconciler",
                quorum_utils::throttled_log::DEFAULT_THROTTLE_INTERVAL,
            ),
        }
    }

    /// Handle "`peer` has `key`".
    pub fn announce(&self, peer: &PeerId, key: PushPullKey) -> Result<AnnounceOutcome, NetworkError> {
        let holder = self.holder(key.entry_type)?;
        if holder.has(&key.hash) {
            self.stats.increment(STAT_LOCAL_HITS);
            return Ok(AnnounceOutcome::AlreadyStored);
        }
        let tracker = holder.pending_tracker();
        let now = Instant::now();

        let record = {
            let mut pending = self.lock_pending();
            let live = pending
                .get(&key)
                .filter(|p| !p.is_expired(now, self.config.pending_push_ttl))
                .cloned();
            match live {
                Some(record) => record,
                None => {
                    pending.insert(key, Arc::new(PendingPush::new(now)));
                    drop(pending);
                    return Ok(self.dispatch(peer.clone(), key, tracker.as_deref()));
                }
            }
        };
        let attempts = record.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        if attempts <= holder.max_parallel_pulls() {
            return Ok(self.dispatch(peer.clone(), key, tracker.as_deref()));
        }

        match tracker {
            Some(tracker) => {
                tracker.add_pending_push(peer.clone(), key.hash);
                self.stats.increment(STAT_PENDING_ROUTED);
                Ok(AnnounceOutcome::Deferred)
            }
            None => {
                self.stats.increment(STAT_LOAD_SHED);
                tracing::trace!(%key, %peer, "pull cap reached, announcement dropped");
                Ok(AnnounceOutcome::Shed)
            }
        }
    }

    /// Hand a pulled payload to the holder of its category.
    pub fn store_entry(
        &self,
        key: PushPullKey,
        payload: Vec<u8>,
        shard: ShardId,
        high_priority: bool,
    ) -> Result<bool, NetworkError> {
        Ok(self
            .holder(key.entry_type)?
            .add(key.hash, payload, shard, high_priority))
    }

    /// Serve a peer's pull from the holder of its category.
    pub fn fetch_entry(&self, key: PushPullKey) -> Result<Option<StoredEntry>, NetworkError> {
        Ok(self.holder(key.entry_type)?.get(&key.hash))
    }

    /// The outbound pull-request stream. Handed out once, to the transport.
    pub fn take_requests(&self) -> Option<mpsc::Receiver<PullRequest>> {
        self.requests_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Start the background tasks: one retry loop per category whose holder
    /// tracks pending requests, plus the expired-record sweeper.
    ///
    /// Must be called from within a tokio runtime. The tasks run for the
    /// lifetime of the process.
    pub fn run(self: &Arc<Self>) -> Result<Vec<JoinHandle<()>>, NetworkError> {
        let mut loops = Vec::new();
        for (&entry_type, holder) in &self.holders {
            let Some(tracker) = holder.pending_tracker() else {
                continue;
            };
            let retries = tracker
                .take_requests()
                .ok_or(NetworkError::TrackerUnavailable(entry_type))?;
            loops.push((entry_type, tracker, retries));
        }

        let mut handles = Vec::with_capacity(loops.len() + 1);
        for (entry_type, tracker, retries) in loops {
            let this = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                this.retry_loop(entry_type, tracker, retries).await;
            }));
        }

        let this = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.pending_sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                this.sweep_expired(Instant::now());
            }
        }));

        tracing::info!(tasks = handles.len(), "gossip reconciler running");
        Ok(handles)
    }

    /// Drop pending push records that have expired at `now`.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let ttl = self.config.pending_push_ttl;
        let mut pending = self.lock_pending();
        let before = pending.len();
        pending.retain(|_, p| !p.is_expired(now, ttl));
        let removed = before - pending.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = pending.len(), "swept pending pushes");
        }
        removed
    }

    /// Number of live-or-unswept pending push records.
    pub fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    pub fn categories(&self) -> impl Iterator<Item = EntryType> + '_ {
        self.holders.keys().copied()
    }

    async fn retry_loop(
        &self,
        entry_type: EntryType,
        tracker: Arc<dyn PendingTracker>,
        mut retries: mpsc::Receiver<RetryRequest>,
    ) {
        while let Some(RetryRequest { peer, hash }) = retries.recv().await {
            self.stats.increment(STAT_RETRIES);
            self.make_request(peer, PushPullKey::new(entry_type, hash));
            tracker.register_pull(&hash);
        }
        tracing::debug!(category = %entry_type, "retry stream closed");
    }

    fn dispatch(
        &self,
        peer: PeerId,
        key: PushPullKey,
        tracker: Option<&dyn PendingTracker>,
    ) -> AnnounceOutcome {
        let queued = self.make_request(peer, key);
        if let Some(tracker) = tracker {
            tracker.register_pull(&key.hash);
        }
        if queued {
            AnnounceOutcome::Requested
        } else {
            AnnounceOutcome::QueueFull
        }
    }

    fn make_request(&self, peer: PeerId, key: PushPullKey) -> bool {
        match self.requests_tx.try_send(PullRequest { peer, key }) {
            Ok(()) => {
                self.stats.increment(STAT_PULLS_ENQUEUED);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.increment(STAT_PULLS_DROPPED);
                self.skipped_log.warn("pull request skipped: request queue full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stats.increment(STAT_PULLS_DROPPED);
                self.skipped_log.warn("pull request skipped: request queue closed");
                false
            }
        }
    }

    fn holder(&self, entry_type: EntryType) -> Result<&Arc<dyn EntryHolder>, NetworkError> {
        self.holders.get(&entry_type).ok_or_else(|| {
            tracing::error!(category = %entry_type, "gossip for unregistered category");
            NetworkError::UnregisteredCategory(entry_type)
        })
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<PushPullKey, Arc<PendingPush>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}
