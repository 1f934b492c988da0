//! Default pending tracker.
//!
//! When the reconciler hits the per-item pull cap it hands further
//! announcements here instead of pulling again. Each tracked item records
//! when its latest pull was dispatched and which peers are waiting as
//! alternative sources. A periodic tick re-issues a pull to the next waiting
//! peer for every item whose pull has been outstanding longer than
//! `pull_timeout`. Items are forgotten once stored ([`PushTracker::complete`])
//! or once their waiting list runs dry.

use quorum_types::{Hash, PeerId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::holder::{PendingTracker, RetryRequest};

/// Default time a pull may stay unanswered before it is retried elsewhere.
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default cap on alternative peers remembered per item.
pub const DEFAULT_MAX_PENDING_PER_HASH: usize = 16;

/// Default capacity of the retry channel.
pub const DEFAULT_RETRY_QUEUE_CAPACITY: usize = 1_000;

#[derive(Clone, Debug)]
pub struct PushTrackerConfig {
    pub pull_timeout: Duration,
    pub max_pending_per_hash: usize,
    pub retry_queue_capacity: usize,
}

impl Default for PushTrackerConfig {
    fn default() -> Self {
        Self {
            pull_timeout: DEFAULT_PULL_TIMEOUT,
            max_pending_per_hash: DEFAULT_MAX_PENDING_PER_HASH,
            retry_queue_capacity: DEFAULT_RETRY_QUEUE_CAPACITY,
        }
    }
}

#[derive(Default)]
struct TrackedItem {
    /// When the latest pull for this item was dispatched.
    pulled_at: Option<Instant>,
    /// Peers that announced the item while the cap was reached, oldest first.
    waiting: VecDeque<PeerId>,
}

pub struct PushTracker {
    config: PushTrackerConfig,
    items: Mutex<HashMap<Hash, TrackedItem>>,
    retry_tx: mpsc::Sender<RetryRequest>,
    retry_rx: Mutex<Option<mpsc::Receiver<RetryRequest>>>,
}

impl PushTracker {
    pub fn new(config: PushTrackerConfig) -> Self {
        let (retry_tx, retry_rx) = mpsc::channel(config.retry_queue_capacity.max(1));
        Self {
            config,
            items: Mutex::new(HashMap::new()),
            retry_tx,
            retry_rx: Mutex::new(Some(retry_rx)),
        }
    }

    /// Forget `hash`; called by the holder once the item is stored.
    pub fn complete(&self, hash: &Hash) {
        self.lock_items().remove(hash);
    }

    /// Retry every pull outstanding longer than the timeout at `now`.
    ///
    /// Returns the number of retries queued. Items with nobody left to ask
    /// are dropped.
    pub fn poll_expired(&self, now: Instant) -> usize {
        let timeout = self.config.pull_timeout;
        let mut items = self.lock_items();
        let mut queued = 0;
        let mut exhausted = Vec::new();

        for (hash, item) in items.iter_mut() {
            let due = item
                .pulled_at
                .map_or(true, |at| now.saturating_duration_since(at) >= timeout);
            if !due {
                continue;
            }
            let Some(peer) = item.waiting.pop_front() else {
                exhausted.push(*hash);
                continue;
            };
            match self.retry_tx.try_send(RetryRequest {
                peer,
                hash: *hash,
            }) {
                Ok(()) => {
                    // Hold off until the reconciler re-registers the pull.
                    item.pulled_at = Some(now);
                    queued += 1;
                }
                Err(mpsc::error::TrySendError::Full(req))
                | Err(mpsc::error::TrySendError::Closed(req)) => {
                    item.waiting.push_front(req.peer);
                    break;
                }
            }
        }

        for hash in exhausted {
            items.remove(&hash);
        }
        if queued > 0 {
            tracing::debug!(queued, tracked = items.len(), "retrying stalled pulls");
        }
        queued
    }

    /// Spawn the periodic tick. Runs for the lifetime of the process.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracker.poll_expired(Instant::now());
            }
        })
    }

    /// Number of items currently tracked.
    pub fn tracked(&self) -> usize {
        self.lock_items().len()
    }

    /// Number of peers waiting as alternative sources for `hash`.
    pub fn waiting_for(&self, hash: &Hash) -> usize {
        self.lock_items()
            .get(hash)
            .map(|item| item.waiting.len())
            .unwrap_or(0)
    }

    fn lock_items(&self) -> std::sync::MutexGuard<'_, HashMap<Hash, TrackedItem>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PushTracker {
    fn default() -> Self {
        Self::new(PushTrackerConfig::default())
    }
}

impl PendingTracker for PushTracker {
    fn register_pull(&self, hash: &Hash) {
        self.lock_items().entry(*hash).or_default().pulled_at = Some(Instant::now());
    }

    fn add_pending_push(&self, peer: PeerId, hash: Hash) {
        let mut items = self.lock_items();
        let item = items.entry(hash).or_default();
        if item.waiting.len() < self.config.max_pending_per_hash && !item.waiting.contains(&peer)
        {
            item.waiting.push_back(peer);
        }
    }

    fn take_requests(&self) -> Option<mpsc::Receiver<RetryRequest>> {
        self.retry_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(byte: u8) -> Hash {
        Hash::new([byte; 32])
    }

    fn tracker(timeout_ms: u64) -> PushTracker {
        PushTracker::new(PushTrackerConfig {
            pull_timeout: Duration::from_millis(timeout_ms),
            max_pending_per_hash: 3,
            retry_queue_capacity: 8,
        })
    }

    #[test]
    fn fresh_pull_is_not_retried() {
        let t = tracker(1_000);
        t.register_pull(&h(1));
        t.add_pending_push(PeerId::from("b"), h(1));
        assert_eq!(t.poll_expired(Instant::now()), 0);
        assert_eq!(t.waiting_for(&h(1)), 1);
    }

    #[test]
    fn stalled_pull_retries_next_waiting_peer() {
        let t = tracker(10);
        let mut rx = t.take_requests().unwrap();
        t.register_pull(&h(1));
        t.add_pending_push(PeerId::from("b"), h(1));
        t.add_pending_push(PeerId::from("c"), h(1));

        let later = Instant::now() + Duration::from_millis(20);
        assert_eq!(t.poll_expired(later), 1);
        let req = rx.try_recv().unwrap();
        assert_eq!(req.peer, PeerId::from("b"));
        assert_eq!(req.hash, h(1));
        assert_eq!(t.waiting_for(&h(1)), 1);

        // Not due again until another timeout passes.
        assert_eq!(t.poll_expired(later), 0);
    }

    #[test]
    fn item_dropped_when_nobody_waits() {
        let t = tracker(10);
        t.register_pull(&h(1));
        assert_eq!(t.tracked(), 1);
        t.poll_expired(Instant::now() + Duration::from_millis(20));
        assert_eq!(t.tracked(), 0);
    }

    #[test]
    fn complete_forgets_item() {
        let t = tracker(10);
        t.register_pull(&h(1));
        t.add_pending_push(PeerId::from("b"), h(1));
        t.complete(&h(1));
        assert_eq!(t.tracked(), 0);
        assert_eq!(t.poll_expired(Instant::now() + Duration::from_secs(1)), 0);
    }

    #[test]
    fn waiting_list_is_bounded_and_deduplicated() {
        let t = tracker(10);
        for peer in ["a", "a", "b", "c", "d", "e"] {
            t.add_pending_push(PeerId::from(peer), h(1));
        }
        assert_eq!(t.waiting_for(&h(1)), 3);
    }

    #[test]
    fn requests_are_handed_out_once() {
        let t = tracker(10);
        assert!(t.take_requests().is_some());
        assert!(t.take_requests().is_none());
    }

    #[test]
    fn full_retry_queue_keeps_peer_waiting() {
        let t = PushTracker::new(PushTrackerConfig {
            pull_timeout: Duration::from_millis(1),
            max_pending_per_hash: 4,
            retry_queue_capacity: 1,
        });
        let _rx = t.take_requests().unwrap();
        for byte in 1..=2 {
            t.register_pull(&h(byte));
            t.add_pending_push(PeerId::from("p"), h(byte));
        }
        let later = Instant::now() + Duration::from_millis(10);
        assert_eq!(t.poll_expired(later), 1);
        let still_waiting = t.waiting_for(&h(1)) + t.waiting_for(&h(2));
        assert_eq!(still_waiting, 1);
    }

    #[tokio::test]
    async fn spawned_tick_emits_retries() {
        let t = Arc::new(tracker(5));
        let mut rx = t.take_requests().unwrap();
        t.register_pull(&h(9));
        t.add_pending_push(PeerId::from("z"), h(9));

        let handle = t.spawn(Duration::from_millis(5));
        let req = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("retry emitted")
            .expect("channel open");
        assert_eq!(req.peer, PeerId::from("z"));
        handle.abort();
    }
}
