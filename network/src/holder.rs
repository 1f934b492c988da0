//! Capability traits implemented by per-category storage.

use quorum_types::{Hash, PeerId, ShardId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// An item as held by an entry holder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    pub payload: Vec<u8>,
    pub shard: ShardId,
    pub high_priority: bool,
}

/// Ask the reconciler to pull `hash` from `peer` again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryRequest {
    pub peer: PeerId,
    pub hash: Hash,
}

/// Authoritative local storage for one gossip category.
pub trait EntryHolder: Send + Sync {
    /// Whether the item is already stored locally.
    fn has(&self, hash: &Hash) -> bool;

    /// Store a pulled payload. Returns `false` if the holder rejected it.
    fn add(&self, hash: Hash, payload: Vec<u8>, shard: ShardId, high_priority: bool) -> bool;

    fn get(&self, hash: &Hash) -> Option<StoredEntry>;

    /// Upper bound on concurrent pulls of the same item.
    fn max_parallel_pulls(&self) -> u32;

    /// Tracker for announcements that arrived while the pull cap was reached.
    fn pending_tracker(&self) -> Option<Arc<dyn PendingTracker>> {
        None
    }

    fn supports_pending_requests(&self) -> bool {
        self.pending_tracker().is_some()
    }
}

/// Remembers throttled announcements and later asks for them to be retried.
pub trait PendingTracker: Send + Sync {
    /// A pull for `hash` has just been dispatched.
    fn register_pull(&self, hash: &Hash);

    /// `peer` announced `hash` while the pull cap was reached.
    fn add_pending_push(&self, peer: PeerId, hash: Hash);

    /// Stream of retries. Handed out once, to the reconciler's retry loop.
    fn take_requests(&self) -> Option<mpsc::Receiver<RetryRequest>>;
}
