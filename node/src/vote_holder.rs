//! The vote pool as the gossip holder for the `vote` category.

use std::sync::Arc;

use quorum_consensus::{Vote, VotePool};
use quorum_network::{EntryHolder, PendingTracker, PushTracker, StoredEntry};
use quorum_types::{Hash, ShardId};

pub struct VoteEntryHolder {
    pool: Arc<VotePool>,
    tracker: Arc<PushTracker>,
    max_parallel_pulls: u32,
}

impl VoteEntryHolder {
    pub fn new(pool: Arc<VotePool>, tracker: Arc<PushTracker>, max_parallel_pulls: u32) -> Self {
        Self {
            pool,
            tracker,
            max_parallel_pulls,
        }
    }

    pub fn pool(&self) -> &Arc<VotePool> {
        &self.pool
    }

    pub fn tracker(&self) -> &Arc<PushTracker> {
        &self.tracker
    }
}

impl EntryHolder for VoteEntryHolder {
    fn has(&self, hash: &Hash) -> bool {
        self.pool.contains(hash)
    }

    fn add(&self, hash: Hash, payload: Vec<u8>, _shard: ShardId, _high_priority: bool) -> bool {
        let vote = match Vote::from_bytes(&payload) {
            Ok(vote) => vote,
            Err(e) => {
                tracing::debug!(%hash, error = %e, "undecodable vote payload");
                return false;
            }
        };
        if vote.hash() != hash {
            tracing::debug!(%hash, actual = %vote.hash(), "vote payload does not match announced hash");
            return false;
        }
        // Stop retrying once the vote is here, accepted or not.
        self.tracker.complete(&hash);
        self.pool.submit(vote)
    }

    fn get(&self, hash: &Hash) -> Option<StoredEntry> {
        let vote = self.pool.lookup(hash)?;
        match vote.to_bytes() {
            Ok(payload) => Some(StoredEntry {
                payload,
                shard: 0,
                high_priority: false,
            }),
            Err(e) => {
                tracing::warn!(%hash, error = %e, "failed to encode stored vote");
                None
            }
        }
    }

    fn max_parallel_pulls(&self) -> u32 {
        self.max_parallel_pulls
    }

    fn pending_tracker(&self) -> Option<Arc<dyn PendingTracker>> {
        Some(self.tracker.clone())
    }
}
