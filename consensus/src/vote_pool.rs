//! Round-scoped vote pool.
//!
//! Holds every accepted vote twice: grouped by round (for tallying) and
//! flat by hash (for gossip lookups). A separate bounded window of known
//! hashes rejects duplicates cheaply. Once a round is finalized,
//! [`VotePool::complete_round`] drops it and everything before it.
//!
//! Lock discipline: the round index, the hash index and the known-hash
//! window each have their own lock and no operation holds two of them at
//! once. `complete_round` raises a watermark under the round-index lock;
//! `submit` re-checks that watermark under the same lock before indexing a
//! vote by round, so a vote for a completed round can never survive.

use quorum_types::{Address, Hash, Round};
use quorum_utils::StatsCounter;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use crate::{KnownHashWindow, ValidatorRegistry, Vote};

/// Maximum number of hashes remembered for duplicate rejection.
pub const MAX_KNOWN_VOTES: usize = 100_000;

const STAT_ACCEPTED: &str = "accepted";
const STAT_DUPLICATE: &str = "duplicate";
const STAT_NON_MEMBER: &str = "non_member";
const STAT_STALE_ROUND: &str = "stale_round";

pub const VOTE_POOL_STATS: &[&str] = &[
    STAT_ACCEPTED,
    STAT_DUPLICATE,
    STAT_NON_MEMBER,
    STAT_STALE_ROUND,
];

#[derive(Default)]
struct RoundIndex {
    rounds: BTreeMap<Round, HashMap<Hash, Arc<Vote>>>,
    /// Highest round passed to `complete_round`.
    completed: Option<Round>,
}

impl RoundIndex {
    fn is_completed(&self, round: Round) -> bool {
        self.completed.is_some_and(|c| round <= c)
    }
}

pub struct VotePool {
    registry: Arc<ValidatorRegistry>,
    by_round: RwLock<RoundIndex>,
    by_hash: RwLock<HashMap<Hash, Arc<Vote>>>,
    known: Mutex<KnownHashWindow>,
    stats: StatsCounter,
}

impl VotePool {
    pub fn new(registry: Arc<ValidatorRegistry>) -> Self {
        Self::with_known_capacity(registry, MAX_KNOWN_VOTES)
    }

    pub fn with_known_capacity(registry: Arc<ValidatorRegistry>, capacity: usize) -> Self {
        Self {
            registry,
            by_round: RwLock::new(RoundIndex::default()),
            by_hash: RwLock::new(HashMap::new()),
            known: Mutex::new(KnownHashWindow::new(capacity)),
            stats: StatsCounter::new(VOTE_POOL_STATS),
        }
    }

    /// Offer a vote to the pool. Returns `true` if it was accepted.
    ///
    /// Rejections (duplicate hash, voter outside a non-empty registry, vote
    /// for an already completed round) are routine and only logged.
    pub fn submit(&self, vote: Vote) -> bool {
        let hash = vote.hash();
        let round = vote.round();

        if self.known_contains(&hash) {
            self.stats.increment(STAT_DUPLICATE);
            tracing::trace!(%hash, "duplicate vote");
            return false;
        }

        if !self.admits(vote.voter()) {
            self.stats.increment(STAT_NON_MEMBER);
            tracing::debug!(%hash, voter = %vote.voter(), "vote from non-validator");
            return false;
        }

        if self.read_rounds().is_completed(round) {
            self.stats.increment(STAT_STALE_ROUND);
            tracing::debug!(%hash, round, "vote for completed round");
            return false;
        }

        // Two racing submits of the same vote: only one wins the window.
        if !self.known.lock().unwrap_or_else(|e| e.into_inner()).insert(hash) {
            self.stats.increment(STAT_DUPLICATE);
            return false;
        }

        let vote = Arc::new(vote);
        self.write_hashes().insert(hash, Arc::clone(&vote));

        let mut rounds = self.write_rounds();
        if rounds.is_completed(round) {
            drop(rounds);
            self.write_hashes().remove(&hash);
            self.stats.increment(STAT_STALE_ROUND);
            tracing::debug!(%hash, round, "round completed during submit");
            return false;
        }
        rounds.rounds.entry(round).or_default().insert(hash, vote);
        drop(rounds);

        self.stats.increment(STAT_ACCEPTED);
        tracing::trace!(%hash, round, "vote accepted");
        true
    }

    pub fn lookup(&self, hash: &Hash) -> Option<Arc<Vote>> {
        self.read_hashes().get(hash).cloned()
    }

    /// Whether a vote with `hash` is currently stored.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.read_hashes().contains_key(hash)
    }

    /// All votes stored for `round`, keyed by hash. Empty if none.
    pub fn votes_for_round(&self, round: Round) -> HashMap<Hash, Arc<Vote>> {
        self.read_rounds()
            .rounds
            .get(&round)
            .cloned()
            .unwrap_or_default()
    }

    /// Permanently drop every vote with `header.round <= round`.
    ///
    /// Later submissions for those rounds are rejected. Rounds above the
    /// threshold are untouched.
    pub fn complete_round(&self, round: Round) {
        let purged_rounds = {
            let mut index = self.write_rounds();
            index.completed = Some(index.completed.map_or(round, |c| c.max(round)));
            match round.checked_add(1) {
                Some(next) => {
                    let keep = index.rounds.split_off(&next);
                    std::mem::replace(&mut index.rounds, keep).len()
                }
                None => std::mem::take(&mut index.rounds).len(),
            }
        };

        let purged_votes = {
            let mut hashes = self.write_hashes();
            let before = hashes.len();
            hashes.retain(|_, vote| vote.round() > round);
            before - hashes.len()
        };

        tracing::debug!(round, purged_rounds, purged_votes, "completed round");
    }

    /// Highest round passed to [`VotePool::complete_round`], if any.
    pub fn completed_round(&self) -> Option<Round> {
        self.read_rounds().completed
    }

    /// Number of stored votes.
    pub fn len(&self) -> usize {
        self.read_hashes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_hashes().is_empty()
    }

    /// Number of hashes in the duplicate-rejection window.
    pub fn known_len(&self) -> usize {
        self.known.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    /// An empty registry admits everyone (bootstrap, before any validator
    /// is known).
    fn admits(&self, voter: &Address) -> bool {
        let validators = self.registry.validators();
        validators.is_empty() || validators.contains(voter)
    }

    fn known_contains(&self, hash: &Hash) -> bool {
        self.known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(hash)
    }

    fn read_rounds(&self) -> std::sync::RwLockReadGuard<'_, RoundIndex> {
        self.by_round.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_rounds(&self) -> std::sync::RwLockWriteGuard<'_, RoundIndex> {
        self.by_round.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_hashes(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Hash, Arc<Vote>>> {
        self.by_hash.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_hashes(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Hash, Arc<Vote>>> {
        self.by_hash.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VoteHeader;
    use quorum_nullables::NullMetaStore;

    fn open_registry() -> Arc<ValidatorRegistry> {
        Arc::new(ValidatorRegistry::load(Arc::new(NullMetaStore::new())).unwrap())
    }

    fn voter(n: u32) -> Address {
        let mut bytes = [0u8; 20];
        bytes[..4].copy_from_slice(&n.to_be_bytes());
        Address::new(bytes)
    }

    fn vote(round: Round, n: u32) -> Vote {
        Vote::new(
            VoteHeader {
                round,
                step: 1,
                voted_hash: Hash::new([0x11; 32]),
            },
            voter(n),
            vec![],
        )
    }

    #[test]
    fn accepted_vote_is_indexed_both_ways() {
        let pool = VotePool::new(open_registry());
        let v = vote(3, 1);
        let hash = v.hash();
        assert!(pool.submit(v));
        assert!(pool.lookup(&hash).is_some());
        assert!(pool.votes_for_round(3).contains_key(&hash));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.known_len(), 1);
    }

    #[test]
    fn duplicate_is_rejected() {
        let pool = VotePool::new(open_registry());
        assert!(pool.submit(vote(1, 1)));
        assert!(!pool.submit(vote(1, 1)));
        assert_eq!(pool.votes_for_round(1).len(), 1);
        assert_eq!(pool.stats().get(STAT_DUPLICATE), 1);
    }

    #[test]
    fn empty_registry_accepts_anyone() {
        let pool = VotePool::new(open_registry());
        assert!(pool.submit(vote(1, 42)));
    }

    #[test]
    fn non_member_rejected_once_registry_populated() {
        let registry = open_registry();
        registry.add_validator(voter(1)).unwrap();
        let pool = VotePool::new(registry);

        assert!(pool.submit(vote(1, 1)));
        assert!(!pool.submit(vote(1, 2)));
        assert_eq!(pool.stats().get(STAT_NON_MEMBER), 1);
        // A rejected vote is not remembered as known.
        assert_eq!(pool.known_len(), 1);
    }

    #[test]
    fn unknown_round_is_empty() {
        let pool = VotePool::new(open_registry());
        assert!(pool.votes_for_round(99).is_empty());
        assert!(pool.lookup(&Hash::new([1u8; 32])).is_none());
    }

    #[test]
    fn complete_round_prunes_at_and_below() {
        let pool = VotePool::new(open_registry());
        for round in [3, 5, 6] {
            assert!(pool.submit(vote(round, 1)));
            assert!(pool.submit(vote(round, 2)));
        }
        let kept = vote(6, 1).hash();
        let dropped = vote(3, 1).hash();

        pool.complete_round(5);

        assert!(pool.votes_for_round(3).is_empty());
        assert!(pool.votes_for_round(5).is_empty());
        assert_eq!(pool.votes_for_round(6).len(), 2);
        assert!(pool.lookup(&dropped).is_none());
        assert!(pool.lookup(&kept).is_some());
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.completed_round(), Some(5));
    }

    #[test]
    fn late_vote_for_completed_round_is_rejected() {
        let pool = VotePool::new(open_registry());
        pool.complete_round(5);
        assert!(!pool.submit(vote(4, 1)));
        assert!(!pool.submit(vote(5, 1)));
        assert!(pool.submit(vote(6, 1)));
        assert_eq!(pool.stats().get(STAT_STALE_ROUND), 2);
    }

    #[test]
    fn watermark_never_moves_backwards() {
        let pool = VotePool::new(open_registry());
        pool.complete_round(10);
        pool.complete_round(4);
        assert_eq!(pool.completed_round(), Some(10));
        assert!(!pool.submit(vote(8, 1)));
    }

    #[test]
    fn complete_max_round_clears_everything() {
        let pool = VotePool::new(open_registry());
        pool.submit(vote(u64::MAX, 1));
        pool.submit(vote(1, 1));
        pool.complete_round(u64::MAX);
        assert!(pool.is_empty());
    }

    #[test]
    fn evicted_hash_is_accepted_again_and_vote_stays_retrievable() {
        let pool = VotePool::with_known_capacity(open_registry(), 3);
        let first = vote(1, 0);
        let first_hash = first.hash();
        assert!(pool.submit(first.clone()));
        for n in 1..=3 {
            assert!(pool.submit(vote(1, n)));
        }
        assert_eq!(pool.known_len(), 3);
        // Evicted from the window, still stored.
        assert!(pool.lookup(&first_hash).is_some());
        assert!(pool.submit(first));
        assert_eq!(pool.votes_for_round(1).len(), 4);
    }

    #[test]
    fn known_window_is_bounded_at_default_capacity() {
        let pool = VotePool::new(open_registry());
        let first = vote(1, 0);
        let first_hash = first.hash();
        for n in 0..=(MAX_KNOWN_VOTES as u32) {
            assert!(pool.submit(vote(1, n)));
        }
        assert_eq!(pool.known_len(), MAX_KNOWN_VOTES);
        assert_eq!(pool.len(), MAX_KNOWN_VOTES + 1);
        assert!(pool.lookup(&first_hash).is_some());
        assert!(pool.submit(first));
        assert_eq!(pool.known_len(), MAX_KNOWN_VOTES);
    }

    #[test]
    fn concurrent_submits_and_completion() {
        let pool = Arc::new(VotePool::new(open_registry()));
        let writers: Vec<_> = (0..4u32)
            .map(|t| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        pool.submit(vote(10 + (i % 5) as Round, t * 1_000 + i));
                        pool.submit(vote(1 + (i % 5) as Round, t * 1_000 + i));
                    }
                })
            })
            .collect();
        let completer = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                for r in 1..=5 {
                    pool.complete_round(r);
                }
            })
        };
        for h in writers {
            h.join().unwrap();
        }
        completer.join().unwrap();
        pool.complete_round(5);

        // Rounds above the threshold all landed.
        let above: usize = (10..15).map(|r| pool.votes_for_round(r).len()).sum();
        assert_eq!(above, 2_000);
        for r in 1..=5 {
            assert!(pool.votes_for_round(r).is_empty());
        }
        assert_eq!(pool.len(), 2_000);
    }

    #[test]
    fn racing_duplicates_accept_once() {
        let pool = Arc::new(VotePool::new(open_registry()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || pool.submit(vote(2, 7)))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();
        assert_eq!(accepted, 1);
    }
}
