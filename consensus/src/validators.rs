//! Validator registry and committee sortition.
//!
//! The registry is an ordered set of validator addresses, sorted descending
//! by raw byte value and persisted as a single record. Every node that holds
//! the same registry and the same (seed, round, step) derives the same
//! committee without communicating.
//!
//! Lock discipline: `write_lock` serialises mutations end to end (compute,
//! persist, publish). Readers clone the current `Arc` snapshot under a short
//! read lock, so they observe either the state before or after a mutation,
//! never a half-sorted list.

use quorum_crypto::sortition_index;
use quorum_store::MetaStore;
use quorum_types::{Address, Round, Seed, Step};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use crate::ConsensusError;

/// Meta-store key holding the serialized registry.
pub const VALIDATORS_KEY: &str = "validators";

/// Draw budget per requested committee seat.
const ATTEMPTS_PER_SEAT: usize = 3;

/// A sampled committee. Members keep the order in which they were drawn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Committee {
    members: Vec<Address>,
    index: HashSet<Address>,
}

impl Committee {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            members: Vec::with_capacity(capacity),
            index: HashSet::with_capacity(capacity),
        }
    }

    fn insert(&mut self, addr: Address) {
        if self.index.insert(addr) {
            self.members.push(addr);
        }
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.index.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in draw order.
    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.members.iter()
    }

    pub fn into_set(self) -> HashSet<Address> {
        self.index
    }
}

/// Persisted, ordered set of validator addresses.
pub struct ValidatorRegistry {
    store: Arc<dyn MetaStore>,
    snapshot: RwLock<Arc<Vec<Address>>>,
    write_lock: Mutex<()>,
}

impl ValidatorRegistry {
    /// Rebuild the registry from `store`. An absent record loads as empty.
    pub fn load(store: Arc<dyn MetaStore>) -> Result<Self, ConsensusError> {
        let mut validators = match store.get_meta(VALIDATORS_KEY)? {
            Some(bytes) => bincode::deserialize::<Vec<Address>>(&bytes)
                .map_err(|e| ConsensusError::Serialization(e.to_string()))?,
            None => Vec::new(),
        };
        sort_descending(&mut validators);
        validators.dedup();

        tracing::info!(count = validators.len(), "loaded validator registry");

        Ok(Self {
            store,
            snapshot: RwLock::new(Arc::new(validators)),
            write_lock: Mutex::new(()),
        })
    }

    /// Add `addr`, re-sort, persist the full list, then publish it.
    ///
    /// Returns `Ok(false)` without writing if `addr` is already registered.
    /// If persisting fails the in-memory registry is left unchanged.
    pub fn add_validator(&self, addr: Address) -> Result<bool, ConsensusError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.validators();
        if current.contains(&addr) {
            tracing::debug!(%addr, "validator already registered");
            return Ok(false);
        }

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend_from_slice(&current);
        next.push(addr);
        sort_descending(&mut next);

        let bytes =
            bincode::serialize(&next).map_err(|e| ConsensusError::Serialization(e.to_string()))?;
        self.store.put_meta(VALIDATORS_KEY, &bytes)?;

        let count = next.len();
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);

        tracing::info!(%addr, count, "validator added");
        Ok(true)
    }

    /// Current ordered snapshot (descending byte order).
    pub fn validators(&self) -> Arc<Vec<Address>> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.validators().contains(addr)
    }

    pub fn count(&self) -> usize {
        self.validators().len()
    }

    /// Deterministically sample `limit` distinct validators for (seed, round, step).
    ///
    /// Draw `i` selects the validator at `sortition_index(seed, round, step, i)`
    /// modulo the registry size; repeated picks are absorbed by set semantics.
    /// At most `3 * limit` draws are made. If that budget runs out before
    /// `limit` distinct members are found the call fails; a partial committee
    /// is never returned.
    pub fn sample_committee(
        &self,
        seed: &Seed,
        round: Round,
        step: Step,
        limit: usize,
    ) -> Result<Committee, ConsensusError> {
        let validators = self.validators();
        let available = validators.len();
        let max_attempts =
            u32::try_from(limit.saturating_mul(ATTEMPTS_PER_SEAT)).unwrap_or(u32::MAX);

        let mut committee = Committee::with_capacity(limit.min(available));
        let mut attempts = 0u32;

        // More seats than validators can never be filled.
        if limit <= available {
            while committee.len() < limit && attempts < max_attempts {
                let Some(idx) = sortition_index(seed, round, step, attempts, available) else {
                    break;
                };
                committee.insert(validators[idx]);
                attempts += 1;
            }
        }

        if committee.len() < limit {
            tracing::debug!(round, step, limit, available, attempts, "committee unavailable");
            return Err(ConsensusError::CommitteeUnavailable {
                limit,
                available,
                attempts,
            });
        }
        Ok(committee)
    }
}

/// Stable sort, highest address first.
fn sort_descending(nodes: &mut [Address]) {
    nodes.sort_by(|a, b| b.cmp(a));
}
