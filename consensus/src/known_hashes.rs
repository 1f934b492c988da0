//! Bounded window of recently accepted vote hashes.
//!
//! Used purely to reject duplicate / spammed votes cheaply. It is not the
//! authoritative vote store: a hash can fall out of the window while the
//! vote itself is still held by the pool.

use quorum_types::Hash;
use std::collections::{HashSet, VecDeque};

/// Insertion-ordered set of hashes with oldest-first eviction.
pub struct KnownHashWindow {
    capacity: usize,
    hashes: HashSet<Hash>,
    order: VecDeque<Hash>,
}

impl KnownHashWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            hashes: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.hashes.contains(hash)
    }

    /// Record `hash`. Returns `false` if it was already present.
    ///
    /// At capacity the oldest entry is evicted before the new one is
    /// inserted, so the window never holds more than `capacity` hashes.
    pub fn insert(&mut self, hash: Hash) -> bool {
        if self.hashes.contains(&hash) {
            return false;
        }
        if self.capacity == 0 {
            return true;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.hashes.remove(&oldest);
            }
        }
        self.hashes.insert(hash);
        self.order.push_back(hash);
        true
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(n: u32) -> Hash {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&n.to_be_bytes());
        Hash::new(bytes)
    }

    #[test]
    fn new_window_is_empty() {
        let w = KnownHashWindow::new(10);
        assert!(w.is_empty());
        assert_eq!(w.capacity(), 10);
    }

    #[test]
    fn insert_then_contains() {
        let mut w = KnownHashWindow::new(10);
        assert!(w.insert(h(1)));
        assert!(w.contains(&h(1)));
        assert!(!w.insert(h(1)));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut w = KnownHashWindow::new(3);
        for i in 1..=3 {
            w.insert(h(i));
        }
        w.insert(h(4));
        assert_eq!(w.len(), 3);
        assert!(!w.contains(&h(1)));
        assert!(w.contains(&h(2)));
        assert!(w.contains(&h(4)));

        w.insert(h(5));
        assert!(!w.contains(&h(2)));
        assert!(w.contains(&h(3)));
    }

    #[test]
    fn evicted_hash_can_be_reinserted() {
        let mut w = KnownHashWindow::new(2);
        w.insert(h(1));
        w.insert(h(2));
        w.insert(h(3));
        assert!(w.insert(h(1)));
        // h(2) made room for h(1)
        assert!(!w.contains(&h(2)));
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut w = KnownHashWindow::new(50);
        for i in 0..1_000 {
            w.insert(h(i));
            assert!(w.len() <= 50);
        }
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut w = KnownHashWindow::new(0);
        assert!(w.insert(h(1)));
        assert!(w.insert(h(1)));
        assert!(w.is_empty());
    }
}
