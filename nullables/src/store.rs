//! Nullable store — thread-safe in-memory metadata storage for testing.

use quorum_store::meta::MetaStore;
use quorum_store::StoreError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// An in-memory [`MetaStore`] for testing.
///
/// Writes can be made to fail on demand with [`NullMetaStore::fail_writes`]
/// to exercise error paths of callers.
pub struct NullMetaStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl NullMetaStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            writes: AtomicU64::new(0),
        }
    }

    /// Make every subsequent `put_meta` / `delete_meta` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write failure injected".to_string()));
        }
        Ok(())
    }
}

impl Default for NullMetaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaStore for NullMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.entries.lock().unwrap().remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let store = NullMetaStore::new();
        store.put_meta("k", b"v").unwrap();
        assert_eq!(store.get_meta("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn missing_key_is_none() {
        let store = NullMetaStore::new();
        assert_eq!(store.get_meta("nope").unwrap(), None);
    }

    #[test]
    fn injected_failure_leaves_data_untouched() {
        let store = NullMetaStore::new();
        store.put_meta("k", b"old").unwrap();
        store.fail_writes(true);
        assert!(store.put_meta("k", b"new").is_err());
        assert!(store.delete_meta("k").is_err());
        assert_eq!(store.get_meta("k").unwrap(), Some(b"old".to_vec()));
        assert_eq!(store.write_count(), 1);

        store.fail_writes(false);
        store.put_meta("k", b"new").unwrap();
        assert_eq!(store.get_meta("k").unwrap(), Some(b"new".to_vec()));
    }
}
