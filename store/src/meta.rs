//! Metadata storage trait.

use crate::StoreError;

/// Generic key-value store for records that are read wholesale on startup
/// and rewritten wholesale on change (e.g. the validator registry).
///
/// Implementations must be safe to share between threads.
pub trait MetaStore: Send + Sync {
    /// Store a value, replacing any previous value under `key`.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a value. `Ok(None)` if the key has never been written.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete an entry. Deleting a missing key is not an error.
    fn delete_meta(&self, key: &str) -> Result<(), StoreError>;
}
