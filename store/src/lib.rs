//! Abstract storage traits for the quorum validator core.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod meta;

pub use error::StoreError;
pub use meta::MetaStore;
