//! LMDB storage backend for the quorum validator core.
//!
//! Implements the storage traits from `quorum-store` using the `heed` LMDB
//! bindings. Each logical store maps to one LMDB database within a single
//! environment.

pub mod environment;
pub mod error;
pub mod meta;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use meta::LmdbMetaStore;
