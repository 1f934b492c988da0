//! Consensus membership and vote aggregation.
//!
//! ## Module overview
//!
//! - [`validators`] — Ordered, persisted validator registry and deterministic
//!   committee sortition.
//! - [`vote`] — Immutable vote with a content-derived hash.
//! - [`known_hashes`] — Bounded FIFO window of recently accepted vote hashes.
//! - [`vote_pool`] — Concurrent vote store indexed by round and by hash.
//! - [`error`] — Consensus error types.

pub mod error;
pub mod known_hashes;
pub mod validators;
pub mod vote;
pub mod vote_pool;

pub use error::ConsensusError;
pub use known_hashes::KnownHashWindow;
pub use validators::{Committee, ValidatorRegistry, VALIDATORS_KEY};
pub use vote::{Vote, VoteHeader};
pub use vote_pool::{VotePool, MAX_KNOWN_VOTES};
