//! Cryptographic primitives for the quorum validator core.
//!
//! - **Blake2b-256** for content hashes (votes, gossiped entries)
//! - **Sortition**: the deterministic seed/round/step/iteration → index
//!   recipe used for committee selection. Any consumer that needs to pick
//!   the same committee (e.g. an on-chain settlement contract) must use
//!   [`sortition_index`] unchanged.

pub mod hash;
pub mod sortition;

pub use hash::{blake2b_256, blake2b_256_multi, hash_content};
pub use sortition::{hash_to_index, sortition_hash, sortition_index};
