//! Deterministic sortition index derivation.
//!
//! The canonical encoding of one draw is the fixed-width concatenation
//! `seed (32) || round (u64 BE) || step (u16 BE) || iteration (u32 BE)`,
//! hashed with Blake2b-256. The digest is read as a 256-bit big-endian
//! unsigned integer and reduced modulo the registry size.

use quorum_types::{Round, Seed, Step};

use crate::blake2b_256_multi;

/// Digest of one sortition draw.
pub fn sortition_hash(seed: &Seed, round: Round, step: Step, iteration: u32) -> [u8; 32] {
    blake2b_256_multi(&[
        seed.as_bytes(),
        &round.to_be_bytes(),
        &step.to_be_bytes(),
        &iteration.to_be_bytes(),
    ])
}

/// Reduce a 256-bit big-endian integer modulo `modulus`.
///
/// Returns `None` when `modulus` is zero.
pub fn hash_to_index(hash: &[u8; 32], modulus: usize) -> Option<usize> {
    if modulus == 0 {
        return None;
    }
    let m = modulus as u128;
    let rem = hash
        .iter()
        .fold(0u128, |acc, &byte| ((acc << 8) | byte as u128) % m);
    Some(rem as usize)
}

/// Registry position selected by draw `iteration` for (seed, round, step)
/// over a registry of `count` validators. `None` if the registry is empty.
pub fn sortition_index(
    seed: &Seed,
    round: Round,
    step: Step,
    iteration: u32,
    count: usize,
) -> Option<usize> {
    hash_to_index(&sortition_hash(seed, round, step, iteration), count)
}
