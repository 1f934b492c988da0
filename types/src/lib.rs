//! Fundamental types for the quorum validator core.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! validator addresses, content hashes, per-round seeds, and the keys used to
//! identify gossiped items.

pub mod address;
pub mod error;
pub mod gossip;
pub mod hash;

pub use address::Address;
pub use error::TypesError;
pub use gossip::{EntryType, PeerId, PushPullKey, ShardId};
pub use hash::{Hash, Seed};

/// Consensus round number.
pub type Round = u64;

/// Step within a consensus round.
pub type Step = u16;

/// Parse a fixed-size hex string, with or without a `0x` prefix.
pub(crate) fn decode_hex_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypesError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() != N * 2 {
        return Err(TypesError::InvalidLength {
            expected: N,
            actual: s.len() / 2,
        });
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(s, &mut out).map_err(|_| TypesError::InvalidHex)?;
    Ok(out)
}
