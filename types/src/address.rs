//! Validator / account address.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A 20-byte validator address.
///
/// Ordering is plain lexicographic byte order, which is what the validator
/// registry sorts on.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    pub const LEN: usize = 20;
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        crate::decode_hex_fixed::<20>(s).map(Self)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_bytewise() {
        let mut low = [0u8; 20];
        low[0] = 0x01;
        let mut high = [0u8; 20];
        high[0] = 0xFF;
        assert!(Address::new(high) > Address::new(low));
    }

    #[test]
    fn hex_roundtrip() {
        let addr = Address::new([0xAB; 20]);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn hex_without_prefix() {
        let addr = Address::from_hex(&"01".repeat(20)).unwrap();
        assert_eq!(addr, Address::new([1u8; 20]));
    }

    #[test]
    fn hex_wrong_length_rejected() {
        assert_eq!(
            Address::from_hex("0x0102"),
            Err(TypesError::InvalidLength {
                expected: 20,
                actual: 2
            })
        );
    }

    #[test]
    fn hex_bad_digit_rejected() {
        assert_eq!(Address::from_hex(&"zz".repeat(20)), Err(TypesError::InvalidHex));
    }
}
