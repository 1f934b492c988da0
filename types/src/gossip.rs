//! Identifiers for gossiped items and the peers that announce them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Hash, TypesError};

/// Shard an entry belongs to. Passed through to entry holders untouched.
pub type ShardId = u32;

/// Gossip category. Each category is served by exactly one entry holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Vote,
    Block,
    Proof,
    Flip,
    KeyPackage,
    Transaction,
}

impl EntryType {
    pub const ALL: [EntryType; 6] = [
        Self::Vote,
        Self::Block,
        Self::Proof,
        Self::Flip,
        Self::KeyPackage,
        Self::Transaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vote => "vote",
            Self::Block => "block",
            Self::Proof => "proof",
            Self::Flip => "flip",
            Self::KeyPackage => "key_package",
            Self::Transaction => "transaction",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TypesError::UnknownEntryType(s.to_string()))
    }
}

/// Composite key identifying any gossiped item across categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PushPullKey {
    pub entry_type: EntryType,
    pub hash: Hash,
}

impl PushPullKey {
    pub fn new(entry_type: EntryType, hash: Hash) -> Self {
        Self { entry_type, hash }
    }
}

impl fmt::Display for PushPullKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entry_type, self.hash)
    }
}

/// Opaque identifier of a remote peer, as assigned by the transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
