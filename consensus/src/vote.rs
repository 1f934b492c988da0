//! Votes as gossiped between validators.
//!
//! A vote is immutable once built. Its hash is derived from the header and
//! the voter only, so two signatures over the same (header, voter) are the
//! same vote as far as deduplication is concerned.

use quorum_crypto::blake2b_256_multi;
use quorum_types::{Address, Hash, Round, Step};
use serde::{Deserialize, Serialize};

use crate::ConsensusError;

/// What a vote is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteHeader {
    pub round: Round,
    pub step: Step,
    /// Hash of the block being voted for.
    pub voted_hash: Hash,
}

/// Wire form of a vote; the hash is recomputed on decode, never trusted.
#[derive(Clone, Serialize, Deserialize)]
struct VoteBody {
    header: VoteHeader,
    voter: Address,
    signature: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VoteBody", into = "VoteBody")]
pub struct Vote {
    pub header: VoteHeader,
    voter: Address,
    signature: Vec<u8>,
    hash: Hash,
}

impl Vote {
    pub fn new(header: VoteHeader, voter: Address, signature: Vec<u8>) -> Self {
        let hash = compute_hash(&header, &voter);
        Self {
            header,
            voter,
            signature,
            hash,
        }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn voter(&self) -> &Address {
        &self.voter
    }

    pub fn round(&self) -> Round {
        self.header.round
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ConsensusError> {
        bincode::serialize(self).map_err(|e| ConsensusError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConsensusError> {
        bincode::deserialize(bytes).map_err(|e| ConsensusError::Serialization(e.to_string()))
    }
}

impl From<VoteBody> for Vote {
    fn from(body: VoteBody) -> Self {
        Vote::new(body.header, body.voter, body.signature)
    }
}

impl From<Vote> for VoteBody {
    fn from(vote: Vote) -> Self {
        VoteBody {
            header: vote.header,
            voter: vote.voter,
            signature: vote.signature,
        }
    }
}

fn compute_hash(header: &VoteHeader, voter: &Address) -> Hash {
    Hash::new(blake2b_256_multi(&[
        &header.round.to_be_bytes(),
        &header.step.to_be_bytes(),
        header.voted_hash.as_bytes(),
        voter.as_bytes(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(round: Round) -> VoteHeader {
        VoteHeader {
            round,
            step: 1,
            voted_hash: Hash::new([0xBB; 32]),
        }
    }

    #[test]
    fn hash_ignores_signature() {
        let voter = Address::new([1u8; 20]);
        let a = Vote::new(header(1), voter, vec![1, 2, 3]);
        let b = Vote::new(header(1), voter, vec![9, 9]);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn hash_depends_on_round_and_voter() {
        let voter = Address::new([1u8; 20]);
        let base = Vote::new(header(1), voter, vec![]);
        assert_ne!(base.hash(), Vote::new(header(2), voter, vec![]).hash());
        assert_ne!(
            base.hash(),
            Vote::new(header(1), Address::new([2u8; 20]), vec![]).hash()
        );
    }

    #[test]
    fn decode_recomputes_hash() {
        let vote = Vote::new(header(7), Address::new([3u8; 20]), vec![4, 5]);
        let decoded = Vote::from_bytes(&vote.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, vote);
        assert_eq!(decoded.hash(), vote.hash());
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            Vote::from_bytes(&[0xFF]),
            Err(ConsensusError::Serialization(_))
        ));
    }
}
