use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("store error: {0}")]
    Store(#[from] quorum_store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(
        "committee unavailable: needed {limit} distinct validators from {available} \
         after {attempts} draws"
    )]
    CommitteeUnavailable {
        limit: usize,
        available: usize,
        attempts: u32,
    },
}
