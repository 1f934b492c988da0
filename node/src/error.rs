use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] quorum_store::StoreError),

    #[error("consensus error: {0}")]
    Consensus(#[from] quorum_consensus::ConsensusError),

    #[error("network error: {0}")]
    Network(#[from] quorum_network::NetworkError),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("node already started")]
    AlreadyStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quorum_store_lmdb::LmdbError> for NodeError {
    fn from(e: quorum_store_lmdb::LmdbError) -> Self {
        NodeError::Store(e.into())
    }
}

impl From<prometheus::Error> for NodeError {
    fn from(e: prometheus::Error) -> Self {
        NodeError::Metrics(e.to_string())
    }
}
