use quorum_types::EntryType;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("no entry holder registered for category '{0}'")]
    UnregisteredCategory(EntryType),

    #[error("entry holder registered twice for category '{0}'")]
    DuplicateCategory(EntryType),

    #[error("pending tracker for category '{0}' has no request stream")]
    TrackerUnavailable(EntryType),
}
