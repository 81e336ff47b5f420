use crate::domain::error::DomainError;
use crate::domain::validation::ValidationError;

use super::backend::BackendError;
use super::dashboard::CommandKind;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Server(String),

    #[error(transparent)]
    CacheConsistency(#[from] DomainError),

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("{0:?} is not available on this dashboard")]
    NotPermitted(CommandKind),

    #[error("lock poisoned")]
    LockPoisoned,
}

impl From<BackendError> for AppError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Server(msg) => AppError::Server(msg),
            other => AppError::Network(other.to_string()),
        }
    }
}
