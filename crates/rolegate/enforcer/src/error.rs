use rolegate_service::ServiceError;
use thiserror::Error;

/// Errors from the runtime enforcer
#[derive(Debug, Error)]
pub enum EnforcerError {
    #[error("config service error: {0}")]
    Service(#[from] ServiceError),

    #[error("lock acquisition failed")]
    LockError,
}

pub type EnforcerResult<T> = Result<T, EnforcerError>;
