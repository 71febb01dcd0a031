use thiserror::Error;

/// Errors seen by a caller of the config service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service answered with `ok: false`
    #[error("config service failed: {0}")]
    Remote(String),

    #[error("config service is not running")]
    Closed,

    #[error("malformed frame: {0}")]
    Codec(#[from] serde_json::Error),

    /// The reply was well-formed but lacked the expected payload
    #[error("reply is missing `{0}`")]
    MissingField(&'static str),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
