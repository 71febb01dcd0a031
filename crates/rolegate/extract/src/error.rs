use thiserror::Error;

/// Errors raised while preparing an extractor
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid scan pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid marker attribute name: {0:?}")]
    InvalidAttribute(String),
}

/// Result type for extraction setup
pub type ExtractResult<T> = Result<T, ExtractError>;
