use crate::FragmentId;
use thiserror::Error;

/// Errors raised by view tree operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("fragment not found: {0}")]
    NotFound(FragmentId),

    #[error("fragment cannot be detached: {0}")]
    Pinned(FragmentId),

    #[error("fragment is not interactive: {0}")]
    NotInteractive(FragmentId),
}

/// Result type for view operations
pub type ViewResult<T> = Result<T, ViewError>;
