use thiserror::Error;

/// Errors from the access configuration store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("stale write: record was read at version {expected}, stored version is {found}")]
    StaleWrite { expected: u64, found: u64 },

    #[error("lock acquisition failed")]
    LockError,
}

/// Convenience type alias for store results
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = StoreError::StaleWrite {
            expected: 3,
            found: 5,
        };
        assert!(e.to_string().contains("version 3"));
        assert!(e.to_string().contains("version is 5"));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let e: StoreError = io_err.into();
        assert!(e.to_string().contains("read-only"));
    }
}
