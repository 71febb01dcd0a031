//! CLI errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot walk view sources: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Extract(#[from] rolegate_extract::ExtractError),

    #[error(transparent)]
    Store(#[from] rolegate_store::StoreError),

    #[error(transparent)]
    Service(#[from] rolegate_service::ServiceError),

    #[error(transparent)]
    Enforcer(#[from] rolegate_enforcer::EnforcerError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("no markers found in {0} source file(s), refusing to replace the marker forest")]
    EmptyForest(usize),
}

pub type CliResult<T> = Result<T, CliError>;
