// Central Error Type for the Catalog

use thiserror::Error;

/// Application-level error type
///
/// Adapters translate their native faults into one of these kinds so callers
/// can tell argument errors, state misuse and backend outages apart.
/// Id-based "not found" is never an error: lookups return `Ok(None)` and
/// deletes return `Ok(false)`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for faults a caller may reasonably retry later
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AppError::BackendUnavailable(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error and DocumentError conversions live in the infra crates
// (orphan rules), each mapping onto the variants above.
