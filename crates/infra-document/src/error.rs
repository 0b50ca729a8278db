// Status-coded document store errors and their AppError mapping

use std::time::Duration;

use catalog_core::error::AppError;
use thiserror::Error;

/// HTTP-style status carried by every document store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    BadRequest,
    NotFound,
    Conflict,
    TooManyRequests,
    ServiceUnavailable,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::Conflict => 409,
            StatusCode::TooManyRequests => 429,
            StatusCode::ServiceUnavailable => 503,
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

#[derive(Error, Debug, Clone)]
#[error("document store returned {status}: {message}")]
pub struct DocumentError {
    pub status: StatusCode,
    pub message: String,
    /// Server hint for throttled requests
    pub retry_after: Option<Duration>,
}

impl DocumentError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Conflict, message)
    }

    pub fn throttled(retry_after: Duration) -> Self {
        Self {
            status: StatusCode::TooManyRequests,
            message: "request rate is large".to_string(),
            retry_after: Some(retry_after),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NotFound
    }
}

/// Convert DocumentError to AppError.
///
/// 404 is only reached here for operations where absence is a fault; point
/// reads and deletes handle it before mapping.
pub fn map_document_error(err: DocumentError) -> AppError {
    match err.status {
        StatusCode::BadRequest => AppError::InvalidArgument(err.message),
        StatusCode::NotFound => AppError::NotFound(err.message),
        StatusCode::Conflict => AppError::Conflict(err.message),
        // Only surfaces once client-side rate-limit retries are exhausted
        StatusCode::TooManyRequests => AppError::BackendUnavailable(format!(
            "throughput exhausted after retries: {}",
            err.message
        )),
        StatusCode::ServiceUnavailable => AppError::BackendUnavailable(err.message),
    }
}
