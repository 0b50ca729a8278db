//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use catalog_core::domain::DomainError;
use catalog_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const INVALID_ARGUMENT: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const CANCELLED: i32 = 4999;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const UNAVAILABLE: i32 = 5003;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::InvalidArgument(_) | AppError::Serialization(_) => code::INVALID_ARGUMENT,
        AppError::Domain(DomainError::InvalidStatusTransition { .. }) => code::CONFLICT,
        AppError::Domain(_) => code::INVALID_ARGUMENT,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Conflict(_) | AppError::InvalidState(_) => code::CONFLICT,
        AppError::Cancelled => code::CANCELLED,
        AppError::Database(_) => code::DB_ERROR,
        AppError::BackendUnavailable(_) => code::UNAVAILABLE,
        AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}
