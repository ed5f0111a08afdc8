//! # Service Error Type
//!
//! What a caller of the services sees when an operation is rejected.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationError ──► CoreError ──┐                                      │
//! │                                  ├──► ServiceError ──► kind() / code()  │
//! │  sqlx::Error ──► DbError ────────┘          │                           │
//! │                                             ▼                           │
//! │  caller identity checks ───────────► ErrorResponse { code, kind, msg }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Infrastructure failures stay inside [`ServiceError::Database`] with
//! their original message; they are reported as `Internal` and never turned
//! into a success.

use serde::Serialize;
use thiserror::Error;

use fcg_core::{CoreError, ErrorKind, ValidationError};
use fcg_db::DbError;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors returned by the application services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A domain rule or input validation refused the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unknown e-mail and wrong password are deliberately the same error.
    #[error("Invalid e-mail or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Administrator role required")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Domain(CoreError::Validation(err))
    }
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Which branch of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Domain(e) => e.kind(),
            ServiceError::Database(e) => match e {
                DbError::NotFound { .. } => ErrorKind::NotFound,
                DbError::Conflict { .. } | DbError::UniqueViolation { .. } => ErrorKind::Conflict,
                _ => ErrorKind::Internal,
            },
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::InvalidCredentials
            | ServiceError::Unauthenticated
            | ServiceError::InvalidToken(_) => ErrorKind::Unauthorized,
            ServiceError::Forbidden => ErrorKind::Forbidden,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable code for programmatic handling.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Domain(e) => match e {
                CoreError::Validation(ValidationError::WeakCredential(_)) => ErrorCode::WeakCredential,
                CoreError::Validation(_) => ErrorCode::ValidationError,
                CoreError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
                CoreError::AlreadyOwned { .. } => ErrorCode::AlreadyOwned,
                CoreError::AllItemsOwned { .. } => ErrorCode::AllItemsOwned,
                CoreError::ItemUnavailable { .. } => ErrorCode::ItemUnavailable,
                CoreError::PromotionNotActive { .. } => ErrorCode::PromotionNotActive,
                CoreError::PromotionExpired { .. } => ErrorCode::PromotionExpired,
                CoreError::EmailAlreadyRegistered { .. } => ErrorCode::EmailAlreadyRegistered,
                CoreError::UserInactive { .. } => ErrorCode::UserInactive,
                _ => ErrorCode::StateConflict,
            },
            ServiceError::Database(e) => match e {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::Conflict { .. } => ErrorCode::ConcurrentUpdate,
                DbError::UniqueViolation { .. } => ErrorCode::StateConflict,
                _ => ErrorCode::Internal,
            },
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::InvalidCredentials
            | ServiceError::Unauthenticated
            | ServiceError::InvalidToken(_) => ErrorCode::Unauthorized,
            ServiceError::Forbidden => ErrorCode::Forbidden,
            ServiceError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed input (400)
    ValidationError,

    /// Password strength rule not met (400)
    WeakCredential,

    /// Wallet balance below the price (409)
    InsufficientFunds,

    AlreadyOwned,
    AllItemsOwned,

    /// Game is unpublished or inactive (409)
    ItemUnavailable,

    PromotionNotActive,
    PromotionExpired,
    EmailAlreadyRegistered,
    UserInactive,

    /// Any other lifecycle rule (already published, already active, ...)
    StateConflict,

    /// Wallet changed concurrently and retries ran out (409)
    ConcurrentUpdate,

    NotFound,
    Unauthorized,
    Forbidden,

    /// Infrastructure failure (500)
    Internal,
}

/// Serializable error body.
///
/// ```json
/// {
///   "code": "INSUFFICIENT_FUNDS",
///   "kind": "conflict",
///   "message": "Insufficient funds: balance R$ 50.00, required R$ 60.00"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %err, "Internal error");
                "An internal error occurred".to_string()
            }
            _ => err.to_string(),
        };

        ErrorResponse {
            code: err.code(),
            kind,
            message,
        }
    }
}

impl From<ServiceError> for ErrorResponse {
    fn from(err: ServiceError) -> Self {
        ErrorResponse::from(&err)
    }
}
