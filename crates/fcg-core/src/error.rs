//! # Error Types
//!
//! Domain-specific error types for fcg-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fcg-core errors (this file)                                           │
//! │  ├── CoreError        - Lifecycle / state conflicts                    │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  fcg-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  fcg-service errors                                                    │
//! │  └── ServiceError     - What callers see (kind + code + message)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError ← DbError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, amounts)
//! 3. Errors are enum variants, never String
//! 4. Every variant reports its [`ErrorKind`] so callers can branch

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;
use crate::{MAX_DISCOUNT_BPS, MIN_PASSWORD_LEN};

// =============================================================================
// Error Kind
// =============================================================================

/// The four-way failure taxonomy every layer reports against.
///
/// ```text
/// Validation   malformed input, never retried
/// Conflict     state rule violated (already owned, insufficient funds, ...)
/// NotFound     missing user / game / promotion
/// Internal     infrastructure failure, propagated to the boundary
/// ```
///
/// The service layer adds `Unauthorized` / `Forbidden` for caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Unauthorized,
    Forbidden,
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
///
/// These are recoverable: the operation was rejected and nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Wallet cannot cover the requested debit.
    ///
    /// ## When This Occurs
    /// - Buying a game priced above the balance
    /// - Buying a promotion whose pending total is above the balance
    ///   (checked against the total before any debit)
    #[error("Insufficient funds: balance {available}, required {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    #[error("Game {game_id} is already published")]
    AlreadyPublished { game_id: String },

    /// Publishing requires the game to be active.
    #[error("Game {game_id} is inactive and cannot be published")]
    InactiveItem { game_id: String },

    #[error("{entity} {id} is already active")]
    AlreadyActive { entity: &'static str, id: String },

    #[error("{entity} {id} is already inactive")]
    AlreadyInactive { entity: &'static str, id: String },

    /// Game is not both published and active.
    #[error("Game {game_id} is not available for purchase")]
    ItemUnavailable { game_id: String },

    #[error("An active game named '{name}' already exists")]
    DuplicateActiveName { name: String },

    /// Items can only be attached before activation.
    #[error("Promotion {promotion_id} is already active")]
    PromotionAlreadyActive { promotion_id: String },

    #[error("Promotion {promotion_id} has expired")]
    PromotionExpired { promotion_id: String },

    #[error("Game {game_id} is already part of promotion {promotion_id}")]
    DuplicateItem { promotion_id: String, game_id: String },

    #[error("Promotion {promotion_id} is not active")]
    PromotionNotActive { promotion_id: String },

    #[error("Game {game_id} is already in the library")]
    AlreadyOwned { game_id: String },

    #[error("Every game of promotion {promotion_id} is already in the library")]
    AllItemsOwned { promotion_id: String },

    #[error("E-mail {email} is already registered")]
    EmailAlreadyRegistered { email: String },

    #[error("User {user_id} is deactivated")]
    UserInactive { user_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Which branch of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements. No state is
/// touched before they are raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Name, title or game name is blank after trimming.
    #[error("{field} must not be blank")]
    InvalidName { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("'{0}' is not a valid e-mail address")]
    InvalidEmail(String),

    #[error("Password {0}")]
    WeakCredential(CredentialRule),

    #[error("Invalid role '{0}': expected Admin (1) or Standard (2)")]
    InvalidRole(String),

    #[error("Invalid game type '{0}'")]
    InvalidGameType(String),

    #[error("Discount must be between 0 and {max} bps, got {bps}", max = MAX_DISCOUNT_BPS)]
    InvalidDiscount { bps: i64 },

    #[error("Promotion end must be after its start")]
    InvalidDateRange,

    /// Deposits and debits must be strictly positive.
    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(Money),

    #[error("Price cannot be negative, got {0}")]
    InvalidPrice(Money),

    /// The amount would push a balance or total past what cents can hold.
    #[error("Amount {0} is too large")]
    AmountTooLarge(Money),

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("None of the given games can be placed on a promotion")]
    NoEligibleItems,
}

/// The password strength rule that was not met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialRule {
    #[error("must have at least {} characters", MIN_PASSWORD_LEN)]
    TooShort,
    #[error("must contain an uppercase letter")]
    MissingUppercase,
    #[error("must contain a lowercase letter")]
    MissingLowercase,
    #[error("must contain a digit")]
    MissingDigit,
    #[error("must contain a symbol")]
    MissingSymbol,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientFunds {
            available: Money::from_cents(5000),
            requested: Money::from_cents(6000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: balance R$ 50.00, required R$ 60.00"
        );

        let err = CoreError::AlreadyActive {
            entity: "Promotion",
            id: "p-1".to_string(),
        };
        assert_eq!(err.to_string(), "Promotion p-1 is already active");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::WeakCredential(CredentialRule::TooShort);
        assert_eq!(err.to_string(), "Password must have at least 8 characters");

        let err = ValidationError::InvalidDiscount { bps: 10_001 };
        assert_eq!(
            err.to_string(),
            "Discount must be between 0 and 10000 bps, got 10001"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::InvalidDateRange.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_state_errors_are_conflicts() {
        let err = CoreError::AlreadyOwned {
            game_id: "g-1".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
