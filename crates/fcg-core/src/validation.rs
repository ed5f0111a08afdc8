//! # Validation Module
//!
//! Validated value objects and input checks for the store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Value objects (THIS MODULE)                                   │
//! │  ├── Name / Email / Password can only be built through `parse`         │
//! │  └── An instance in hand is always valid                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Aggregates (game, promotion, user)                           │
//! │  └── State rules (already active, already owned, ...)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE(email), UNIQUE(user_id, game_id)                           │
//! │  └── CHECK(balance_cents >= 0)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fcg_core::validation::{Email, Name, Password};
//!
//! let name = Name::parse("  Ada Lovelace ").unwrap();
//! assert_eq!(name.as_str(), "Ada Lovelace");
//!
//! let email = Email::parse("Ada@Example.com").unwrap();
//! assert_eq!(email.as_str(), "ada@example.com");
//!
//! assert!(Password::parse("Str0ng!pass").is_ok());
//! assert!(Password::parse("weak").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CredentialRule, ValidationError};
use crate::{MAX_EMAIL_LEN, MAX_NAME_LEN, MIN_PASSWORD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Name
// =============================================================================

/// A trimmed, non-blank display name of at most [`MAX_NAME_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Parses a user name.
    pub fn parse(raw: &str) -> ValidationResult<Name> {
        validate_name_field("name", raw).map(Name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Name {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Name::parse(&value)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> String {
        name.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared rule for every human-entered label: user names, game names,
/// promotion titles.
///
/// Returns the trimmed value.
pub fn validate_name_field(field: &str, raw: &str) -> ValidationResult<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::InvalidName {
            field: field.to_string(),
        });
    }

    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(trimmed.to_string())
}

// =============================================================================
// Email
// =============================================================================

/// A syntactically valid e-mail address, stored lowercased.
///
/// ## Grammar
/// ```text
/// local @ domain . tld
///   │       │       │
///   │       │       └── at least one character after the last dot
///   │       └────────── no empty labels ("a..b" is rejected)
///   └────────────────── no whitespace, no '@'
/// ```
///
/// Lowercasing makes the address usable as the user's natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> ValidationResult<Email> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "email".to_string(),
            });
        }

        if trimmed.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email".to_string(),
                max: MAX_EMAIL_LEN,
            });
        }

        if !is_well_formed_email(trimmed) {
            return Err(ValidationError::InvalidEmail(trimmed.to_string()));
        }

        Ok(Email(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn is_well_formed_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain needs at least two labels and none of them may be empty
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> String {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Password
// =============================================================================

/// A plaintext password that passed the strength rules.
///
/// Never serialized and never printed: `Debug` is redacted. The only way to
/// read it back is [`Password::expose`], which the hasher calls.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Checks the strength rules in order and reports the first one broken.
    ///
    /// ## Rules
    /// 1. At least [`MIN_PASSWORD_LEN`] characters
    /// 2. An uppercase letter
    /// 3. A lowercase letter
    /// 4. A digit
    /// 5. A non-alphanumeric character
    pub fn parse(raw: &str) -> ValidationResult<Password> {
        let rule = if raw.chars().count() < MIN_PASSWORD_LEN {
            Some(CredentialRule::TooShort)
        } else if !raw.chars().any(char::is_uppercase) {
            Some(CredentialRule::MissingUppercase)
        } else if !raw.chars().any(char::is_lowercase) {
            Some(CredentialRule::MissingLowercase)
        } else if !raw.chars().any(|c| c.is_ascii_digit()) {
            Some(CredentialRule::MissingDigit)
        } else if raw.chars().all(char::is_alphanumeric) {
            Some(CredentialRule::MissingSymbol)
        } else {
            None
        };

        match rule {
            Some(rule) => Err(ValidationError::WeakCredential(rule)),
            None => Ok(Password(raw.to_string())),
        }
    }

    /// The plaintext, for handing to a credential hasher.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

// =============================================================================
// Scalar Validators
// =============================================================================

/// Validates a catalog price in cents.
///
/// ## Rules
/// - Must be >= 0 (free games are allowed)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::InvalidPrice(crate::Money::from_cents(
            cents,
        )));
    }
    Ok(())
}

/// Validates a free-text description (may be empty).
pub fn validate_description(description: &str) -> ValidationResult<String> {
    let trimmed = description.trim();

    if trimmed.chars().count() > 1000 {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: 1000,
        });
    }

    Ok(trimmed.to_string())
}

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use fcg_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
