//! # Domain Types
//!
//! Enumerations and small value types shared by every aggregate.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shared Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Role       │   │    GameType     │   │  MovementKind   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Admin    (1)   │   │  Action   (1)   │   │  Deposit        │       │
//! │  │  Standard (2)   │   │  ...            │   │  Withdrawal     │       │
//! │  └─────────────────┘   │  Casual  (10)   │   │  FreeGrant      │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │  ┌─────────────────┐                                                   │
//! │  │  DiscountRate   │                                                   │
//! │  │  ─────────────  │                                                   │
//! │  │  bps (u32)      │                                                   │
//! │  │  2500 = 25%     │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 string - immutable, used for relations
//! - Business key: e-mail for users, name for active games

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_DISCOUNT_BPS;

// =============================================================================
// Identifiers
// =============================================================================

/// Generates a new entity ID (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Role
// =============================================================================

/// Access role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages catalog, promotions and users.
    Admin,
    /// Buys games. Every new registration starts here.
    Standard,
}

impl Role {
    /// Numeric code accepted by role changes.
    pub const fn code(&self) -> u8 {
        match self {
            Role::Admin => 1,
            Role::Standard => 2,
        }
    }

    /// Parses a role from its symbolic name or its numeric code.
    ///
    /// ## Accepted Input
    /// - `"Admin"`, `"admin"`, `"1"` → Admin
    /// - `"Standard"`, `"Usuario"`, `"2"` → Standard
    ///
    /// ## Example
    /// ```rust
    /// use fcg_core::types::Role;
    ///
    /// assert_eq!(Role::parse("1").unwrap(), Role::Admin);
    /// assert_eq!(Role::parse("standard").unwrap(), Role::Standard);
    /// assert!(Role::parse("3").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Role, ValidationError> {
        let trimmed = input.trim();

        if let Ok(code) = trimmed.parse::<i64>() {
            return match code {
                1 => Ok(Role::Admin),
                2 => Ok(Role::Standard),
                _ => Err(ValidationError::InvalidRole(input.to_string())),
            };
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "standard" | "usuario" => Ok(Role::Standard),
            _ => Err(ValidationError::InvalidRole(input.to_string())),
        }
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Standard
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("Admin"),
            Role::Standard => f.write_str("Standard"),
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s)
    }
}

// =============================================================================
// Game Type
// =============================================================================

/// Catalog category of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Action,
    Adventure,
    Rpg,
    Strategy,
    Simulation,
    Sports,
    Racing,
    Puzzle,
    Shooter,
    Casual,
}

impl GameType {
    /// Every category, in code order.
    pub const ALL: [GameType; 10] = [
        GameType::Action,
        GameType::Adventure,
        GameType::Rpg,
        GameType::Strategy,
        GameType::Simulation,
        GameType::Sports,
        GameType::Racing,
        GameType::Puzzle,
        GameType::Shooter,
        GameType::Casual,
    ];

    /// Numeric code (1-based position in [`GameType::ALL`]).
    pub fn code(&self) -> u8 {
        GameType::ALL
            .iter()
            .position(|t| t == self)
            .map_or(0, |idx| idx as u8 + 1)
    }

    /// Looks up a category by numeric code.
    pub fn from_code(code: i64) -> Result<GameType, ValidationError> {
        usize::try_from(code)
            .ok()
            .and_then(|c| c.checked_sub(1))
            .and_then(|idx| GameType::ALL.get(idx).copied())
            .ok_or_else(|| ValidationError::InvalidGameType(code.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameType::Action => "action",
            GameType::Adventure => "adventure",
            GameType::Rpg => "rpg",
            GameType::Strategy => "strategy",
            GameType::Simulation => "simulation",
            GameType::Sports => "sports",
            GameType::Racing => "racing",
            GameType::Puzzle => "puzzle",
            GameType::Shooter => "shooter",
            GameType::Casual => "casual",
        }
    }
}

/// Parses a category from its name (any case) or numeric code.
impl FromStr for GameType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return GameType::from_code(code);
        }

        let lowered = trimmed.to_ascii_lowercase();
        GameType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == lowered)
            .ok_or_else(|| ValidationError::InvalidGameType(s.to_string()))
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Movement Kind
// =============================================================================

/// What a wallet ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Credit into the wallet.
    Deposit,
    /// Debit for a paid acquisition.
    Withdrawal,
    /// Zero-price acquisition; balance untouched.
    FreeGrant,
}

impl MovementKind {
    /// Balance after applying `amount` of this kind to `before`.
    ///
    /// Used to check the ledger invariant
    /// `balance_after = balance_before ± amount`.
    pub fn apply(&self, before: Money, amount: Money) -> Money {
        match self {
            MovementKind::Deposit => before + amount,
            MovementKind::Withdrawal => before - amount,
            MovementKind::FreeGrant => before,
        }
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// Promotion discount represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 2500 bps = 25%, 1250 bps = 12.5%
///
/// The constructor enforces the inclusive range 0%..=100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a rate from basis points, rejecting values above 100%.
    pub fn from_bps(bps: i64) -> Result<Self, ValidationError> {
        u32::try_from(bps)
            .ok()
            .filter(|b| *b <= MAX_DISCOUNT_BPS)
            .map(DiscountRate)
            .ok_or(ValidationError::InvalidDiscount { bps })
    }

    /// Creates a rate from a whole percentage.
    pub fn from_percent(percent: i64) -> Result<Self, ValidationError> {
        DiscountRate::from_bps(percent.saturating_mul(100))
    }

    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for DiscountRate {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        DiscountRate::from_bps(i64::from(value))
    }
}

impl From<DiscountRate> for u32 {
    fn from(rate: DiscountRate) -> u32 {
        rate.0
    }
}

impl fmt::Display for DiscountRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
