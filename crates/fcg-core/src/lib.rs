//! # fcg-core: Pure Domain Rules for the Games Store
//!
//! This crate is the **heart** of the store backend. It contains every rule
//! that decides whether money moves or ownership changes, as plain functions
//! and methods with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FCG Architecture                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                apps/fcg-service (Application)                   │   │
//! │  │   register, login, acquire_game, acquire_promotion, ...         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fcg-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────────┐ │   │
//! │  │   │  wallet  │ │   game   │ │ promotion │ │     purchase     │ │   │
//! │  │   │  Wallet  │ │   Game   │ │ Promotion │ │  acquire_game    │ │   │
//! │  │   │  Money   │ │ lifecycle│ │ lifecycle │ │  acquire_promo.. │ │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────────────┘ │   │
//! │  │        ┌──────────┐  ┌────────────┐                            │   │
//! │  │        │   user   │  │ validation │                            │   │
//! │  │        │   User   │  │ Name/Email │                            │   │
//! │  │        └──────────┘  └────────────┘                            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    fcg-db (Database Layer)                      │   │
//! │  │       SQLite queries, migrations, repositories, unit of work    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Enumerations shared by every aggregate (Role, GameType, ...)
//! - [`validation`] - Validated value objects (Name, Email, Password)
//! - [`wallet`] - Non-negative balance with deposit/debit primitives
//! - [`game`] - Catalog item and its publish/activate lifecycle
//! - [`promotion`] - Time-boxed discount bundles
//! - [`user`] - User aggregate: wallet, movement ledger, library
//! - [`purchase`] - Cross-aggregate purchase orchestration
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: the current time is an argument, never read here
//! 2. **Integer Money**: all monetary values are in cents (i64)
//! 3. **Explicit Errors**: every rejected operation returns a typed error
//! 4. **All-or-nothing**: a failed purchase leaves the user untouched
//!
//! ## Example Usage
//!
//! ```rust
//! use fcg_core::money::Money;
//! use fcg_core::types::DiscountRate;
//!
//! let price = Money::from_cents(10_000); // R$ 100.00
//! let rate = DiscountRate::from_percent(25).unwrap();
//!
//! assert_eq!(price.apply_discount(rate).cents(), 7_500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod game;
pub mod money;
pub mod promotion;
pub mod purchase;
pub mod types;
pub mod user;
pub mod validation;
pub mod wallet;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use fcg_core::Money` instead of
// `use fcg_core::money::Money`

pub use error::{CoreError, CoreResult, CredentialRule, ErrorKind, ValidationError};
pub use game::{Game, GameRecord};
pub use money::Money;
pub use promotion::{Promotion, PromotionRecord, PromotionStatus};
pub use purchase::{
    acquire_game, acquire_promotion, quote_promotion, PromotionQuote, PurchaseReceipt, QuoteLine,
};
pub use types::*;
pub use user::{CredentialHash, LibraryEntry, Movement, User, UserRecord};
pub use validation::{Email, Name, Password};
pub use wallet::Wallet;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length for user names, game names and promotion titles.
pub const MAX_NAME_LEN: usize = 150;

/// Maximum length of an e-mail address (RFC 5321 path limit).
pub const MAX_EMAIL_LEN: usize = 254;

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Largest discount expressible, in basis points (100%).
pub const MAX_DISCOUNT_BPS: u32 = 10_000;
