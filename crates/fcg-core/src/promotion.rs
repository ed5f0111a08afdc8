//! # Promotion
//!
//! Time-boxed discount over a set of games.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► ┌─────────┐  activate  ┌─────────┐                         │
//! │              │  Draft  │ ─────────► │ Active  │                         │
//! │              │ add_game│            │ pricing │                         │
//! │              └────┬────┘            └────┬────┘                         │
//! │                   │   now > ends_at      │                              │
//! │                   └──────────┬───────────┘                              │
//! │                              ▼                                          │
//! │                        ┌──────────┐                                     │
//! │                        │ Expired  │  terminal, derived from the clock   │
//! │                        └──────────┘                                     │
//! │                                                                         │
//! │   delete: allowed from any state (cascade handled by persistence)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `starts_at` is informational: an activated promotion prices its games
//! until `ends_at`, even before the start time is reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::game::Game;
use crate::money::Money;
use crate::types::{new_id, DiscountRate};
use crate::validation::{validate_description, validate_name_field};

// =============================================================================
// Status
// =============================================================================

/// Derived state of a promotion at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    /// Inactive and not expired; games may be attached.
    Draft,
    /// Active and not expired; games can be bought at the discount.
    Active,
    /// Past `ends_at`, whatever the active flag says.
    Expired,
}

// =============================================================================
// Persisted Shape
// =============================================================================

/// Row shape of a promotion (its game list lives in `promotion_games`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PromotionRecord {
    pub id: String,
    pub title: String,
    pub description: String,

    /// Discount in basis points (2500 = 25%).
    pub discount_bps: i64,

    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub ends_at: DateTime<Utc>,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Bumped by every persisted activation or game attachment.
    pub version: i64,
}

// =============================================================================
// Promotion Aggregate
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    id: String,
    title: String,
    description: String,
    discount: DiscountRate,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
    game_ids: Vec<String>,
    version: i64,
}

impl Promotion {
    /// Creates an inactive promotion with no games.
    ///
    /// Fails with `InvalidDateRange` unless `ends_at > starts_at`.
    pub fn create(
        title: &str,
        description: &str,
        discount: DiscountRate,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CoreResult<Promotion> {
        let title = validate_name_field("title", title)?;
        let description = validate_description(description)?;

        if ends_at <= starts_at {
            return Err(ValidationError::InvalidDateRange.into());
        }

        Ok(Promotion {
            id: new_id(),
            title,
            description,
            discount,
            starts_at,
            ends_at,
            is_active: false,
            created_at: now,
            game_ids: Vec::new(),
            version: 0,
        })
    }

    /// Restores a promotion from its row plus its attached game ids.
    pub fn from_record(record: PromotionRecord, game_ids: Vec<String>) -> CoreResult<Promotion> {
        let discount = DiscountRate::from_bps(record.discount_bps)?;

        Ok(Promotion {
            id: record.id,
            title: record.title,
            description: record.description,
            discount,
            starts_at: record.starts_at,
            ends_at: record.ends_at,
            is_active: record.is_active,
            created_at: record.created_at,
            game_ids,
            version: record.version,
        })
    }

    pub fn to_record(&self) -> PromotionRecord {
        PromotionRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            discount_bps: i64::from(self.discount.bps()),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            is_active: self.is_active,
            created_at: self.created_at,
            version: self.version,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn discount(&self) -> DiscountRate {
        self.discount
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Version the promotion was loaded at.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn game_ids(&self) -> &[String] {
        &self.game_ids
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.game_ids.iter().any(|id| id == game_id)
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.ends_at
    }

    pub fn status(&self, now: DateTime<Utc>) -> PromotionStatus {
        if self.is_expired(now) {
            PromotionStatus::Expired
        } else if self.is_active {
            PromotionStatus::Active
        } else {
            PromotionStatus::Draft
        }
    }

    /// Attaches a game. Only allowed while the promotion is a draft.
    pub fn add_game(&mut self, game_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        if self.is_active {
            return Err(CoreError::PromotionAlreadyActive {
                promotion_id: self.id.clone(),
            });
        }
        if self.is_expired(now) {
            return Err(CoreError::PromotionExpired {
                promotion_id: self.id.clone(),
            });
        }
        if self.contains(game_id) {
            return Err(CoreError::DuplicateItem {
                promotion_id: self.id.clone(),
                game_id: game_id.to_string(),
            });
        }

        self.game_ids.push(game_id.to_string());
        Ok(())
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.is_expired(now) {
            return Err(CoreError::PromotionExpired {
                promotion_id: self.id.clone(),
            });
        }
        if self.is_active {
            return Err(CoreError::AlreadyActive {
                entity: "Promotion",
                id: self.id.clone(),
            });
        }

        self.is_active = true;
        Ok(())
    }

    /// Fails unless the promotion is active and not expired at `now`.
    ///
    /// A draft is `PromotionNotActive`; an activated promotion past its end
    /// is `PromotionExpired`.
    pub fn ensure_active(&self, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.is_active {
            return Err(CoreError::PromotionNotActive {
                promotion_id: self.id.clone(),
            });
        }
        if self.is_expired(now) {
            return Err(CoreError::PromotionExpired {
                promotion_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Discounted price of `game` under this promotion.
    ///
    /// Rounded half-up to the cent, see [`Money::apply_discount`].
    pub fn effective_price(&self, game: &Game, now: DateTime<Utc>) -> CoreResult<Money> {
        self.ensure_active(now)?;
        Ok(game.price().apply_discount(self.discount))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
