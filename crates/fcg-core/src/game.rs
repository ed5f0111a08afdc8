//! # Catalog Item (Game)
//!
//! A purchasable game and its lifecycle.
//!
//! ## State Machine
//! ```text
//!                      register
//!                         │
//!                         ▼
//!            ┌──────────────────────────┐   deactivate   ┌──────────────────────────┐
//!            │   Unpublished · Active    │ ─────────────► │  Unpublished · Inactive  │
//!            │                          │ ◄───────────── │                          │
//!            └────────────┬─────────────┘    activate    └──────────────────────────┘
//!                         │ publish          (publish from here → InactiveItem)
//!                         ▼
//!            ┌──────────────────────────┐   deactivate   ┌──────────────────────────┐
//!            │    Published · Active    │ ─────────────► │   Published · Inactive   │
//!            │     ★ purchasable ★      │ ◄───────────── │                          │
//!            └──────────────────────────┘    activate    └──────────────────────────┘
//! ```
//!
//! Publishing is one-way. Activation toggles and each direction fails if
//! the game is already in the target state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{new_id, GameType};
use crate::validation::{validate_description, validate_name_field, validate_price_cents};

// =============================================================================
// Persisted Shape
// =============================================================================

/// Row shape of a game, as stored and as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct GameRecord {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Unique among active games.
    pub name: String,

    pub description: String,

    /// Price in cents (>= 0).
    pub price_cents: i64,

    pub game_type: GameType,

    pub is_published: bool,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Bumped by every persisted lifecycle change.
    pub version: i64,
}

// =============================================================================
// Game Aggregate
// =============================================================================

/// A catalog item. Fields are private so lifecycle rules cannot be bypassed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    id: String,
    name: String,
    description: String,
    price: Money,
    game_type: GameType,
    is_published: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    version: i64,
}

impl Game {
    /// Registers a new game: unpublished and active.
    ///
    /// `active_name_taken` is the answer to "does an active game already use
    /// this name?", which only the persistence layer can know.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use fcg_core::{Game, GameType, Money};
    ///
    /// let game = Game::register("Celeste", "Climb", Money::from_cents(3999),
    ///     GameType::Adventure, false, Utc::now()).unwrap();
    ///
    /// assert!(game.is_active());
    /// assert!(!game.is_published());
    /// assert!(!game.is_purchasable());
    /// ```
    pub fn register(
        name: &str,
        description: &str,
        price: Money,
        game_type: GameType,
        active_name_taken: bool,
        now: DateTime<Utc>,
    ) -> CoreResult<Game> {
        let name = validate_name_field("name", name)?;
        let description = validate_description(description)?;
        validate_price_cents(price.cents())?;

        if active_name_taken {
            return Err(CoreError::DuplicateActiveName { name });
        }

        Ok(Game {
            id: new_id(),
            name,
            description,
            price,
            game_type,
            is_published: false,
            is_active: true,
            created_at: now,
            version: 0,
        })
    }

    /// Restores a game from its persisted row.
    pub fn from_record(record: GameRecord) -> CoreResult<Game> {
        validate_price_cents(record.price_cents)?;

        Ok(Game {
            id: record.id,
            name: record.name,
            description: record.description,
            price: Money::from_cents(record.price_cents),
            game_type: record.game_type,
            is_published: record.is_published,
            is_active: record.is_active,
            created_at: record.created_at,
            version: record.version,
        })
    }

    pub fn to_record(&self) -> GameRecord {
        GameRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            price_cents: self.price.cents(),
            game_type: self.game_type,
            is_published: self.is_published,
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

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    pub fn is_published(&self) -> bool {
        self.is_published
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Version the game was loaded at.
    pub fn version(&self) -> i64 {
        self.version
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Publishes the game. Requires it to be active and not yet published.
    pub fn publish(&mut self) -> CoreResult<()> {
        if self.is_published {
            return Err(CoreError::AlreadyPublished {
                game_id: self.id.clone(),
            });
        }
        if !self.is_active {
            return Err(CoreError::InactiveItem {
                game_id: self.id.clone(),
            });
        }
        self.is_published = true;
        Ok(())
    }

    /// `active_name_taken` must reflect other active games only.
    pub fn activate(&mut self, active_name_taken: bool) -> CoreResult<()> {
        if self.is_active {
            return Err(CoreError::AlreadyActive {
                entity: "Game",
                id: self.id.clone(),
            });
        }
        if active_name_taken {
            return Err(CoreError::DuplicateActiveName {
                name: self.name.clone(),
            });
        }
        self.is_active = true;
        Ok(())
    }

    pub fn deactivate(&mut self) -> CoreResult<()> {
        if !self.is_active {
            return Err(CoreError::AlreadyInactive {
                entity: "Game",
                id: self.id.clone(),
            });
        }
        self.is_active = false;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Purchasability
    // -------------------------------------------------------------------------

    #[inline]
    pub fn is_purchasable(&self) -> bool {
        self.is_published && self.is_active
    }

    pub fn ensure_purchasable(&self) -> CoreResult<()> {
        if self.is_purchasable() {
            Ok(())
        } else {
            Err(CoreError::ItemUnavailable {
                game_id: self.id.clone(),
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn new_game() -> Game {
        Game::register(
            "Hollow Knight",
            "Metroidvania",
            Money::from_cents(4699),
            GameType::Adventure,
            false,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_register_starts_unpublished_and_active() {
        let game = new_game();
        assert!(game.is_active());
        assert!(!game.is_published());
        assert!(!game.is_purchasable());
        assert!(uuid::Uuid::parse_str(game.id()).is_ok());
    }

    #[test]
    fn test_register_validation() {
        let now = Utc::now();
        let err = Game::register("  ", "", Money::zero(), GameType::Casual, false, now);
        assert!(matches!(
            err,
            Err(CoreError::Validation(ValidationError::InvalidName { .. }))
        ));

        let err = Game::register("X", "", Money::from_cents(-1), GameType::Casual, false, now);
        assert!(matches!(
            err,
            Err(CoreError::Validation(ValidationError::InvalidPrice(_)))
        ));

        let err = Game::register("Doom", "", Money::zero(), GameType::Shooter, true, now);
        assert_eq!(
            err.unwrap_err(),
            CoreError::DuplicateActiveName {
                name: "Doom".to_string()
            }
        );
    }

    #[test]
    fn test_publish_rules() {
        let mut game = new_game();
        game.publish().unwrap();
        assert!(game.is_purchasable());
        assert!(matches!(
            game.publish(),
            Err(CoreError::AlreadyPublished { .. })
        ));

        let mut inactive = new_game();
        inactive.deactivate().unwrap();
        assert!(matches!(
            inactive.publish(),
            Err(CoreError::InactiveItem { .. })
        ));
        assert!(!inactive.is_published());
    }

    #[test]
    fn test_activation_toggles() {
        let mut game = new_game();
        assert!(matches!(
            game.activate(false),
            Err(CoreError::AlreadyActive { entity: "Game", .. })
        ));

        game.deactivate().unwrap();
        assert!(matches!(
            game.deactivate(),
            Err(CoreError::AlreadyInactive { entity: "Game", .. })
        ));

        assert!(matches!(
            game.activate(true),
            Err(CoreError::DuplicateActiveName { .. })
        ));
        game.activate(false).unwrap();
        assert!(game.is_active());
    }

    #[test]
    fn test_purchasable_requires_published_and_active() {
        let mut game = new_game();
        assert!(matches!(
            game.ensure_purchasable(),
            Err(CoreError::ItemUnavailable { .. })
        ));

        game.publish().unwrap();
        assert!(game.ensure_purchasable().is_ok());

        game.deactivate().unwrap();
        assert!(matches!(
            game.ensure_purchasable(),
            Err(CoreError::ItemUnavailable { .. })
        ));
    }

    #[test]
    fn test_record_round_trip_keeps_flags() {
        let mut game = new_game();
        game.publish().unwrap();
        let restored = Game::from_record(game.to_record()).unwrap();
        assert_eq!(restored, game);
    }
}
