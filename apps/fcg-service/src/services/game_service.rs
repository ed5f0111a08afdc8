//! # Game Service
//!
//! Catalog administration and single-game purchases.
//!
//! ## Purchase
//! ```text
//! acquire_game(caller, game_id)
//!    │
//!    └── with_retry ─┬─ load user + game          (repositories)
//!                    ├─ fcg_core::acquire_game     (rules, no I/O)
//!                    └─ UnitOfWork::record_purchase + commit
//!                         version check ── Conflict → retry
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use fcg_core::{acquire_game, CoreError, Game, GameType, Money, PurchaseReceipt, User};
use fcg_db::{DbError, GameFilter};

use crate::context::CallerContext;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{with_retry, AppState};

/// Input for [`GameService::register_game`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGame {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub game_type: GameType,
}

/// A game as shown in the catalog.
///
/// The lifecycle flags are only filled in for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub game_type: GameType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl GameView {
    fn public(game: &Game) -> Self {
        GameView {
            id: game.id().to_string(),
            name: game.name().to_string(),
            description: game.description().to_string(),
            price: game.price(),
            game_type: game.game_type(),
            is_published: None,
            is_active: None,
            created_at: game.created_at(),
        }
    }

    fn admin(game: &Game) -> Self {
        GameView {
            is_published: Some(game.is_published()),
            is_active: Some(game.is_active()),
            ..GameView::public(game)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Publish,
    Activate,
    Deactivate,
}

impl Lifecycle {
    fn operation(self) -> &'static str {
        match self {
            Lifecycle::Publish => "publish_game",
            Lifecycle::Activate => "activate_game",
            Lifecycle::Deactivate => "deactivate_game",
        }
    }
}

#[derive(Clone)]
pub struct GameService {
    state: AppState,
}

impl GameService {
    pub fn new(state: AppState) -> Self {
        GameService { state }
    }

    /// Adds an unpublished, active game. Admin only.
    ///
    /// ## Errors
    /// - Validation: blank name, negative price
    /// - Conflict: `DuplicateActiveName`
    pub async fn register_game(&self, caller: &CallerContext, new: NewGame) -> ServiceResult<GameView> {
        let admin_id = caller.require_admin()?;

        let taken = self
            .state
            .db
            .games()
            .active_name_taken(new.name.trim(), None)
            .await?;

        let game = Game::register(
            &new.name,
            &new.description,
            new.price,
            new.game_type,
            taken,
            self.state.clock.now(),
        )?;

        match self.state.db.games().insert(&game).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                return Err(CoreError::DuplicateActiveName {
                    name: game.name().to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            target: "audit",
            admin_id = %admin_id,
            game_id = %game.id(),
            name = %game.name(),
            price = %game.price(),
            "Game registered"
        );
        Ok(GameView::admin(&game))
    }

    pub async fn publish_game(&self, caller: &CallerContext, game_id: &str) -> ServiceResult<GameView> {
        let admin_id = caller.require_admin()?;
        let game = self.transition(game_id, Lifecycle::Publish).await?;

        info!(target: "audit", admin_id = %admin_id, game_id = %game_id, "Game published");
        Ok(GameView::admin(&game))
    }

    /// Fails with `DuplicateActiveName` if another active game took the name
    /// meanwhile.
    pub async fn activate_game(&self, caller: &CallerContext, game_id: &str) -> ServiceResult<GameView> {
        let admin_id = caller.require_admin()?;
        let game = self.transition(game_id, Lifecycle::Activate).await?;

        info!(target: "audit", admin_id = %admin_id, game_id = %game_id, "Game activated");
        Ok(GameView::admin(&game))
    }

    pub async fn deactivate_game(&self, caller: &CallerContext, game_id: &str) -> ServiceResult<GameView> {
        let admin_id = caller.require_admin()?;
        let game = self.transition(game_id, Lifecycle::Deactivate).await?;

        info!(target: "audit", admin_id = %admin_id, game_id = %game_id, "Game deactivated");
        Ok(GameView::admin(&game))
    }

    /// Admins see the whole catalog with lifecycle flags; everyone else
    /// sees only games that can be bought.
    pub async fn list_games(&self, caller: &CallerContext) -> ServiceResult<Vec<GameView>> {
        if caller.is_admin() {
            let games = self.state.db.games().list(GameFilter::default()).await?;
            return Ok(games.iter().map(GameView::admin).collect());
        }

        let games = self.state.db.games().list(GameFilter::purchasable()).await?;
        Ok(games.iter().map(GameView::public).collect())
    }

    /// Buys a game at list price for the caller.
    ///
    /// ## Errors
    /// - NotFound: user or game
    /// - Conflict: `UserInactive`, `ItemUnavailable`, `AlreadyOwned`,
    ///   `InsufficientFunds`, or a wallet conflict that outlived the retries
    pub async fn acquire_game(&self, caller: &CallerContext, game_id: &str) -> ServiceResult<PurchaseReceipt> {
        let user_id = caller.require_user()?;

        let receipt = with_retry(self.state.purchase_retry_attempts, "acquire_game", || {
            self.try_acquire(user_id, game_id)
        })
        .await?;

        info!(
            target: "audit",
            user_id = %user_id,
            game_id = %game_id,
            charged = %receipt.total_charged,
            "Game acquired"
        );
        Ok(receipt)
    }

    async fn try_acquire(&self, user_id: &str, game_id: &str) -> ServiceResult<PurchaseReceipt> {
        let mut user: User = self
            .state
            .db
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;
        let game = self.load(game_id).await?;

        let receipt = acquire_game(&mut user, &game, self.state.clock.now())?;

        let mut uow = self.state.db.begin().await?;
        uow.record_purchase(&user, &receipt).await?;
        uow.commit().await?;

        Ok(receipt)
    }

    /// Load, change, versioned write; again on a fresh snapshot when
    /// another writer got there first.
    async fn transition(&self, game_id: &str, step: Lifecycle) -> ServiceResult<Game> {
        with_retry(self.state.purchase_retry_attempts, step.operation(), || {
            self.try_transition(game_id, step)
        })
        .await
    }

    async fn try_transition(&self, game_id: &str, step: Lifecycle) -> ServiceResult<Game> {
        let mut game = self.load(game_id).await?;

        match step {
            Lifecycle::Publish => game.publish()?,
            Lifecycle::Activate => {
                let taken = self
                    .state
                    .db
                    .games()
                    .active_name_taken(game.name(), Some(game_id))
                    .await?;
                game.activate(taken)?;
            }
            Lifecycle::Deactivate => game.deactivate()?,
        }

        match self.state.db.games().update(&game).await {
            Ok(()) => Ok(game),
            Err(DbError::UniqueViolation { .. }) => Err(CoreError::DuplicateActiveName {
                name: game.name().to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, game_id: &str) -> ServiceResult<Game> {
        self.state
            .db
            .games()
            .find_by_id(game_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Game", game_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
