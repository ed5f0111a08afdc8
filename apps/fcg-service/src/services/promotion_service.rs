//! # Promotion Service
//!
//! Promotion administration and bundle purchases.
//!
//! ## Bundle Purchase
//! ```text
//! acquire_promotion(caller, promotion_id)
//!    │
//!    └── with_retry ─┬─ load user, promotion, its games
//!                    ├─ fcg_core::acquire_promotion
//!                    │     only games not yet owned, total checked up front
//!                    └─ UnitOfWork::record_purchase + commit
//!                         one transaction for every movement and library row
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fcg_core::{
    acquire_promotion, quote_promotion, DiscountRate, Game, Money, Promotion,
    PromotionQuote, PromotionStatus, PurchaseReceipt, User, ValidationError,
};

use crate::context::CallerContext;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{with_retry, AppState};

/// Input for [`PromotionService::create_promotion`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromotion {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub discount: DiscountRate,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub game_ids: Vec<String>,
}

/// A game inside a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionGameView {
    pub game_id: String,
    pub name: String,
    pub list_price: Money,
    /// Discounted price, present while the promotion is active and unexpired.
    pub price: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub discount: DiscountRate,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: PromotionStatus,
    pub games: Vec<PromotionGameView>,
}

#[derive(Clone)]
pub struct PromotionService {
    state: AppState,
}

impl PromotionService {
    pub fn new(state: AppState) -> Self {
        PromotionService { state }
    }

    /// Creates an inactive promotion. Admin only.
    ///
    /// Ids that do not exist or point at games that cannot be bought are
    /// left out; duplicates are attached once.
    ///
    /// ## Errors
    /// - Validation: no ids (`Required`), none eligible (`NoEligibleItems`),
    ///   discount out of range, end not after start
    pub async fn create_promotion(&self, caller: &CallerContext, new: NewPromotion) -> ServiceResult<PromotionView> {
        let admin_id = caller.require_admin()?;
        let now = self.state.clock.now();

        if new.game_ids.is_empty() {
            return Err(ValidationError::Required {
                field: "game_ids".to_string(),
            }
            .into());
        }

        let mut promotion = Promotion::create(
            &new.title,
            &new.description,
            new.discount,
            new.starts_at,
            new.ends_at,
            now,
        )?;

        let games = self.state.db.games().find_by_ids(&new.game_ids).await?;
        for game_id in &new.game_ids {
            let eligible = games
                .iter()
                .any(|g| g.id() == game_id.as_str() && g.is_purchasable());
            if !eligible {
                debug!(game_id = %game_id, "Skipping ineligible game");
                continue;
            }
            if !promotion.contains(game_id) {
                promotion.add_game(game_id, now)?;
            }
        }

        if promotion.game_ids().is_empty() {
            return Err(ValidationError::NoEligibleItems.into());
        }

        self.state.db.promotions().insert(&promotion).await?;

        info!(
            target: "audit",
            admin_id = %admin_id,
            promotion_id = %promotion.id(),
            discount = %promotion.discount(),
            games = promotion.game_ids().len(),
            "Promotion created"
        );
        Ok(self.view(&promotion, &games, now))
    }

    pub async fn activate_promotion(&self, caller: &CallerContext, promotion_id: &str) -> ServiceResult<PromotionView> {
        let admin_id = caller.require_admin()?;

        let promotion = with_retry(self.state.purchase_retry_attempts, "activate_promotion", || {
            self.try_activate(promotion_id)
        })
        .await?;

        info!(target: "audit", admin_id = %admin_id, promotion_id = %promotion_id, "Promotion activated");
        self.hydrated_view(&promotion, self.state.clock.now()).await
    }

    /// Removes the promotion and its game associations, whatever its state.
    pub async fn delete_promotion(&self, caller: &CallerContext, promotion_id: &str) -> ServiceResult<()> {
        let admin_id = caller.require_admin()?;

        self.state.db.promotions().delete(promotion_id).await?;

        info!(target: "audit", admin_id = %admin_id, promotion_id = %promotion_id, "Promotion deleted");
        Ok(())
    }

    /// Attaches a purchasable game to a promotion that is not yet active.
    pub async fn add_game_to_promotion(
        &self,
        caller: &CallerContext,
        promotion_id: &str,
        game_id: &str,
    ) -> ServiceResult<PromotionView> {
        let admin_id = caller.require_admin()?;

        let promotion = with_retry(self.state.purchase_retry_attempts, "add_game_to_promotion", || {
            self.try_add_game(promotion_id, game_id)
        })
        .await?;

        info!(
            target: "audit",
            admin_id = %admin_id,
            promotion_id = %promotion_id,
            game_id = %game_id,
            "Game added to promotion"
        );
        self.hydrated_view(&promotion, self.state.clock.now()).await
    }

    /// Administrators see every promotion unless `only_active` is set;
    /// everyone else only sees active, unexpired ones.
    pub async fn list_promotions(&self, caller: &CallerContext, only_active: bool) -> ServiceResult<Vec<PromotionView>> {
        let now = self.state.clock.now();

        let promotions = if caller.is_admin() && !only_active {
            self.state.db.promotions().list().await?
        } else {
            self.state.db.promotions().list_current(now).await?
        };

        let mut views = Vec::with_capacity(promotions.len());
        for promotion in &promotions {
            views.push(self.hydrated_view(promotion, now).await?);
        }
        Ok(views)
    }

    /// What buying the promotion would cost the caller right now.
    pub async fn quote(&self, caller: &CallerContext, promotion_id: &str) -> ServiceResult<PromotionQuote> {
        let user_id = caller.require_user()?;
        let (user, promotion, games) = self.load_purchase(user_id, promotion_id).await?;

        Ok(quote_promotion(&user, &promotion, &games, self.state.clock.now())?)
    }

    /// Buys every game of the promotion the caller does not own yet.
    ///
    /// ## Errors
    /// - NotFound: user or promotion
    /// - Conflict: `PromotionNotActive`, `PromotionExpired`, `AllItemsOwned`,
    ///   `ItemUnavailable`, `InsufficientFunds`, `UserInactive`
    pub async fn acquire_promotion(&self, caller: &CallerContext, promotion_id: &str) -> ServiceResult<PurchaseReceipt> {
        let user_id = caller.require_user()?;

        let receipt = with_retry(self.state.purchase_retry_attempts, "acquire_promotion", || {
            self.try_acquire(user_id, promotion_id)
        })
        .await?;

        info!(
            target: "audit",
            user_id = %user_id,
            promotion_id = %promotion_id,
            games = receipt.library_entries.len(),
            charged = %receipt.total_charged,
            "Promotion acquired"
        );
        Ok(receipt)
    }

    async fn try_activate(&self, promotion_id: &str) -> ServiceResult<Promotion> {
        let mut promotion = self.load(promotion_id).await?;
        promotion.activate(self.state.clock.now())?;
        self.state.db.promotions().update(&promotion).await?;
        Ok(promotion)
    }

    async fn try_add_game(&self, promotion_id: &str, game_id: &str) -> ServiceResult<Promotion> {
        let mut promotion = self.load(promotion_id).await?;
        let game = self
            .state
            .db
            .games()
            .find_by_id(game_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Game", game_id))?;
        game.ensure_purchasable()?;

        promotion.add_game(game_id, self.state.clock.now())?;
        self.state.db.promotions().update(&promotion).await?;
        Ok(promotion)
    }

    async fn try_acquire(&self, user_id: &str, promotion_id: &str) -> ServiceResult<PurchaseReceipt> {
        let (mut user, promotion, games) = self.load_purchase(user_id, promotion_id).await?;

        let receipt = acquire_promotion(&mut user, &promotion, &games, self.state.clock.now())?;

        let mut uow = self.state.db.begin().await?;
        uow.record_purchase(&user, &receipt).await?;
        uow.commit().await?;

        Ok(receipt)
    }

    async fn load_purchase(&self, user_id: &str, promotion_id: &str) -> ServiceResult<(User, Promotion, Vec<Game>)> {
        let user = self
            .state
            .db
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;
        let promotion = self.load(promotion_id).await?;
        let games = self.state.db.games().find_by_ids(promotion.game_ids()).await?;

        Ok((user, promotion, games))
    }

    async fn load(&self, promotion_id: &str) -> ServiceResult<Promotion> {
        self.state
            .db
            .promotions()
            .find_by_id(promotion_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Promotion", promotion_id))
    }

    async fn hydrated_view(&self, promotion: &Promotion, now: DateTime<Utc>) -> ServiceResult<PromotionView> {
        let games = self.state.db.games().find_by_ids(promotion.game_ids()).await?;
        Ok(self.view(promotion, &games, now))
    }

    fn view(&self, promotion: &Promotion, games: &[Game], now: DateTime<Utc>) -> PromotionView {
        let games = promotion
            .game_ids()
            .iter()
            .filter_map(|id| games.iter().find(|g| g.id() == id.as_str()))
            .map(|game| PromotionGameView {
                game_id: game.id().to_string(),
                name: game.name().to_string(),
                list_price: game.price(),
                price: promotion.effective_price(game, now).ok(),
            })
            .collect();

        PromotionView {
            id: promotion.id().to_string(),
            title: promotion.title().to_string(),
            description: promotion.description().to_string(),
            discount: promotion.discount(),
            starts_at: promotion.starts_at(),
            ends_at: promotion.ends_at(),
            status: promotion.status(now),
            games,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::test_support::{admin, harness, stored_game, stored_user, Harness};
    use crate::services::{GameService, UserService};
    use chrono::Duration;
    use fcg_core::{CoreError, ErrorKind, MovementKind, Role};

    fn service(state: &AppState) -> PromotionService {
        PromotionService::new(state.clone())
    }

    fn new_promotion(h: &Harness, percent: i64, game_ids: Vec<String>) -> NewPromotion {
        NewPromotion {
            title: "Summer Sale".to_string(),
            description: String::new(),
            discount: DiscountRate::from_percent(percent).unwrap(),
            starts_at: h.now(),
            ends_at: h.now() + Duration::days(7),
            game_ids,
        }
    }

    async fn funded(state: &AppState, email: &str, cents: i64) -> CallerContext {
        let caller = stored_user(state, email, Role::Standard).await;
        let user_id = caller.user_id().unwrap().to_string();
        UserService::new(state.clone())
            .deposit(&caller, &user_id, Money::from_cents(cents))
            .await
            .unwrap();
        caller
    }

    async fn balance(state: &AppState, caller: &CallerContext) -> Money {
        state
            .db
            .users()
            .find_by_id(caller.user_id().unwrap())
            .await
            .unwrap()
            .unwrap()
            .balance()
    }

    #[tokio::test]
    async fn test_create_keeps_only_eligible_games() {
        let h = harness().await;
        let promos = service(&h.state);
        let a = stored_game(&h.state, "A", 1_000).await;
        let b = stored_game(&h.state, "B", 2_000).await;
        GameService::new(h.state.clone())
            .deactivate_game(&admin(), b.id())
            .await
            .unwrap();

        let ids = vec![
            a.id().to_string(),
            a.id().to_string(),
            b.id().to_string(),
            "missing".to_string(),
        ];
        let view = promos.create_promotion(&admin(), new_promotion(&h, 25, ids)).await.unwrap();
        assert_eq!(view.status, PromotionStatus::Draft);
        assert_eq!(view.games.len(), 1);
        assert_eq!(view.games[0].game_id, a.id());
        assert_eq!(view.games[0].price, None);

        let err = promos
            .create_promotion(&admin(), new_promotion(&h, 25, vec![b.id().to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::Validation(ValidationError::NoEligibleItems))
        ));

        let err = promos
            .create_promotion(&admin(), new_promotion(&h, 25, Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_window_and_non_admin() {
        let h = harness().await;
        let promos = service(&h.state);
        let a = stored_game(&h.state, "A", 1_000).await;

        let mut new = new_promotion(&h, 10, vec![a.id().to_string()]);
        new.ends_at = new.starts_at;
        let err = promos.create_promotion(&admin(), new).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::Validation(ValidationError::InvalidDateRange))
        ));

        let player = stored_user(&h.state, "p@example.com", Role::Standard).await;
        let err = promos
            .create_promotion(&player, new_promotion(&h, 10, vec![a.id().to_string()]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_activation_and_listing() {
        let h = harness().await;
        let promos = service(&h.state);
        let player = stored_user(&h.state, "p@example.com", Role::Standard).await;
        let a = stored_game(&h.state, "A", 10_000).await;

        let draft = promos
            .create_promotion(&admin(), new_promotion(&h, 25, vec![a.id().to_string()]))
            .await
            .unwrap();
        assert!(promos.list_promotions(&player, false).await.unwrap().is_empty());
        assert_eq!(promos.list_promotions(&admin(), false).await.unwrap().len(), 1);
        assert!(promos.list_promotions(&admin(), true).await.unwrap().is_empty());

        let active = promos.activate_promotion(&admin(), &draft.id).await.unwrap();
        assert_eq!(active.status, PromotionStatus::Active);
        assert_eq!(active.games[0].price, Some(Money::from_cents(7_500)));

        let err = promos.activate_promotion(&admin(), &draft.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::AlreadyActive { .. })));

        let listed = promos.list_promotions(&player, false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].games[0].list_price, Money::from_cents(10_000));

        h.clock.advance(Duration::days(8));
        assert!(promos.list_promotions(&player, false).await.unwrap().is_empty());
        let all = promos.list_promotions(&admin(), false).await.unwrap();
        assert_eq!(all[0].status, PromotionStatus::Expired);
        assert_eq!(all[0].games[0].price, None);
    }

    #[tokio::test]
    async fn test_expired_promotion_rejects_activation_and_new_games() {
        let h = harness().await;
        let promos = service(&h.state);
        let a = stored_game(&h.state, "A", 1_000).await;
        let b = stored_game(&h.state, "B", 1_000).await;

        let draft = promos
            .create_promotion(&admin(), new_promotion(&h, 10, vec![a.id().to_string()]))
            .await
            .unwrap();
        h.clock.advance(Duration::days(8));

        let err = promos.activate_promotion(&admin(), &draft.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::PromotionExpired { .. })));

        let err = promos
            .add_game_to_promotion(&admin(), &draft.id, b.id())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::PromotionExpired { .. })));
    }

    #[tokio::test]
    async fn test_add_game_rules() {
        let h = harness().await;
        let promos = service(&h.state);
        let a = stored_game(&h.state, "A", 1_000).await;
        let b = stored_game(&h.state, "B", 1_000).await;

        let draft = promos
            .create_promotion(&admin(), new_promotion(&h, 10, vec![a.id().to_string()]))
            .await
            .unwrap();

        let view = promos.add_game_to_promotion(&admin(), &draft.id, b.id()).await.unwrap();
        assert_eq!(view.games.len(), 2);

        let err = promos
            .add_game_to_promotion(&admin(), &draft.id, b.id())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::DuplicateItem { .. })));

        let err = promos
            .add_game_to_promotion(&admin(), &draft.id, "missing")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        promos.activate_promotion(&admin(), &draft.id).await.unwrap();
        let c = stored_game(&h.state, "C", 1_000).await;
        let err = promos
            .add_game_to_promotion(&admin(), &draft.id, c.id())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::PromotionAlreadyActive { .. })));
    }

    #[tokio::test]
    async fn test_activation_survives_stale_game_attachment() {
        let h = harness().await;
        let promos = service(&h.state);
        let a = stored_game(&h.state, "A", 1_000).await;
        let b = stored_game(&h.state, "B", 1_000).await;

        let draft = promos
            .create_promotion(&admin(), new_promotion(&h, 10, vec![a.id().to_string()]))
            .await
            .unwrap();
        let mut stale = h.state.db.promotions().find_by_id(&draft.id).await.unwrap().unwrap();

        promos.activate_promotion(&admin(), &draft.id).await.unwrap();

        // The snapshot loaded before activation still looks like a draft
        stale.add_game(b.id(), h.now()).unwrap();
        let err = ServiceError::from(h.state.db.promotions().update(&stale).await.unwrap_err());
        assert_eq!(err.code(), ErrorCode::ConcurrentUpdate);

        // Through the service the attachment is decided on fresh state
        let err = promos
            .add_game_to_promotion(&admin(), &draft.id, b.id())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::PromotionAlreadyActive { .. })));

        let stored = h.state.db.promotions().find_by_id(&draft.id).await.unwrap().unwrap();
        assert!(stored.is_active());
        assert_eq!(stored.game_ids(), [a.id().to_string()]);
    }

    #[tokio::test]
    async fn test_delete_is_unconditional() {
        let h = harness().await;
        let promos = service(&h.state);
        let a = stored_game(&h.state, "A", 1_000).await;

        let promo = promos
            .create_promotion(&admin(), new_promotion(&h, 10, vec![a.id().to_string()]))
            .await
            .unwrap();
        promos.activate_promotion(&admin(), &promo.id).await.unwrap();
        promos.delete_promotion(&admin(), &promo.id).await.unwrap();

        assert!(promos.list_promotions(&admin(), false).await.unwrap().is_empty());
        let err = promos.delete_promotion(&admin(), &promo.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_acquire_promotion_debits_discounted_price() {
        let h = harness().await;
        let promos = service(&h.state);
        let buyer = funded(&h.state, "buyer@example.com", 10_000).await;
        let a = stored_game(&h.state, "A", 10_000).await;

        let promo = promos
            .create_promotion(&admin(), new_promotion(&h, 25, vec![a.id().to_string()]))
            .await
            .unwrap();
        promos.activate_promotion(&admin(), &promo.id).await.unwrap();

        let receipt = promos.acquire_promotion(&buyer, &promo.id).await.unwrap();
        assert_eq!(receipt.total_charged, Money::from_cents(7_500));
        assert_eq!(receipt.library_entries.len(), 1);
        assert_eq!(balance(&h.state, &buyer).await, Money::from_cents(2_500));

        let err = promos.acquire_promotion(&buyer, &promo.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::AllItemsOwned { .. })));
    }

    #[tokio::test]
    async fn test_acquire_promotion_skips_owned_games() {
        let h = harness().await;
        let promos = service(&h.state);
        let games = GameService::new(h.state.clone());
        let buyer = funded(&h.state, "buyer@example.com", 10_000).await;
        let a = stored_game(&h.state, "A", 2_000).await;
        let b = stored_game(&h.state, "B", 3_000).await;
        let c = stored_game(&h.state, "C", 4_000).await;

        games.acquire_game(&buyer, a.id()).await.unwrap();

        let ids = vec![a.id().to_string(), b.id().to_string(), c.id().to_string()];
        let promo = promos.create_promotion(&admin(), new_promotion(&h, 50, ids)).await.unwrap();
        promos.activate_promotion(&admin(), &promo.id).await.unwrap();

        let quote = promos.quote(&buyer, &promo.id).await.unwrap();
        assert_eq!(quote.lines.len(), 2);
        assert_eq!(quote.total, Money::from_cents(3_500));

        let receipt = promos.acquire_promotion(&buyer, &promo.id).await.unwrap();
        assert_eq!(receipt.total_charged, Money::from_cents(3_500));
        assert_eq!(receipt.library_entries.len(), 2);
        assert!(receipt.movements.iter().all(|m| m.kind == MovementKind::Withdrawal));
        assert_eq!(balance(&h.state, &buyer).await, Money::from_cents(4_500));
    }

    #[tokio::test]
    async fn test_unaffordable_bundle_changes_nothing() {
        let h = harness().await;
        let promos = service(&h.state);
        let buyer = funded(&h.state, "buyer@example.com", 5_000).await;
        let a = stored_game(&h.state, "A", 4_000).await;
        let b = stored_game(&h.state, "B", 4_000).await;

        let ids = vec![a.id().to_string(), b.id().to_string()];
        let promo = promos.create_promotion(&admin(), new_promotion(&h, 10, ids)).await.unwrap();
        promos.activate_promotion(&admin(), &promo.id).await.unwrap();

        let err = promos.acquire_promotion(&buyer, &promo.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::InsufficientFunds { .. })));

        let user = h
            .state
            .db
            .users()
            .find_by_id(buyer.user_id().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.balance(), Money::from_cents(5_000));
        assert!(user.library().is_empty());
        assert_eq!(user.movements().len(), 1);
    }

    #[tokio::test]
    async fn test_full_discount_is_free_grant() {
        let h = harness().await;
        let promos = service(&h.state);
        let buyer = stored_user(&h.state, "buyer@example.com", Role::Standard).await;
        let a = stored_game(&h.state, "A", 4_000).await;

        let promo = promos
            .create_promotion(&admin(), new_promotion(&h, 100, vec![a.id().to_string()]))
            .await
            .unwrap();
        promos.activate_promotion(&admin(), &promo.id).await.unwrap();

        let receipt = promos.acquire_promotion(&buyer, &promo.id).await.unwrap();
        assert_eq!(receipt.movements[0].kind, MovementKind::FreeGrant);
        assert_eq!(receipt.total_charged, Money::zero());
    }

    #[tokio::test]
    async fn test_draft_promotion_cannot_be_bought() {
        let h = harness().await;
        let promos = service(&h.state);
        let buyer = funded(&h.state, "buyer@example.com", 5_000).await;
        let a = stored_game(&h.state, "A", 1_000).await;

        let promo = promos
            .create_promotion(&admin(), new_promotion(&h, 10, vec![a.id().to_string()]))
            .await
            .unwrap();

        let err = promos.acquire_promotion(&buyer, &promo.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::PromotionNotActive { .. })));
    }
}
