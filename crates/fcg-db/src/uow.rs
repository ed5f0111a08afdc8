//! # Unit of Work
//!
//! One SQLite transaction covering a wallet change and everything it
//! produced.
//!
//! ## Purchase Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE users SET balance_cents = ?, version = version + 1           │
//! │     WHERE id = ? AND version = ?          ── 0 rows → Conflict         │
//! │    INSERT INTO movements ... (one per movement)                        │
//! │    INSERT INTO library   ... (one per entry, UNIQUE(user, game))       │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction → ROLLBACK              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Optimistic Concurrency
//! Two requests that loaded the same user at version N race to the
//! `UPDATE`. The first bumps it to N+1; the second matches zero rows and
//! gets [`DbError::Conflict`], so its debit never lands.
//!
//! With a single-connection pool (in-memory tests) load everything through
//! the repositories BEFORE calling [`Database::begin`](crate::Database::begin).

use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fcg_core::{LibraryEntry, Movement, PurchaseReceipt, User};

/// An open transaction. Dropping it without [`commit`](Self::commit) rolls
/// back.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        UnitOfWork { tx }
    }

    /// Writes the user's balance if nobody else changed it since load.
    pub async fn save_wallet(&mut self, user: &User) -> DbResult<()> {
        debug!(
            user_id = %user.id(),
            version = user.version(),
            balance = user.balance().cents(),
            "Saving wallet"
        );

        let result = sqlx::query(
            r#"
            UPDATE users
            SET balance_cents = ?1, version = version + 1
            WHERE id = ?2 AND version = ?3
            "#,
        )
        .bind(user.balance().cents())
        .bind(user.id())
        .bind(user.version())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("User", user.id()));
        }

        Ok(())
    }

    pub async fn insert_movement(&mut self, movement: &Movement) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO movements (
                id, user_id, kind, amount_cents, balance_before_cents,
                balance_after_cents, game_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.user_id)
        .bind(movement.kind)
        .bind(movement.amount_cents)
        .bind(movement.balance_before_cents)
        .bind(movement.balance_after_cents)
        .bind(&movement.game_id)
        .bind(movement.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    pub async fn insert_library_entry(&mut self, entry: &LibraryEntry) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO library (id, user_id, game_id, acquired_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.game_id)
        .bind(entry.acquired_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Persists a deposit: new balance plus its movement.
    pub async fn record_deposit(&mut self, user: &User, movement: &Movement) -> DbResult<()> {
        self.save_wallet(user).await?;
        self.insert_movement(movement).await
    }

    /// Persists an acquisition (single game or promotion batch).
    pub async fn record_purchase(&mut self, user: &User, receipt: &PurchaseReceipt) -> DbResult<()> {
        self.save_wallet(user).await?;
        for movement in &receipt.movements {
            self.insert_movement(movement).await?;
        }
        for entry in &receipt.library_entries {
            self.insert_library_entry(entry).await?;
        }
        Ok(())
    }

    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use fcg_core::{
        acquire_game, acquire_promotion, CredentialHash, DiscountRate, Email, Game, GameType,
        Money, MovementKind, Name, Promotion,
    };

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn funded_user(db: &Database, cents: i64) -> User {
        let mut user = User::register(
            Name::parse("Buyer").unwrap(),
            Email::parse("buyer@example.com").unwrap(),
            CredentialHash::new("hash"),
            Utc::now(),
        );
        db.users().insert(&user).await.unwrap();

        let movement = user.deposit(Money::from_cents(cents), Utc::now()).unwrap();
        let mut uow = db.begin().await.unwrap();
        uow.record_deposit(&user, &movement).await.unwrap();
        uow.commit().await.unwrap();

        db.users().find_by_id(user.id()).await.unwrap().unwrap()
    }

    async fn stored_game(db: &Database, name: &str, cents: i64) -> Game {
        let mut game = Game::register(
            name,
            "",
            Money::from_cents(cents),
            GameType::Action,
            false,
            Utc::now(),
        )
        .unwrap();
        game.publish().unwrap();
        db.games().insert(&game).await.unwrap();
        game
    }

    #[tokio::test]
    async fn test_deposit_persists_balance_version_and_movement() {
        let db = db().await;
        let user = funded_user(&db, 5_000).await;

        assert_eq!(user.balance().cents(), 5_000);
        assert_eq!(user.version(), 1);
        assert_eq!(user.movements().len(), 1);
        assert_eq!(user.movements()[0].kind, MovementKind::Deposit);
        assert_eq!(db.movements().ledger_balance(user.id()).await.unwrap(), 5_000);
    }

    #[tokio::test]
    async fn test_purchase_commits_all_rows() {
        let db = db().await;
        let mut user = funded_user(&db, 10_000).await;
        let game = stored_game(&db, "Doom", 6_000).await;

        let receipt = acquire_game(&mut user, &game, Utc::now()).unwrap();
        let mut uow = db.begin().await.unwrap();
        uow.record_purchase(&user, &receipt).await.unwrap();
        uow.commit().await.unwrap();

        let reloaded = db.users().find_by_id(user.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.balance().cents(), 4_000);
        assert!(reloaded.owns(game.id()));
        assert!(db.library().owns(user.id(), game.id()).await.unwrap());

        let owned = db.library().owned_games(user.id()).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].game.name, "Doom");

        let ledger = db.movements().list_for_user(user.id()).await.unwrap();
        assert_eq!(ledger[0].kind, MovementKind::Withdrawal);
        assert_eq!(db.movements().ledger_balance(user.id()).await.unwrap(), 4_000);
    }

    #[tokio::test]
    async fn test_stale_version_is_conflict_and_rolls_back() {
        let db = db().await;
        let user = funded_user(&db, 10_000).await;
        let a = stored_game(&db, "A", 1_000).await;
        let b = stored_game(&db, "B", 2_000).await;

        // Two requests load the same snapshot
        let mut first = user.clone();
        let mut second = user.clone();

        let receipt = acquire_game(&mut first, &a, Utc::now()).unwrap();
        let mut uow = db.begin().await.unwrap();
        uow.record_purchase(&first, &receipt).await.unwrap();
        uow.commit().await.unwrap();

        let receipt = acquire_game(&mut second, &b, Utc::now()).unwrap();
        let mut uow = db.begin().await.unwrap();
        let err = uow.record_purchase(&second, &receipt).await.unwrap_err();
        assert!(err.is_retryable());
        drop(uow);

        let reloaded = db.users().find_by_id(user.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.balance().cents(), 9_000);
        assert!(!reloaded.owns(b.id()));
    }

    #[tokio::test]
    async fn test_duplicate_library_row_rolls_back_batch() {
        let db = db().await;
        let mut user = funded_user(&db, 10_000).await;
        let game = stored_game(&db, "Quake", 1_000).await;

        let receipt = acquire_game(&mut user, &game, Utc::now()).unwrap();
        let mut uow = db.begin().await.unwrap();
        uow.record_purchase(&user, &receipt).await.unwrap();
        uow.commit().await.unwrap();

        // Forge a second entry for the same game at the fresh version
        let mut stale = db.users().find_by_id(user.id()).await.unwrap().unwrap();
        let movement = stale.deposit(Money::from_cents(1), Utc::now()).unwrap();
        let mut uow = db.begin().await.unwrap();
        uow.record_deposit(&stale, &movement).await.unwrap();
        let err = uow
            .insert_library_entry(&receipt.library_entries[0])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        uow.rollback().await.unwrap();

        let reloaded = db.users().find_by_id(user.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.balance().cents(), 9_000);
        assert_eq!(reloaded.library().len(), 1);
    }

    #[tokio::test]
    async fn test_promotion_batch_is_one_commit() {
        let db = db().await;
        let now = Utc::now();
        let mut user = funded_user(&db, 10_000).await;
        let a = stored_game(&db, "A", 4_000).await;
        let b = stored_game(&db, "B", 6_000).await;

        let mut promo = Promotion::create(
            "Bundle",
            "",
            DiscountRate::from_percent(50).unwrap(),
            now,
            now + chrono::Duration::days(1),
            now,
        )
        .unwrap();
        promo.add_game(a.id(), now).unwrap();
        promo.add_game(b.id(), now).unwrap();
        promo.activate(now).unwrap();

        let receipt = acquire_promotion(&mut user, &promo, &[a, b], now).unwrap();
        let mut uow = db.begin().await.unwrap();
        uow.record_purchase(&user, &receipt).await.unwrap();
        uow.commit().await.unwrap();

        let reloaded = db.users().find_by_id(user.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.balance().cents(), 5_000);
        assert_eq!(reloaded.library().len(), 2);
        assert_eq!(reloaded.version(), 2);
    }
}
