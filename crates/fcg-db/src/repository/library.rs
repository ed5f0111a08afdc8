//! # Library & Movement Repositories
//!
//! Read side of a user's ownership records and wallet ledger. Rows are only
//! ever written through [`UnitOfWork`](crate::uow::UnitOfWork), never here.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use fcg_core::{GameRecord, LibraryEntry, Movement};

/// A library row joined with the game it points at.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OwnedGame {
    pub entry_id: String,
    pub acquired_at: chrono::DateTime<chrono::Utc>,
    #[sqlx(flatten)]
    pub game: GameRecord,
}

/// Repository for library lookups.
#[derive(Debug, Clone)]
pub struct LibraryRepository {
    pool: SqlitePool,
}

impl LibraryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LibraryRepository { pool }
    }

    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<LibraryEntry>> {
        let entries = sqlx::query_as::<_, LibraryEntry>(
            r#"
            SELECT id, user_id, game_id, acquired_at
            FROM library
            WHERE user_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Games in the user's library with their current catalog data.
    pub async fn owned_games(&self, user_id: &str) -> DbResult<Vec<OwnedGame>> {
        debug!(user_id = %user_id, "Loading owned games");

        let owned = sqlx::query_as::<_, OwnedGame>(
            r#"
            SELECT
                l.id AS entry_id,
                l.acquired_at,
                g.id, g.name, g.description, g.price_cents, g.game_type,
                g.is_published, g.is_active, g.created_at, g.version
            FROM library l
            JOIN games g ON g.id = l.game_id
            WHERE l.user_id = ?1
            ORDER BY l.rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(owned)
    }

    pub async fn owns(&self, user_id: &str, game_id: &str) -> DbResult<bool> {
        let owns: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM library WHERE user_id = ?1 AND game_id = ?2)",
        )
        .bind(user_id)
        .bind(game_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(owns)
    }
}

/// Repository for ledger lookups.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Ledger of one user, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Movement>> {
        debug!(user_id = %user_id, "Loading movements");

        let movements = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, user_id, kind, amount_cents, balance_before_cents,
                   balance_after_cents, game_id, created_at
            FROM movements
            WHERE user_id = ?1
            ORDER BY rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Sum of signed movement amounts for a user.
    ///
    /// Equals the stored balance whenever the ledger is intact.
    pub async fn ledger_balance(&self, user_id: &str) -> DbResult<i64> {
        let balance: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(
                CASE kind
                    WHEN 'deposit' THEN amount_cents
                    WHEN 'withdrawal' THEN -amount_cents
                    ELSE 0
                END
            ), 0)
            FROM movements
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }
}
