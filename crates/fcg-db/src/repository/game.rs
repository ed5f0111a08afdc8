//! # Game Repository
//!
//! Database operations for the catalog.
//!
//! ## Catalog Views
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  list(GameFilter { published, active })                                │
//! │                                                                         │
//! │  Admin view:     GameFilter::default()           every game            │
//! │  Public view:    GameFilter::purchasable()       published AND active  │
//! │                                                                         │
//! │  find_by_ids(&[id])  used to load a promotion's games in one query     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fcg_core::{Game, GameRecord};

const GAME_COLUMNS: &str = r#"
    id, name, description, price_cents, game_type,
    is_published, is_active, created_at, version
"#;

/// Optional predicates for [`GameRepository::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GameFilter {
    pub published: Option<bool>,
    pub active: Option<bool>,
}

impl GameFilter {
    /// Games a customer can see and buy.
    pub fn purchasable() -> Self {
        GameFilter {
            published: Some(true),
            active: Some(true),
        }
    }
}

/// Repository for game database operations.
#[derive(Debug, Clone)]
pub struct GameRepository {
    pool: SqlitePool,
}

impl GameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        GameRepository { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Game>> {
        debug!(id = %id, "Loading game");

        let record = sqlx::query_as::<_, GameRecord>(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(Game::from_record).transpose().map_err(DbError::from)
    }

    /// Gets the active game carrying `name`, if any.
    pub async fn find_active_by_name(&self, name: &str) -> DbResult<Option<Game>> {
        let record = sqlx::query_as::<_, GameRecord>(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE name = ?1 AND is_active = 1"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        record.map(Game::from_record).transpose().map_err(DbError::from)
    }

    /// Whether another active game already uses `name`.
    ///
    /// `excluding_id` lets a game being reactivated ignore itself.
    pub async fn active_name_taken(&self, name: &str, excluding_id: Option<&str>) -> DbResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM games
                WHERE name = ?1 AND is_active = 1 AND id != COALESCE(?2, '')
            )
            "#,
        )
        .bind(name.trim())
        .bind(excluding_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    /// Lists games ordered by name.
    pub async fn list(&self, filter: GameFilter) -> DbResult<Vec<Game>> {
        debug!(?filter, "Listing games");

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {GAME_COLUMNS} FROM games WHERE 1 = 1"));

        if let Some(published) = filter.published {
            query.push(" AND is_published = ").push_bind(published);
        }
        if let Some(active) = filter.active {
            query.push(" AND is_active = ").push_bind(active);
        }
        query.push(" ORDER BY name, created_at");

        let records = query
            .build_query_as::<GameRecord>()
            .fetch_all(&self.pool)
            .await?;

        records
            .into_iter()
            .map(|r| Game::from_record(r).map_err(DbError::from))
            .collect()
    }

    /// Loads every game in `ids` that exists. Unknown ids are skipped.
    pub async fn find_by_ids(&self, ids: &[String]) -> DbResult<Vec<Game>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {GAME_COLUMNS} FROM games WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let records = query
            .build_query_as::<GameRecord>()
            .fetch_all(&self.pool)
            .await?;

        records
            .into_iter()
            .map(|r| Game::from_record(r).map_err(DbError::from))
            .collect()
    }

    pub async fn insert(&self, game: &Game) -> DbResult<()> {
        debug!(id = %game.id(), name = %game.name(), "Inserting game");

        let record = game.to_record();
        sqlx::query(
            r#"
            INSERT INTO games (
                id, name, description, price_cents, game_type,
                is_published, is_active, created_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.price_cents)
        .bind(record.game_type)
        .bind(record.is_published)
        .bind(record.is_active)
        .bind(record.created_at)
        .bind(record.version)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &record.name),
            other => other,
        })?;

        Ok(())
    }

    /// Writes every mutable column of the game if nobody else changed it
    /// since it was loaded.
    ///
    /// ## Errors
    /// - `NotFound`: no such game
    /// - `Conflict`: the stored version moved on; reload and decide again
    pub async fn update(&self, game: &Game) -> DbResult<()> {
        debug!(id = %game.id(), version = game.version(), "Updating game");

        let record = game.to_record();
        let result = sqlx::query(
            r#"
            UPDATE games
            SET name = ?2, description = ?3, price_cents = ?4, game_type = ?5,
                is_published = ?6, is_active = ?7, version = version + 1
            WHERE id = ?1 AND version = ?8
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.price_cents)
        .bind(record.game_type)
        .bind(record.is_published)
        .bind(record.is_active)
        .bind(record.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_stale(&record.id).await);
        }

        Ok(())
    }

    async fn missing_or_stale(&self, id: &str) -> DbError {
        match sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM games WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
        {
            Ok(true) => DbError::conflict("Game", id),
            Ok(false) => DbError::not_found("Game", id),
            Err(e) => e.into(),
        }
    }

    /// Counts all games (for diagnostics and the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM games")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
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
    use fcg_core::{GameType, Money};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn game(name: &str, published: bool) -> Game {
        let mut game = Game::register(
            name,
            "test",
            Money::from_cents(1999),
            GameType::Strategy,
            false,
            Utc::now(),
        )
        .unwrap();
        if published {
            game.publish().unwrap();
        }
        game
    }

    #[tokio::test]
    async fn test_insert_find_update() {
        let db = db().await;
        let mut g = game("Civilization", false);
        db.games().insert(&g).await.unwrap();

        g.publish().unwrap();
        db.games().update(&g).await.unwrap();

        let loaded = db.games().find_by_id(g.id()).await.unwrap().unwrap();
        assert!(loaded.is_published());
        assert_eq!(loaded.game_type(), GameType::Strategy);
        assert_eq!(loaded.price().cents(), 1999);
    }

    #[tokio::test]
    async fn test_public_and_admin_views() {
        let db = db().await;
        db.games().insert(&game("A", true)).await.unwrap();
        db.games().insert(&game("B", false)).await.unwrap();
        let mut retired = game("C", true);
        retired.deactivate().unwrap();
        db.games().insert(&retired).await.unwrap();

        let public = db.games().list(GameFilter::purchasable()).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].name(), "A");

        let all = db.games().list(GameFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(db.games().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_active_name_uniqueness() {
        let db = db().await;
        let first = game("Myst", true);
        db.games().insert(&first).await.unwrap();

        assert!(db.games().active_name_taken("Myst", None).await.unwrap());
        assert!(!db
            .games()
            .active_name_taken("Myst", Some(first.id()))
            .await
            .unwrap());

        // Storage backstop: partial unique index on active names
        let err = db.games().insert(&game("Myst", false)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let found = db.games().find_active_by_name("Myst").await.unwrap();
        assert_eq!(found.unwrap().id(), first.id());
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_unknown() {
        let db = db().await;
        let a = game("A", true);
        let b = game("B", true);
        db.games().insert(&a).await.unwrap();
        db.games().insert(&b).await.unwrap();

        let ids = vec![a.id().to_string(), "nope".to_string(), b.id().to_string()];
        let found = db.games().find_by_ids(&ids).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(db.games().find_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_game() {
        let db = db().await;
        let err = db.games().update(&game("Ghost", true)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_a_conflict() {
        let db = db().await;
        let g = game("Portal", false);
        db.games().insert(&g).await.unwrap();

        let mut first = db.games().find_by_id(g.id()).await.unwrap().unwrap();
        let mut second = db.games().find_by_id(g.id()).await.unwrap().unwrap();

        first.publish().unwrap();
        db.games().update(&first).await.unwrap();

        second.deactivate().unwrap();
        let err = db.games().update(&second).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert!(err.is_retryable());

        let stored = db.games().find_by_id(g.id()).await.unwrap().unwrap();
        assert!(stored.is_published());
        assert!(stored.is_active());
        assert_eq!(stored.version(), 1);
    }
}
