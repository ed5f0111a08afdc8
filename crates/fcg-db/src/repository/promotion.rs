//! # Promotion Repository
//!
//! Promotions and their `promotion_games` associations.
//!
//! ```text
//! promotions (1) ──< promotion_games >── (N) games
//!                    PK (promotion_id, game_id)
//!                    ON DELETE CASCADE from promotions
//! ```
//!
//! Writes that touch both tables run in one transaction.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use fcg_core::{Promotion, PromotionRecord};

const PROMOTION_COLUMNS: &str = r#"
    id, title, description, discount_bps, starts_at, ends_at,
    is_active, created_at, version
"#;

/// Repository for promotion database operations.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        debug!(id = %id, "Loading promotion");

        let record = sqlx::query_as::<_, PromotionRecord>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => self.hydrate(record).await.map(Some),
            None => Ok(None),
        }
    }

    /// Lists every promotion, newest first.
    pub async fn list(&self) -> DbResult<Vec<Promotion>> {
        debug!("Listing promotions");

        let records = sqlx::query_as::<_, PromotionRecord>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions ORDER BY rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut promotions = Vec::with_capacity(records.len());
        for record in records {
            promotions.push(self.hydrate(record).await?);
        }
        Ok(promotions)
    }

    /// Promotions that are active and not expired at `now`.
    ///
    /// Expiry is compared on decoded timestamps rather than in SQL, since
    /// the stored text form has a variable number of fractional digits.
    pub async fn list_current(&self, now: DateTime<Utc>) -> DbResult<Vec<Promotion>> {
        let promotions = self.list().await?;
        Ok(promotions
            .into_iter()
            .filter(|p| p.is_active() && !p.is_expired(now))
            .collect())
    }

    /// Inserts the promotion and its game associations.
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<()> {
        debug!(
            id = %promotion.id(),
            games = promotion.game_ids().len(),
            "Inserting promotion"
        );

        let record = promotion.to_record();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, title, description, discount_bps, starts_at, ends_at,
                is_active, created_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.discount_bps)
        .bind(record.starts_at)
        .bind(record.ends_at)
        .bind(record.is_active)
        .bind(record.created_at)
        .bind(record.version)
        .execute(&mut *tx)
        .await?;

        for game_id in promotion.game_ids() {
            sqlx::query("INSERT INTO promotion_games (promotion_id, game_id) VALUES (?1, ?2)")
                .bind(&record.id)
                .bind(game_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Writes the active flag and attaches any game not yet associated, if
    /// nobody else changed the promotion since it was loaded.
    ///
    /// Associations are only ever added here; removal happens through
    /// [`delete`](Self::delete).
    ///
    /// ## Errors
    /// - `NotFound`: no such promotion
    /// - `Conflict`: the stored version moved on; nothing is written
    pub async fn update(&self, promotion: &Promotion) -> DbResult<()> {
        debug!(id = %promotion.id(), version = promotion.version(), "Updating promotion");

        let record = promotion.to_record();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE promotions
            SET title = ?2, description = ?3, discount_bps = ?4,
                starts_at = ?5, ends_at = ?6, is_active = ?7,
                version = version + 1
            WHERE id = ?1 AND version = ?8
            "#,
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.discount_bps)
        .bind(record.starts_at)
        .bind(record.ends_at)
        .bind(record.is_active)
        .bind(record.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM promotions WHERE id = ?1)")
                    .bind(&record.id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                DbError::conflict("Promotion", &record.id)
            } else {
                DbError::not_found("Promotion", &record.id)
            });
        }

        for game_id in promotion.game_ids() {
            sqlx::query(
                "INSERT OR IGNORE INTO promotion_games (promotion_id, game_id) VALUES (?1, ?2)",
            )
            .bind(&record.id)
            .bind(game_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Deletes the promotion. Associations cascade.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting promotion");

        let result = sqlx::query("DELETE FROM promotions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", id));
        }

        Ok(())
    }

    async fn hydrate(&self, record: PromotionRecord) -> DbResult<Promotion> {
        let game_ids: Vec<String> = sqlx::query_scalar(
            "SELECT game_id FROM promotion_games WHERE promotion_id = ?1 ORDER BY rowid",
        )
        .bind(&record.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Promotion::from_record(record, game_ids)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
