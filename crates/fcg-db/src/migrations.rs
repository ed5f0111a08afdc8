//! # Database Migrations
//!
//! SQL migrations embedded into the binary at compile time.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::new                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  _sqlx_migrations table (created on first run)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  embedded migrations/sqlite/*.sql  vs  applied rows                    │
//! │       │                                                                 │
//! │       ├── 001_initial_schema.sql ✓ applied                             │
//! │       └── 00N_next_change.sql    ⬜ pending → run, then record          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Add `migrations/sqlite/NNN_description.sql` with the next number
//! 2. **NEVER** edit an applied migration; the checksum check will refuse it

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Every file under `migrations/sqlite`, relative to this crate.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs pending migrations in filename order, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
