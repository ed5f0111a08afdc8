//! # User Repository
//!
//! Database operations for users.
//!
//! ## Loading the Aggregate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  find_by_id / find_by_email                                             │
//! │       │                                                                 │
//! │       ├── SELECT users      → UserRecord                                │
//! │       ├── SELECT movements  → Vec<Movement>                             │
//! │       └── SELECT library    → Vec<LibraryEntry>                         │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │       User::from_record(record, movements, library)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wallet writes do NOT go through here: they need the version check and
//! the movement/library rows in the same transaction, see
//! [`UnitOfWork`](crate::uow::UnitOfWork).

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fcg_core::{LibraryEntry, Movement, Role, User, UserRecord};

const USER_COLUMNS: &str = r#"
    id, name, email, password_hash, role, is_active,
    balance_cents, created_at, version
"#;

/// Optional predicates for [`UserRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user with ledger and library.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<User>> {
        debug!(id = %id, "Loading user");

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => self.hydrate(record).await.map(Some),
            None => Ok(None),
        }
    }

    /// Gets a user by natural key. `email` is compared lowercased.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        debug!(email = %email, "Loading user by email");

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => self.hydrate(record).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn email_exists(&self, email: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)")
            .bind(email.trim().to_lowercase())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Lists users (rows only, no ledger) ordered by name.
    pub async fn list(&self, filter: &UserFilter) -> DbResult<Vec<UserRecord>> {
        debug!(?filter, "Listing users");

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"));

        if let Some(role) = filter.role {
            query.push(" AND role = ").push_bind(role);
        }
        if let Some(is_active) = filter.is_active {
            query.push(" AND is_active = ").push_bind(is_active);
        }
        query.push(" ORDER BY name, email");

        let users = query
            .build_query_as::<UserRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Inserts a newly registered user.
    ///
    /// A taken e-mail surfaces as [`DbError::UniqueViolation`].
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id(), email = %user.email(), "Inserting user");

        let record = user.to_record();
        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role, is_active,
                balance_cents, created_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(record.role)
        .bind(record.is_active)
        .bind(record.balance_cents)
        .bind(record.created_at)
        .bind(record.version)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &record.email),
            other => other,
        })?;

        Ok(())
    }

    /// Writes name, credential, role and active flag if nobody else
    /// changed the user since it was loaded.
    ///
    /// Balance is left alone. The version is shared with wallet writes, so
    /// a profile change and a purchase on the same snapshot cannot both land.
    ///
    /// ## Errors
    /// - `NotFound`: no such user
    /// - `Conflict`: the stored version moved on
    pub async fn update_profile(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id(), version = user.version(), "Updating user profile");

        let record = user.to_record();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = ?2, password_hash = ?3, role = ?4, is_active = ?5,
                version = version + 1
            WHERE id = ?1 AND version = ?6
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.password_hash)
        .bind(record.role)
        .bind(record.is_active)
        .bind(record.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_stale(&record.id).await);
        }

        Ok(())
    }

    /// Deletes a user; ledger and library rows cascade.
    pub async fn remove(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Removing user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn missing_or_stale(&self, id: &str) -> DbError {
        match sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
        {
            Ok(true) => DbError::conflict("User", id),
            Ok(false) => DbError::not_found("User", id),
            Err(e) => e.into(),
        }
    }

    async fn hydrate(&self, record: UserRecord) -> DbResult<User> {
        let movements = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, user_id, kind, amount_cents, balance_before_cents,
                   balance_after_cents, game_id, created_at
            FROM movements
            WHERE user_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(&record.id)
        .fetch_all(&self.pool)
        .await?;

        let library = sqlx::query_as::<_, LibraryEntry>(
            r#"
            SELECT id, user_id, game_id, acquired_at
            FROM library
            WHERE user_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(&record.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(User::from_record(record, movements, library)?)
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
    use fcg_core::{CredentialHash, Email, Name};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_user(email: &str) -> User {
        User::register(
            Name::parse("Tester").unwrap(),
            Email::parse(email).unwrap(),
            CredentialHash::new("hash"),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = db().await;
        let user = new_user("tester@example.com");
        db.users().insert(&user).await.unwrap();

        let by_id = db.users().find_by_id(user.id()).await.unwrap().unwrap();
        assert_eq!(by_id.email().as_str(), "tester@example.com");
        assert_eq!(by_id.role(), Role::Standard);

        let by_email = db
            .users()
            .find_by_email("TESTER@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id(), user.id());

        assert!(db.users().find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = db().await;
        db.users().insert(&new_user("dup@example.com")).await.unwrap();

        let err = db
            .users()
            .insert(&new_user("dup@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(db.users().email_exists("dup@example.com").await.unwrap());
        assert_eq!(db.users().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_profile_and_filter() {
        let db = db().await;
        let mut admin = new_user("admin@example.com");
        db.users().insert(&admin).await.unwrap();
        db.users().insert(&new_user("plain@example.com")).await.unwrap();

        admin.change_role(Role::Admin);
        db.users().update_profile(&admin).await.unwrap();

        let admins = db
            .users()
            .list(&UserFilter {
                role: Some(Role::Admin),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].email, "admin@example.com");

        let everyone = db.users().list(&UserFilter::default()).await.unwrap();
        assert_eq!(everyone.len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let db = db().await;
        let err = db
            .users()
            .update_profile(&new_user("ghost@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_stale_profile_write_is_a_conflict() {
        let db = db().await;
        let user = new_user("race@example.com");
        db.users().insert(&user).await.unwrap();

        let mut promoting = db.users().find_by_id(user.id()).await.unwrap().unwrap();
        let mut deactivating = db.users().find_by_id(user.id()).await.unwrap().unwrap();

        promoting.change_role(Role::Admin);
        db.users().update_profile(&promoting).await.unwrap();

        deactivating.deactivate().unwrap();
        let err = db.users().update_profile(&deactivating).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let stored = db.users().find_by_id(user.id()).await.unwrap().unwrap();
        assert_eq!(stored.role(), Role::Admin);
        assert!(stored.is_active());
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let db = db().await;
        let user = new_user("gone@example.com");
        db.users().insert(&user).await.unwrap();
        db.users().remove(user.id()).await.unwrap();
        assert!(db.users().find_by_id(user.id()).await.unwrap().is_none());
        assert!(matches!(
            db.users().remove(user.id()).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
