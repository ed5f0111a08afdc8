//! # User Service
//!
//! Registration, login, credentials, roles, activation and the wallet.
//!
//! ## Who May Do What
//! ```text
//! register, login, change_password      anyone (the password is the proof)
//! deposit, user_details, owned_games    the user itself or an admin
//! reset_password, change_role,
//! activate/deactivate, list_users       admin only
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use fcg_core::{
    CoreError, Email, Money, Movement, Name, Password, Role, User, UserRecord,
};
use fcg_db::{DbError, UserFilter};

use crate::context::CallerContext;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{with_retry, AppState};

// =============================================================================
// Views
// =============================================================================

/// A user as listed to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserSummary {
    fn from(record: UserRecord) -> Self {
        UserSummary {
            id: record.id,
            name: record.name,
            email: record.email,
            role: record.role,
            is_active: record.is_active,
            balance: Money::from_cents(record.balance_cents),
            created_at: record.created_at,
        }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary::from(user.to_record())
    }
}

/// A library entry with the title and current price of its game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedGameView {
    pub game_id: String,
    pub name: String,
    pub price: Money,
    pub acquired_at: DateTime<Utc>,
}

/// Profile, library and ledger of one user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub profile: UserSummary,
    pub library: Vec<OwnedGameView>,
    /// Newest first.
    pub movements: Vec<Movement>,
}

// =============================================================================
// Service
// =============================================================================

/// How a profile write finds its user.
#[derive(Debug, Clone, Copy)]
enum UserKey<'a> {
    Id(&'a str),
    Email(&'a str),
}

#[derive(Clone)]
pub struct UserService {
    state: AppState,
}

impl UserService {
    pub fn new(state: AppState) -> Self {
        UserService { state }
    }

    /// Creates a standard, active user with an empty wallet.
    ///
    /// ## Errors
    /// - Validation: `InvalidName`, `InvalidEmail`, `WeakCredential`
    /// - Conflict: `EmailAlreadyRegistered`
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ServiceResult<UserSummary> {
        let name = Name::parse(name)?;
        let email = Email::parse(email)?;
        let password = Password::parse(password)?;

        let user = self.create_user(name, email, &password, Role::Standard).await?;
        Ok(UserSummary::from(&user))
    }

    /// Returns a bearer token.
    ///
    /// Unknown e-mail and wrong password are both `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<String> {
        let user = match self.state.db.users().find_by_email(email).await? {
            Some(user) if self.state.hasher.verify(password, user.password_hash()) => user,
            _ => {
                warn!(email = %email, "Rejected login");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        user.ensure_active()?;

        info!(user_id = %user.id(), "User logged in");
        self.state.tokens.issue(&user)
    }

    /// Replaces the password after checking the current one.
    pub async fn change_password(&self, email: &str, current: &str, new: &str) -> ServiceResult<()> {
        let password = Password::parse(new)?;
        let hash = self.state.hasher.hash(&password)?;

        let result = self
            .update_profile("change_password", UserKey::Email(email), |user| {
                if !self.state.hasher.verify(current, user.password_hash()) {
                    return Err(ServiceError::InvalidCredentials);
                }
                user.change_password_hash(hash.clone());
                Ok(())
            })
            .await;

        let (user, ()) = match result {
            Err(ServiceError::InvalidCredentials | ServiceError::NotFound { .. }) => {
                warn!(email = %email, "Rejected password change");
                return Err(ServiceError::InvalidCredentials);
            }
            other => other?,
        };

        info!(target: "audit", user_id = %user.id(), "Password changed");
        Ok(())
    }

    /// Replaces a user's password without the current one. Admin only.
    pub async fn reset_password(&self, caller: &CallerContext, email: &str, new: &str) -> ServiceResult<()> {
        let admin_id = caller.require_admin()?;
        let password = Password::parse(new)?;
        let hash = self.state.hasher.hash(&password)?;

        let (user, ()) = self
            .update_profile("reset_password", UserKey::Email(email), |user| {
                user.change_password_hash(hash.clone());
                Ok(())
            })
            .await?;

        info!(target: "audit", admin_id = %admin_id, user_id = %user.id(), "Password reset");
        Ok(())
    }

    /// `role` is a name (`admin`, `standard`) or a code (`1`, `2`). Admin only.
    pub async fn change_role(&self, caller: &CallerContext, user_id: &str, role: &str) -> ServiceResult<UserSummary> {
        let admin_id = caller.require_admin()?;
        let role = Role::parse(role)?;

        let (user, previous) = self
            .update_profile("change_role", UserKey::Id(user_id), |user| {
                let previous = user.role();
                user.change_role(role);
                Ok(previous)
            })
            .await?;

        info!(
            target: "audit",
            admin_id = %admin_id,
            user_id = %user_id,
            from = %previous,
            to = %role,
            "Role changed"
        );
        Ok(UserSummary::from(&user))
    }

    pub async fn activate_user(&self, caller: &CallerContext, user_id: &str) -> ServiceResult<UserSummary> {
        let admin_id = caller.require_admin()?;

        let (user, ()) = self
            .update_profile("activate_user", UserKey::Id(user_id), |user| Ok(user.activate()?))
            .await?;

        info!(target: "audit", admin_id = %admin_id, user_id = %user_id, "User activated");
        Ok(UserSummary::from(&user))
    }

    /// A deactivated user can neither log in nor buy.
    pub async fn deactivate_user(&self, caller: &CallerContext, user_id: &str) -> ServiceResult<UserSummary> {
        let admin_id = caller.require_admin()?;

        let (user, ()) = self
            .update_profile("deactivate_user", UserKey::Id(user_id), |user| Ok(user.deactivate()?))
            .await?;

        info!(target: "audit", admin_id = %admin_id, user_id = %user_id, "User deactivated");
        Ok(UserSummary::from(&user))
    }

    /// Applies `change` to a freshly loaded user and persists the profile.
    ///
    /// A version conflict reloads and applies `change` again.
    async fn update_profile<T, F>(&self, operation: &'static str, key: UserKey<'_>, change: F) -> ServiceResult<(User, T)>
    where
        F: Fn(&mut User) -> ServiceResult<T>,
    {
        let change = &change;
        with_retry(self.state.purchase_retry_attempts, operation, move || {
            self.try_update_profile(key, change)
        })
        .await
    }

    async fn try_update_profile<T, F>(&self, key: UserKey<'_>, change: &F) -> ServiceResult<(User, T)>
    where
        F: Fn(&mut User) -> ServiceResult<T>,
    {
        let mut user = match key {
            UserKey::Id(id) => self.load(id).await?,
            UserKey::Email(email) => self
                .state
                .db
                .users()
                .find_by_email(email)
                .await?
                .ok_or_else(|| ServiceError::not_found("User", email))?,
        };

        let out = change(&mut user)?;
        self.state.db.users().update_profile(&user).await?;
        Ok((user, out))
    }

    pub async fn list_users(&self, caller: &CallerContext, filter: &UserFilter) -> ServiceResult<Vec<UserSummary>> {
        caller.require_admin()?;

        let records = self.state.db.users().list(filter).await?;
        Ok(records.into_iter().map(UserSummary::from).collect())
    }

    /// Credits `amount` to the wallet and appends a Deposit movement.
    pub async fn deposit(&self, caller: &CallerContext, user_id: &str, amount: Money) -> ServiceResult<Movement> {
        caller.require_self_or_admin(user_id)?;

        let movement = with_retry(self.state.purchase_retry_attempts, "deposit", || {
            self.try_deposit(user_id, amount)
        })
        .await?;

        info!(
            target: "audit",
            user_id = %user_id,
            amount = %movement.amount(),
            balance = movement.balance_after_cents,
            "Deposit"
        );
        Ok(movement)
    }

    async fn try_deposit(&self, user_id: &str, amount: Money) -> ServiceResult<Movement> {
        let mut user = self.load(user_id).await?;
        user.ensure_active()?;
        let movement = user.deposit(amount, self.state.clock.now())?;

        let mut uow = self.state.db.begin().await?;
        uow.record_deposit(&user, &movement).await?;
        uow.commit().await?;

        Ok(movement)
    }

    pub async fn user_details(&self, caller: &CallerContext, user_id: &str) -> ServiceResult<UserDetails> {
        caller.require_self_or_admin(user_id)?;

        let user = self.load(user_id).await?;
        let library = self.owned_games(caller, user_id).await?;

        Ok(UserDetails {
            profile: UserSummary::from(&user),
            library,
            movements: user.movements_newest_first(),
        })
    }

    /// Games in the user's library, in acquisition order.
    pub async fn owned_games(&self, caller: &CallerContext, user_id: &str) -> ServiceResult<Vec<OwnedGameView>> {
        caller.require_self_or_admin(user_id)?;

        let owned = self.state.db.library().owned_games(user_id).await?;
        Ok(owned
            .into_iter()
            .map(|o| OwnedGameView {
                game_id: o.game.id,
                name: o.game.name,
                price: Money::from_cents(o.game.price_cents),
                acquired_at: o.acquired_at,
            })
            .collect())
    }

    /// Makes sure an administrator with this e-mail exists.
    ///
    /// Creates it when missing and promotes an existing standard user.
    /// Calling it again changes nothing. Returns the user id.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> ServiceResult<String> {
        let email = Email::parse(email)?;

        if let Some(user) = self.state.db.users().find_by_email(email.as_str()).await? {
            if !user.is_admin() {
                self.update_profile("ensure_admin", UserKey::Id(user.id()), |user| {
                    user.change_role(Role::Admin);
                    Ok(())
                })
                .await?;
                info!(target: "audit", user_id = %user.id(), "Existing user promoted to admin");
            }
            return Ok(user.id().to_string());
        }

        let name = Name::parse(name)?;
        let password = Password::parse(password)?;
        let user = self.create_user(name, email, &password, Role::Admin).await?;
        Ok(user.id().to_string())
    }

    async fn create_user(&self, name: Name, email: Email, password: &Password, role: Role) -> ServiceResult<User> {
        let taken = || CoreError::EmailAlreadyRegistered {
            email: email.to_string(),
        };

        if self.state.db.users().email_exists(email.as_str()).await? {
            return Err(taken().into());
        }

        let hash = self.state.hasher.hash(password)?;
        let mut user = User::register(name, email.clone(), hash, self.state.clock.now());
        user.change_role(role);

        // Two registrations racing past the check above meet the UNIQUE index
        match self.state.db.users().insert(&user).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => return Err(taken().into()),
            Err(e) => return Err(e.into()),
        }

        info!(target: "audit", user_id = %user.id(), role = %role, "User registered");
        Ok(user)
    }

    async fn load(&self, user_id: &str) -> ServiceResult<User> {
        self.state
            .db
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
