//! # User Aggregate
//!
//! Identity, credentials, role, wallet, movement ledger and library.
//!
//! ## Ownership
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ User                                                         │
//! │   id, name, email, credential hash, role, active, version    │
//! │                                                              │
//! │   ┌──────────┐   ┌────────────────────┐   ┌───────────────┐  │
//! │   │  Wallet  │   │ Movements (ledger) │   │    Library    │  │
//! │   │ balance  │   │ append-only        │   │ one per game  │  │
//! │   └──────────┘   └────────────────────┘   └───────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//!          Game / Promotion are referenced by id only
//! ```
//!
//! Every wallet change goes through this type so that it always produces a
//! matching [`Movement`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{new_id, MovementKind, Role};
use crate::validation::{Email, Name};
use crate::wallet::Wallet;

// =============================================================================
// Persisted Shapes
// =============================================================================

/// Row shape of a user.
///
/// `version` is bumped by every persisted change (wallet or profile);
/// writers compare it to detect concurrent updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

/// Immutable wallet ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Movement {
    pub id: String,
    pub user_id: String,
    pub kind: MovementKind,
    pub amount_cents: i64,
    pub balance_before_cents: i64,
    pub balance_after_cents: i64,

    /// Set for acquisitions, empty for deposits.
    pub game_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Movement {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// `balance_after == kind.apply(balance_before, amount)`
    pub fn is_consistent(&self) -> bool {
        self.kind
            .apply(Money::from_cents(self.balance_before_cents), self.amount())
            .cents()
            == self.balance_after_cents
    }
}

/// Proof that a user owns a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LibraryEntry {
    pub id: String,
    pub user_id: String,
    pub game_id: String,

    #[ts(as = "String")]
    pub acquired_at: DateTime<Utc>,
}

/// Stored form of a password produced by a credential hasher.
///
/// Opaque to the domain: it is only ever compared by the hasher.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
    pub fn new(stored: impl Into<String>) -> Self {
        CredentialHash(stored.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialHash(***)")
    }
}

// =============================================================================
// User Aggregate
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: String,
    name: Name,
    email: Email,
    password_hash: CredentialHash,
    role: Role,
    is_active: bool,
    created_at: DateTime<Utc>,
    wallet: Wallet,
    movements: Vec<Movement>,
    library: Vec<LibraryEntry>,
    version: i64,
}

impl User {
    /// New Standard user, active, with an empty wallet.
    pub fn register(name: Name, email: Email, password_hash: CredentialHash, now: DateTime<Utc>) -> User {
        User {
            id: new_id(),
            name,
            email,
            password_hash,
            role: Role::Standard,
            is_active: true,
            created_at: now,
            wallet: Wallet::empty(),
            movements: Vec::new(),
            library: Vec::new(),
            version: 0,
        }
    }

    /// Restores a user from its row, ledger and library.
    pub fn from_record(
        record: UserRecord,
        movements: Vec<Movement>,
        library: Vec<LibraryEntry>,
    ) -> CoreResult<User> {
        Ok(User {
            name: Name::parse(&record.name)?,
            email: Email::parse(&record.email)?,
            wallet: Wallet::with_balance(Money::from_cents(record.balance_cents))?,
            id: record.id,
            password_hash: CredentialHash::new(record.password_hash),
            role: record.role,
            is_active: record.is_active,
            created_at: record.created_at,
            movements,
            library,
            version: record.version,
        })
    }

    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            id: self.id.clone(),
            name: self.name.as_str().to_string(),
            email: self.email.as_str().to_string(),
            password_hash: self.password_hash.as_str().to_string(),
            role: self.role,
            is_active: self.is_active,
            balance_cents: self.wallet.balance().cents(),
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

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password_hash(&self) -> &CredentialHash {
        &self.password_hash
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn balance(&self) -> Money {
        self.wallet.balance()
    }

    /// Version the aggregate was loaded at.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Ledger in insertion order.
    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    /// Ties on `created_at` keep the later insertion first.
    pub fn movements_newest_first(&self) -> Vec<Movement> {
        let mut sorted: Vec<Movement> = self.movements.iter().rev().cloned().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sorted
    }

    pub fn library(&self) -> &[LibraryEntry] {
        &self.library
    }

    pub fn owns(&self, game_id: &str) -> bool {
        self.library.iter().any(|entry| entry.game_id == game_id)
    }

    // -------------------------------------------------------------------------
    // Wallet
    // -------------------------------------------------------------------------

    /// Credits the wallet and appends a Deposit movement.
    pub fn deposit(&mut self, amount: Money, now: DateTime<Utc>) -> CoreResult<Movement> {
        let before = self.wallet.balance();
        self.wallet.deposit(amount)?;

        let movement = self.movement(MovementKind::Deposit, amount, before, None, now);
        self.movements.push(movement.clone());
        Ok(movement)
    }

    /// Records ownership of `game_id` bought at `price`.
    ///
    /// A zero price is a FreeGrant and leaves the balance alone; anything
    /// else is debited as a Withdrawal. Nothing changes on failure.
    pub fn record_acquisition(
        &mut self,
        game_id: &str,
        price: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<(Movement, LibraryEntry)> {
        if self.owns(game_id) {
            return Err(CoreError::AlreadyOwned {
                game_id: game_id.to_string(),
            });
        }

        let before = self.wallet.balance();
        let kind = if price.is_zero() {
            MovementKind::FreeGrant
        } else {
            self.wallet.debit(price)?;
            MovementKind::Withdrawal
        };

        let movement = self.movement(kind, price, before, Some(game_id.to_string()), now);
        let entry = LibraryEntry {
            id: new_id(),
            user_id: self.id.clone(),
            game_id: game_id.to_string(),
            acquired_at: now,
        };

        self.movements.push(movement.clone());
        self.library.push(entry.clone());
        Ok((movement, entry))
    }

    fn movement(
        &self,
        kind: MovementKind,
        amount: Money,
        before: Money,
        game_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Movement {
        Movement {
            id: new_id(),
            user_id: self.id.clone(),
            kind,
            amount_cents: amount.cents(),
            balance_before_cents: before.cents(),
            balance_after_cents: self.wallet.balance().cents(),
            game_id,
            created_at: now,
        }
    }

    // -------------------------------------------------------------------------
    // Account
    // -------------------------------------------------------------------------

    pub fn ensure_active(&self) -> CoreResult<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(CoreError::UserInactive {
                user_id: self.id.clone(),
            })
        }
    }

    pub fn change_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn change_password_hash(&mut self, password_hash: CredentialHash) {
        self.password_hash = password_hash;
    }

    pub fn activate(&mut self) -> CoreResult<()> {
        if self.is_active {
            return Err(CoreError::AlreadyActive {
                entity: "User",
                id: self.id.clone(),
            });
        }
        self.is_active = true;
        Ok(())
    }

    pub fn deactivate(&mut self) -> CoreResult<()> {
        if !self.is_active {
            return Err(CoreError::AlreadyInactive {
                entity: "User",
                id: self.id.clone(),
            });
        }
        self.is_active = false;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
