//! # fcg-db: Persistence Gateway for the Games Store
//!
//! SQLite storage for users, games, promotions, libraries and the wallet
//! ledger, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FCG Data Flow                                    │
//! │                                                                         │
//! │  fcg-service (acquire_game, deposit, ...)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     fcg-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │ UserRepository │   │  (embedded)  │   │   │
//! │  │   │               │◄───│ GameRepository │   │ 001_initial  │   │   │
//! │  │   │  SqlitePool   │    │ Promotion...   │   │              │   │   │
//! │  │   └───────┬───────┘    └────────────────┘   └──────────────┘   │   │
//! │  │           │                                                     │   │
//! │  │           └── begin() ──► UnitOfWork (uow.rs)                   │   │
//! │  │                           versioned wallet write + ledger rows  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (DATABASE_PATH, default ./fcg.db)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fcg_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./fcg.db")).await?;
//!
//! let mut user = db.users().find_by_id(&user_id).await?.expect("user");
//! let game = db.games().find_by_id(&game_id).await?.expect("game");
//! let receipt = fcg_core::acquire_game(&mut user, &game, chrono::Utc::now())?;
//!
//! let mut uow = db.begin().await?;
//! uow.record_purchase(&user, &receipt).await?;
//! uow.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod uow;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use uow::UnitOfWork;

pub use repository::game::{GameFilter, GameRepository};
pub use repository::library::{LibraryRepository, MovementRepository, OwnedGame};
pub use repository::promotion::PromotionRepository;
pub use repository::user::{UserFilter, UserRepository};
