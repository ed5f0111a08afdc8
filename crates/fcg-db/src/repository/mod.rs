//! # Repository Module
//!
//! Persistence gateway, one repository per aggregate.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Application service                                                   │
//! │       │                                                                 │
//! │       │  db.games().find_by_id(id)                                     │
//! │       ▼                                                                 │
//! │  GameRepository                                                        │
//! │  ├── find_by_id / find_active_by_name    → Option<Game>  (absent ≠ err)│
//! │  ├── list(filter)                         → Vec<Game>                  │
//! │  ├── insert / update                                                   │
//! │  └── count                                                             │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Missing-by-id lookups return Ok(None); the caller decides whether    │
//! │  that is a NotFound.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Users, profile writes
//! - [`GameRepository`](game::GameRepository) - Catalog
//! - [`PromotionRepository`](promotion::PromotionRepository) - Promotions + associations
//! - [`LibraryRepository`](library::LibraryRepository) - Ownership lookups
//! - [`MovementRepository`](library::MovementRepository) - Ledger lookups

pub mod game;
pub mod library;
pub mod promotion;
pub mod user;
