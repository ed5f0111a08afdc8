//! # FCG Service
//!
//! Application services for the games store: who may do what, and in which
//! order domain rules and persistence run.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         FCG Service                                     │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  UserService   │  │  GameService   │  │  PromotionService          ││
//! │  │                │  │                │  │                            ││
//! │  │ • register     │  │ • register     │  │ • create / activate        ││
//! │  │ • login        │  │ • publish      │  │ • add game / delete        ││
//! │  │ • deposit      │  │ • (de)activate │  │ • list with prices         ││
//! │  │ • roles        │  │ • acquire      │  │ • quote / acquire          ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │  SQLite (fcg-db)   Argon2 hashing   HS256 JWT   Clock   tracing  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport (HTTP routing, request shaping) is left to the host: it
//! validates the bearer token into a [`CallerContext`] and calls a service.
//!
//! ## Configuration
//! See [`config`] for the environment variables.

pub mod auth;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod services;
pub mod telemetry;

use std::sync::Arc;

use tracing::info;

use fcg_db::Database;

// Re-exports
pub use auth::{Argon2Hasher, CredentialHasher, JwtManager, TokenIssuer};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, ServiceConfig};
pub use context::CallerContext;
pub use error::{ErrorCode, ErrorResponse, ServiceError, ServiceResult};
pub use services::{AppState, GameService, PromotionService, UserService};

/// The three services over one shared state.
#[derive(Clone)]
pub struct FcgService {
    pub users: UserService,
    pub games: GameService,
    pub promotions: PromotionService,
    state: AppState,
}

impl FcgService {
    /// Opens the database, wires the production collaborators and creates
    /// the configured administrator.
    pub async fn start(config: &ServiceConfig) -> ServiceResult<Self> {
        info!(path = %config.database_path.display(), "Starting FCG service");

        let db = Database::new(config.db_config()).await?;

        let state = AppState {
            db,
            hasher: Arc::new(Argon2Hasher::new()),
            tokens: Arc::new(JwtManager::new(&config.jwt)),
            clock: Arc::new(SystemClock),
            purchase_retry_attempts: config.purchase_retry_attempts,
        };
        let service = FcgService::from_state(state);

        if let Some(admin) = &config.admin {
            let admin_id = service
                .users
                .ensure_admin(&admin.name, &admin.email, &admin.password)
                .await?;
            info!(admin_id = %admin_id, "Administrator account ready");
        }

        Ok(service)
    }

    /// Builds the services over caller-supplied collaborators.
    pub fn from_state(state: AppState) -> Self {
        FcgService {
            users: UserService::new(state.clone()),
            games: GameService::new(state.clone()),
            promotions: PromotionService::new(state.clone()),
            state,
        }
    }

    /// Turns an optional bearer token into a caller identity.
    ///
    /// No token is anonymous; a bad token is an error, not anonymous.
    pub fn authenticate(&self, bearer: Option<&str>) -> ServiceResult<CallerContext> {
        match bearer {
            None => Ok(CallerContext::Anonymous),
            Some(token) => self.state.tokens.validate(token),
        }
    }

    pub fn database(&self) -> &Database {
        &self.state.db
    }

    pub async fn shutdown(&self) {
        self.state.db.close().await;
    }
}
