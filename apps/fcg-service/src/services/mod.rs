//! # Application Services
//!
//! Each service is a thin sequencer: check the caller, load aggregates,
//! let `fcg-core` decide, persist through `fcg-db`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UserService        register, login, passwords, roles, deposits        │
//! │  GameService        catalog lifecycle, single-game purchases           │
//! │  PromotionService   promotion lifecycle, bundle purchases              │
//! │                                                                         │
//! │  All three share one AppState (database, hasher, tokens, clock)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Versioned Writes
//! Every write to a user, game or promotion runs load → decide → persist
//! inside [`with_retry`]. A [`DbError::Conflict`](fcg_db::DbError::Conflict)
//! means another request changed the same row after our load; the whole
//! cycle runs again on fresh data, up to `purchase_retry_attempts` times.

pub mod game_service;
pub mod promotion_service;
pub mod user_service;

use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use fcg_db::Database;

use crate::auth::{CredentialHasher, TokenIssuer};
use crate::clock::Clock;
use crate::error::{ServiceError, ServiceResult};

pub use game_service::{GameService, GameView, NewGame};
pub use promotion_service::{NewPromotion, PromotionGameView, PromotionService, PromotionView};
pub use user_service::{OwnedGameView, UserDetails, UserService, UserSummary};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub clock: Arc<dyn Clock>,
    pub purchase_retry_attempts: u32,
}

/// Runs `operation` again while it fails with a retryable database error.
pub(crate) async fn with_retry<T, F, Fut>(
    attempts: u32,
    operation: &'static str,
    mut run: F,
) -> ServiceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    let mut attempt = 1;
    loop {
        match run().await {
            Err(ServiceError::Database(e)) if e.is_retryable() && attempt < attempts => {
                warn!(operation, attempt, error = %e, "Concurrent update, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}
