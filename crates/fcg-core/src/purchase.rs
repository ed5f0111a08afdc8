//! # Purchase Orchestration
//!
//! Rules that span User, Game and Promotion. Each aggregate keeps its own
//! invariants; the functions here only sequence the calls and decide what
//! happens when one of them refuses.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  acquire_game(user, game)                                               │
//! │    user active? ─► game purchasable? ─► not owned? ─► affordable?       │
//! │                                                        │                │
//! │                                                        ▼                │
//! │                              debit (or FreeGrant) + movement + library  │
//! │                                                                         │
//! │  acquire_promotion(user, promotion, games)                              │
//! │    quote_promotion ─► pending = games not owned                         │
//! │                    ─► price each pending game at the discount           │
//! │                    ─► total <= balance?  (checked once, up front)       │
//! │                                │                                        │
//! │                                ▼                                        │
//! │              per pending game: debit + movement + library               │
//! │              applied to a staged copy, swapped in only if all succeed   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The persistence layer writes a [`PurchaseReceipt`] in one transaction, so
//! the batch is all-or-nothing there too.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::game::Game;
use crate::money::Money;
use crate::promotion::Promotion;
use crate::user::{LibraryEntry, Movement, User};

// =============================================================================
// Results
// =============================================================================

/// Everything a successful acquisition appended to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub movements: Vec<Movement>,
    pub library_entries: Vec<LibraryEntry>,
    pub total_charged: Money,
}

/// One game a promotion purchase would add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub game_id: String,
    pub list_price: Money,
    pub price: Money,
}

/// What buying a promotion would cost this user right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionQuote {
    pub promotion_id: String,
    pub lines: Vec<QuoteLine>,
    pub total: Money,
}

// =============================================================================
// Single Game
// =============================================================================

/// Buys `game` at list price.
///
/// ## Errors
/// - `UserInactive`
/// - `ItemUnavailable`: not published and active
/// - `AlreadyOwned`
/// - `InsufficientFunds`
pub fn acquire_game(user: &mut User, game: &Game, now: DateTime<Utc>) -> CoreResult<PurchaseReceipt> {
    user.ensure_active()?;
    game.ensure_purchasable()?;

    let (movement, entry) = user.record_acquisition(game.id(), game.price(), now)?;

    Ok(PurchaseReceipt {
        total_charged: movement.amount(),
        movements: vec![movement],
        library_entries: vec![entry],
    })
}

// =============================================================================
// Promotion Batch
// =============================================================================

/// Prices the games of `promotion` the user does not own yet.
///
/// `games` must hold every game attached to the promotion; one that is
/// missing or no longer purchasable fails the whole quote with
/// `ItemUnavailable`.
pub fn quote_promotion(
    user: &User,
    promotion: &Promotion,
    games: &[Game],
    now: DateTime<Utc>,
) -> CoreResult<PromotionQuote> {
    promotion.ensure_active(now)?;

    let pending: Vec<&String> = promotion
        .game_ids()
        .iter()
        .filter(|id| !user.owns(id))
        .collect();

    if pending.is_empty() {
        return Err(CoreError::AllItemsOwned {
            promotion_id: promotion.id().to_string(),
        });
    }

    let mut lines = Vec::with_capacity(pending.len());
    for game_id in pending {
        let game = games
            .iter()
            .find(|g| g.id() == game_id.as_str())
            .ok_or_else(|| CoreError::ItemUnavailable {
                game_id: game_id.clone(),
            })?;
        game.ensure_purchasable()?;

        lines.push(QuoteLine {
            game_id: game_id.clone(),
            list_price: game.price(),
            price: promotion.effective_price(game, now)?,
        });
    }

    let total = lines
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(line.price))
        .ok_or(ValidationError::AmountTooLarge(Money::from_cents(i64::MAX)))?;

    Ok(PromotionQuote {
        promotion_id: promotion.id().to_string(),
        lines,
        total,
    })
}

/// Buys every game of `promotion` the user does not own, at the discount.
///
/// ## Errors
/// - `UserInactive`
/// - `PromotionNotActive` / `PromotionExpired`
/// - `AllItemsOwned`
/// - `ItemUnavailable`
/// - `InsufficientFunds`: total of the pending games exceeds the balance
pub fn acquire_promotion(
    user: &mut User,
    promotion: &Promotion,
    games: &[Game],
    now: DateTime<Utc>,
) -> CoreResult<PurchaseReceipt> {
    user.ensure_active()?;
    let quote = quote_promotion(user, promotion, games, now)?;

    if !user.wallet().can_afford(quote.total) {
        return Err(CoreError::InsufficientFunds {
            available: user.balance(),
            requested: quote.total,
        });
    }

    let mut staged = user.clone();
    let mut receipt = PurchaseReceipt {
        movements: Vec::with_capacity(quote.lines.len()),
        library_entries: Vec::with_capacity(quote.lines.len()),
        total_charged: Money::zero(),
    };

    for line in &quote.lines {
        let (movement, entry) = staged.record_acquisition(&line.game_id, line.price, now)?;
        receipt.total_charged += movement.amount();
        receipt.movements.push(movement);
        receipt.library_entries.push(entry);
    }

    *user = staged;
    Ok(receipt)
}

// =============================================================================
// Unit Tests
// =============================================================================
