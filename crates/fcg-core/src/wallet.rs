//! # Wallet
//!
//! A user's spendable credit. Pure value object: it knows how to change its
//! balance and nothing else. Recording the movement is the owner's job.
//!
//! ```text
//!   deposit(amount)                 debit(amount)
//!   ───────────────                 ─────────────
//!   amount <= 0 → InvalidAmount     amount <= 0       → InvalidAmount
//!   overflow    → AmountTooLarge    amount > balance  → InsufficientFunds
//!   balance += amount
//!                                   balance -= amount
//!
//!   Invariant: balance >= 0 after every successful call
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// Non-negative balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wallet {
    balance: Money,
}

impl Wallet {
    /// A wallet with zero balance (every new user starts here).
    pub fn empty() -> Self {
        Wallet {
            balance: Money::zero(),
        }
    }

    /// Restores a wallet from a persisted balance.
    ///
    /// Rejects negative balances so a corrupted row cannot produce a wallet
    /// that breaks the invariant.
    pub fn with_balance(balance: Money) -> CoreResult<Self> {
        if balance.is_negative() {
            return Err(ValidationError::InvalidAmount(balance).into());
        }
        Ok(Wallet { balance })
    }

    #[inline]
    pub fn balance(&self) -> Money {
        self.balance
    }

    #[inline]
    pub fn can_afford(&self, amount: Money) -> bool {
        amount <= self.balance
    }

    pub fn deposit(&mut self, amount: Money) -> CoreResult<()> {
        if !amount.is_positive() {
            return Err(ValidationError::InvalidAmount(amount).into());
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(ValidationError::AmountTooLarge(amount))?;
        Ok(())
    }

    pub fn debit(&mut self, amount: Money) -> CoreResult<()> {
        if !amount.is_positive() {
            return Err(ValidationError::InvalidAmount(amount).into());
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(CoreError::InsufficientFunds {
                available: self.balance,
                requested: amount,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn test_deposit_then_debit_round_trip() {
        let mut wallet = Wallet::with_balance(cents(1234)).unwrap();
        wallet.deposit(cents(500)).unwrap();
        wallet.debit(cents(500)).unwrap();
        assert_eq!(wallet.balance(), cents(1234));
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let mut wallet = Wallet::empty();
        for amount in [cents(0), cents(-1)] {
            assert!(matches!(
                wallet.deposit(amount),
                Err(CoreError::Validation(ValidationError::InvalidAmount(_)))
            ));
            assert!(matches!(
                wallet.debit(amount),
                Err(CoreError::Validation(ValidationError::InvalidAmount(_)))
            ));
        }
        assert_eq!(wallet.balance(), Money::zero());
    }

    #[test]
    fn test_debit_never_goes_negative() {
        let mut wallet = Wallet::with_balance(cents(5000)).unwrap();
        let err = wallet.debit(cents(6000)).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientFunds {
                available: cents(5000),
                requested: cents(6000),
            }
        );
        assert_eq!(wallet.balance(), cents(5000));

        wallet.debit(cents(5000)).unwrap();
        assert!(wallet.balance().is_zero());
    }

    #[test]
    fn test_balance_tracks_signed_sum() {
        let mut wallet = Wallet::empty();
        let ops: [(bool, i64); 6] = [
            (true, 1000),
            (false, 300),
            (true, 250),
            (false, 950),
            (false, 1), // rejected: only 0 left
            (true, 75),
        ];

        let mut expected = 0;
        for (is_deposit, amount) in ops {
            let result = if is_deposit {
                wallet.deposit(cents(amount))
            } else {
                wallet.debit(cents(amount))
            };
            if result.is_ok() {
                expected += if is_deposit { amount } else { -amount };
            }
            assert!(!wallet.balance().is_negative());
        }
        assert_eq!(wallet.balance().cents(), expected);
        assert_eq!(expected, 75);
    }

    #[test]
    fn test_deposit_overflow_is_rejected() {
        let mut wallet = Wallet::with_balance(cents(1)).unwrap();
        let err = wallet.deposit(cents(i64::MAX)).unwrap_err();
        assert_eq!(
            err,
            CoreError::Validation(ValidationError::AmountTooLarge(cents(i64::MAX)))
        );
        assert_eq!(wallet.balance(), cents(1));

        wallet.deposit(cents(i64::MAX - 1)).unwrap();
        assert_eq!(wallet.balance(), cents(i64::MAX));
    }

    #[test]
    fn test_with_balance_rejects_negative() {
        assert!(Wallet::with_balance(cents(-1)).is_err());
        assert!(Wallet::with_balance(Money::zero()).is_ok());
    }
}
