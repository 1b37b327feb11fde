use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::CreditCardError;

/// Debt category used by the interest engine (C3/C4/C5). A strict subset of
/// [`BucketType`] — the interest engine never sees `OVERDUE`, which is a
/// penalty classification meaningful only to the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceBucket {
    Purchase,
    CashAdvance,
    Installment,
    FeesInterest,
}

impl BalanceBucket {
    pub const ALL: [BalanceBucket; 4] = [
        BalanceBucket::Purchase,
        BalanceBucket::CashAdvance,
        BalanceBucket::Installment,
        BalanceBucket::FeesInterest,
    ];
}

/// Debt category used by the allocator (C6/C7/C8), carrying a default
/// priority (lower = paid earlier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BucketType {
    Purchase,
    CashAdvance,
    Installment,
    FeesInterest,
    Overdue,
}

impl BucketType {
    /// Default priority integer; lower values are paid down first.
    pub fn default_priority(&self) -> u32 {
        match self {
            BucketType::Overdue => 0,
            BucketType::FeesInterest => 1,
            BucketType::CashAdvance => 2,
            BucketType::Installment => 3,
            BucketType::Purchase => 4,
        }
    }

    /// The corresponding interest-engine bucket, where one exists.
    pub fn as_balance_bucket(&self) -> Option<BalanceBucket> {
        match self {
            BucketType::Purchase => Some(BalanceBucket::Purchase),
            BucketType::CashAdvance => Some(BalanceBucket::CashAdvance),
            BucketType::Installment => Some(BalanceBucket::Installment),
            BucketType::FeesInterest => Some(BalanceBucket::FeesInterest),
            BucketType::Overdue => None,
        }
    }
}

/// An immutable category of outstanding debt on one account.
///
/// Invariants enforced at construction and on every transition:
/// `minimum_payment <= current_balance`; `has_debt() <=> current_balance > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtBucket {
    pub bucket_id: String,
    #[serde(rename = "type")]
    pub bucket_type: BucketType,
    pub current_balance: Decimal,
    pub interest_rate: Decimal,
    pub minimum_payment: Decimal,
    pub due_date: NaiveDate,
    pub priority: u32,
}

impl DebtBucket {
    pub fn new(
        bucket_id: impl Into<String>,
        bucket_type: BucketType,
        current_balance: Decimal,
        interest_rate: Decimal,
        minimum_payment: Decimal,
        due_date: NaiveDate,
        priority: u32,
    ) -> Result<Self, CreditCardError> {
        let bucket_id = bucket_id.into();
        if bucket_id.is_empty() || bucket_id.len() > 64 {
            return Err(CreditCardError::InvalidAmount {
                amount: Decimal::ZERO,
                reason: format!(
                    "bucket_id must be non-empty and at most 64 bytes, got {} bytes",
                    bucket_id.len()
                ),
            });
        }
        if current_balance < Decimal::ZERO {
            return Err(CreditCardError::InvalidAmount {
                amount: current_balance,
                reason: "current_balance must be >= 0".into(),
            });
        }
        if interest_rate < Decimal::ZERO {
            return Err(CreditCardError::InvalidRate {
                bucket_id,
                rate: interest_rate,
                reason: "interest_rate must be >= 0".into(),
            });
        }
        if minimum_payment < Decimal::ZERO {
            return Err(CreditCardError::InvalidAmount {
                amount: minimum_payment,
                reason: "minimum_payment must be >= 0".into(),
            });
        }
        if minimum_payment > current_balance {
            return Err(CreditCardError::InvalidAmount {
                amount: minimum_payment,
                reason: format!(
                    "minimum_payment {minimum_payment} exceeds current_balance {current_balance}"
                ),
            });
        }
        Ok(Self {
            bucket_id,
            bucket_type,
            current_balance,
            interest_rate,
            minimum_payment,
            due_date,
            priority,
        })
    }

    pub fn has_debt(&self) -> bool {
        self.current_balance > Decimal::ZERO
    }

    /// Apply a payment, yielding a new bucket with the reduced balance.
    /// Rejects `amount <= 0` or `amount > current_balance`.
    pub fn with_payment(&self, amount: Decimal) -> Result<Self, CreditCardError> {
        if amount <= Decimal::ZERO {
            return Err(CreditCardError::InvalidAmount {
                amount,
                reason: "payment amount must be positive".into(),
            });
        }
        if amount > self.current_balance {
            return Err(CreditCardError::AllocationOverflow {
                bucket_id: self.bucket_id.clone(),
                allocated: amount,
                balance: self.current_balance,
                severity: 4,
            });
        }
        let new_balance = self.current_balance - amount;
        let minimum_payment = if new_balance < self.minimum_payment {
            new_balance
        } else {
            self.minimum_payment
        };
        Ok(Self {
            current_balance: new_balance,
            minimum_payment,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    #[test]
    fn rejects_minimum_above_balance() {
        let err = DebtBucket::new(
            "B1",
            BucketType::Purchase,
            dec!(100),
            dec!(0.18),
            dec!(200),
            due(),
            1,
        )
        .unwrap_err();
        assert!(matches!(err, CreditCardError::InvalidAmount { .. }));
    }

    #[test]
    fn with_payment_reduces_balance() {
        let b = DebtBucket::new(
            "B1",
            BucketType::Purchase,
            dec!(1000),
            dec!(0.18),
            dec!(25),
            due(),
            1,
        )
        .unwrap();
        let paid = b.with_payment(dec!(400)).unwrap();
        assert_eq!(paid.current_balance, dec!(600));
        assert!(paid.has_debt());
    }

    #[test]
    fn with_payment_rejects_overflow() {
        let b = DebtBucket::new(
            "B1",
            BucketType::Purchase,
            dec!(100),
            dec!(0.18),
            dec!(0),
            due(),
            1,
        )
        .unwrap();
        let err = b.with_payment(dec!(150)).unwrap_err();
        assert!(matches!(err, CreditCardError::AllocationOverflow { .. }));
    }

    #[test]
    fn with_payment_rejects_nonpositive() {
        let b = DebtBucket::new(
            "B1",
            BucketType::Purchase,
            dec!(100),
            dec!(0.18),
            dec!(0),
            due(),
            1,
        )
        .unwrap();
        assert!(b.with_payment(dec!(0)).is_err());
        assert!(b.with_payment(dec!(-5)).is_err());
    }

    #[test]
    fn full_payoff_has_no_debt() {
        let b = DebtBucket::new(
            "B1",
            BucketType::Purchase,
            dec!(100),
            dec!(0.18),
            dec!(0),
            due(),
            1,
        )
        .unwrap();
        let paid = b.with_payment(dec!(100)).unwrap();
        assert!(!paid.has_debt());
        assert_eq!(paid.current_balance, Decimal::ZERO);
    }
}
