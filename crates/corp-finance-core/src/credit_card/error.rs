use rust_decimal::Decimal;
use thiserror::Error;

/// Error surface for the revolving-credit allocator and interest engine.
///
/// Every validator-raised variant carries a `severity` in `1..=5` (5 being the
/// most severe) so that callers can triage without string-matching messages.
#[derive(Debug, Clone, Error)]
pub enum CreditCardError {
    #[error(
        "allocation of {allocated} to bucket {bucket_id} exceeds its balance of {balance}"
    )]
    AllocationOverflow {
        bucket_id: String,
        allocated: Decimal,
        balance: Decimal,
        severity: u8,
    },

    #[error(
        "partial allocation of {allocated} to bucket {bucket_id} is below its minimum payment of {minimum} and is not a full payoff"
    )]
    MinimumPaymentViolation {
        bucket_id: String,
        allocated: Decimal,
        minimum: Decimal,
        severity: u8,
    },

    #[error("applying allocations would leave bucket {bucket_id} at a negative balance of {resulting}")]
    NegativeBalance {
        bucket_id: String,
        resulting: Decimal,
        severity: u8,
    },

    #[error(
        "allocated total {allocated_total} exceeds payment amount {payment_amount}"
    )]
    TotalMismatch {
        allocated_total: Decimal,
        payment_amount: Decimal,
        severity: u8,
    },

    #[error(
        "dynamic-programming backtracking could not reproduce the optimal cell at bucket {bucket_index}, unit {unit_index}, within tolerance"
    )]
    DpInconsistency {
        bucket_index: usize,
        unit_index: i64,
        severity: u8,
    },

    #[error(
        "manual allocation of {allocated} to bucket {bucket_id} exceeds its capacity of {capacity}"
    )]
    BucketCapacityExceeded {
        bucket_id: String,
        allocated: Decimal,
        capacity: Decimal,
        severity: u8,
    },

    #[error(
        "sweep-line interest {sweep_total} and brute-force interest {brute_total} differ by {diff}, exceeding tolerance {tolerance}"
    )]
    SweepLineMismatch {
        sweep_total: Decimal,
        brute_total: Decimal,
        diff: Decimal,
        tolerance: Decimal,
        severity: u8,
    },

    #[error("unknown account {account_id}")]
    UnknownAccount { account_id: String },

    #[error("unknown allocation {allocation_id} for account {account_id}")]
    UnknownAllocation {
        account_id: String,
        allocation_id: String,
    },

    #[error(
        "account {account_id} no longer matches the bucket state allocation {allocation_id} was computed against"
    )]
    StaleAllocation {
        account_id: String,
        allocation_id: String,
    },

    #[error("unknown bucket {bucket_id} for account {account_id}")]
    UnknownBucket {
        account_id: String,
        bucket_id: String,
    },

    #[error("invalid rate {rate} for bucket {bucket_id}: {reason}")]
    InvalidRate {
        bucket_id: String,
        rate: Decimal,
        reason: String,
    },

    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Decimal, reason: String },
}

impl CreditCardError {
    /// Severity on a 1-5 scale. Lookup errors and constructor-time validation
    /// carry no inherent severity (they never reach the validator) and report 0.
    pub fn severity(&self) -> u8 {
        match self {
            Self::AllocationOverflow { severity, .. }
            | Self::MinimumPaymentViolation { severity, .. }
            | Self::NegativeBalance { severity, .. }
            | Self::TotalMismatch { severity, .. }
            | Self::DpInconsistency { severity, .. }
            | Self::BucketCapacityExceeded { severity, .. }
            | Self::SweepLineMismatch { severity, .. } => *severity,
            _ => 0,
        }
    }
}
