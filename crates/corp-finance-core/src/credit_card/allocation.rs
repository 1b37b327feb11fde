use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Closed sum of the ways a payment can be split across buckets (§9: "sum
/// types, dispatch by match, not interface").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStrategy {
    BankRule,
    DpOptimal { granularity: i64 },
    Manual { per_bucket_amount: BTreeMap<String, Decimal> },
}

impl AllocationStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            AllocationStrategy::BankRule => "BANK_RULE",
            AllocationStrategy::DpOptimal { .. } => "DP_OPTIMAL",
            AllocationStrategy::Manual { .. } => "MANUAL",
        }
    }
}

/// Solver diagnostics attached to every [`PaymentAllocation`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationMetrics {
    pub dp_cache_entries: usize,
    pub optimization_score: u32,
    pub computation_time_ms: u64,
}

/// Result of running one allocation strategy against a payment (§3).
///
/// Invariants (checked by the allocation-service validator, not here):
/// `sum(per_bucket_amount) <= payment_amount`; each entry
/// `0 <= a <= bucket.current_balance`; a partial allocation below minimum
/// payment is only legal when it fully pays off the bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub allocation_id: String,
    pub strategy: AllocationStrategy,
    pub payment_amount: Decimal,
    pub per_bucket_amount: BTreeMap<String, Decimal>,
    pub total_interest_saved: Decimal,
    pub metrics: AllocationMetrics,
}

impl PaymentAllocation {
    pub fn allocated_total(&self) -> Decimal {
        self.per_bucket_amount.values().sum()
    }

    pub fn remainder(&self) -> Decimal {
        self.payment_amount - self.allocated_total()
    }
}
