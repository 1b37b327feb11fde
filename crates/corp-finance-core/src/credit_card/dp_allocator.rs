use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::allocation::{AllocationMetrics, AllocationStrategy, PaymentAllocation};
use super::bucket::DebtBucket;
use super::error::CreditCardError;
use super::money::{round_money, DP_TOLERANCE};

/// Default granularity: cents.
pub const DEFAULT_GRANULARITY: i64 = 100;
pub const ALLOWED_GRANULARITIES: [i64; 4] = [1, 10, 100, 1000];

/// The DP allocator's fixed projection horizon (§4.4, §9: "a single tunable
/// constant; do not invent a statement-cycle lookup").
pub const HORIZON_DAYS: i64 = 30;

/// Projected interest savings from paying `amount` off a bucket at `rate`
/// over the fixed horizon. Shared by the DP and greedy allocators so their
/// `total_interest_saved` figures are directly comparable (§4.5).
pub fn benefit(rate: Decimal, amount: Decimal) -> Decimal {
    amount * rate / dec!(365) * Decimal::from(HORIZON_DAYS)
}

fn validate_granularity(granularity: i64) -> Result<(), CreditCardError> {
    if !ALLOWED_GRANULARITIES.contains(&granularity) {
        return Err(CreditCardError::InvalidAmount {
            amount: Decimal::from(granularity),
            reason: format!("granularity must be one of {ALLOWED_GRANULARITIES:?}"),
        });
    }
    Ok(())
}

fn sorted_active(buckets: &[DebtBucket]) -> Vec<&DebtBucket> {
    let mut active: Vec<&DebtBucket> = buckets.iter().filter(|b| b.has_debt()).collect();
    active.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.interest_rate.cmp(&a.interest_rate))
    });
    active
}

/// `round(value * granularity)` converted to an integer unit count.
fn to_units(value: Decimal, granularity: i64) -> i64 {
    (value * Decimal::from(granularity))
        .round()
        .to_i64()
        .unwrap_or(0)
        .max(0)
}

fn empty_allocation(payment: Decimal, granularity: i64, elapsed_ms: u64) -> PaymentAllocation {
    PaymentAllocation {
        allocation_id: String::new(),
        strategy: AllocationStrategy::DpOptimal { granularity },
        payment_amount: payment,
        per_bucket_amount: BTreeMap::new(),
        total_interest_saved: Decimal::ZERO,
        metrics: AllocationMetrics {
            dp_cache_entries: 0,
            optimization_score: 0,
            computation_time_ms: elapsed_ms,
        },
    }
}

/// Bounded multi-item knapsack minimising projected interest (C6).
///
/// Feasible per-bucket units at each DP cell are `{0} u [min_units, min(j,
/// balance_units)]` — minimum-payment legality is built directly into the
/// transition function rather than enforced post-hoc, which keeps every
/// reachable DP cell validator-clean without a fallback pass (see
/// DESIGN.md's resolution of the minimum-payment open question).
pub fn allocate_dp(
    buckets: &[DebtBucket],
    payment: Decimal,
    granularity: i64,
) -> Result<PaymentAllocation, CreditCardError> {
    let start = Instant::now();
    validate_granularity(granularity)?;
    if payment < Decimal::ZERO {
        return Err(CreditCardError::InvalidAmount {
            amount: payment,
            reason: "payment amount must be >= 0".into(),
        });
    }

    let active = sorted_active(buckets);
    let g = Decimal::from(granularity);
    let u = to_units(payment, granularity);

    if active.is_empty() || u == 0 {
        let elapsed = start.elapsed().as_millis() as u64;
        return Ok(empty_allocation(payment, granularity, elapsed));
    }

    let n = active.len();
    let balance_units: Vec<i64> = active
        .iter()
        .map(|b| to_units(b.current_balance, granularity))
        .collect();
    let min_units: Vec<i64> = active
        .iter()
        .map(|b| to_units(b.minimum_payment, granularity))
        .collect();

    let u_usize = u as usize;
    let mut dp: Vec<Vec<Decimal>> = vec![vec![Decimal::ZERO; u_usize + 1]; n + 1];
    let mut choice: Vec<Vec<i64>> = vec![vec![0; u_usize + 1]; n + 1];

    for i in 1..=n {
        let rate = active[i - 1].interest_rate;
        let max_m = balance_units[i - 1];
        let min_u = min_units[i - 1];

        for j in 0..=u_usize {
            let j_i64 = j as i64;
            let cap = j_i64.min(max_m);

            // k = 0 is always feasible.
            let mut best_cost = dp[i - 1][j];
            let mut best_k: i64 = 0;

            if min_u <= cap {
                for k in min_u..=cap {
                    let amount = Decimal::from(k) / g;
                    let candidate = dp[i - 1][(j_i64 - k) as usize] - benefit(rate, amount);
                    // Exact Decimal arithmetic throughout, so strict
                    // improvement is well-defined; scanning k ascending and
                    // only replacing on strict improvement means an exact
                    // tie keeps the smallest k, per the spec's determinism
                    // rule.
                    if candidate < best_cost {
                        best_cost = candidate;
                        best_k = k;
                    }
                }
            }

            dp[i][j] = best_cost;
            choice[i][j] = best_k;
        }
    }

    let mut per_bucket_amount = BTreeMap::new();
    let mut total_benefit = Decimal::ZERO;
    let mut nonzero_count = 0u32;
    let mut j = u;

    for i in (1..=n).rev() {
        let k = choice[i][j as usize];
        let bucket = active[i - 1];
        let amount = Decimal::from(k) / g;

        let prev_cell = dp[i - 1][(j - k) as usize];
        let expected = prev_cell - benefit(bucket.interest_rate, amount);
        if (expected - dp[i][j as usize]).abs() > DP_TOLERANCE {
            return Err(CreditCardError::DpInconsistency {
                bucket_index: i - 1,
                unit_index: j,
                severity: 5,
            });
        }

        if k > 0 {
            let rounded = round_money(amount);
            per_bucket_amount.insert(bucket.bucket_id.clone(), rounded);
            total_benefit += benefit(bucket.interest_rate, amount);
            nonzero_count += 1;
        }
        j -= k;
    }

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(PaymentAllocation {
        allocation_id: String::new(),
        strategy: AllocationStrategy::DpOptimal { granularity },
        payment_amount: payment,
        per_bucket_amount,
        total_interest_saved: round_money(total_benefit),
        metrics: AllocationMetrics {
            dp_cache_entries: (n + 1) * (u_usize + 1),
            optimization_score: (20 * nonzero_count).min(100),
            computation_time_ms: elapsed,
        },
    })
}
