use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;

use super::allocation::{AllocationMetrics, AllocationStrategy, PaymentAllocation};
use super::bucket::DebtBucket;
use super::dp_allocator::benefit;
use super::error::CreditCardError;
use super::money::round_money;

/// Priority-rule allocator (C7): sort by `(priority asc, rate desc)`, honour
/// each bucket's minimum payment before filling further down the balance.
pub fn allocate_greedy(
    buckets: &[DebtBucket],
    payment: Decimal,
) -> Result<PaymentAllocation, CreditCardError> {
    let start = Instant::now();
    if payment < Decimal::ZERO {
        return Err(CreditCardError::InvalidAmount {
            amount: payment,
            reason: "payment amount must be >= 0".into(),
        });
    }

    let mut active: Vec<&DebtBucket> = buckets.iter().filter(|b| b.has_debt()).collect();
    active.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.interest_rate.cmp(&a.interest_rate))
    });

    let mut remaining = payment;
    let mut per_bucket_amount = BTreeMap::new();
    let mut total_benefit = Decimal::ZERO;
    let mut nonzero_count = 0u32;

    for bucket in &active {
        if remaining <= Decimal::ZERO {
            break;
        }
        let min_payment_portion = bucket.minimum_payment.min(remaining);
        let additional = (bucket.current_balance - min_payment_portion)
            .min(remaining - min_payment_portion)
            .max(Decimal::ZERO);
        let total = min_payment_portion + additional;

        if total > Decimal::ZERO {
            per_bucket_amount.insert(bucket.bucket_id.clone(), round_money(total));
            total_benefit += benefit(bucket.interest_rate, total);
            nonzero_count += 1;
            remaining -= total;
        }
    }

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(PaymentAllocation {
        allocation_id: String::new(),
        strategy: AllocationStrategy::BankRule,
        payment_amount: payment,
        per_bucket_amount,
        total_interest_saved: round_money(total_benefit),
        metrics: AllocationMetrics {
            dp_cache_entries: 0,
            optimization_score: (20 * nonzero_count).min(100),
            computation_time_ms: elapsed,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit_card::bucket::BucketType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    fn bucket(id: &str, balance: Decimal, rate: Decimal, min: Decimal, priority: u32) -> DebtBucket {
        DebtBucket::new(id, BucketType::Purchase, balance, rate, min, due(), priority).unwrap()
    }

    #[test]
    fn scenario_s1_single_bucket_full_payoff() {
        let buckets = vec![bucket("P1", dec!(1000), dec!(0.18), Decimal::ZERO, 1)];
        let result = allocate_greedy(&buckets, dec!(1500)).unwrap();
        assert_eq!(result.per_bucket_amount["P1"], dec!(1000));
        assert_eq!(result.remainder(), dec!(500));
    }

    #[test]
    fn scenario_s2_rate_desc_tiebreak_matches_dp() {
        let buckets = vec![
            bucket("A", dec!(1000), dec!(0.10), Decimal::ZERO, 1),
            bucket("B", dec!(1000), dec!(0.30), Decimal::ZERO, 1),
        ];
        let result = allocate_greedy(&buckets, dec!(1000)).unwrap();
        assert_eq!(result.per_bucket_amount["B"], dec!(1000));
        assert!(!result.per_bucket_amount.contains_key("A"));
    }

    #[test]
    fn scenario_s3_honours_minimum_at_priority_bucket_first() {
        let buckets = vec![
            bucket("A", dec!(500), dec!(0.20), dec!(100), 1),
            bucket("B", dec!(500), dec!(0.30), dec!(100), 2),
        ];
        let result = allocate_greedy(&buckets, dec!(150)).unwrap();
        assert_eq!(result.per_bucket_amount["A"], dec!(150));
        assert!(!result.per_bucket_amount.contains_key("B"));
    }

    #[test]
    fn scenario_s6_empty_buckets_no_error() {
        let result = allocate_greedy(&[], dec!(500)).unwrap();
        assert!(result.per_bucket_amount.is_empty());
        assert_eq!(result.remainder(), dec!(500));
    }

    #[test]
    fn never_allocates_more_than_payment() {
        let buckets = vec![
            bucket("A", dec!(50), dec!(0.2), dec!(10), 1),
            bucket("B", dec!(50), dec!(0.2), dec!(10), 2),
        ];
        let result = allocate_greedy(&buckets, dec!(1000)).unwrap();
        assert!(result.allocated_total() <= dec!(1000));
        assert_eq!(result.per_bucket_amount["A"], dec!(50));
        assert_eq!(result.per_bucket_amount["B"], dec!(50));
    }
}
