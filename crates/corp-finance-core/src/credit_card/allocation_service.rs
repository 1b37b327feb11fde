use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocation::{AllocationStrategy, PaymentAllocation};
use super::bucket::DebtBucket;
use super::dp_allocator::{self, DEFAULT_GRANULARITY};
use super::error::CreditCardError;
use super::greedy_allocator;
use super::money::round_money;

/// How a caller wants a payment split. Distinct from [`AllocationStrategy`]
/// (the record of what happened) in that `DpOptimal` here takes the
/// granularity the caller wants, and `Manual` takes the map directly.
#[derive(Debug, Clone)]
pub enum AllocationRequest {
    BankRule,
    DpOptimal { granularity: i64 },
    Manual(HashMap<String, Decimal>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStrategyKind {
    BankRule,
    DpOptimal,
}

/// Result of running every applicable strategy on a snapshot, without
/// mutating account state (§4.6, §11: includes the losing strategy too).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub bank_rule: PaymentAllocation,
    pub dp_optimal: PaymentAllocation,
    pub best: AllocationStrategyKind,
}

/// One allocation record plus the bucket snapshot it was computed against,
/// so a later [`AllocationService::apply_allocation`] can tell whether the
/// account is still in the state the record expects (idempotent no-op),
/// already reflects the record (idempotent no-op), or has moved on to
/// something else entirely (clean error) — rather than blindly subtracting
/// the allocated amounts a second time.
#[derive(Clone)]
struct HistoryEntry {
    allocation: PaymentAllocation,
    buckets_before: Vec<DebtBucket>,
}

/// Orchestrates the allocators, enforces post-allocation invariants, and
/// owns each account's current bucket set and allocation history (C8).
///
/// `account_buckets` and `allocation_history` are `Mutex`-guarded maps: a
/// single account is assumed single-writer (callers serialise), and
/// concurrent access to *distinct* accounts never blocks on the same key in
/// practice since each call only holds the lock for the duration of one
/// map operation.
pub struct AllocationService {
    account_buckets: Mutex<HashMap<String, Vec<DebtBucket>>>,
    allocation_history: Mutex<HashMap<String, Vec<HistoryEntry>>>,
    next_id: AtomicU64,
}

impl Default for AllocationService {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationService {
    pub fn new() -> Self {
        Self {
            account_buckets: Mutex::new(HashMap::new()),
            allocation_history: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn fresh_allocation_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("alloc-{n:010}")
    }

    pub fn set_account_buckets(&self, account_id: &str, buckets: Vec<DebtBucket>) {
        self.account_buckets
            .lock()
            .expect("account_buckets mutex poisoned")
            .insert(account_id.to_string(), buckets);
    }

    pub fn add_debt_bucket(&self, account_id: &str, bucket: DebtBucket) {
        self.account_buckets
            .lock()
            .expect("account_buckets mutex poisoned")
            .entry(account_id.to_string())
            .or_default()
            .push(bucket);
    }

    fn buckets_snapshot(&self, account_id: &str) -> Result<Vec<DebtBucket>, CreditCardError> {
        self.account_buckets
            .lock()
            .expect("account_buckets mutex poisoned")
            .get(account_id)
            .cloned()
            .ok_or_else(|| CreditCardError::UnknownAccount {
                account_id: account_id.to_string(),
            })
    }

    fn run_strategy(
        &self,
        buckets: &[DebtBucket],
        amount: Decimal,
        request: &AllocationRequest,
    ) -> Result<PaymentAllocation, CreditCardError> {
        match request {
            AllocationRequest::BankRule => greedy_allocator::allocate_greedy(buckets, amount),
            AllocationRequest::DpOptimal { granularity } => {
                dp_allocator::allocate_dp(buckets, amount, *granularity)
            }
            AllocationRequest::Manual(per_bucket_amount) => {
                Self::build_manual_allocation(buckets, amount, per_bucket_amount)
            }
        }
    }

    fn build_manual_allocation(
        buckets: &[DebtBucket],
        amount: Decimal,
        per_bucket_amount: &HashMap<String, Decimal>,
    ) -> Result<PaymentAllocation, CreditCardError> {
        use super::allocation::AllocationMetrics;

        let mut map = std::collections::BTreeMap::new();
        for (bucket_id, allocated) in per_bucket_amount {
            let bucket = buckets
                .iter()
                .find(|b| &b.bucket_id == bucket_id)
                .ok_or_else(|| CreditCardError::UnknownBucket {
                    account_id: String::new(),
                    bucket_id: bucket_id.clone(),
                })?;
            if *allocated > bucket.current_balance {
                return Err(CreditCardError::BucketCapacityExceeded {
                    bucket_id: bucket_id.clone(),
                    allocated: *allocated,
                    capacity: bucket.current_balance,
                    severity: 4,
                });
            }
            map.insert(bucket_id.clone(), round_money(*allocated));
        }

        Ok(PaymentAllocation {
            allocation_id: String::new(),
            strategy: AllocationStrategy::Manual {
                per_bucket_amount: map.clone(),
            },
            payment_amount: amount,
            per_bucket_amount: map,
            total_interest_saved: Decimal::ZERO,
            metrics: AllocationMetrics::default(),
        })
    }

    /// Validator (§4.6): checked before any bucket mutation. Violations are
    /// hard faults and leave state untouched.
    fn validate_allocation(
        buckets: &[DebtBucket],
        candidate: &PaymentAllocation,
        payment_amount: Decimal,
    ) -> Result<(), CreditCardError> {
        let allocated_total = candidate.allocated_total();
        if allocated_total > payment_amount {
            return Err(CreditCardError::TotalMismatch {
                allocated_total,
                payment_amount,
                severity: 5,
            });
        }

        for (bucket_id, allocated) in &candidate.per_bucket_amount {
            let bucket = buckets
                .iter()
                .find(|b| &b.bucket_id == bucket_id)
                .ok_or_else(|| CreditCardError::UnknownBucket {
                    account_id: String::new(),
                    bucket_id: bucket_id.clone(),
                })?;

            if *allocated > bucket.current_balance {
                return Err(CreditCardError::AllocationOverflow {
                    bucket_id: bucket_id.clone(),
                    allocated: *allocated,
                    balance: bucket.current_balance,
                    severity: 4,
                });
            }

            let is_full_payoff = *allocated == bucket.current_balance;
            if *allocated > Decimal::ZERO && *allocated < bucket.minimum_payment && !is_full_payoff
            {
                return Err(CreditCardError::MinimumPaymentViolation {
                    bucket_id: bucket_id.clone(),
                    allocated: *allocated,
                    minimum: bucket.minimum_payment,
                    severity: 3,
                });
            }

            let resulting = bucket.current_balance - allocated;
            if resulting < Decimal::ZERO {
                return Err(CreditCardError::NegativeBalance {
                    bucket_id: bucket_id.clone(),
                    resulting,
                    severity: 5,
                });
            }
        }

        Ok(())
    }

    fn apply_to_buckets(
        buckets: &[DebtBucket],
        allocation: &PaymentAllocation,
    ) -> Result<Vec<DebtBucket>, CreditCardError> {
        let mut updated = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            match allocation.per_bucket_amount.get(&bucket.bucket_id) {
                Some(amount) if *amount > Decimal::ZERO => {
                    updated.push(bucket.with_payment(*amount)?);
                }
                _ => updated.push(bucket.clone()),
            }
        }
        Ok(updated)
    }

    /// Runs the selected allocator, validates, applies bucket updates, and
    /// records the allocation in history. `Draft -> Validated -> Applied`.
    pub fn allocate_payment(
        &self,
        account_id: &str,
        amount: Decimal,
        request: AllocationRequest,
    ) -> Result<PaymentAllocation, CreditCardError> {
        if amount < Decimal::ZERO {
            return Err(CreditCardError::InvalidAmount {
                amount,
                reason: "payment amount must be >= 0".into(),
            });
        }

        let buckets = self.buckets_snapshot(account_id)?;
        let mut candidate = self.run_strategy(&buckets, amount, &request)?;
        Self::validate_allocation(&buckets, &candidate, amount)?;

        let updated_buckets = Self::apply_to_buckets(&buckets, &candidate)?;
        candidate.allocation_id = self.fresh_allocation_id();

        self.account_buckets
            .lock()
            .expect("account_buckets mutex poisoned")
            .insert(account_id.to_string(), updated_buckets);
        self.allocation_history
            .lock()
            .expect("allocation_history mutex poisoned")
            .entry(account_id.to_string())
            .or_default()
            .push(HistoryEntry {
                allocation: candidate.clone(),
                buckets_before: buckets,
            });

        Ok(candidate)
    }

    /// Runs bank-rule and DP-optimal on a snapshot (no mutation); returns
    /// both results and the better one (tie-break: BANK_RULE).
    pub fn compare_all_strategies(
        &self,
        account_id: &str,
        amount: Decimal,
    ) -> Result<StrategyComparison, CreditCardError> {
        let buckets = self.buckets_snapshot(account_id)?;
        let bank_rule = greedy_allocator::allocate_greedy(&buckets, amount)?;
        let dp_optimal = dp_allocator::allocate_dp(&buckets, amount, DEFAULT_GRANULARITY)?;

        let best = if dp_optimal.total_interest_saved > bank_rule.total_interest_saved {
            AllocationStrategyKind::DpOptimal
        } else {
            AllocationStrategyKind::BankRule
        };

        Ok(StrategyComparison {
            bank_rule,
            dp_optimal,
            best,
        })
    }

    /// Specialised two-way comparison (§4.6); a thin wrapper over
    /// [`Self::compare_all_strategies`].
    pub fn compare_dp_vs_bank_rule(
        &self,
        account_id: &str,
        amount: Decimal,
    ) -> Result<StrategyComparison, CreditCardError> {
        self.compare_all_strategies(account_id, amount)
    }

    /// Re-applies a prior allocation record (§8.7: idempotence).
    ///
    /// Compares the account's current buckets against the snapshot the
    /// record was originally computed from:
    /// - if the current buckets already equal the record's expected
    ///   post-allocation state, the record has already been applied —
    ///   returns it unchanged as a no-op, never re-subtracting;
    /// - if the current buckets still equal the pre-allocation snapshot,
    ///   applies it now;
    /// - otherwise the account has moved on (other payments landed since),
    ///   and this fails cleanly with `StaleAllocation` rather than guessing.
    pub fn apply_allocation(
        &self,
        account_id: &str,
        allocation_id: &str,
    ) -> Result<PaymentAllocation, CreditCardError> {
        let entry = {
            let history = self
                .allocation_history
                .lock()
                .expect("allocation_history mutex poisoned");
            history
                .get(account_id)
                .and_then(|records| {
                    records
                        .iter()
                        .find(|e| e.allocation.allocation_id == allocation_id)
                })
                .cloned()
                .ok_or_else(|| CreditCardError::UnknownAllocation {
                    account_id: account_id.to_string(),
                    allocation_id: allocation_id.to_string(),
                })?
        };

        let current_buckets = self.buckets_snapshot(account_id)?;
        let expected_after = Self::apply_to_buckets(&entry.buckets_before, &entry.allocation)?;

        if current_buckets == expected_after {
            return Ok(entry.allocation);
        }

        if current_buckets != entry.buckets_before {
            return Err(CreditCardError::StaleAllocation {
                account_id: account_id.to_string(),
                allocation_id: allocation_id.to_string(),
            });
        }

        Self::validate_allocation(
            &current_buckets,
            &entry.allocation,
            entry.allocation.payment_amount,
        )?;
        self.account_buckets
            .lock()
            .expect("account_buckets mutex poisoned")
            .insert(account_id.to_string(), expected_after);

        Ok(entry.allocation)
    }

    /// Time-ordered (newest first).
    pub fn get_allocation_history(
        &self,
        account_id: &str,
    ) -> Result<Vec<PaymentAllocation>, CreditCardError> {
        let history = self
            .allocation_history
            .lock()
            .expect("allocation_history mutex poisoned");
        let mut records: Vec<PaymentAllocation> = history
            .get(account_id)
            .map(|entries| entries.iter().map(|e| e.allocation.clone()).collect())
            .unwrap_or_default();
        records.reverse();
        Ok(records)
    }
}
