use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bucket::BalanceBucket;
use super::error::CreditCardError;
use super::interest::{DailyInterestEntry, InterestCalculator, InterestResult, WarnSink};
use super::money::{DateRange, T_MATCH};
use super::sweep::{SweepLineEngine, SweepStatistics};

struct AccountState {
    sweep: SweepLineEngine,
    calculator: InterestCalculator,
}

/// Wall-clock comparison of the sweep-line fast path against the brute-force
/// reference (§11: `benchmark_statement_interest`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestBenchmark {
    pub sweep_total: Decimal,
    pub brute_force_total: Decimal,
    pub sweep_elapsed_micros: u128,
    pub brute_force_elapsed_micros: u128,
    pub speedup: Decimal,
}

/// Wraps one [`SweepLineEngine`] + [`InterestCalculator`] pair per account
/// and cross-checks the sweep-line fast path against the brute-force
/// reference before trusting a statement-level result (C9).
pub struct SweepLineService {
    accounts: Mutex<HashMap<String, AccountState>>,
}

impl Default for SweepLineService {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepLineService {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_account(
        &self,
        account_id: &str,
        rates: BTreeMap<BalanceBucket, Decimal>,
    ) -> Result<(), CreditCardError> {
        self.register_account_with_warn_sink(account_id, rates, None)
    }

    pub fn register_account_with_warn_sink(
        &self,
        account_id: &str,
        rates: BTreeMap<BalanceBucket, Decimal>,
        warn: Option<WarnSink>,
    ) -> Result<(), CreditCardError> {
        let calculator = InterestCalculator::with_warn_sink(rates, warn)?;
        self.accounts
            .lock()
            .expect("accounts mutex poisoned")
            .insert(
                account_id.to_string(),
                AccountState {
                    sweep: SweepLineEngine::new(),
                    calculator,
                },
            );
        Ok(())
    }

    pub fn record_balance_change(
        &self,
        account_id: &str,
        bucket: BalanceBucket,
        date: NaiveDate,
        amount: Decimal,
    ) -> Result<(), CreditCardError> {
        let mut accounts = self.accounts.lock().expect("accounts mutex poisoned");
        let state = accounts
            .get_mut(account_id)
            .ok_or_else(|| CreditCardError::UnknownAccount {
                account_id: account_id.to_string(),
            })?;
        state.sweep.add_change(bucket, date, amount);
        Ok(())
    }

    fn with_account<T>(
        &self,
        account_id: &str,
        f: impl FnOnce(&AccountState) -> T,
    ) -> Result<T, CreditCardError> {
        let accounts = self.accounts.lock().expect("accounts mutex poisoned");
        let state = accounts
            .get(account_id)
            .ok_or_else(|| CreditCardError::UnknownAccount {
                account_id: account_id.to_string(),
            })?;
        Ok(f(state))
    }

    /// Computes period interest via the sweep-line fast path and
    /// cross-checks it against the brute-force reference, raising
    /// `SweepLineMismatch` if the two diverge beyond [`T_MATCH`] (§7).
    pub fn calculate_statement_interest(
        &self,
        account_id: &str,
        range: DateRange,
    ) -> Result<InterestResult, CreditCardError> {
        self.with_account(account_id, |state| {
            let result = state.calculator.period_interest(&state.sweep, range)?;

            let rates: BTreeMap<BalanceBucket, Decimal> = BalanceBucket::ALL
                .into_iter()
                .map(|b| (b, state.calculator.rate_for(b)))
                .collect();
            let (_, brute_total) =
                super::brute_force::brute_force_interest(&state.sweep, &rates, range);

            let diff = (result.total_interest - brute_total).abs();
            if diff > T_MATCH {
                return Err(CreditCardError::SweepLineMismatch {
                    sweep_total: result.total_interest,
                    brute_total,
                    diff,
                    tolerance: T_MATCH,
                    severity: 5,
                });
            }

            Ok(result)
        })?
    }

    /// Wall-clock ratio of the brute-force reference to the sweep-line fast
    /// path over the same range (§11).
    pub fn benchmark_statement_interest(
        &self,
        account_id: &str,
        range: DateRange,
    ) -> Result<InterestBenchmark, CreditCardError> {
        self.with_account(account_id, |state| {
            let rates: BTreeMap<BalanceBucket, Decimal> = BalanceBucket::ALL
                .into_iter()
                .map(|b| (b, state.calculator.rate_for(b)))
                .collect();

            let sweep_start = Instant::now();
            let sweep_result = state.calculator.period_interest(&state.sweep, range)?;
            let sweep_elapsed_micros = sweep_start.elapsed().as_micros();

            let brute_start = Instant::now();
            let (_, brute_total) =
                super::brute_force::brute_force_interest(&state.sweep, &rates, range);
            let brute_force_elapsed_micros = brute_start.elapsed().as_micros();

            let speedup = if sweep_elapsed_micros == 0 {
                Decimal::ZERO
            } else {
                Decimal::from(brute_force_elapsed_micros) / Decimal::from(sweep_elapsed_micros)
            };

            Ok(InterestBenchmark {
                sweep_total: sweep_result.total_interest,
                brute_force_total: brute_total,
                sweep_elapsed_micros,
                brute_force_elapsed_micros,
                speedup,
            })
        })?
    }

    pub fn daily_balance_history(
        &self,
        account_id: &str,
        range: DateRange,
    ) -> Result<Vec<super::sweep::DailyBalance>, CreditCardError> {
        self.with_account(account_id, |state| state.sweep.daily_balances(range))
    }

    pub fn balance_at(
        &self,
        account_id: &str,
        date: NaiveDate,
    ) -> Result<BTreeMap<BalanceBucket, Decimal>, CreditCardError> {
        self.with_account(account_id, |state| state.sweep.balance_at(date))
    }

    pub fn daily_interest(
        &self,
        account_id: &str,
        range: DateRange,
    ) -> Result<Vec<DailyInterestEntry>, CreditCardError> {
        self.with_account(account_id, |state| {
            state.calculator.daily_interest(&state.sweep, range)
        })
    }

    pub fn statistics(&self, account_id: &str) -> Result<SweepStatistics, CreditCardError> {
        self.with_account(account_id, |state| state.sweep.statistics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn rates(rate: Decimal) -> BTreeMap<BalanceBucket, Decimal> {
        BalanceBucket::ALL.into_iter().map(|b| (b, rate)).collect()
    }

    #[test]
    fn unknown_account_is_reported() {
        let service = SweepLineService::new();
        let range = DateRange::new(d(0), d(9)).unwrap();
        let err = service
            .calculate_statement_interest("ghost", range)
            .unwrap_err();
        assert!(matches!(err, CreditCardError::UnknownAccount { .. }));
    }

    #[test]
    fn calculate_statement_interest_matches_sweep_and_brute_force() {
        let service = SweepLineService::new();
        service.register_account("acct-1", rates(dec!(0.18))).unwrap();
        service
            .record_balance_change("acct-1", BalanceBucket::Purchase, d(0), dec!(500))
            .unwrap();
        service
            .record_balance_change("acct-1", BalanceBucket::Purchase, d(10), dec!(200))
            .unwrap();

        let range = DateRange::new(d(0), d(29)).unwrap();
        let result = service
            .calculate_statement_interest("acct-1", range)
            .unwrap();
        assert!(result.total_interest > Decimal::ZERO);
    }

    #[test]
    fn benchmark_reports_matching_totals() {
        let service = SweepLineService::new();
        service.register_account("acct-2", rates(dec!(0.2))).unwrap();
        service
            .record_balance_change("acct-2", BalanceBucket::CashAdvance, d(0), dec!(1000))
            .unwrap();

        let range = DateRange::new(d(0), d(29)).unwrap();
        let benchmark = service.benchmark_statement_interest("acct-2", range).unwrap();
        let diff = (benchmark.sweep_total - benchmark.brute_force_total).abs();
        assert!(diff <= T_MATCH);
    }

    #[test]
    fn balance_at_and_daily_interest_delegate_correctly() {
        let service = SweepLineService::new();
        service.register_account("acct-3", rates(dec!(0.1))).unwrap();
        service
            .record_balance_change("acct-3", BalanceBucket::Purchase, d(0), dec!(300))
            .unwrap();

        let bal = service.balance_at("acct-3", d(5)).unwrap();
        assert_eq!(bal[&BalanceBucket::Purchase], dec!(300));

        let range = DateRange::new(d(0), d(0)).unwrap();
        let daily = service.daily_interest("acct-3", range).unwrap();
        assert_eq!(daily.len(), 1);

        let stats = service.statistics("acct-3").unwrap();
        assert_eq!(stats.event_count, 1);
    }
}
