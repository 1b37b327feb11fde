use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::bucket::BalanceBucket;
use super::error::CreditCardError;
use super::money::{round_money, DateRange};
use super::sweep::SweepLineEngine;

/// ACT/365 day-count divisor used throughout the interest engine.
pub const DAYS_PER_YEAR: Decimal = dec!(365);

/// Threshold above which a configured rate triggers a non-fatal warning
/// rather than a constructor error (§4.2: "rate > 2.0 accepted but a warning
/// surface is offered").
const RATE_WARN_THRESHOLD: Decimal = dec!(2.0);

/// Single-callback logger for non-fatal rate warnings (§6).
pub type WarnSink = Arc<dyn Fn(&str, &serde_json::Value) + Send + Sync>;

/// Output of a period interest calculation (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestResult {
    pub period: DateRange,
    pub average_balance_per_bucket: BTreeMap<BalanceBucket, Decimal>,
    pub interest_per_bucket: BTreeMap<BalanceBucket, Decimal>,
    pub total_interest: Decimal,
    pub period_days: i64,
    /// Warnings raised while computing this result (non-fatal), mirroring the
    /// warnings delivered eagerly through the `warn` callback (§10.4).
    pub warnings: Vec<String>,
}

/// A single day's interest, per bucket and in total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyInterestEntry {
    pub date: NaiveDate,
    pub interest_per_bucket: BTreeMap<BalanceBucket, Decimal>,
    pub total_interest: Decimal,
}

/// Computes period and per-day interest from sweep-line balances at a fixed
/// set of per-bucket annual rates (C4).
#[derive(Clone)]
pub struct InterestCalculator {
    rates: BTreeMap<BalanceBucket, Decimal>,
    warn: Option<WarnSink>,
}

impl InterestCalculator {
    pub fn new(rates: BTreeMap<BalanceBucket, Decimal>) -> Result<Self, CreditCardError> {
        Self::with_warn_sink(rates, None)
    }

    pub fn with_warn_sink(
        rates: BTreeMap<BalanceBucket, Decimal>,
        warn: Option<WarnSink>,
    ) -> Result<Self, CreditCardError> {
        let mut warnings = Vec::new();
        for (bucket, rate) in &rates {
            if *rate < Decimal::ZERO {
                return Err(CreditCardError::InvalidRate {
                    bucket_id: format!("{bucket:?}"),
                    rate: *rate,
                    reason: "annual interest rate must be >= 0".into(),
                });
            }
            if *rate > RATE_WARN_THRESHOLD {
                warnings.push(format!(
                    "rate {rate} for bucket {bucket:?} exceeds {RATE_WARN_THRESHOLD}x; this is unusually high"
                ));
            }
        }
        if let Some(sink) = &warn {
            for w in &warnings {
                sink(w, &serde_json::json!({ "rates": rates }));
            }
        }
        Ok(Self { rates, warn })
    }

    pub(crate) fn rate_for(&self, bucket: BalanceBucket) -> Decimal {
        self.rates.get(&bucket).copied().unwrap_or(Decimal::ZERO)
    }

    /// `avg = sweep.average_balances(range)`; per bucket,
    /// `i = round2(avg * rate * days / 365)`; summed into `total`.
    pub fn period_interest(
        &self,
        sweep: &SweepLineEngine,
        range: DateRange,
    ) -> Result<InterestResult, CreditCardError> {
        let average_balance_per_bucket = sweep.average_balances(range)?;
        let days = range.days();
        let mut interest_per_bucket = BTreeMap::new();
        let mut total = Decimal::ZERO;
        let mut warnings = Vec::new();

        for (bucket, avg) in &average_balance_per_bucket {
            let rate = self.rate_for(*bucket);
            let interest = if *avg <= Decimal::ZERO {
                Decimal::ZERO
            } else {
                round_money(*avg * rate * Decimal::from(days) / DAYS_PER_YEAR)
            };
            interest_per_bucket.insert(*bucket, interest);
            total += interest;
        }
        if total.is_sign_negative() {
            warnings.push("computed total interest is negative; check input balances".into());
        }

        Ok(InterestResult {
            period: range,
            average_balance_per_bucket,
            interest_per_bucket,
            total_interest: total,
            period_days: days,
            warnings,
        })
    }

    /// Per-day interest: zero or negative daily balance contributes zero that
    /// day; otherwise `round2(daily * rate / 365)`.
    pub fn daily_interest(
        &self,
        sweep: &SweepLineEngine,
        range: DateRange,
    ) -> Vec<DailyInterestEntry> {
        sweep
            .daily_balances(range)
            .into_iter()
            .map(|day| {
                let mut per_bucket = BTreeMap::new();
                let mut total = Decimal::ZERO;
                for (bucket, balance) in &day.balances {
                    let rate = self.rate_for(*bucket);
                    let interest = if *balance <= Decimal::ZERO {
                        Decimal::ZERO
                    } else {
                        round_money(*balance * rate / DAYS_PER_YEAR)
                    };
                    per_bucket.insert(*bucket, interest);
                    total += interest;
                }
                DailyInterestEntry {
                    date: day.date,
                    interest_per_bucket: per_bucket,
                    total_interest: total,
                }
            })
            .collect()
    }

    /// `principal * (1 + rate/12)^months`, rounded to cents. Integer-exponent
    /// loop, never floating point.
    pub fn compound_interest(
        &self,
        principal: Decimal,
        bucket: BalanceBucket,
        months: u32,
    ) -> Decimal {
        let rate = self.rate_for(bucket);
        let monthly_rate = Decimal::ONE + rate / dec!(12);
        let mut factor = Decimal::ONE;
        for _ in 0..months {
            factor *= monthly_rate;
        }
        round_money(principal * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit_card::bucket::BalanceBucket;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn rates(rate: Decimal) -> BTreeMap<BalanceBucket, Decimal> {
        BalanceBucket::ALL.into_iter().map(|b| (b, rate)).collect()
    }

    #[test]
    fn rejects_negative_rate() {
        let err = InterestCalculator::new(rates(dec!(-0.1))).unwrap_err();
        assert!(matches!(err, CreditCardError::InvalidRate { .. }));
    }

    #[test]
    fn warns_but_accepts_rate_above_two() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let sink: WarnSink = Arc::new(move |_msg, _ctx| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        let calc = InterestCalculator::with_warn_sink(rates(dec!(3.0)), Some(sink)).unwrap();
        assert!(calls.load(Ordering::SeqCst) > 0);
        assert_eq!(calc.rate_for(BalanceBucket::Purchase), dec!(3.0));
    }

    #[test]
    fn scenario_s4_period_interest_single_bucket() {
        let mut sweep = SweepLineEngine::new();
        sweep.add_change(BalanceBucket::Purchase, d(0), dec!(500));
        sweep.add_change(BalanceBucket::Purchase, d(10), dec!(200));
        let calc = InterestCalculator::new(rates(dec!(0.18))).unwrap();
        let range = DateRange::new(d(0), d(29)).unwrap();
        let result = calc.period_interest(&sweep, range).unwrap();
        assert_eq!(result.period_days, 30);
        assert!(result.total_interest > Decimal::ZERO);
    }

    #[test]
    fn negative_daily_balance_contributes_zero() {
        let calc = InterestCalculator::new(rates(dec!(0.18))).unwrap();
        let sweep = SweepLineEngine::new();
        let range = DateRange::new(d(0), d(0)).unwrap();
        let daily = calc.daily_interest(&sweep, range);
        assert_eq!(daily[0].total_interest, Decimal::ZERO);
    }

    #[test]
    fn compound_interest_matches_manual_calc() {
        let calc = InterestCalculator::new(rates(dec!(0.12))).unwrap();
        let result = calc.compound_interest(dec!(1000), BalanceBucket::Purchase, 12);
        // (1 + 0.01)^12 * 1000 ~= 1126.83
        assert_eq!(result, dec!(1126.83));
    }
}
