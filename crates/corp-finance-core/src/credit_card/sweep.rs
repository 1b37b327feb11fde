use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bucket::BalanceBucket;
use super::error::CreditCardError;
use super::money::{round_average, DateRange};

/// A single balance-affecting event. Multiple changes on the same date for
/// the same bucket are summed by [`SweepLineEngine::add_change`] — this type
/// exists for callers that want to batch a history rather than call
/// `add_change` event-by-event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BalanceChange {
    pub date: NaiveDate,
    pub bucket: BalanceBucket,
    pub amount: Decimal,
}

/// Per-bucket balances on a single day. Always defined for every
/// [`BalanceBucket`] variant, zero if there is no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBalance {
    pub date: NaiveDate,
    pub balances: BTreeMap<BalanceBucket, Decimal>,
}

/// Derived summary statistics over an account's event history (§11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepStatistics {
    pub event_count: usize,
    pub first_event_date: Option<NaiveDate>,
    pub last_event_date: Option<NaiveDate>,
    pub per_bucket_total_delta: BTreeMap<BalanceBucket, Decimal>,
    pub change_point_count: usize,
}

fn zero_map() -> BTreeMap<BalanceBucket, Decimal> {
    BalanceBucket::ALL
        .into_iter()
        .map(|b| (b, Decimal::ZERO))
        .collect()
}

/// Event-sourced per-bucket running balance (C3).
///
/// `deltas` is an ordered mapping `Date -> (Bucket -> amount)`; `opening`
/// is the per-bucket balance vector before any recorded event (`B0`,
/// defaults to zero). A single account's engine is single-writer; engines
/// for distinct accounts may be driven from different threads.
#[derive(Debug, Clone, Default)]
pub struct SweepLineEngine {
    opening: HashMap<BalanceBucket, Decimal>,
    deltas: BTreeMap<NaiveDate, HashMap<BalanceBucket, Decimal>>,
}

impl SweepLineEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opening_balances(opening: HashMap<BalanceBucket, Decimal>) -> Self {
        Self {
            opening,
            deltas: BTreeMap::new(),
        }
    }

    /// Accumulate `amount` into `deltas[date][bucket]`.
    pub fn add_change(&mut self, bucket: BalanceBucket, date: NaiveDate, amount: Decimal) {
        *self
            .deltas
            .entry(date)
            .or_default()
            .entry(bucket)
            .or_insert(Decimal::ZERO) += amount;
    }

    /// `B0 + sum_{t <= d} deltas[t]` per bucket.
    pub fn balance_at(&self, d: NaiveDate) -> BTreeMap<BalanceBucket, Decimal> {
        let mut running = zero_map();
        for (bucket, amount) in &self.opening {
            *running.entry(*bucket).or_insert(Decimal::ZERO) += *amount;
        }
        for (_, day_deltas) in self.deltas.range(..=d) {
            for (bucket, amount) in day_deltas {
                *running.entry(*bucket).or_insert(Decimal::ZERO) += *amount;
            }
        }
        running
    }

    /// One [`DailyBalance`] per day in `range`, swept forward from the
    /// opening balance seeded by all deltas strictly before `range.start`.
    /// An event on a given day is applied *that* day — the reported balance
    /// for that day is the post-event balance.
    pub fn daily_balances(&self, range: DateRange) -> Vec<DailyBalance> {
        let mut running = zero_map();
        for (bucket, amount) in &self.opening {
            *running.entry(*bucket).or_insert(Decimal::ZERO) += *amount;
        }
        for (_, day_deltas) in self.deltas.range(..range.start) {
            for (bucket, amount) in day_deltas {
                *running.entry(*bucket).or_insert(Decimal::ZERO) += *amount;
            }
        }

        let mut out = Vec::with_capacity(range.days().max(0) as usize);
        for day in range.iter_days() {
            if let Some(day_deltas) = self.deltas.get(&day) {
                for (bucket, amount) in day_deltas {
                    *running.entry(*bucket).or_insert(Decimal::ZERO) += *amount;
                }
            }
            out.push(DailyBalance {
                date: day,
                balances: running.clone(),
            });
        }
        out
    }

    /// Per-bucket average balance over `range`, scale 6, HALF_UP. Divides the
    /// summed per-bucket daily balances by `days`.
    pub fn average_balances(
        &self,
        range: DateRange,
    ) -> Result<BTreeMap<BalanceBucket, Decimal>, CreditCardError> {
        let days = range.days();
        if days == 0 {
            return Ok(zero_map());
        }
        let daily = self.daily_balances(range);
        let mut sums = zero_map();
        for d in &daily {
            for (bucket, amount) in &d.balances {
                *sums.entry(*bucket).or_insert(Decimal::ZERO) += *amount;
            }
        }
        let divisor = Decimal::from(days);
        Ok(sums
            .into_iter()
            .map(|(b, total)| (b, round_average(total / divisor)))
            .collect())
    }

    /// Net delta for a bucket over a range (events within `[start, end]`).
    pub fn total_delta(&self, bucket: BalanceBucket, range: DateRange) -> Decimal {
        self.deltas
            .range(range.start..=range.end)
            .filter_map(|(_, day)| day.get(&bucket))
            .sum()
    }

    /// All dates on which at least one change was recorded, ascending.
    pub fn change_points(&self) -> Vec<NaiveDate> {
        self.deltas.keys().copied().collect()
    }

    pub fn statistics(&self) -> SweepStatistics {
        let event_count: usize = self.deltas.values().map(|m| m.len()).sum();
        let mut per_bucket_total_delta = zero_map();
        for day in self.deltas.values() {
            for (bucket, amount) in day {
                *per_bucket_total_delta.entry(*bucket).or_insert(Decimal::ZERO) += *amount;
            }
        }
        SweepStatistics {
            event_count,
            first_event_date: self.deltas.keys().next().copied(),
            last_event_date: self.deltas.keys().next_back().copied(),
            per_bucket_total_delta,
            change_point_count: self.deltas.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    #[test]
    fn balance_at_sums_events_up_to_and_including_date() {
        let mut sweep = SweepLineEngine::new();
        sweep.add_change(BalanceBucket::Purchase, d(0), dec!(500));
        sweep.add_change(BalanceBucket::Purchase, d(10), dec!(200));

        let bal = sweep.balance_at(d(5));
        assert_eq!(bal[&BalanceBucket::Purchase], dec!(500));

        let bal = sweep.balance_at(d(10));
        assert_eq!(bal[&BalanceBucket::Purchase], dec!(700));
    }

    #[test]
    fn event_before_range_seeds_opening_only() {
        let mut sweep = SweepLineEngine::new();
        sweep.add_change(BalanceBucket::Purchase, d(-5), dec!(300));
        let range = DateRange::new(d(0), d(9)).unwrap();
        let daily = sweep.daily_balances(range);
        assert_eq!(daily[0].balances[&BalanceBucket::Purchase], dec!(300));
        assert_eq!(daily.last().unwrap().balances[&BalanceBucket::Purchase], dec!(300));
    }

    #[test]
    fn multiple_changes_same_day_same_bucket_sum() {
        let mut sweep = SweepLineEngine::new();
        sweep.add_change(BalanceBucket::Purchase, d(0), dec!(100));
        sweep.add_change(BalanceBucket::Purchase, d(0), dec!(50));
        assert_eq!(sweep.balance_at(d(0))[&BalanceBucket::Purchase], dec!(150));
    }

    #[test]
    fn average_balance_matches_scenario_s5() {
        let mut sweep = SweepLineEngine::new();
        sweep.add_change(BalanceBucket::Purchase, d(0), dec!(500));
        sweep.add_change(BalanceBucket::Purchase, d(10), dec!(200));
        let range = DateRange::new(d(0), d(29)).unwrap();
        let avg = sweep.average_balances(range).unwrap();
        // (500*10 + 700*20) / 30 = 633.333333...
        assert_eq!(avg[&BalanceBucket::Purchase], dec!(633.333333));
    }

    #[test]
    fn statistics_report_event_span() {
        let mut sweep = SweepLineEngine::new();
        sweep.add_change(BalanceBucket::Purchase, d(0), dec!(500));
        sweep.add_change(BalanceBucket::CashAdvance, d(5), dec!(100));
        let stats = sweep.statistics();
        assert_eq!(stats.event_count, 2);
        assert_eq!(stats.change_point_count, 2);
        assert_eq!(stats.first_event_date, Some(d(0)));
        assert_eq!(stats.last_event_date, Some(d(5)));
    }
}
