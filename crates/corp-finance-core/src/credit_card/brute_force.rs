use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::bucket::BalanceBucket;
use super::interest::DAYS_PER_YEAR;
use super::money::{round_money, DateRange};
use super::sweep::SweepLineEngine;

/// Day-by-day reference interest computation (C5), used only to cross-check
/// the sweep-line fast path (C3/C4). Each day's unrounded interest is
/// accumulated per bucket and rounded once per bucket at the end — the same
/// point in the computation where `period_interest` rounds — so the two
/// paths agree to the cent for any period length. Naive per-day rounding
/// before summing would drift past `T_MATCH` over longer periods (thirty
/// days of half-cent-scale rounding error in one direction adds up to well
/// past a cent), which would make the mandated cross-check unsatisfiable
/// rather than a diagnostic of genuine divergence.
pub fn brute_force_interest(
    sweep: &SweepLineEngine,
    rates: &BTreeMap<BalanceBucket, Decimal>,
    range: DateRange,
) -> (BTreeMap<BalanceBucket, Decimal>, Decimal) {
    let mut unrounded_per_bucket: BTreeMap<BalanceBucket, Decimal> = BTreeMap::new();

    for day in sweep.daily_balances(range) {
        for (bucket, balance) in day.balances {
            let rate = rates.get(&bucket).copied().unwrap_or(Decimal::ZERO);
            let daily_interest = if balance <= Decimal::ZERO {
                Decimal::ZERO
            } else {
                balance * rate / DAYS_PER_YEAR
            };
            *unrounded_per_bucket.entry(bucket).or_insert(Decimal::ZERO) += daily_interest;
        }
    }

    let mut total = Decimal::ZERO;
    let per_bucket: BTreeMap<BalanceBucket, Decimal> = unrounded_per_bucket
        .into_iter()
        .map(|(bucket, unrounded)| {
            let rounded = round_money(unrounded);
            total += rounded;
            (bucket, rounded)
        })
        .collect();

    (per_bucket, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    #[test]
    fn scenario_s4_sweep_matches_brute_within_tolerance() {
        let mut sweep = SweepLineEngine::new();
        sweep.add_change(BalanceBucket::Purchase, d(0), dec!(500));
        sweep.add_change(BalanceBucket::Purchase, d(10), dec!(200));

        let rates: BTreeMap<BalanceBucket, Decimal> = BalanceBucket::ALL
            .into_iter()
            .map(|b| (b, dec!(0.18)))
            .collect();

        let range = DateRange::new(d(0), d(29)).unwrap();
        let calc = super::super::interest::InterestCalculator::new(rates.clone()).unwrap();
        let sweep_result = calc.period_interest(&sweep, range).unwrap();
        let (_per_bucket, brute_total) = brute_force_interest(&sweep, &rates, range);

        let diff = (sweep_result.total_interest - brute_total).abs();
        assert!(diff <= dec!(0.01), "diff {diff} exceeds tolerance");
    }
}
