use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::CreditCardError;

/// Monetary tolerance for the sweep-line vs brute-force cross-check (§7,
/// `SweepLineMismatch`). Not a scaling factor — kept constant per the spec's
/// open question on tolerance scaling (see DESIGN.md).
pub const T_MATCH: Decimal = dec!(0.01);

/// Tolerance used when backtracking the DP table to confirm a chosen unit
/// split reproduces the recorded optimum.
pub const DP_TOLERANCE: Decimal = dec!(0.01);

/// Round a monetary amount HALF_UP to 2 fractional digits.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round an average-balance figure HALF_UP to 6 fractional digits (§3).
pub fn round_average(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero)
}

/// An inclusive date range, `days = end - start + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CreditCardError> {
        if end < start {
            return Err(CreditCardError::InvalidAmount {
                amount: Decimal::ZERO,
                reason: format!("date range end {end} precedes start {start}"),
            });
        }
        Ok(Self { start, end })
    }

    /// Inclusive day count; always >= 1 for a valid range.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterate every calendar day in `[start, end]`.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_day_range_has_one_day() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let r = DateRange::new(d, d).unwrap();
        assert_eq!(r.days(), 1);
        assert_eq!(r.iter_days().count(), 1);
    }

    #[test]
    fn rejects_inverted_range() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(DateRange::new(start, end).is_err());
    }

    #[test]
    fn round_money_half_up() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
    }

    #[test]
    fn round_average_scale_six() {
        assert_eq!(
            round_average(dec!(633.3333333333)),
            dec!(633.333333)
        );
    }
}
