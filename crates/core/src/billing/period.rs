//! Billing period enumeration and charge computation.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use super::rate::ResolvedRate;
use crate::calendar::{days_in_month, first_of_month, next_month_start, same_month};
use crate::community::CommunityKind;

/// Lazy sequence of first-of-month dates.
///
/// Cloning restarts from the clone point, so a sequence can be walked twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Periods {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Periods {
    /// Last period the sequence will yield.
    #[must_use]
    pub const fn last(&self) -> NaiveDate {
        self.last
    }
}

impl Iterator for Periods {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next.filter(|period| *period <= self.last)?;
        self.next = next_month_start(current);
        Some(current)
    }
}

/// Result of pricing one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodCharge {
    /// Rounded amount to bill.
    pub amount: Decimal,
    /// True if only part of the month was billed.
    pub prorated: bool,
}

/// Period arithmetic for the billing engine.
pub struct PeriodCalculator;

impl PeriodCalculator {
    /// Enumerates billing periods from the month of `start` through the
    /// month of `horizon`, inclusive.
    ///
    /// Empty when `start` falls in a later month than `horizon`.
    #[must_use]
    pub fn enumerate_periods(start: NaiveDate, horizon: NaiveDate) -> Periods {
        Periods {
            next: Some(first_of_month(start)),
            last: first_of_month(horizon),
        }
    }

    /// Monthly charge before pro-ration.
    ///
    /// Standalone communities charge the fixed amount; all others charge
    /// `rate_per_area * flat_size`, with a missing size counting as zero.
    #[must_use]
    pub fn monthly_total(
        kind: CommunityKind,
        rate: &ResolvedRate,
        flat_size: Option<Decimal>,
    ) -> Decimal {
        match kind {
            CommunityKind::Standalone => rate.fixed_amount,
            CommunityKind::RateBased => rate.rate_per_area * flat_size.unwrap_or(Decimal::ZERO),
        }
    }

    /// Computes the amount billed for `period`.
    ///
    /// Returns `None` when `monthly_total <= 0`: such periods are never billed.
    /// The month containing `start` is pro-rated by active days unless the
    /// unit started on the 1st, which bills the whole month. Amounts are
    /// rounded to whole units, half away from zero.
    #[must_use]
    pub fn compute_amount(
        monthly_total: Decimal,
        period: NaiveDate,
        start: NaiveDate,
    ) -> Option<PeriodCharge> {
        if monthly_total <= Decimal::ZERO {
            return None;
        }

        if !same_month(period, start) {
            return Some(PeriodCharge {
                amount: round_amount(monthly_total),
                prorated: false,
            });
        }

        let days_in_month = days_in_month(start);
        let days_active = days_in_month - start.day() + 1;

        if days_active < days_in_month {
            let prorated =
                monthly_total * Decimal::from(days_active) / Decimal::from(days_in_month);
            Some(PeriodCharge {
                amount: round_amount(prorated),
                prorated: true,
            })
        } else {
            Some(PeriodCharge {
                amount: round_amount(monthly_total),
                prorated: false,
            })
        }
    }
}

fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
