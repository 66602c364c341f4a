//! Month boundary arithmetic.
//!
//! Billing periods are identified by the first day of a calendar month.
//! Everything here works on `NaiveDate`, so month boundaries never drift
//! with the host timezone.

use chrono::{Datelike, Days, Months, NaiveDate};

/// Returns the first day of the month containing `date`.
#[must_use]
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Returns the first day of the month after the one containing `date`.
///
/// `None` only at the far end of the representable date range.
#[must_use]
pub fn next_month_start(date: NaiveDate) -> Option<NaiveDate> {
    first_of_month(date).checked_add_months(Months::new(1))
}

/// Returns true if both dates fall in the same calendar month.
#[must_use]
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Number of days in the month containing `date`.
#[must_use]
pub fn days_in_month(date: NaiveDate) -> u32 {
    match date.month() {
        2 if is_leap_year(date.year()) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of whole months from the month of `from` to the month of `to`.
///
/// Negative when `to` is in an earlier month.
#[must_use]
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let years = i64::from(to.year()) - i64::from(from.year());
    years * 12 + i64::from(to.month()) - i64::from(from.month())
}

/// Parses a month as `YYYY-MM` or a full `YYYY-MM-DD` date.
///
/// The result is always normalized to the first of the month.
#[must_use]
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
        .map(first_of_month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_of_month() {
        assert_eq!(first_of_month(date(2024, 3, 17)), date(2024, 3, 1));
        assert_eq!(first_of_month(date(2024, 3, 1)), date(2024, 3, 1));
        assert_eq!(first_of_month(date(2024, 12, 31)), date(2024, 12, 1));
    }

    #[test]
    fn test_next_month_start_rolls_year() {
        assert_eq!(next_month_start(date(2024, 12, 15)), Some(date(2025, 1, 1)));
        assert_eq!(next_month_start(date(2024, 1, 31)), Some(date(2024, 2, 1)));
    }

    #[test]
    fn test_next_month_start_at_range_end() {
        assert_eq!(next_month_start(NaiveDate::MAX), None);
    }

    #[rstest]
    #[case(date(2024, 2, 10), 29)]
    #[case(date(2023, 2, 10), 28)]
    #[case(date(1900, 2, 1), 28)]
    #[case(date(2000, 2, 1), 29)]
    #[case(date(2024, 4, 30), 30)]
    #[case(date(2024, 9, 1), 30)]
    #[case(date(2024, 1, 1), 31)]
    #[case(date(2024, 12, 31), 31)]
    fn test_days_in_month(#[case] input: NaiveDate, #[case] expected: u32) {
        assert_eq!(days_in_month(input), expected);
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(date(2024, 1, 20), date(2024, 1, 2)), 0);
        assert_eq!(months_between(date(2023, 11, 1), date(2024, 2, 1)), 3);
        assert_eq!(months_between(date(2024, 5, 1), date(2024, 2, 1)), -3);
    }

    #[rstest]
    #[case("2024-05", Some(date(2024, 5, 1)))]
    #[case(" 2024-05 ", Some(date(2024, 5, 1)))]
    #[case("2024-05-19", Some(date(2024, 5, 1)))]
    #[case("2024-13", None)]
    #[case("May 2024", None)]
    #[case("", None)]
    fn test_parse_month(#[case] raw: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_month(raw), expected);
    }
}
