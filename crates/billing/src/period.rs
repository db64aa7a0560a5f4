//! Billing periods accepted by the upstream reports.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::BillingError;

/// A calendar month, formatted `YYYY-MM` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingMonth(NaiveDate);

impl FromStr for BillingMonth {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 7 {
            return Err(BillingError::invalid_parameters());
        }
        NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| BillingError::invalid_parameters())
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0.year(), self.0.month())
    }
}

/// Parse a `YYYY-MM-DD` day.
///
/// # Errors
///
/// Returns [`BillingError::InvalidRequest`] if `s` is not a valid date.
pub fn parse_day(s: &str) -> Result<NaiveDate, BillingError> {
    let s = s.trim();
    if s.len() != 10 {
        return Err(BillingError::invalid_parameters());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| BillingError::invalid_parameters())
}

/// Inclusive run of days used by the range report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DayRange {
    /// Build a range, rejecting reversed bounds and spans over `max_days`.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidRequest`] when `end < start` or the
    /// range covers more than `max_days` days.
    pub fn new(start: NaiveDate, end: NaiveDate, max_days: u32) -> Result<Self, BillingError> {
        let span = (end - start).num_days() + 1;
        if span < 1 || span > i64::from(max_days) {
            return Err(BillingError::invalid_parameters());
        }
        Ok(Self { start, end })
    }

    /// Every day in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |day| *day <= self.end)
    }
}

/// Format a day as `YYYY-MM-DD`, used for range report keys.
pub(crate) fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        let month: BillingMonth = "2024-11".parse().unwrap();
        assert_eq!(month.to_string(), "2024-11");
        assert_eq!(month, BillingMonth(NaiveDate::from_ymd_opt(2024, 11, 1).unwrap()));
    }

    #[test]
    fn test_reject_bad_months() {
        assert!("2024-13".parse::<BillingMonth>().is_err());
        assert!("2024-1".parse::<BillingMonth>().is_err());
        assert!("2024-11-05".parse::<BillingMonth>().is_err());
        assert!("".parse::<BillingMonth>().is_err());
    }

    #[test]
    fn test_parse_day() {
        assert!(parse_day("2024-02-29").is_ok());
        assert!(parse_day("2023-02-29").is_err());
        assert!(parse_day("2024-2-1").is_err());
    }

    #[test]
    fn test_day_range() {
        let start = parse_day("2024-01-30").unwrap();
        let end = parse_day("2024-02-02").unwrap();
        let range = DayRange::new(start, end, 31).unwrap();
        let days: Vec<String> = range.days().map(day_key).collect();
        assert_eq!(days, ["2024-01-30", "2024-01-31", "2024-02-01", "2024-02-02"]);
    }

    #[test]
    fn test_day_range_limits() {
        let start = parse_day("2024-01-01").unwrap();
        assert!(DayRange::new(start, start, 1).is_ok());
        assert!(DayRange::new(start, parse_day("2023-12-31").unwrap(), 31).is_err());
        assert!(DayRange::new(start, parse_day("2024-02-01").unwrap(), 31).is_err());
    }
}
