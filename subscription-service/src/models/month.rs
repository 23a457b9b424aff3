//! Month-granularity calendar value used for subscription start/end dates.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a string is not a `MM-YYYY` month.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date format '{input}': {reason}")]
pub struct MonthParseError {
    pub input: String,
    pub reason: &'static str,
}

impl MonthParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// A calendar month (year + month, no day).
///
/// Field order makes the derived ordering chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Build a month, rejecting out-of-range parts.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(0..=9999).contains(&year) || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Parse a query/body value where the empty string means "not specified".
    pub fn parse_optional(value: &str) -> Result<Option<Self>, MonthParseError> {
        if value.is_empty() {
            return Ok(None);
        }
        value.parse().map(Some)
    }

    /// First day of the month, the representation used for storage.
    pub fn first_day(&self) -> NaiveDate {
        // `new` guarantees a representable year and a valid month.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl From<NaiveDate> for Month {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        let [month, year] = parts.as_slice() else {
            return Err(MonthParseError::new(s, "expected MM-YYYY"));
        };

        if month.len() != 2 || !month.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MonthParseError::new(s, "month must be two digits"));
        }
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MonthParseError::new(s, "year must be four digits"));
        }

        let month: u32 = month
            .parse()
            .map_err(|_| MonthParseError::new(s, "month must be two digits"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| MonthParseError::new(s, "year must be four digits"))?;

        Month::new(year, month).ok_or_else(|| MonthParseError::new(s, "month out of range"))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month, self.year)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_month_year() {
        let month: Month = "03-2024".parse().unwrap();
        assert_eq!(month.year(), 2024);
        assert_eq!(month.month(), 3);
        assert_eq!(month.to_string(), "03-2024");
    }

    #[test]
    fn empty_string_is_absent() {
        assert_eq!(Month::parse_optional("").unwrap(), None);
        assert_eq!(
            Month::parse_optional("12-2023").unwrap(),
            Month::new(2023, 12)
        );
    }

    #[test]
    fn rejects_wrong_separator_count() {
        for input in ["2024", "01-01-2024", "01/2024", "-", "01-"] {
            assert!(input.parse::<Month>().is_err(), "{input} should fail");
        }
    }

    #[test]
    fn rejects_non_numeric_parts() {
        for input in ["ab-2024", "01-20x4", " 1-2024", "01-+024", "1-2024", "01-24"] {
            assert!(input.parse::<Month>().is_err(), "{input} should fail");
        }
    }

    #[test]
    fn rejects_invalid_month() {
        assert!("00-2024".parse::<Month>().is_err());
        assert!("13-2024".parse::<Month>().is_err());
    }

    #[test]
    fn format_then_parse_is_stable() {
        for input in ["01-2024", "12-1999", "07-0001", "10-9999"] {
            let first: Month = input.parse().unwrap();
            let again: Month = first.to_string().parse().unwrap();
            assert_eq!(first, again);
            assert_eq!(again.to_string(), input);
        }
    }

    #[test]
    fn orders_by_year_then_month() {
        let dec_2023: Month = "12-2023".parse().unwrap();
        let jan_2024: Month = "01-2024".parse().unwrap();
        let feb_2024: Month = "02-2024".parse().unwrap();
        assert!(dec_2023 < jan_2024);
        assert!(jan_2024 < feb_2024);
    }

    #[test]
    fn date_round_trip_drops_day() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let month = Month::from(date);
        assert_eq!(month.first_day(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn serializes_as_string() {
        let month = Month::new(2024, 1).unwrap();
        assert_eq!(serde_json::to_string(&month).unwrap(), "\"01-2024\"");
        let back: Month = serde_json::from_str("\"01-2024\"").unwrap();
        assert_eq!(back, month);
        assert!(serde_json::from_str::<Month>("\"2024-01\"").is_err());
    }
}
