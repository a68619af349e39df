//! Period normalization for the textual `MMM-YYYY` transaction dates.
//!
//! Dates stay raw strings in the store; chronological operations normalize
//! to `YYYY-MM` (month) or `YYYY` (year) on demand. Lexicographic order on
//! the normalized keys matches chronological order, which the raw form
//! does not.

use crate::error::{AnalyticsError, Result};

/// Time bucket granularity for series endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Month,
    Year,
}

impl Period {
    /// Parse the wire value; absent defaults to month.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            None | Some("") => Ok(Period::Month),
            Some("month") => Ok(Period::Month),
            Some("year") => Ok(Period::Year),
            Some(other) => Err(AnalyticsError::invalid(format!(
                "Unknown period: {other} (expected 'month' or 'year')"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Month => "month",
            Period::Year => "year",
        }
    }

    /// Bucket a raw date into this period's canonical key.
    pub fn bucket(&self, raw_date: &str) -> Option<String> {
        match self {
            Period::Month => month_key(raw_date),
            Period::Year => year_key(raw_date),
        }
    }
}

const MONTHS: [(&str, &str); 12] = [
    ("JAN", "01"),
    ("FEB", "02"),
    ("MAR", "03"),
    ("APR", "04"),
    ("MAY", "05"),
    ("JUN", "06"),
    ("JUL", "07"),
    ("AUG", "08"),
    ("SEP", "09"),
    ("OCT", "10"),
    ("NOV", "11"),
    ("DEC", "12"),
];

/// Normalize `MMM-YYYY` to `YYYY-MM`. Sentinel, empty, and malformed
/// dates yield `None` and are excluded from chronological output.
pub fn month_key(raw_date: &str) -> Option<String> {
    let (month_name, year) = split_raw(raw_date)?;
    let month = MONTHS
        .iter()
        .find(|(name, _)| *name == month_name)
        .map(|(_, number)| *number)?;
    Some(format!("{year}-{month}"))
}

/// Normalize `MMM-YYYY` to `YYYY`.
pub fn year_key(raw_date: &str) -> Option<String> {
    let (_, year) = split_raw(raw_date)?;
    Some(year.to_string())
}

fn split_raw(raw_date: &str) -> Option<(&str, &str)> {
    let (month, year) = raw_date.split_once('-')?;
    if month.len() != 3 || year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((month, year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key_normalizes_every_month() {
        let expected = [
            ("JAN-2024", "2024-01"),
            ("FEB-2024", "2024-02"),
            ("MAR-2024", "2024-03"),
            ("APR-2024", "2024-04"),
            ("MAY-2024", "2024-05"),
            ("JUN-2024", "2024-06"),
            ("JUL-2024", "2024-07"),
            ("AUG-2024", "2024-08"),
            ("SEP-2024", "2024-09"),
            ("OCT-2024", "2024-10"),
            ("NOV-2024", "2024-11"),
            ("DEC-2024", "2024-12"),
        ];
        for (raw, key) in expected {
            assert_eq!(month_key(raw).as_deref(), Some(key));
        }
    }

    #[test]
    fn test_year_key() {
        assert_eq!(year_key("OCT-2017").as_deref(), Some("2017"));
        assert_eq!(year_key("-"), None);
    }

    #[test]
    fn test_sentinel_and_malformed_excluded() {
        for raw in ["-", "", "XXX-2020", "JAN-20", "JAN2020", "JAN-ABCD"] {
            assert_eq!(month_key(raw), None, "{raw:?} should not bucket");
        }
    }

    #[test]
    fn test_normalized_keys_sort_chronologically() {
        let mut keys: Vec<String> = ["DEC-2019", "JAN-2020", "OCT-2019", "FEB-2020"]
            .iter()
            .map(|raw| month_key(raw).unwrap())
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["2019-10", "2019-12", "2020-01", "2020-02"]);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!(Period::parse(None).unwrap(), Period::Month);
        assert_eq!(Period::parse(Some("year")).unwrap(), Period::Year);
        assert!(Period::parse(Some("week")).is_err());
    }
}
