//! Two-stage date parsing
//!
//! Every value is first tried against the strict US export format
//! (`11/8/2016`). Values that fail go through a fixed list of lenient
//! formats. A value that matches nothing becomes [`ParsedDate::Missing`];
//! parsing a column never fails as a whole.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Strict format of temporal columns (month/day/year).
pub const STRICT_FORMAT: &str = "%m/%d/%Y";

const LENIENT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m-%d-%Y",
    "%m/%d/%y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const LENIENT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Outcome of parsing one raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    /// Matched the strict format
    Strict(NaiveDate),
    /// Matched a lenient format
    Lenient(NaiveDate),
    /// Matched nothing; the explicit missing marker
    Missing,
}

impl ParsedDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            ParsedDate::Strict(d) | ParsedDate::Lenient(d) => Some(*d),
            ParsedDate::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ParsedDate::Missing)
    }
}

/// Strict-then-lenient date parser
#[derive(Debug, Clone)]
pub struct DateParser {
    strict_format: String,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(STRICT_FORMAT)
    }
}

impl DateParser {
    pub fn new(strict_format: impl Into<String>) -> Self {
        Self {
            strict_format: strict_format.into(),
        }
    }

    /// Parse one value. Surrounding whitespace is ignored.
    pub fn parse(&self, raw: &str) -> ParsedDate {
        let value = raw.trim();
        if value.is_empty() {
            return ParsedDate::Missing;
        }

        if let Ok(date) = NaiveDate::parse_from_str(value, &self.strict_format) {
            return ParsedDate::Strict(date);
        }

        self.parse_lenient(value)
            .map(ParsedDate::Lenient)
            .unwrap_or(ParsedDate::Missing)
    }

    fn parse_lenient(&self, value: &str) -> Option<NaiveDate> {
        LENIENT_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .or_else(|| {
                LENIENT_DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                    .map(|dt| dt.date())
            })
            .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
    }
}

/// Days since 1970-01-01, the physical representation of a polars `Date`.
pub fn to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_strict_format_without_padding() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("11/8/2016"), ParsedDate::Strict(ymd(2016, 11, 8)));
        assert_eq!(parser.parse(" 06/12/2016 "), ParsedDate::Strict(ymd(2016, 6, 12)));
    }

    #[test]
    fn test_lenient_fallback() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("2016-11-08"), ParsedDate::Lenient(ymd(2016, 11, 8)));
        assert_eq!(
            parser.parse("2016-11-08 00:00:00"),
            ParsedDate::Lenient(ymd(2016, 11, 8))
        );
        assert_eq!(parser.parse("Nov 8, 2016"), ParsedDate::Lenient(ymd(2016, 11, 8)));
    }

    #[test]
    fn test_unparseable_is_missing() {
        let parser = DateParser::default();
        assert!(parser.parse("not a date").is_missing());
        assert!(parser.parse("13/45/2016").is_missing());
        assert!(parser.parse("").is_missing());
    }

    #[test]
    fn test_epoch_days_round_trip() {
        let date = ymd(2016, 11, 8);
        assert_eq!(to_epoch_days(ymd(1970, 1, 1)), 0);
        assert_eq!(from_epoch_days(to_epoch_days(date)), Some(date));
    }
}
