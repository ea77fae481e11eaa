//! Canonical timestamps shared by both temporal dimensions.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::TemporalError;

use super::SqlValue;

/// chrono format matching SQLite's `strftime('%Y-%m-%d %H:%M:%f', ...)`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Text of the open-ended sentinel (`MAX_TIMESTAMP`).
pub const INFINITY_TEXT: &str = "9999-12-31 23:59:59.999";

const INPUT_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// A point in time with millisecond precision, or the infinity sentinel.
///
/// Canonical text is fixed-width so SQLite's text ordering agrees with `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Timestamp {
    At(NaiveDateTime),
    Infinity,
}

impl Timestamp {
    /// Truncate to milliseconds; the sentinel instant maps to `Infinity`.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        let millis = (dt.nanosecond() / 1_000_000) * 1_000_000;
        let dt = dt.with_nanosecond(millis).unwrap_or(dt);
        let ts = Timestamp::At(dt);
        if ts.to_string() == INFINITY_TEXT {
            Timestamp::Infinity
        } else {
            ts
        }
    }

    /// Parse caller text into a timestamp.
    ///
    /// Period bounds are stored in canonical form, so `'2020-01-01'` comes
    /// back as `'2020-01-01 00:00:00.000'`. Plain comparisons against period
    /// columns should canonicalize their operand first, e.g. with
    /// `strftime('%Y-%m-%d %H:%M:%f', ...)`.
    pub fn parse(text: &str) -> Result<Self, TemporalError> {
        let trimmed = text.trim();
        if trimmed == INFINITY_TEXT {
            return Ok(Timestamp::Infinity);
        }
        let mut normalized = trimmed.trim_end_matches('Z').to_string();
        if normalized.len() > 10 && normalized.as_bytes()[10] == b'T' {
            normalized.replace_range(10..11, " ");
        }
        // Reject 5+ digit years: they would break fixed-width ordering.
        if normalized.len() < 10 || normalized.as_bytes()[4] != b'-' {
            return Err(TemporalError::InvalidTimestamp(text.to_string()));
        }
        for format in INPUT_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
                return Ok(Self::from_naive(dt));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self::from_naive(dt));
            }
        }
        Err(TemporalError::InvalidTimestamp(text.to_string()))
    }

    /// Interpret an engine value as a timestamp. Only text is accepted.
    pub fn from_value(value: &SqlValue) -> Result<Self, TemporalError> {
        match value {
            SqlValue::Text(text) => Self::parse(text),
            other => Err(TemporalError::InvalidTimestamp(other.to_string())),
        }
    }

    pub fn to_value(self) -> SqlValue {
        SqlValue::Text(self.to_string())
    }

    pub fn is_infinity(self) -> bool {
        matches!(self, Timestamp::Infinity)
    }

    /// The next representable instant (used to keep transaction times strictly increasing).
    pub fn next_millisecond(self) -> Self {
        match self {
            Timestamp::At(dt) => Self::from_naive(dt + chrono::Duration::milliseconds(1)),
            Timestamp::Infinity => Timestamp::Infinity,
        }
    }

    /// SQL string literal of the canonical text. Canonical text never contains quotes.
    pub fn sql_literal(self) -> String {
        format!("'{self}'")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::At(dt) => write!(f, "{}", dt.format(TIMESTAMP_FORMAT)),
            Timestamp::Infinity => f.write_str(INFINITY_TEXT),
        }
    }
}

impl FromStr for Timestamp {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_is_midnight() {
        let ts = Timestamp::parse("2020-01-01").unwrap();
        assert_eq!(ts.to_string(), "2020-01-01 00:00:00.000");
    }

    #[test]
    fn iso_t_separator_and_zulu() {
        let ts = Timestamp::parse("2021-06-15T10:30:00.1234Z").unwrap();
        assert_eq!(ts.to_string(), "2021-06-15 10:30:00.123");
    }

    #[test]
    fn sentinel_parses_to_infinity() {
        assert_eq!(Timestamp::parse(INFINITY_TEXT).unwrap(), Timestamp::Infinity);
        assert!(Timestamp::parse("2020-01-01").unwrap() < Timestamp::Infinity);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Timestamp::parse("yesterday").is_err());
        assert!(Timestamp::parse("20200-01-01").is_err());
        assert!(Timestamp::from_value(&SqlValue::Integer(5)).is_err());
    }

    #[test]
    fn text_order_matches_ord() {
        let a = Timestamp::parse("2020-01-01 09:00").unwrap();
        let b = Timestamp::parse("2020-01-01 10:00:00.5").unwrap();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
        assert!(b.to_string().as_str() < INFINITY_TEXT);
    }

    #[test]
    fn next_millisecond_advances() {
        let a = Timestamp::parse("2020-01-01 00:00:00.999").unwrap();
        assert_eq!(a.next_millisecond().to_string(), "2020-01-01 00:00:01.000");
    }
}
