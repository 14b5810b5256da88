use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::fmt;

/// Explicit formats, tried in priority order. Day-first wins over
/// month-first when both would parse.
pub const EXPLICIT_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%Y.%m.%d",
    "%b %d %Y",
    "%b  %d %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
    "%d.%m.%Y",
    "%a %b %d %Y",
    "%d/%m/%y",
    "%m/%d/%y",
    "%d-%m-%y",
];

/// `%Y` takes any digit count, so `01/07/25` would otherwise land in year 25.
fn four_digit_year(d: NaiveDate) -> Option<NaiveDate> {
    (d.year() >= 1000).then_some(d)
}

/// Result of parsing a date cell: either a calendar date or the text
/// exactly as it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Parsed(NaiveDate),
    Unparsed(String),
}

impl DateValue {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Parsed(d) => Some(*d),
            DateValue::Unparsed(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, DateValue::Parsed(_))
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Parsed(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DateValue::Unparsed(raw) => f.write_str(raw),
        }
    }
}

/// Parse a date cell. Never fails: unknown shapes come back as `Unparsed`.
pub fn parse_date(value: &str) -> DateValue {
    let s = value.trim();
    if let Some(d) = parse_explicit(s).or_else(|| parse_permissive(s)) {
        return DateValue::Parsed(d);
    }
    DateValue::Unparsed(value.to_string())
}

fn parse_explicit(s: &str) -> Option<NaiveDate> {
    EXPLICIT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().and_then(four_digit_year))
}

fn parse_permissive(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    FALLBACK_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(s, fmt)
                .ok()
                .and_then(|dt| four_digit_year(dt.date()))
        })
        .or_else(|| {
            FALLBACK_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().and_then(four_digit_year))
        })
}
