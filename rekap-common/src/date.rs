//! Date parsing for upstream activity records
//!
//! Supported formats, tried in order:
//! 1. ISO-8601 timestamp (`2024-05-01T08:30:00Z`, `2024-05-01 08:30:00`)
//! 2. `DD/MM/YYYY`
//! 3. `YYYY-MM-DD`
//! 4. ISO week `YYYY-Www` (resolves to the Monday of that week)
//! 5. Indonesian month names (`Mei 2024`, `15 Juli 2024`)
//! 6. Month key `YYYY-MM` (resolves to the first of the month)
//!
//! Timestamps carrying an explicit offset are shifted to the reporting
//! offset (WIB, UTC+7, by default) before the calendar date is taken.

use crate::field_path::{value_as_text, FieldAliases, RecordView};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc, Weekday};
use serde::Serialize;

/// Default reporting offset in minutes (WIB)
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;

/// Indonesian month names, January first
const MONTHS_ID: [&str; 12] = [
    "januari", "februari", "maret", "april", "mei", "juni", "juli", "agustus", "september",
    "oktober", "november", "desember",
];

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Result of resolving a date across candidate fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedDate {
    /// Text of the winning candidate, or of the first present candidate
    /// when none parsed
    pub raw: Option<String>,
    /// Parsed calendar date; never an invalid-but-present date
    pub parsed: Option<NaiveDate>,
}

/// Date parser bound to a reporting offset
#[derive(Debug, Clone, Copy)]
pub struct DateParser {
    offset: FixedOffset,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::with_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES)
    }
}

impl DateParser {
    /// Create a parser reporting dates at the given UTC offset.
    ///
    /// Out-of-range offsets fall back to UTC.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    /// Parse one date string using the supported formats in order
    pub fn parse(&self, input: &str) -> Option<NaiveDate> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }

        self.parse_timestamp(text)
            .or_else(|| NaiveDate::parse_from_str(text, "%d/%m/%Y").ok())
            .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok())
            .or_else(|| parse_iso_week(text))
            .or_else(|| parse_indonesian(text))
            .or_else(|| parse_month_key(text))
    }

    fn parse_timestamp(&self, text: &str) -> Option<NaiveDate> {
        if let Ok(stamped) = DateTime::parse_from_rfc3339(text) {
            return Some(stamped.with_timezone(&self.offset).date_naive());
        }
        NAIVE_TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .map(|naive| naive.date())
    }

    /// Resolve a date across candidate fields. The first candidate that
    /// parses wins; unparseable candidates are skipped.
    pub fn resolve(&self, view: &mut RecordView<'_>, aliases: &FieldAliases) -> ResolvedDate {
        let mut first_raw: Option<String> = None;

        for path in aliases.iter() {
            let Some(text) = view.lookup(path).as_ref().and_then(value_as_text) else {
                continue;
            };
            if let Some(parsed) = self.parse(&text) {
                return ResolvedDate {
                    raw: Some(text),
                    parsed: Some(parsed),
                };
            }
            first_raw.get_or_insert(text);
        }

        ResolvedDate {
            raw: first_raw,
            parsed: None,
        }
    }
}

/// Parse with the default reporting offset
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    DateParser::default().parse(input)
}

/// `2024-W18` → Monday 2024-04-29
fn parse_iso_week(text: &str) -> Option<NaiveDate> {
    let (year, week) = text.split_once("-W").or_else(|| text.split_once("-w"))?;
    let year = year.parse::<i32>().ok()?;
    let week = week.parse::<u32>().ok()?;
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

/// `2024-05` → 2024-05-01
fn parse_month_key(text: &str) -> Option<NaiveDate> {
    let (year, month) = text.split_once('-')?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// `Mei 2024`, `15 Juli 2024`, `Senin, 3 Agustus 2024`
fn parse_indonesian(text: &str) -> Option<NaiveDate> {
    let tokens: Vec<String> = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();

    let month_pos = tokens.iter().position(|t| month_number(t).is_some())?;
    let month = month_number(&tokens[month_pos])?;

    let year = tokens[month_pos + 1..]
        .iter()
        .find(|t| t.len() == 4 && t.chars().all(|c| c.is_ascii_digit()))?
        .parse::<i32>()
        .ok()?;

    let day = match month_pos.checked_sub(1).map(|i| &tokens[i]) {
        Some(prev) if prev.len() <= 2 && prev.chars().all(|c| c.is_ascii_digit()) => {
            prev.parse::<u32>().ok()?
        }
        _ => 1,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Full name or an unambiguous prefix of at least 3 letters
fn month_number(token: &str) -> Option<u32> {
    let token = token.trim_end_matches('.');
    if token.len() < 3 {
        return None;
    }
    MONTHS_ID
        .iter()
        .position(|name| name.starts_with(token))
        .map(|i| i as u32 + 1)
}

/// Monday of the ISO week containing `date`
pub fn iso_week_start(date: NaiveDate) -> NaiveDate {
    let week = date.iso_week();
    NaiveDate::from_isoywd_opt(week.year(), week.week(), Weekday::Mon).unwrap_or(date)
}
