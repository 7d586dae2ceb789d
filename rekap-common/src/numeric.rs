//! Locale-ambiguous number parsing
//!
//! Upstream counts arrive as JSON numbers, as US-formatted strings
//! (`"1,234.56"`), or as Indonesian/European strings (`"1.234,56"`).
//! Everything here resolves to a plain `f64`.
//!
//! # Separator Rules
//! - Both `.` and `,` present: the rightmost one is the decimal point, the
//!   other is a thousands separator
//! - Only one kind present: it is a thousands separator when every group
//!   after it has exactly 3 digits and the leading group is a non-zero
//!   1-3 digit number; otherwise a single occurrence is a decimal point
//! - Currency symbols, whitespace and other decoration are stripped first

use serde_json::Value;

/// Normalize a JSON value to a number, defaulting to 0.
///
/// Numbers pass through (non-finite → 0), strings go through
/// [`parse_numeric_str`], everything else is 0.
///
/// # Examples
///
/// ```
/// use rekap_common::numeric::normalize_number;
/// use serde_json::json;
///
/// assert_eq!(normalize_number(&json!(42)), 42.0);
/// assert_eq!(normalize_number(&json!("1.234,56")), 1234.56);
/// assert_eq!(normalize_number(&json!("abc")), 0.0);
/// assert_eq!(normalize_number(&json!(null)), 0.0);
/// ```
pub fn normalize_number(value: &Value) -> f64 {
    parse_numeric_value(value).unwrap_or(0.0)
}

/// Parse a JSON value as a number, returning `None` when it carries no
/// usable numeric signal.
///
/// Used by the field path resolver to decide whether a candidate field is
/// "present and parseable" before falling through to the next alias.
pub fn parse_numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_numeric_str(s),
        _ => None,
    }
}

/// Normalize a string to a number, defaulting to 0.
pub fn normalize_numeric_str(input: &str) -> f64 {
    parse_numeric_str(input).unwrap_or(0.0)
}

/// Parse a locale-ambiguous numeric string.
///
/// # Examples
///
/// ```
/// use rekap_common::numeric::parse_numeric_str;
///
/// assert_eq!(parse_numeric_str("1.234"), Some(1234.0));
/// assert_eq!(parse_numeric_str("1.234,56"), Some(1234.56));
/// assert_eq!(parse_numeric_str("1,234.56"), Some(1234.56));
/// assert_eq!(parse_numeric_str("Rp 12.500"), Some(12500.0));
/// assert_eq!(parse_numeric_str("2,5"), Some(2.5));
/// assert_eq!(parse_numeric_str(""), None);
/// ```
pub fn parse_numeric_str(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    let negative = trimmed.starts_with('-');

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let canonical = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) => {
            // Rightmost separator is the decimal point
            let (decimal, thousands) = if dot > comma { ('.', ',') } else { (',', '.') };
            let without_thousands: String = cleaned.chars().filter(|c| *c != thousands).collect();
            if without_thousands.matches(decimal).count() > 1 {
                return None;
            }
            without_thousands.replace(decimal, ".")
        }
        (Some(_), None) => resolve_single_separator(&cleaned, '.')?,
        (None, Some(_)) => resolve_single_separator(&cleaned, ',')?,
        (None, None) => cleaned,
    };

    let value = canonical.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negative { -value } else { value })
}

/// Decide whether a lone separator kind groups thousands or marks decimals,
/// returning a string `f64::from_str` accepts.
fn resolve_single_separator(cleaned: &str, separator: char) -> Option<String> {
    let groups: Vec<&str> = cleaned.split(separator).collect();

    if is_thousands_grouping(&groups) {
        return Some(groups.concat());
    }

    // Only a single occurrence can be a decimal point
    if groups.len() == 2 {
        let (int_part, frac_part) = (groups[0], groups[1]);
        let int_part = if int_part.is_empty() { "0" } else { int_part };
        if frac_part.is_empty() {
            return Some(int_part.to_string());
        }
        return Some(format!("{}.{}", int_part, frac_part));
    }

    None
}

/// `["1", "234", "567"]` → true; `["0", "500"]` → false; `["1", "5"]` → false
fn is_thousands_grouping(groups: &[&str]) -> bool {
    let Some((lead, rest)) = groups.split_first() else {
        return false;
    };
    if rest.is_empty() || lead.is_empty() || lead.len() > 3 || lead.starts_with('0') {
        return false;
    }
    rest.iter().all(|g| g.len() == 3)
}
