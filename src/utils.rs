use crate::error::{ForecastError, Result};

/// Date layouts accepted when reading dates from files or user input.
///
/// ISO dates come first since that is what `save` writes back.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Layout used whenever a date is written to storage or shown to the user.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a calendar date from a string.
///
/// Accepts the layouts in `DATE_FORMATS` as well as full timestamps such as
/// `2024-01-01 00:00:00` (the time part is dropped).
///
/// # Arguments
/// * `input` - Date text, surrounding whitespace is ignored.
///
/// # Returns
/// * `Option<chrono::NaiveDate>` - The parsed date, or `None` if no layout matches.
///
/// # Examples
///
/// ```
/// let date = event_forecast::utils::parse_date("2024-01-03").unwrap();
/// assert_eq!(date.to_string(), "2024-01-03");
/// ```
pub fn parse_date(input: &str) -> Option<chrono::NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .map(|dt| dt.date())
        .ok()
}

/// Parses a user supplied date, reporting a validation error on failure.
pub fn parse_input_date(input: &str) -> Result<chrono::NaiveDate> {
    parse_date(input).ok_or_else(|| {
        ForecastError::validation(input, "expected a calendar date such as 2024-01-31")
    })
}

/// Parses an event count.
///
/// Counts are non-negative integers. A float with no fractional part
/// (`3.0`) is accepted because spreadsheet exports often write counts that way.
///
/// # Arguments
/// * `input` - Count text.
///
/// # Returns
/// * `Option<u32>` - The count, or `None` if negative, fractional or not a number.
pub fn parse_count(input: &str) -> Option<u32> {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return Some(n);
    }

    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
            Some(v as u32)
        }
        _ => None,
    }
}

/// Parses a user supplied count, reporting a validation error on failure.
pub fn parse_input_count(input: &str) -> Result<u32> {
    parse_count(input)
        .ok_or_else(|| ForecastError::validation(input, "expected a non-negative integer count"))
}

/// Formats a date with `DATE_FORMAT`.
pub fn format_date(date: chrono::NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Returns the day before `today`.
///
/// Used by the "current query" autofill, which marks yesterday as a day
/// without events when nothing was logged for it.
pub fn day_before(today: chrono::NaiveDate) -> chrono::NaiveDate {
    today.pred_opt().unwrap_or(today)
}
