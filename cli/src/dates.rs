//! Due-date parsing for `--due-at`.
//!
//! ISO-looking input (four leading digits) goes through `Timestamp`, which
//! takes RFC 3339, naive date-times and bare dates. Anything else is tried
//! as a US date. Dates without a time are midnight UTC.

use chrono::NaiveDate;
use todo_core::Timestamp;

use crate::error::CliError;

const US_FORMATS: [&str; 2] = ["%m/%d/%Y", "%m-%d-%Y"];

pub fn parse_due(input: &str) -> Result<Timestamp, CliError> {
    let trimmed = input.trim();
    let looks_iso = trimmed.len() >= 4 && trimmed.bytes().take(4).all(|b| b.is_ascii_digit());
    let parsed = if looks_iso {
        trimmed.parse::<Timestamp>().ok()
    } else {
        US_FORMATS.iter().find_map(|format| {
            NaiveDate::parse_from_str(trimmed, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| Timestamp(midnight.and_utc()))
        })
    };
    parsed.ok_or_else(|| CliError::InvalidDate(input.to_string()))
}
