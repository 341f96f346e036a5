//! Flexible date parsing for source-provided date strings.
//!
//! The clinical source mixes several date formats in free-text fields;
//! everything user-facing is rendered as `DD.MM.YYYY`.

use chrono::NaiveDate;

/// Formats accepted from the source, tried in order.
pub const SUPPORTED_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d.%m.%Y", "%Y.%m.%d", "%d-%m-%Y"];

/// Parse a date string in any supported format.
pub fn parse_flexible(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    SUPPORTED_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Render a date in the display format used by reports.
pub fn format_display(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Reformat a raw source date for display; unrecognized input passes
/// through unchanged.
pub fn display_or_raw(raw: &str) -> String {
    match parse_flexible(raw) {
        Some(d) => format_display(d),
        None => raw.to_string(),
    }
}
