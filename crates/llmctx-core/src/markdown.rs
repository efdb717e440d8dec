//! Markdown building blocks and the timezone-aware date formatter.
//!
//! Providers render their data through [`MarkdownWriter`] so every source
//! produces the same heading/field/list shape for the downstream model.

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Placeholder rendered for absent values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Append-only Markdown text builder.
#[derive(Debug, Default)]
pub struct MarkdownWriter {
    out: String,
}

impl MarkdownWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `# text` for level 1, `## text` for level 2, and so on.
    pub fn heading(&mut self, level: usize, text: &str) -> &mut Self {
        let _ = writeln!(self.out, "{} {text}", "#".repeat(level.clamp(1, 6)));
        self
    }

    /// `**label**: value`
    pub fn field(&mut self, label: &str, value: &str) -> &mut Self {
        let _ = writeln!(self.out, "**{label}**: {value}");
        self
    }

    /// `- text`
    pub fn list_item(&mut self, text: &str) -> &mut Self {
        let _ = writeln!(self.out, "- {text}");
        self
    }

    pub fn blank_line(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// English ordinal suffix for a day of the month.
fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Parse an ISO-8601 timestamp or date into `tz`.
///
/// Accepted shapes:
/// - RFC 3339 with offset or `Z` (`2024-07-07T11:00:00.000Z`)
/// - naive date-time, taken as UTC (`2024-07-07T11:00:00`)
/// - plain date, taken as midnight in `tz` (`2024-07-10`)
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&tz));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(Utc.from_utc_datetime(&naive).with_timezone(&tz));
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight).earliest()
}

/// Render a timestamp as `"July 7th, 2024 7:00 AM"` in `tz`.
///
/// Absent or blank input renders as `N/A`. Input that is not a recognised
/// ISO-8601 form is returned unchanged.
pub fn format_date(raw: Option<&str>, tz: Tz) -> String {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };
    match parse_timestamp(raw, tz) {
        Some(dt) => {
            let day = dt.day();
            let suffix = ordinal_suffix(day);
            format!(
                "{} {day}{suffix}, {}",
                dt.format("%B"),
                dt.format("%Y %-I:%M %p")
            )
        }
        None => raw.to_string(),
    }
}
