//! Row → calendar event transformation.
//!
//! Form answers arrive as display text: `3/5/2024`, `2:30:00 PM`, `1:00:00`.
//! They are parsed into wall-clock time in the configured zone, converted to
//! instants, and formatted into the summary/description shown on the calendar.
//! Any unparseable row aborts the whole batch.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

use super::reader::RawEventRow;
use crate::google::{EventDateTime, EventPayload};

pub const NO_DESCRIPTION: &str = "[No description]";
const UNTITLED: &str = "Untitled event";
const UNKNOWN_CREATOR: &str = "Unknown";

/// Flag values (trimmed, lowercased) that mark a signup row.
const SIGNUP_MARKERS: [&str; 5] = ["yes", "y", "true", "x", "1"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("row {row}: missing {field}")]
    MissingField { row: u32, field: &'static str },

    #[error("row {row}: invalid date '{value}', expected M/D/YYYY")]
    InvalidDate { row: u32, value: String },

    #[error("row {row}: invalid time '{value}', expected H:MM:SS AM/PM")]
    InvalidTime { row: u32, value: String },

    #[error("row {row}: invalid duration '{value}', expected H:MM:SS")]
    InvalidDuration { row: u32, value: String },

    #[error("row {row}: {value} does not exist in {zone}")]
    NonexistentLocalTime {
        row: u32,
        value: String,
        zone: &'static str,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

/// A submission ready to be inserted into a calendar.
/// `end == start` for signup rows, `end >= start` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedEvent {
    pub summary: String,
    pub description: String,
    pub location: Option<String>,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub is_signup: bool,
}

impl TransformedEvent {
    pub fn payload(&self) -> EventPayload {
        let zone = self.start.timezone().name();
        EventPayload {
            summary: self.summary.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            start: EventDateTime::from_instant(&self.start, zone),
            end: EventDateTime::from_instant(&self.end, zone),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Batch + row transformation
// ────────────────────────────────────────────────────────────────────────────

/// Transforms a batch read from `first_row` onwards. All or nothing.
pub fn transform_rows(
    rows: &[RawEventRow],
    first_row: u32,
    zone: Tz,
) -> Result<Vec<TransformedEvent>, TransformError> {
    rows.iter()
        .zip(first_row..)
        .map(|(row, row_number)| transform_row(row, row_number, zone))
        .collect()
}

pub fn transform_row(
    row: &RawEventRow,
    row_number: u32,
    zone: Tz,
) -> Result<TransformedEvent, TransformError> {
    let date_text = required(&row.date, row_number, "date")?;
    let time_text = required(&row.time, row_number, "time")?;

    let date = parse_date(date_text).ok_or_else(|| TransformError::InvalidDate {
        row: row_number,
        value: date_text.to_string(),
    })?;
    let time = parse_clock_time(time_text).ok_or_else(|| TransformError::InvalidTime {
        row: row_number,
        value: time_text.to_string(),
    })?;

    let local = NaiveDateTime::new(date, time);
    // Ambiguous fall-back times resolve to the first occurrence.
    let start = zone
        .from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| TransformError::NonexistentLocalTime {
            row: row_number,
            value: local.to_string(),
            zone: zone.name(),
        })?;

    let is_signup = is_signup(row.signup.as_deref());
    let end = if is_signup {
        start
    } else {
        let duration_text = required(&row.duration, row_number, "duration")?;
        let invalid = || TransformError::InvalidDuration {
            row: row_number,
            value: duration_text.to_string(),
        };
        let duration = parse_duration(duration_text).ok_or_else(invalid)?;
        start.checked_add_signed(duration).ok_or_else(invalid)?
    };

    Ok(TransformedEvent {
        summary: format_title(row.summary.as_deref(), row.abbreviation.as_deref()),
        description: format_description(row.description.as_deref(), row.creator.as_deref()),
        location: row.location.clone().filter(|l| !l.trim().is_empty()),
        start,
        end,
        is_signup,
    })
}

fn required<'a>(
    cell: &'a Option<String>,
    row: u32,
    field: &'static str,
) -> Result<&'a str, TransformError> {
    cell.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(TransformError::MissingField { row, field })
}

// ────────────────────────────────────────────────────────────────────────────
// Field parsers
// ────────────────────────────────────────────────────────────────────────────

/// `M/D/YYYY`, with or without zero padding on month and day.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.trim().split('/');
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    let day = parts.next()?.trim().parse::<u32>().ok()?;
    let year_text = parts.next()?.trim();
    if year_text.len() != 4 || !year_text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = year_text.parse::<i32>().ok().filter(|y| *y >= 1000)?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// 12-hour clock to 24-hour: 12 AM is hour 0, 12 PM stays 12.
pub fn to_24_hour(hour: u32, meridiem: Meridiem) -> u32 {
    match (meridiem, hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Am, h) => h,
        (Meridiem::Pm, 12) => 12,
        (Meridiem::Pm, h) => h + 12,
    }
}

/// `H:MM:SS AM` or `H:MM AM`; the marker is case-insensitive.
pub fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    let mut parts = text.split_whitespace();
    let clock = parts.next()?;
    let meridiem = match parts.next()?.to_ascii_uppercase().as_str() {
        "AM" => Meridiem::Am,
        "PM" => Meridiem::Pm,
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }

    let (hour, minute, second) = split_clock(clock)?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    NaiveTime::from_hms_opt(to_24_hour(hour, meridiem), minute, second)
}

/// `H:MM:SS` or `H:MM`, hours unbounded.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let (hours, minutes, seconds) = split_clock(text.trim())?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    let total = i64::from(hours) * 3600 + i64::from(minutes) * 60 + i64::from(seconds);
    Some(Duration::seconds(total))
}

fn split_clock(text: &str) -> Option<(u32, u32, u32)> {
    let fields: Vec<&str> = text.split(':').collect();
    let number = |s: &str| -> Option<u32> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    };
    match fields.as_slice() {
        [h, m] => Some((number(h)?, number(m)?, 0)),
        [h, m, s] => Some((number(h)?, number(m)?, number(s)?)),
        _ => None,
    }
}

pub fn is_signup(flag: Option<&str>) -> bool {
    flag.map(|f| f.trim().to_ascii_lowercase())
        .is_some_and(|f| SIGNUP_MARKERS.contains(&f.as_str()))
}

// ────────────────────────────────────────────────────────────────────────────
// Formatting
// ────────────────────────────────────────────────────────────────────────────

/// `[ABBR] Summary`; the prefix is dropped when there is no abbreviation.
pub fn format_title(summary: Option<&str>, abbreviation: Option<&str>) -> String {
    let summary = summary.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(UNTITLED);
    match abbreviation.map(str::trim).filter(|a| !a.is_empty()) {
        Some(abbr) => format!("[{abbr}] {summary}"),
        None => summary.to_string(),
    }
}

/// Bold body (or the placeholder) followed by an italic attribution line.
pub fn format_description(description: Option<&str>, creator: Option<&str>) -> String {
    let body = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_DESCRIPTION);
    let creator = creator.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(UNKNOWN_CREATOR);
    format!("<b>{body}</b><br><br><i>Added by: {creator}</i>")
}
