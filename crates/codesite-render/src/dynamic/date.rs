//! PHP-style date formatting, as stored in site settings (`F j, Y`).

use std::fmt::Write;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

/// Formats `dt` with PHP `date()` format letters.
///
/// A backslash escapes the next character. Characters that are not format
/// letters are copied as-is.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use codesite_render::dynamic::format_date;
///
/// let dt = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
/// assert_eq!(format_date(&dt, "F j, Y"), "March 5, 2024");
/// assert_eq!(format_date(&dt, "D, jS \\o\\f M"), "Tue, 5th of Mar");
/// ```
pub fn format_date(dt: &DateTime<Utc>, format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        // Writing to a String cannot fail.
        let _ = match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
                Ok(())
            }
            'd' => write!(out, "{}", dt.format("%d")),
            'D' => write!(out, "{}", dt.format("%a")),
            'j' => write!(out, "{}", dt.day()),
            'l' => write!(out, "{}", dt.format("%A")),
            'N' => write!(out, "{}", dt.weekday().number_from_monday()),
            'S' => write!(out, "{}", ordinal_suffix(dt.day())),
            'w' => write!(out, "{}", dt.weekday().num_days_from_sunday()),
            'z' => write!(out, "{}", dt.ordinal0()),
            'W' => write!(out, "{:02}", dt.iso_week().week()),
            'F' => write!(out, "{}", dt.format("%B")),
            'm' => write!(out, "{}", dt.format("%m")),
            'M' => write!(out, "{}", dt.format("%b")),
            'n' => write!(out, "{}", dt.month()),
            't' => write!(out, "{}", days_in_month(dt.year(), dt.month())),
            'L' => write!(out, "{}", u8::from(is_leap(dt.year()))),
            'o' => write!(out, "{}", dt.iso_week().year()),
            'Y' => write!(out, "{}", dt.year()),
            'y' => write!(out, "{}", dt.format("%y")),
            'a' => write!(out, "{}", if dt.hour() < 12 { "am" } else { "pm" }),
            'A' => write!(out, "{}", if dt.hour() < 12 { "AM" } else { "PM" }),
            'g' => write!(out, "{}", dt.hour12().1),
            'G' => write!(out, "{}", dt.hour()),
            'h' => write!(out, "{:02}", dt.hour12().1),
            'H' => write!(out, "{}", dt.format("%H")),
            'i' => write!(out, "{}", dt.format("%M")),
            's' => write!(out, "{}", dt.format("%S")),
            'u' => write!(out, "{:06}", dt.timestamp_subsec_micros()),
            'v' => write!(out, "{:03}", dt.timestamp_subsec_millis()),
            'e' | 'T' => write!(out, "UTC"),
            'P' => write!(out, "+00:00"),
            'O' => write!(out, "+0000"),
            'Z' => write!(out, "0"),
            'I' => write!(out, "0"),
            'c' => write!(out, "{}", dt.format("%Y-%m-%dT%H:%M:%S+00:00")),
            'r' => write!(out, "{}", dt.format("%a, %d %b %Y %H:%M:%S +0000")),
            'U' => write!(out, "{}", dt.timestamp()),
            other => {
                out.push(other);
                Ok(())
            }
        };
    }
    out
}

/// Parses the date shapes stored values come in: unix timestamps, RFC 3339,
/// RFC 2822, `Y-m-d H:i:s` and `Y-m-d`.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(secs) = text.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn is_leap(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}
