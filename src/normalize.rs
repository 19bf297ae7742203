// 🧹 Field Normalizer - Text, times, days and yes/no flags
// Every function here is total: bad input degrades to "" / Unknown / verbatim text.

use crate::sheet::{time_from_day_fraction, CellValue};
use chrono::{NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

// ============================================================================
// TEXT
// ============================================================================

/// Missing → "", otherwise the trimmed text form
pub fn clean_text(value: &CellValue) -> String {
    if value.is_missing() {
        return String::new();
    }
    value.to_text().trim().to_string()
}

/// `clean_text` plus removal of control characters and curly quotes,
/// for values that end up inside JSON consumed by the front end
pub fn clean_json_text(value: &CellValue) -> String {
    sanitize_json_str(&clean_text(value))
}

pub fn sanitize_json_str(text: &str) -> String {
    text.chars()
        .filter(|c| !is_stripped_control(*c))
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1F}' | '\u{7F}'..='\u{9F}')
}

// ============================================================================
// TIMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// "09:00:00"
    TwentyFourHour,
    /// "9:00 AM"
    TwelveHour,
}

/// A start or end time as read from a sheet.
///
/// Parseable values are kept as a clock time so either display format can be
/// derived later; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotTime {
    Clock(NaiveTime),
    Text(String),
}

const TEXT_TIME_FORMATS: &[&str] = &[
    "%H:%M:%S",
    "%H:%M",
    "%I:%M:%S %p",
    "%I:%M %p",
    "%I:%M%p",
];

const TEXT_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

impl SlotTime {
    /// None for missing cells
    pub fn from_cell(value: &CellValue) -> Option<SlotTime> {
        if value.is_missing() {
            return None;
        }
        match value {
            CellValue::Time(t) => Some(SlotTime::Clock(*t)),
            CellValue::DateTime(dt) => Some(SlotTime::Clock(dt.time())),
            CellValue::Number(n) => match time_from_day_fraction(*n) {
                Some(t) => Some(SlotTime::Clock(t)),
                None => Some(SlotTime::Text(value.to_text())),
            },
            _ => {
                let text = clean_text(value);
                Some(match parse_time_text(&text) {
                    Some(t) => SlotTime::Clock(t),
                    None => SlotTime::Text(text),
                })
            }
        }
    }

    pub fn render(&self, format: TimeFormat) -> String {
        match self {
            SlotTime::Clock(t) => match format {
                TimeFormat::TwentyFourHour => t.format("%H:%M:%S").to_string(),
                TimeFormat::TwelveHour => t.format("%-I:%M %p").to_string(),
            },
            SlotTime::Text(s) => s.clone(),
        }
    }
}

/// Best-effort parse of "14:30", "2:30 PM", "2:30pm", "2 p.m.", "2024-01-01 14:30:00"
pub fn parse_time_text(text: &str) -> Option<NaiveTime> {
    let normalized = text.trim().to_uppercase().replace('.', "");
    if normalized.is_empty() {
        return None;
    }

    for format in TEXT_TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(&normalized, format) {
            return Some(t);
        }
    }

    for format in TEXT_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(dt.time());
        }
    }

    // "9 AM" / "9AM": chrono needs a minute field
    let (hour_part, meridiem) = if let Some(h) = normalized.strip_suffix("AM") {
        (h.trim(), "AM")
    } else if let Some(h) = normalized.strip_suffix("PM") {
        (h.trim(), "PM")
    } else {
        return None;
    };
    if hour_part.is_empty() || !hour_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveTime::parse_from_str(&format!("{}:00 {}", hour_part, meridiem), "%I:%M %p").ok()
}

/// Render a time cell in the requested format; unparseable text comes back verbatim
pub fn format_time(value: &CellValue, format: TimeFormat) -> String {
    SlotTime::from_cell(value)
        .map(|t| t.render(format))
        .unwrap_or_default()
}

// ============================================================================
// YES / NO FLAGS
// ============================================================================

/// Appointment requirement. Variant order is the merge order:
/// Unknown < No < Yes, and a merged flag never moves down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum AppointmentFlag {
    #[default]
    Unknown,
    No,
    Yes,
}

impl AppointmentFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentFlag::Unknown => "Unknown",
            AppointmentFlag::No => "No",
            AppointmentFlag::Yes => "Yes",
        }
    }

    pub fn join(self, other: AppointmentFlag) -> AppointmentFlag {
        self.max(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Only an explicit yes counts; everything else is No
    TwoState,
    /// Explicit yes / explicit no / Unknown
    ThreeState,
}

const YES_TOKENS: &[&str] = &["yes", "true", "1", "required", "y", "by appointment only"];
const NO_TOKENS: &[&str] = &["no", "false", "0", "not required", "n"];

pub fn normalize_flag(value: &CellValue, kind: FlagKind) -> AppointmentFlag {
    let detected = match value {
        CellValue::Bool(true) => Some(AppointmentFlag::Yes),
        CellValue::Bool(false) => Some(AppointmentFlag::No),
        other if other.is_missing() => None,
        other => {
            let token = clean_text(other).to_lowercase();
            if YES_TOKENS.contains(&token.as_str()) {
                Some(AppointmentFlag::Yes)
            } else if NO_TOKENS.contains(&token.as_str()) {
                Some(AppointmentFlag::No)
            } else {
                None
            }
        }
    };

    match (kind, detected) {
        (_, Some(AppointmentFlag::Yes)) => AppointmentFlag::Yes,
        (FlagKind::TwoState, _) => AppointmentFlag::No,
        (FlagKind::ThreeState, Some(flag)) => flag,
        (FlagKind::ThreeState, None) => AppointmentFlag::Unknown,
    }
}

// ============================================================================
// DAYS
// ============================================================================

/// Full names first, then abbreviations; the first substring hit wins
const DAY_TABLE: [(&str, Weekday); 14] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
    ("mon", Weekday::Mon),
    ("tue", Weekday::Tue),
    ("wed", Weekday::Wed),
    ("thu", Weekday::Thu),
    ("fri", Weekday::Fri),
    ("sat", Weekday::Sat),
    ("sun", Weekday::Sun),
];

/// Ordinal given to day labels that name no weekday
pub const UNKNOWN_DAY_ORDINAL: u32 = 999;

pub fn match_day(text: &str) -> Option<Weekday> {
    let lower = text.to_lowercase();
    DAY_TABLE
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, day)| *day)
}

/// Canonical lowercase key ("monday")
pub fn day_key(day: Weekday) -> &'static str {
    DAY_TABLE[day.num_days_from_monday() as usize].0
}

/// Display name ("Monday")
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// ISO ordinal (Monday = 1), 999 when the label names no weekday
pub fn day_ordinal(label: &str) -> u32 {
    match_day(label)
        .map(|d| d.number_from_monday())
        .unwrap_or(UNKNOWN_DAY_ORDINAL)
}

// ============================================================================
// TESTS
// ============================================================================
