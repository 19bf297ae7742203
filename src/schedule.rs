// 🗓️ Schedules - Weekly hours and the compressed display string
//
// Hours are stored structured (day → ordered time slots) and rendered at the
// output boundary, either as {start, end} pairs or as a single line such as
// "Monday–Wednesday, Friday: 9:00 AM to 5:00 PM".

use crate::normalize::{day_name, match_day, SlotTime, TimeFormat, UNKNOWN_DAY_ORDINAL};
use chrono::Weekday;
use std::collections::BTreeMap;

// ============================================================================
// TIME SLOT
// ============================================================================

/// Start/end pair. Equality is exact equality of the normalized values;
/// overlapping slots are not merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    pub start: SlotTime,
    pub end: SlotTime,
}

impl TimeSlot {
    pub fn new(start: SlotTime, end: SlotTime) -> Self {
        TimeSlot { start, end }
    }

    /// "9:00 AM to 5:00 PM" style text with a caller-chosen separator
    pub fn render(&self, format: TimeFormat, separator: &str) -> String {
        format!(
            "{}{}{}",
            self.start.render(format),
            separator,
            self.end.render(format)
        )
    }
}

// ============================================================================
// DAY LABEL
// ============================================================================

/// A day as written in the source, ordered by ISO weekday, then the plain
/// name ahead of qualified labels, then text.
///
/// Plain day names and abbreviations ("mon", "MONDAY") collapse to the display
/// name; qualified labels ("1st Saturday of month") are kept as written but
/// still sort with their weekday.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayLabel {
    ordinal: u32,
    qualified: bool,
    label: String,
}

impl DayLabel {
    pub fn new(text: &str) -> Self {
        let text = text.trim();
        let lower = text.to_lowercase();
        match match_day(text) {
            Some(day) => {
                let name = day_name(day);
                let plain = lower == name.to_lowercase() || lower == name[..3].to_lowercase();
                DayLabel {
                    ordinal: day.number_from_monday(),
                    qualified: !plain,
                    label: if plain { name.to_string() } else { text.to_string() },
                }
            }
            None => DayLabel {
                ordinal: UNKNOWN_DAY_ORDINAL,
                qualified: true,
                label: text.to_string(),
            },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn weekday(&self) -> Option<Weekday> {
        match_day(&self.label)
    }
}

// ============================================================================
// WEEKLY HOURS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyHours {
    days: BTreeMap<DayLabel, Vec<TimeSlot>>,
}

impl WeeklyHours {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the exact slot is already recorded for that day
    pub fn add_slot(&mut self, day: DayLabel, slot: TimeSlot) -> bool {
        let slots = self.days.entry(day).or_default();
        if slots.contains(&slot) {
            return false;
        }
        slots.push(slot);
        true
    }

    /// Union with another schedule; existing slot order is kept
    pub fn absorb(&mut self, other: &WeeklyHours) {
        for (day, slots) in &other.days {
            for slot in slots {
                self.add_slot(day.clone(), slot.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// Days in weekday order
    pub fn iter(&self) -> impl Iterator<Item = (&DayLabel, &[TimeSlot])> {
        self.days.iter().map(|(day, slots)| (day, slots.as_slice()))
    }

    pub fn slots_for(&self, label: &str) -> &[TimeSlot] {
        self.days
            .get(&DayLabel::new(label))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Single-line display form, 12-hour clock
    pub fn to_display(&self) -> String {
        let days: Vec<(String, Vec<String>)> = self
            .iter()
            .map(|(day, slots)| {
                let texts = slots
                    .iter()
                    .map(|s| s.render(TimeFormat::TwelveHour, " to "))
                    .collect();
                (day.label().to_string(), texts)
            })
            .collect();
        format_schedule(&days)
    }
}

// ============================================================================
// SCHEDULE FORMATTER
// ============================================================================

/// Collapse day → slot texts into "Monday–Wednesday, Friday: 9:00 AM to 5:00 PM".
///
/// Days with identical (sorted) slot sets share a group; within a group runs
/// of consecutive weekdays become ranges. Groups are joined with "; " in order
/// of their earliest day.
pub fn format_schedule(days: &[(String, Vec<String>)]) -> String {
    // slot text → days carrying exactly that text
    let mut groups: BTreeMap<String, Vec<(DayLabel, &str)>> = BTreeMap::new();

    for (label, slots) in days {
        if slots.is_empty() {
            continue;
        }
        let mut sorted: Vec<&str> = slots.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();
        groups
            .entry(sorted.join(", "))
            .or_default()
            .push((DayLabel::new(label), label.as_str()));
    }

    let mut ordered: Vec<(Vec<(DayLabel, &str)>, String)> = groups
        .into_iter()
        .map(|(times, mut group_days)| {
            group_days.sort();
            (group_days, times)
        })
        .collect();
    ordered.sort_by(|a, b| a.0.first().cmp(&b.0.first()));

    ordered
        .iter()
        .map(|(group_days, times)| format!("{}: {}", compress_days(group_days), times))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Sorted days → "Monday–Wednesday, Friday". Only plain weekdays form ranges.
fn compress_days(days: &[(DayLabel, &str)]) -> String {
    let mut runs: Vec<(&str, &str)> = Vec::new();
    let mut previous: Option<&DayLabel> = None;

    for (day, label) in days {
        let extends = matches!(
            previous,
            Some(p) if !p.qualified && !day.qualified && day.ordinal == p.ordinal + 1
        );
        if extends {
            if let Some(run) = runs.last_mut() {
                run.1 = *label;
            }
        } else {
            runs.push((*label, *label));
        }
        previous = Some(day);
    }

    runs.iter()
        .map(|(first, last)| {
            if first == last {
                first.to_string()
            } else {
                format!("{}–{}", first, last)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn clock(h: u32, m: u32) -> SlotTime {
        SlotTime::Clock(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn day(label: &str, times: &[&str]) -> (String, Vec<String>) {
        (
            label.to_string(),
            times.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[test]
    fn test_compresses_consecutive_days() {
        let days = vec![
            day("Friday", &["9:00 AM to 5:00 PM"]),
            day("Monday", &["9:00 AM to 5:00 PM"]),
            day("Wednesday", &["9:00 AM to 5:00 PM"]),
            day("Tuesday", &["9:00 AM to 5:00 PM"]),
        ];
        assert_eq!(
            format_schedule(&days),
            "Monday–Wednesday, Friday: 9:00 AM to 5:00 PM"
        );
    }

    #[test]
    fn test_separate_time_groups() {
        let days = vec![
            day("Saturday", &["10:00 AM to 12:00 PM"]),
            day("Monday", &["9:00 AM to 5:00 PM"]),
            day("Tuesday", &["9:00 AM to 5:00 PM"]),
        ];
        assert_eq!(
            format_schedule(&days),
            "Monday–Tuesday: 9:00 AM to 5:00 PM; Saturday: 10:00 AM to 12:00 PM"
        );
    }

    #[test]
    fn test_multiple_slots_group_by_exact_set() {
        let days = vec![
            day("Monday", &["5:00 PM to 7:00 PM", "10:00 AM to 12:00 PM"]),
            day("Tuesday", &["10:00 AM to 12:00 PM", "5:00 PM to 7:00 PM"]),
            day("Wednesday", &["10:00 AM to 12:00 PM"]),
        ];
        assert_eq!(
            format_schedule(&days),
            "Monday–Tuesday: 10:00 AM to 12:00 PM, 5:00 PM to 7:00 PM; Wednesday: 10:00 AM to 12:00 PM"
        );
    }

    #[test]
    fn test_unknown_days_sort_last_and_never_range() {
        let days = vec![
            day("Holidays", &["9:00 AM to 1:00 PM"]),
            day("By request", &["9:00 AM to 1:00 PM"]),
            day("Sunday", &["9:00 AM to 1:00 PM"]),
        ];
        assert_eq!(
            format_schedule(&days),
            "Sunday, By request, Holidays: 9:00 AM to 1:00 PM"
        );
    }

    #[test]
    fn test_plain_day_sorts_before_qualified_labels() {
        let days = vec![
            day("1st Monday", &["9:00 AM to 1:00 PM"]),
            day("Tuesday", &["9:00 AM to 1:00 PM"]),
            day("Monday", &["9:00 AM to 1:00 PM"]),
            day("Holidays", &["9:00 AM to 1:00 PM"]),
        ];
        assert_eq!(
            format_schedule(&days),
            "Monday, 1st Monday, Tuesday, Holidays: 9:00 AM to 1:00 PM"
        );
        assert!(DayLabel::new("Monday") < DayLabel::new("1st Monday"));
        assert!(DayLabel::new("1st Monday") < DayLabel::new("Tuesday"));
    }

    #[test]
    fn test_empty_schedule() {
        assert_eq!(format_schedule(&[]), "");
        assert_eq!(WeeklyHours::new().to_display(), "");
    }

    #[test]
    fn test_day_label_canonicalizes_plain_names() {
        assert_eq!(DayLabel::new("mon").label(), "Monday");
        assert_eq!(DayLabel::new(" FRIDAY ").label(), "Friday");
        let qualified = DayLabel::new("1st Saturday of month");
        assert_eq!(qualified.label(), "1st Saturday of month");
        assert_eq!(qualified.ordinal(), 6);
        assert_eq!(DayLabel::new("Daily").ordinal(), UNKNOWN_DAY_ORDINAL);
    }

    #[test]
    fn test_add_slot_dedups_exact_values() {
        let mut hours = WeeklyHours::new();
        let slot = TimeSlot::new(clock(9, 0), clock(12, 0));
        assert!(hours.add_slot(DayLabel::new("Monday"), slot.clone()));
        assert!(!hours.add_slot(DayLabel::new("Mon"), slot));
        assert!(hours.add_slot(
            DayLabel::new("Monday"),
            TimeSlot::new(clock(13, 0), clock(15, 0))
        ));
        assert_eq!(hours.slots_for("Monday").len(), 2);
    }

    #[test]
    fn test_weekly_hours_display() {
        let mut hours = WeeklyHours::new();
        for label in ["Thursday", "Tuesday", "Wednesday"] {
            hours.add_slot(
                DayLabel::new(label),
                TimeSlot::new(clock(9, 0), clock(17, 0)),
            );
        }
        assert_eq!(hours.to_display(), "Tuesday–Thursday: 9:00 AM to 5:00 PM");
    }
}
