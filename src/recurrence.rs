use chrono::{Datelike, Days, Local, Months, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::models::{Quest, RecurrencePattern, RecurrenceType, Status};

/// Number of occurrences generated when the caller has no preference.
pub const DEFAULT_MAX_OCCURRENCES: usize = 10;

/// Hard ceiling on a single generation run, whatever the caller asks for.
pub const MAX_OCCURRENCES_CEILING: usize = 100;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One generated due date of a recurring quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub due_date: NaiveDate,
    /// 1-based position in the generated sequence.
    pub instance_number: u32,
}

/// Generates the next due dates of a recurring base quest.
///
/// The cursor starts at `from` and moves forward to every accepted date, so
/// `from` itself is never part of the result. Generation stops at
/// `max_occurrences` (clamped to [`MAX_OCCURRENCES_CEILING`]), at the
/// pattern's end date (exclusive) or once the instance number would exceed
/// the pattern's own `max_occurrences`.
///
/// A quest that is not recurring, or has no pattern, yields nothing.
///
/// Monthly steps use chrono's `checked_add_months`, which clamps to the last
/// day of a shorter month: Jan 31 + 1 month is Feb 28 (Feb 29 in leap years).
/// The clamped day then carries forward to later occurrences.
pub fn generate_next_occurrences(base: &Quest, from: NaiveDate, max_occurrences: usize) -> Vec<Occurrence> {
    let pattern = match &base.recurrence_pattern {
        Some(p) if base.is_recurring => p,
        _ => return Vec::new(),
    };
    if pattern.interval == 0 {
        warn!(quest = base.id, "recurrence interval is 0, nothing generated");
        return Vec::new();
    }

    let limit = max_occurrences.min(MAX_OCCURRENCES_CEILING);
    let mut occurrences = Vec::with_capacity(limit);
    let mut current = from;
    let mut instance_number: u32 = 1;

    while occurrences.len() < limit
        && pattern.end_date.map_or(true, |end| current < end)
        && pattern.max_occurrences.map_or(true, |max| instance_number <= max)
    {
        let Some(next) = next_date(current, pattern) else {
            break;
        };
        if pattern.end_date.is_some_and(|end| next >= end) {
            break;
        }
        occurrences.push(Occurrence { due_date: next, instance_number });
        current = next;
        instance_number += 1;
    }

    debug!(quest = base.id, %from, count = occurrences.len(), "generated occurrences");
    occurrences
}

/// Date following `current` according to `pattern`.
///
/// `None` only if the result would overflow chrono's date range.
fn next_date(current: NaiveDate, pattern: &RecurrencePattern) -> Option<NaiveDate> {
    let interval = pattern.interval;
    match pattern.kind {
        RecurrenceType::Daily => current.checked_add_days(Days::new(u64::from(interval))),
        RecurrenceType::Weekly => {
            let days = pattern.selected_days();
            if days.is_empty() {
                current.checked_add_days(Days::new(7 * u64::from(interval)))
            } else {
                next_weekly_occurrence(current, &days, interval)
            }
        }
        RecurrenceType::Monthly => current.checked_add_months(Months::new(interval)),
    }
}

/// Next selected weekday after `current`.
///
/// Stays in the current week when a later selected day exists, otherwise
/// jumps to the first selected day `interval` weeks ahead.
fn next_weekly_occurrence(current: NaiveDate, days: &[u32], interval: u32) -> Option<NaiveDate> {
    let weekday = current.weekday().num_days_from_sunday();
    let offset = match days.iter().find(|d| **d > weekday) {
        Some(day) => day - weekday,
        None => (7 - weekday) + (interval - 1) * 7 + days[0],
    };
    current.checked_add_days(Days::new(u64::from(offset)))
}

/// Builds a concrete, non-recurring quest for one occurrence of `base`.
///
/// The result has placeholder id `0`; the store assigns the real id on insert.
pub fn create_recurring_quest_instance(base: &Quest, due_date: NaiveDate, instance_number: u32) -> Quest {
    Quest {
        id: 0,
        title: format!("{} (#{})", base.title, instance_number),
        description: base.description.clone(),
        priority: base.priority,
        category: base.category,
        status: Status::Active,
        due_date: Some(due_date),
        created_at: Utc::now(),
        completed_at: None,
        xp_reward: base.xp_reward,
        tags: base.tags.clone(),
        estimated_minutes: base.estimated_minutes,
        is_recurring: false,
        recurrence_pattern: None,
        sync_to_calendar: base.sync_to_calendar,
        calendar_event_id: None,
        assigned_to: base.assigned_to.clone(),
        created_by: base.created_by.clone(),
    }
}

/// Checks a pattern against today's date. See [`validate_recurrence_pattern_on`].
pub fn validate_recurrence_pattern(pattern: &RecurrencePattern) -> Vec<String> {
    validate_recurrence_pattern_on(pattern, Local::now().date_naive())
}

/// Returns every rule `pattern` breaks, as human-readable messages.
///
/// An empty list means the pattern is valid.
pub fn validate_recurrence_pattern_on(pattern: &RecurrencePattern, today: NaiveDate) -> Vec<String> {
    let mut errors = Vec::new();

    if pattern.interval < 1 {
        errors.push("Interval must be at least 1".to_string());
    }

    if pattern.kind == RecurrenceType::Weekly {
        if let Some(days) = &pattern.days_of_week {
            if days.iter().any(|d| !(0..=6).contains(d)) {
                errors.push("Days of week must be between 0 (Sunday) and 6 (Saturday)".to_string());
            }
        }
    }

    if pattern.end_date.is_some_and(|end| end <= today) {
        errors.push("End date must be in the future".to_string());
    }

    if pattern.max_occurrences.is_some_and(|max| max < 1) {
        errors.push("Maximum occurrences must be at least 1".to_string());
    }

    errors
}

/// Short English description, e.g. `"Weekly on Mon, Wed until Dec 31, 2025"`.
pub fn recurrence_description(pattern: &RecurrencePattern) -> String {
    let interval = pattern.interval;
    let mut description = match pattern.kind {
        RecurrenceType::Daily if interval == 1 => "Daily".to_string(),
        RecurrenceType::Daily => format!("Every {} days", interval),
        RecurrenceType::Weekly => {
            let days = pattern.selected_days();
            let base = if interval == 1 {
                "Weekly".to_string()
            } else {
                format!("Every {} weeks", interval)
            };
            if days.is_empty() {
                base
            } else {
                let names: Vec<&str> = days.iter().map(|d| DAY_NAMES[*d as usize]).collect();
                format!("{} on {}", base, names.join(", "))
            }
        }
        RecurrenceType::Monthly if interval == 1 => "Monthly".to_string(),
        RecurrenceType::Monthly => format!("Every {} months", interval),
    };

    if let Some(end) = pattern.end_date {
        description.push_str(&format!(" until {}", end.format("%b %d, %Y")));
    }

    description
}
