//! Calendar sync: turning quests into calendar events and keeping them in a
//! calendar provider.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ics::parameters::TzIDParam;
use ics::properties::{Description, DtEnd, DtStart, RRule, Summary};
use ics::{escape_text, Event, ICalendar};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CalendarSettings;
use crate::error::{Error, Result};
use crate::models::{Quest, RecurrencePattern, RecurrenceType};
use crate::storage::{read_json, write_json, Store};

pub const CALENDAR_FILE: &str = "calendar.json";

const PRODUCT_ID: &str = "-//questhub//Quest Hub//EN";
const ICAL_BYDAY: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

/// A timed calendar event, in the shape calendar APIs expect: local start and
/// end times plus the time zone they are expressed in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub summary: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub time_zone: String,
    /// `RRULE:` lines for repeating events.
    #[serde(default)]
    pub recurrence: Vec<String>,
}

/// Builds a one hour event for `quest` on `due`.
pub fn quest_to_calendar_event(quest: &Quest, due: NaiveDate, settings: &CalendarSettings) -> Result<CalendarEvent> {
    let time = NaiveTime::from_hms_opt(settings.event_hour, 0, 0).ok_or_else(|| Error::InvalidValue {
        field: "event hour",
        value: settings.event_hour.to_string(),
    })?;
    let start = due.and_time(time);

    Ok(CalendarEvent {
        id: None,
        summary: format!("🎯 {}", quest.title),
        description: format!(
            "{}\n\nCategory: {}\nPriority: {}\nXP Reward: {}\n\nFrom Quest Hub",
            quest.description.as_deref().unwrap_or(""),
            quest.category,
            quest.priority,
            quest.xp_reward
        ),
        start,
        end: start + Duration::hours(1),
        time_zone: settings.time_zone.clone(),
        recurrence: Vec::new(),
    })
}

/// RFC 5545 recurrence lines for a pattern, e.g.
/// `RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=SU,SA`.
pub fn recurrence_rule(pattern: &RecurrencePattern) -> Vec<String> {
    let freq = match pattern.kind {
        RecurrenceType::Daily => "DAILY",
        RecurrenceType::Weekly => "WEEKLY",
        RecurrenceType::Monthly => "MONTHLY",
    };
    let mut rule = format!("RRULE:FREQ={};INTERVAL={}", freq, pattern.interval.max(1));

    let days = pattern.selected_days();
    if !days.is_empty() {
        let names: Vec<&str> = days.iter().map(|d| ICAL_BYDAY[*d as usize]).collect();
        rule.push_str(&format!(";BYDAY={}", names.join(",")));
    }

    if let Some(end) = pattern.end_date {
        rule.push_str(&format!(";UNTIL={}", end.format("%Y%m%dT000000Z")));
    }

    vec![rule]
}

/// Somewhere quest events can be pushed to.
pub trait CalendarProvider {
    /// Stores the event and returns its new id.
    fn create_event(&mut self, event: &CalendarEvent) -> Result<String>;

    fn delete_event(&mut self, event_id: &str) -> Result<()>;

    /// Events starting on a day within `from..=to`, sorted by start.
    fn events_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEvent>>;
}

/// Calendar kept next to the quests in `calendar.json`.
#[derive(Debug)]
pub struct LocalCalendar {
    path: PathBuf,
    events: Vec<CalendarEvent>,
}

impl LocalCalendar {
    pub fn open(store: &Store) -> Result<LocalCalendar> {
        let path = store.path(CALENDAR_FILE);
        let events = read_json(&path)?.unwrap_or_default();
        Ok(LocalCalendar { path, events })
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    fn persist(&self) -> Result<()> {
        write_json(&self.path, &self.events)
    }

    /// Renders every event as an iCalendar document.
    pub fn to_ics(&self) -> String {
        let dtstamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let mut calendar = ICalendar::new("2.0", PRODUCT_ID);
        for e in &self.events {
            let uid = e.id.clone().unwrap_or_default();
            let mut event = Event::new(uid, dtstamp.clone());
            event.push(Summary::new(escape_text(e.summary.clone())));
            event.push(Description::new(escape_text(e.description.clone())));

            let mut start = DtStart::new(format_local(&e.start));
            let mut end = DtEnd::new(format_local(&e.end));
            start.add(TzIDParam::new(e.time_zone.clone()));
            end.add(TzIDParam::new(e.time_zone.clone()));
            event.push(start);
            event.push(end);

            for line in &e.recurrence {
                let rule = line.strip_prefix("RRULE:").unwrap_or(line);
                event.push(RRule::new(rule.to_string()));
            }
            calendar.add_event(event);
        }
        calendar.to_string()
    }

    pub fn export_ics(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_ics())?;
        Ok(())
    }
}

fn format_local(dt: &NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

impl CalendarProvider for LocalCalendar {
    fn create_event(&mut self, event: &CalendarEvent) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut stored = event.clone();
        stored.id = Some(id.clone());
        self.events.push(stored);
        self.persist()?;
        info!(event = %id, summary = %event.summary, "created calendar event");
        Ok(id)
    }

    fn delete_event(&mut self, event_id: &str) -> Result<()> {
        let before = self.events.len();
        self.events.retain(|e| e.id.as_deref() != Some(event_id));
        if self.events.len() == before {
            return Err(Error::Calendar(format!("event {} not found", event_id)));
        }
        self.persist()?;
        info!(event = %event_id, "deleted calendar event");
        Ok(())
    }

    fn events_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEvent>> {
        let mut events: Vec<CalendarEvent> = self
            .events
            .iter()
            .filter(|e| (from..=to).contains(&e.start.date()))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }
}
