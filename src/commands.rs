use std::io::{self, Write};
use std::path::Path;

use chrono::{Days, Local, NaiveDate, Utc, Weekday};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tracing::{info, warn};

use crate::calendar::{quest_to_calendar_event, recurrence_rule, CalendarEvent, CalendarProvider, LocalCalendar};
use crate::config::{CalendarSettings, Config};
use crate::error::{Error, Result};
use crate::filters::{summarize, QuestFilters};
use crate::models::{Category, Priority, Quest, RecurrencePattern, Status};
use crate::recurrence::{
    create_recurring_quest_instance, generate_next_occurrences, recurrence_description,
    validate_recurrence_pattern, Occurrence,
};
use crate::stats::{achievement_progress, level_progress, player_stats, PlayerStats};
use crate::storage::Store;

/// Fields for a new quest. Unset fields take the defaults documented on
/// [`Quest::new`].
#[derive(Debug, Clone)]
pub struct QuestInput {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Category,
    pub due: Option<NaiveDate>,
    pub xp: Option<u32>,
    pub tags: Vec<String>,
    pub estimated_minutes: Option<u32>,
    /// Assignee; the current user when `None`.
    pub assign_to: Option<String>,
}

impl QuestInput {
    pub fn new(title: impl Into<String>, priority: Priority, category: Category) -> Self {
        QuestInput {
            title: title.into(),
            description: None,
            priority,
            category,
            due: None,
            xp: None,
            tags: Vec::new(),
            estimated_minutes: None,
            assign_to: None,
        }
    }

    fn into_quest(self, user: &str) -> Quest {
        let mut q = Quest::new(self.title, self.priority, self.category, user);
        q.description = self.description;
        q.due_date = self.due;
        if let Some(xp) = self.xp {
            q.xp_reward = xp;
        }
        q.tags = self.tags;
        q.estimated_minutes = self.estimated_minutes;
        if let Some(assignee) = self.assign_to {
            q.assigned_to = assignee;
        }
        q
    }
}

/// Field changes for `edit`. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct QuestEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due: Option<NaiveDate>,
    pub xp: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub estimated_minutes: Option<u32>,
    pub assign_to: Option<String>,
}

/// Ids produced by [`cmd_add_recurring`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringCreated {
    pub base_id: u64,
    pub instance_ids: Vec<u64>,
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// Parses a comma separated weekday list, either numbers (`0` = Sunday) or
/// names (`mon`, `Wednesday`).
///
/// Out-of-range numbers are kept so the pattern validator can report them.
pub fn parse_days(s: &str) -> Result<Vec<i32>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if let Ok(n) = part.parse::<i32>() {
                return Ok(n);
            }
            part.parse::<Weekday>()
                .map(|w| w.num_days_from_sunday() as i32)
                .map_err(|_| Error::InvalidValue { field: "weekday", value: part.to_string() })
        })
        .collect()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Loads a quest `user` is allowed to modify.
fn load_modifiable(store: &Store, user: &str, id: u64, action: &'static str) -> Result<Quest> {
    let quest = store.load_quest(id)?;
    if !quest.can_modify(user) {
        return Err(Error::Forbidden { user: user.to_string(), action, id });
    }
    Ok(quest)
}

/// Quests created by or assigned to `user`.
pub fn visible_quests(store: &Store, user: &str) -> Result<Vec<Quest>> {
    let mut quests = store.load_quests()?;
    quests.retain(|q| q.can_modify(user));
    Ok(quests)
}

/// Adds a new quest to the store.
pub fn cmd_add(store: &Store, user: &str, input: QuestInput, silent: bool) -> Result<u64> {
    let quest = input.into_quest(user);
    let xp = quest.xp_reward;
    let id = store.insert_quest(quest)?;
    info!(id, user, "quest created");
    if !silent {
        println!("Quest added (id = {}, {} XP)", id, xp);
    }
    Ok(id)
}

/// Creates a recurring base quest and its first instances.
///
/// Instances start after `input.due` (today if unset) and number
/// `config.recurring_instances`. With `sync` set and a calendar available,
/// each instance gets its own event; a failed sync is logged and the
/// instance is kept.
pub fn cmd_add_recurring(
    store: &Store,
    config: &Config,
    calendar: Option<&mut dyn CalendarProvider>,
    input: QuestInput,
    pattern: RecurrencePattern,
    sync: bool,
    silent: bool,
) -> Result<RecurringCreated> {
    let errors = validate_recurrence_pattern(&pattern);
    if !errors.is_empty() {
        return Err(Error::InvalidPattern(errors));
    }

    let start = input.due.unwrap_or_else(today);
    let mut base = input.into_quest(&config.user);
    base.due_date = Some(start);
    base.is_recurring = true;
    base.recurrence_pattern = Some(pattern);
    base.sync_to_calendar = sync;

    let base_id = store.insert_quest(base.clone())?;
    base.id = base_id;

    let occurrences = generate_next_occurrences(&base, start, config.recurring_instances);
    let instances: Vec<Quest> = occurrences
        .iter()
        .map(|o| create_recurring_quest_instance(&base, o.due_date, o.instance_number))
        .collect();
    let instance_ids = store.insert_quests(instances)?;

    if sync {
        match (calendar, &config.calendar) {
            (Some(provider), Some(settings)) => {
                for (id, occurrence) in instance_ids.iter().zip(&occurrences) {
                    if let Err(e) = sync_instance(store, provider, settings, *id, occurrence) {
                        warn!(quest = id, error = %e, "calendar sync failed for instance");
                    }
                }
            }
            _ => warn!(quest = base_id, "calendar sync requested but no calendar is connected"),
        }
    }

    info!(base_id, instances = instance_ids.len(), "recurring quest created");
    if !silent {
        println!(
            "Recurring quest added (id = {}) with {} upcoming instances: {}",
            base_id,
            instance_ids.len(),
            base.recurrence_pattern.as_ref().map(recurrence_description).unwrap_or_default()
        );
    }
    Ok(RecurringCreated { base_id, instance_ids })
}

fn sync_instance(
    store: &Store,
    provider: &mut dyn CalendarProvider,
    settings: &CalendarSettings,
    id: u64,
    occurrence: &Occurrence,
) -> Result<()> {
    let mut quest = store.load_quest(id)?;
    let event = quest_to_calendar_event(&quest, occurrence.due_date, settings)?;
    quest.calendar_event_id = Some(provider.create_event(&event)?);
    store.save_quest(&quest)
}

/// Shows the dates a pattern would generate from `from`, without storing anything.
pub fn cmd_preview(pattern: &RecurrencePattern, from: NaiveDate, count: usize, silent: bool) -> Result<Vec<Occurrence>> {
    let errors = validate_recurrence_pattern(pattern);
    if !errors.is_empty() {
        return Err(Error::InvalidPattern(errors));
    }
    let mut probe = Quest::new("preview", Priority::Low, Category::Personal, "");
    probe.is_recurring = true;
    probe.recurrence_pattern = Some(pattern.clone());
    let occurrences = generate_next_occurrences(&probe, from, count);

    if !silent {
        println!("{}", recurrence_description(pattern));
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["#", "Due", "Day"]);
        for o in &occurrences {
            table.add_row(vec![
                o.instance_number.to_string(),
                o.due_date.to_string(),
                o.due_date.format("%a").to_string(),
            ]);
        }
        println!("{table}");
    }
    Ok(occurrences)
}

/// Lists the user's quests in a table, filtered and sorted.
pub fn cmd_list(store: &Store, user: &str, filters: &QuestFilters, silent: bool) -> Result<Vec<Quest>> {
    let mut quests = visible_quests(store, user)?;
    let today = today();
    let summary = summarize(&quests, today);
    filters.apply(&mut quests);

    if silent {
        return Ok(quests);
    }
    if quests.is_empty() {
        println!("No quests found.");
        return Ok(quests);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("XP").add_attribute(Attribute::Bold),
            Cell::new("Assignee").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for q in &quests {
        let due = match q.due_date {
            Some(d) => {
                let days_left = (d - today).num_days();
                if days_left < 0 {
                    format!("{} ({}d overdue)", d, days_left.abs())
                } else if days_left == 0 {
                    format!("{} (today)", d)
                } else {
                    d.to_string()
                }
            }
            None => "-".to_string(),
        };
        let priority_color = match q.priority {
            Priority::Critical => Color::Red,
            Priority::High => Color::Yellow,
            Priority::Medium => Color::Cyan,
            Priority::Low => Color::Green,
        };
        let status_color = match q.status {
            Status::Completed => Color::Green,
            Status::Paused => Color::Grey,
            Status::Active if q.is_overdue(today) => Color::Red,
            Status::Active => Color::Yellow,
        };
        let title = if q.is_recurring { format!("{} ↻", q.title) } else { q.title.clone() };

        table.add_row(vec![
            Cell::new(q.id),
            Cell::new(title),
            Cell::new(q.category),
            Cell::new(q.priority).fg(priority_color),
            Cell::new(due),
            Cell::new(q.xp_reward),
            Cell::new(&q.assigned_to),
            Cell::new(q.status).fg(status_color),
        ]);
    }

    println!("{table}");
    println!(
        "{} active, {} completed, {} paused, {} overdue",
        summary.active, summary.completed, summary.paused, summary.overdue
    );
    Ok(quests)
}

/// Lists recurring base quests with a description of their pattern.
pub fn cmd_recurring_list(store: &Store, user: &str) -> Result<Vec<Quest>> {
    let mut quests = visible_quests(store, user)?;
    quests.retain(|q| q.is_recurring);
    quests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if quests.is_empty() {
        println!("No recurring quests found.");
        return Ok(quests);
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Title", "Repeats", "Starts", "XP", "Calendar"]);
    for q in &quests {
        table.add_row(vec![
            q.id.to_string(),
            q.title.clone(),
            q.recurrence_pattern.as_ref().map(recurrence_description).unwrap_or_default(),
            q.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            q.xp_reward.to_string(),
            if q.sync_to_calendar { "yes".into() } else { "no".into() },
        ]);
    }
    println!("{table}");
    Ok(quests)
}

/// Marks a quest as completed and returns the XP it awarded.
///
/// Completing an already completed quest changes nothing and awards 0 XP.
pub fn cmd_complete(store: &Store, user: &str, id: u64, silent: bool) -> Result<u32> {
    let mut quest = load_modifiable(store, user, id, "complete")?;
    if quest.is_completed() {
        if !silent { println!("Quest {} is already completed.", id); }
        return Ok(0);
    }

    let today = today();
    let before = player_stats(&store.load_quests()?, &quest.assigned_to, today);
    quest.status = Status::Completed;
    quest.completed_at = Some(Utc::now());
    store.save_quest(&quest)?;
    let after = player_stats(&store.load_quests()?, &quest.assigned_to, today);

    info!(id, xp = quest.xp_reward, assignee = %quest.assigned_to, "quest completed");
    if !silent {
        println!("Quest {} completed! +{} XP for {}", id, quest.xp_reward, quest.assigned_to);
        if after.level > before.level {
            println!("Level up! {} reached level {}", quest.assigned_to, after.level);
        }
    }
    Ok(quest.xp_reward)
}

/// Moves a completed quest back to active. Its XP no longer counts.
pub fn cmd_reopen(store: &Store, user: &str, id: u64, silent: bool) -> Result<()> {
    let mut quest = load_modifiable(store, user, id, "reopen")?;
    if !quest.is_completed() {
        return Err(Error::InvalidTransition { id, from: quest.status, to: Status::Active });
    }
    quest.status = Status::Active;
    quest.completed_at = None;
    store.save_quest(&quest)?;
    if !silent { println!("Quest {} reopened.", id); }
    Ok(())
}

/// Pauses an active quest, or resumes a paused one.
pub fn cmd_set_paused(store: &Store, user: &str, id: u64, paused: bool, silent: bool) -> Result<()> {
    let mut quest = load_modifiable(store, user, id, if paused { "pause" } else { "resume" })?;
    let (from, to) = if paused {
        (Status::Active, Status::Paused)
    } else {
        (Status::Paused, Status::Active)
    };
    if quest.status != from {
        return Err(Error::InvalidTransition { id, from: quest.status, to });
    }
    quest.status = to;
    store.save_quest(&quest)?;
    if !silent { println!("Quest {} is now {}.", id, to); }
    Ok(())
}

/// Edits an existing quest's details.
pub fn cmd_edit(store: &Store, user: &str, id: u64, edit: QuestEdit, silent: bool) -> Result<()> {
    let mut q = load_modifiable(store, user, id, "edit")?;
    if let Some(t) = edit.title { q.title = t; }
    if let Some(d) = edit.description { q.description = Some(d); }
    if let Some(p) = edit.priority { q.priority = p; }
    if let Some(c) = edit.category { q.category = c; }
    if let Some(d) = edit.due { q.due_date = Some(d); }
    if let Some(xp) = edit.xp { q.xp_reward = xp; }
    if let Some(tags) = edit.tags { q.tags = tags; }
    if let Some(m) = edit.estimated_minutes { q.estimated_minutes = Some(m); }
    if let Some(a) = edit.assign_to { q.assigned_to = a; }
    store.save_quest(&q)?;
    if !silent { println!("Quest {} updated.", id); }
    Ok(())
}

/// Removes a quest. Only its creator may do so.
///
/// A linked calendar event is deleted too when a calendar is available.
pub fn cmd_remove(store: &Store, calendar: Option<&mut dyn CalendarProvider>, user: &str, id: u64, silent: bool) -> Result<()> {
    let quest = store.load_quest(id)?;
    if !quest.can_delete(user) {
        return Err(Error::Forbidden { user: user.to_string(), action: "delete", id });
    }
    if let (Some(event_id), Some(provider)) = (&quest.calendar_event_id, calendar) {
        if let Err(e) = provider.delete_event(event_id) {
            warn!(quest = id, error = %e, "could not delete calendar event");
        }
    }
    store.remove_quest(id)?;
    if !silent { println!("Quest {} removed.", id); }
    Ok(())
}

/// Prints and returns the user's stats.
pub fn cmd_stats(store: &Store, user: &str, silent: bool) -> Result<PlayerStats> {
    let stats = player_stats(&store.load_quests()?, user, today());
    if !silent {
        let progress = level_progress(stats.total_xp);
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec![
            Cell::new(format!("{} - Level {} {}", user, progress.level, progress.title)).add_attribute(Attribute::Bold),
            Cell::new(""),
        ]);
        table.add_row(vec!["Total XP".to_string(), stats.total_xp.to_string()]);
        table.add_row(vec![
            format!("Progress to level {}", progress.level + 1),
            format!("{}/100 XP ({} to go)", progress.xp_in_level, progress.xp_to_next_level),
        ]);
        table.add_row(vec!["Quests completed".to_string(), stats.quests_completed.to_string()]);
        table.add_row(vec!["Quests created".to_string(), stats.total_quests_created.to_string()]);
        table.add_row(vec!["Current streak".to_string(), format!("{} days", stats.current_streak)]);
        table.add_row(vec!["Longest streak".to_string(), format!("{} days", stats.longest_streak)]);
        table.add_row(vec!["Early completions".to_string(), stats.early_completions.to_string()]);
        println!("{table}");
    }
    Ok(stats)
}

/// Prints every achievement with the user's progress. Returns the unlocked count.
pub fn cmd_achievements(store: &Store, user: &str, unlocked_only: bool, silent: bool) -> Result<usize> {
    let stats = player_stats(&store.load_quests()?, user, today());
    let progress = achievement_progress(&stats);
    let unlocked = progress.iter().filter(|p| p.unlocked()).count();
    if silent {
        return Ok(unlocked);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Achievement", "Description", "Bonus XP", "Progress"]);
    for p in progress.iter().filter(|p| !unlocked_only || p.unlocked()) {
        let status = if p.unlocked() {
            Cell::new("Unlocked").fg(Color::Green)
        } else {
            Cell::new(format!("{:.0}%", p.progress * 100.0)).fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(p.achievement.title),
            Cell::new(p.achievement.description),
            Cell::new(p.achievement.xp_reward),
            status,
        ]);
    }
    println!("{table}");
    println!("{} of {} achievements unlocked", unlocked, progress.len());
    Ok(unlocked)
}

/// Connects the local calendar by writing calendar settings to the config.
pub fn cmd_calendar_connect(store: &Store, config: &mut Config, settings: CalendarSettings, silent: bool) -> Result<()> {
    config.calendar = Some(settings);
    config.save(store.dir())?;
    if !silent { println!("Calendar connected."); }
    Ok(())
}

pub fn cmd_calendar_disconnect(store: &Store, config: &mut Config, silent: bool) -> Result<()> {
    config.calendar = None;
    config.save(store.dir())?;
    if !silent { println!("Calendar disconnected."); }
    Ok(())
}

pub fn cmd_calendar_status(config: &Config) {
    match &config.calendar {
        Some(s) => println!("Calendar connected (time zone {}, events at {:02}:00).", s.time_zone, s.event_hour),
        None => println!("Calendar not connected."),
    }
}

/// Pushes a quest to the calendar and stores the event id on it.
///
/// A recurring base quest becomes one repeating event.
pub fn cmd_calendar_sync(
    store: &Store,
    calendar: &mut dyn CalendarProvider,
    config: &Config,
    id: u64,
    silent: bool,
) -> Result<String> {
    let settings = config.calendar.as_ref().ok_or(Error::CalendarNotConnected)?;
    let mut quest = load_modifiable(store, &config.user, id, "sync")?;
    let due = quest.due_date.ok_or(Error::MissingDueDate(id))?;

    let mut event = quest_to_calendar_event(&quest, due, settings)?;
    if let (true, Some(pattern)) = (quest.is_recurring, &quest.recurrence_pattern) {
        event.recurrence = recurrence_rule(pattern);
    }
    let event_id = calendar.create_event(&event)?;

    quest.calendar_event_id = Some(event_id.clone());
    quest.sync_to_calendar = true;
    store.save_quest(&quest)?;
    if !silent { println!("Quest {} synced to calendar (event {}).", id, event_id); }
    Ok(event_id)
}

/// Removes a quest's calendar event and forgets its id.
///
/// A failed deletion is logged and ignored; the event may already be gone.
pub fn cmd_calendar_unsync(
    store: &Store,
    calendar: Option<&mut dyn CalendarProvider>,
    user: &str,
    id: u64,
    silent: bool,
) -> Result<()> {
    let mut quest = load_modifiable(store, user, id, "unsync")?;
    if let Some(event_id) = quest.calendar_event_id.take() {
        if let Some(provider) = calendar {
            if let Err(e) = provider.delete_event(&event_id) {
                warn!(quest = id, error = %e, "could not delete calendar event");
            }
        }
    }
    quest.sync_to_calendar = false;
    store.save_quest(&quest)?;
    if !silent { println!("Quest {} removed from calendar.", id); }
    Ok(())
}

/// Lists calendar events in the next `days` days, starting today.
pub fn cmd_calendar_events(calendar: &dyn CalendarProvider, days: u64, silent: bool) -> Result<Vec<CalendarEvent>> {
    let from = today();
    let to = from.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
    let events = calendar.events_between(from, to)?;
    if silent {
        return Ok(events);
    }
    if events.is_empty() {
        println!("No calendar events between {} and {}.", from, to);
        return Ok(events);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Start", "Summary", "Repeats"]);
    for e in &events {
        table.add_row(vec![
            format!("{} {}", e.start.format("%Y-%m-%d %H:%M"), e.time_zone),
            e.summary.clone(),
            if e.recurrence.is_empty() { "-".to_string() } else { e.recurrence.join(" ") },
        ]);
    }
    println!("{table}");
    Ok(events)
}

/// Writes the calendar as an `.ics` file.
pub fn cmd_calendar_export(calendar: &LocalCalendar, path: &Path) -> Result<()> {
    calendar.export_ics(path)?;
    println!("Exported {} events to {}.", calendar.events().len(), path.display());
    Ok(())
}

/// Resets the store by deleting all quests and calendar events.
pub fn cmd_reset(store: &Store, force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all quests? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    store.delete_database()?;
    println!("Database reset successfully.");
    Ok(())
}
