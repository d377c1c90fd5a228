use chrono::{Days, Local, NaiveDate};
use questhub::calendar::{CalendarEvent, CalendarProvider, LocalCalendar};
use questhub::commands::*;
use questhub::config::{CalendarSettings, Config};
use questhub::filters::{QuestFilters, SortBy, SortOrder};
use questhub::models::{Category, Priority, RecurrencePattern, RecurrenceType, Status};
use questhub::storage::Store;
use questhub::Error;
use tempfile::TempDir;

fn with_test_store<F>(f: F)
where
    F: FnOnce(&Store),
{
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    f(&store);
}

fn config(user: &str) -> Config {
    Config {
        user: user.to_string(),
        recurring_instances: 5,
        calendar: None,
    }
}

fn days_from_today(n: u64) -> NaiveDate {
    Local::now().date_naive().checked_add_days(Days::new(n)).unwrap()
}

#[test]
fn test_add_and_load() {
    with_test_store(|store| {
        let mut input = QuestInput::new("Clean room", Priority::High, Category::Chores);
        input.due = Some(parse_date("2025-12-01").unwrap());
        input.tags = vec!["weekend".into()];
        let id = cmd_add(store, "dana", input, true).unwrap();

        let quests = store.load_quests().unwrap();
        assert_eq!(quests.len(), 1);
        let q = &quests[0];
        assert_eq!(q.id, id);
        assert_eq!(q.title, "Clean room");
        assert_eq!(q.xp_reward, 50);
        assert_eq!(q.status, Status::Active);
        assert_eq!(q.created_by, "dana");
        assert_eq!(q.assigned_to, "dana");
        assert_eq!(q.tags, vec!["weekend".to_string()]);
    });
}

#[test]
fn test_ids_are_sequential() {
    with_test_store(|store| {
        let a = cmd_add(store, "dana", QuestInput::new("A", Priority::Low, Category::Personal), true).unwrap();
        let b = cmd_add(store, "dana", QuestInput::new("B", Priority::Low, Category::Personal), true).unwrap();
        assert_eq!((a, b), (1, 2));
    });
}

#[test]
fn test_complete_awards_xp_once() {
    with_test_store(|store| {
        let mut input = QuestInput::new("Math worksheet", Priority::Critical, Category::School);
        input.assign_to = Some("noa".into());
        let id = cmd_add(store, "dana", input, true).unwrap();

        assert_eq!(cmd_complete(store, "noa", id, true).unwrap(), 100);
        assert_eq!(cmd_complete(store, "noa", id, true).unwrap(), 0);

        let q = store.load_quest(id).unwrap();
        assert_eq!(q.status, Status::Completed);
        assert!(q.completed_at.is_some());

        let stats = cmd_stats(store, "noa", true).unwrap();
        assert_eq!(stats.total_xp, 100);
        assert_eq!(stats.level, 2);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(cmd_stats(store, "dana", true).unwrap().total_xp, 0);
    });
}

#[test]
fn test_achievements_count_unlocked() {
    with_test_store(|store| {
        assert_eq!(cmd_achievements(store, "noa", false, true).unwrap(), 0);

        let mut input = QuestInput::new("Science fair", Priority::Critical, Category::School);
        input.due = Some(days_from_today(3));
        let id = cmd_add(store, "noa", input, true).unwrap();
        cmd_complete(store, "noa", id, true).unwrap();

        // first-quest and xp-100
        assert_eq!(cmd_achievements(store, "noa", true, true).unwrap(), 2);
    });
}

#[test]
fn test_reopen_clears_completion() {
    with_test_store(|store| {
        let id = cmd_add(store, "dana", QuestInput::new("Walk dog", Priority::Medium, Category::Chores), true).unwrap();
        assert!(matches!(cmd_reopen(store, "dana", id, true), Err(Error::InvalidTransition { .. })));

        cmd_complete(store, "dana", id, true).unwrap();
        cmd_reopen(store, "dana", id, true).unwrap();

        let q = store.load_quest(id).unwrap();
        assert_eq!(q.status, Status::Active);
        assert!(q.completed_at.is_none());
        assert_eq!(cmd_stats(store, "dana", true).unwrap().total_xp, 0);
    });
}

#[test]
fn test_pause_and_resume() {
    with_test_store(|store| {
        let id = cmd_add(store, "dana", QuestInput::new("Read", Priority::Low, Category::School), true).unwrap();
        cmd_set_paused(store, "dana", id, true, true).unwrap();
        assert_eq!(store.load_quest(id).unwrap().status, Status::Paused);
        assert!(cmd_set_paused(store, "dana", id, true, true).is_err());
        cmd_set_paused(store, "dana", id, false, true).unwrap();
        assert_eq!(store.load_quest(id).unwrap().status, Status::Active);
    });
}

#[test]
fn test_permissions() {
    with_test_store(|store| {
        let mut input = QuestInput::new("Laundry", Priority::Medium, Category::Chores);
        input.assign_to = Some("noa".into());
        let id = cmd_add(store, "dana", input, true).unwrap();

        // Strangers can neither edit nor complete.
        let edit = QuestEdit { title: Some("Nope".into()), ..Default::default() };
        assert!(matches!(cmd_edit(store, "eli", id, edit, true), Err(Error::Forbidden { .. })));
        assert!(matches!(cmd_complete(store, "eli", id, true), Err(Error::Forbidden { .. })));

        // The assignee may edit, but only the creator may delete.
        let edit = QuestEdit { title: Some("Fold laundry".into()), xp: Some(30), ..Default::default() };
        cmd_edit(store, "noa", id, edit, true).unwrap();
        assert!(matches!(cmd_remove(store, None, "noa", id, true), Err(Error::Forbidden { .. })));

        let q = store.load_quest(id).unwrap();
        assert_eq!(q.title, "Fold laundry");
        assert_eq!(q.xp_reward, 30);

        cmd_remove(store, None, "dana", id, true).unwrap();
        assert!(store.load_quests().unwrap().is_empty());
    });
}

#[test]
fn test_unknown_id() {
    with_test_store(|store| {
        assert!(matches!(cmd_complete(store, "dana", 42, true), Err(Error::NotFound(42))));
        assert!(matches!(cmd_remove(store, None, "dana", 42, true), Err(Error::NotFound(42))));
    });
}

#[test]
fn test_list_filters_and_visibility() {
    with_test_store(|store| {
        let mut low = QuestInput::new("Water plants", Priority::Low, Category::Chores);
        low.due = Some(parse_date("2025-05-02").unwrap());
        let mut critical = QuestInput::new("Science project", Priority::Critical, Category::School);
        critical.due = Some(parse_date("2025-05-01").unwrap());
        let undated = QuestInput::new("Plant tomatoes", Priority::Medium, Category::Chores);
        cmd_add(store, "dana", low, true).unwrap();
        cmd_add(store, "dana", critical, true).unwrap();
        cmd_add(store, "dana", undated, true).unwrap();
        cmd_add(store, "eli", QuestInput::new("Eli's own", Priority::High, Category::Personal), true).unwrap();

        let by_priority = QuestFilters { sort_by: SortBy::Priority, ..Default::default() };
        let listed = cmd_list(store, "dana", &by_priority, true).unwrap();
        let titles: Vec<&str> = listed.iter().map(|q| q.title.as_str()).collect();
        assert_eq!(titles, vec!["Science project", "Plant tomatoes", "Water plants"]);

        let by_due = QuestFilters { sort_by: SortBy::DueDate, sort_order: SortOrder::Asc, ..Default::default() };
        let listed = cmd_list(store, "dana", &by_due, true).unwrap();
        assert_eq!(listed.last().unwrap().title, "Plant tomatoes");

        let search = QuestFilters { search: Some("PLANT".into()), category: Some(Category::Chores), ..Default::default() };
        assert_eq!(cmd_list(store, "dana", &search, true).unwrap().len(), 2);
    });
}

#[test]
fn test_add_recurring_creates_base_and_instances() {
    with_test_store(|store| {
        let cfg = config("dana");
        let mut input = QuestInput::new("Take out trash", Priority::Medium, Category::Chores);
        input.due = Some(days_from_today(1));
        input.assign_to = Some("noa".into());
        let pattern = RecurrencePattern::new(RecurrenceType::Daily, 2);

        let created = cmd_add_recurring(store, &cfg, None, input, pattern, false, true).unwrap();

        assert_eq!(created.instance_ids.len(), 5);
        let base = store.load_quest(created.base_id).unwrap();
        assert!(base.is_recurring);
        assert!(base.recurrence_pattern.is_some());

        for (i, id) in created.instance_ids.iter().enumerate() {
            let instance = store.load_quest(*id).unwrap();
            assert!(!instance.is_recurring);
            assert!(instance.title.contains(&format!("(#{})", i + 1)));
            assert_eq!(instance.assigned_to, "noa");
            assert_eq!(instance.created_by, "dana");
            assert_eq!(instance.due_date, Some(days_from_today(1 + 2 * (i as u64 + 1))));
        }

        let recurring = cmd_recurring_list(store, "noa").unwrap();
        assert_eq!(recurring.len(), 1);
        assert_eq!(recurring[0].id, created.base_id);
    });
}

#[test]
fn test_add_recurring_rejects_invalid_pattern() {
    with_test_store(|store| {
        let cfg = config("dana");
        let input = QuestInput::new("Bad", Priority::Low, Category::Personal);
        let pattern = RecurrencePattern::new(RecurrenceType::Weekly, 0).with_days(vec![8]);

        match cmd_add_recurring(store, &cfg, None, input, pattern, false, true) {
            Err(Error::InvalidPattern(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
        assert!(store.load_quests().unwrap().is_empty());
    });
}

#[test]
fn test_add_recurring_syncs_instances_to_calendar() {
    with_test_store(|store| {
        let mut cfg = config("dana");
        cfg.calendar = Some(CalendarSettings::default());
        let mut calendar = LocalCalendar::open(store).unwrap();
        let mut input = QuestInput::new("Piano", Priority::High, Category::School);
        input.due = Some(days_from_today(1));
        let pattern = RecurrencePattern::new(RecurrenceType::Weekly, 1).with_days(vec![1, 3, 5]);

        let created = cmd_add_recurring(store, &cfg, Some(&mut calendar), input, pattern, true, true).unwrap();

        assert_eq!(calendar.events().len(), created.instance_ids.len());
        for id in &created.instance_ids {
            assert!(store.load_quest(*id).unwrap().calendar_event_id.is_some());
        }
        assert!(store.load_quest(created.base_id).unwrap().sync_to_calendar);
    });
}

#[test]
fn test_calendar_sync_and_unsync() {
    with_test_store(|store| {
        let mut cfg = config("dana");
        let mut calendar = LocalCalendar::open(store).unwrap();
        let mut input = QuestInput::new("Dentist", Priority::High, Category::Health);
        input.due = Some(parse_date("2025-09-15").unwrap());
        let id = cmd_add(store, "dana", input, true).unwrap();
        let undated = cmd_add(store, "dana", QuestInput::new("Someday", Priority::Low, Category::Personal), true).unwrap();

        assert!(matches!(
            cmd_calendar_sync(store, &mut calendar, &cfg, id, true),
            Err(Error::CalendarNotConnected)
        ));

        cmd_calendar_connect(store, &mut cfg, CalendarSettings::default(), true).unwrap();
        assert_eq!(Config::load(store.dir()).unwrap().calendar, Some(CalendarSettings::default()));
        assert!(matches!(
            cmd_calendar_sync(store, &mut calendar, &cfg, undated, true),
            Err(Error::MissingDueDate(_))
        ));

        let event_id = cmd_calendar_sync(store, &mut calendar, &cfg, id, true).unwrap();
        assert_eq!(store.load_quest(id).unwrap().calendar_event_id, Some(event_id.clone()));
        let from = parse_date("2025-09-15").unwrap();
        assert_eq!(calendar.events_between(from, from).unwrap().len(), 1);

        cmd_calendar_unsync(store, Some(&mut calendar), "dana", id, true).unwrap();
        assert!(store.load_quest(id).unwrap().calendar_event_id.is_none());
        assert!(calendar.events().is_empty());
    });
}

#[test]
fn test_calendar_events_window() {
    with_test_store(|store| {
        let mut cfg = config("dana");
        cmd_calendar_connect(store, &mut cfg, CalendarSettings::default(), true).unwrap();
        let mut calendar = LocalCalendar::open(store).unwrap();
        for (title, offset) in [("Haircut", 2), ("Recital", 30)] {
            let mut input = QuestInput::new(title, Priority::Medium, Category::Personal);
            input.due = Some(days_from_today(offset));
            let id = cmd_add(store, "dana", input, true).unwrap();
            cmd_calendar_sync(store, &mut calendar, &cfg, id, true).unwrap();
        }

        let upcoming = cmd_calendar_events(&calendar, 14, true).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].summary, "🎯 Haircut");
        assert_eq!(cmd_calendar_events(&calendar, 60, true).unwrap().len(), 2);
    });
}

#[test]
fn test_recurring_base_syncs_as_repeating_event() {
    with_test_store(|store| {
        let mut cfg = config("dana");
        cfg.calendar = Some(CalendarSettings { time_zone: "Asia/Jerusalem".into(), event_hour: 17 });
        let mut input = QuestInput::new("Soccer", Priority::Medium, Category::Health);
        input.due = Some(days_from_today(2));
        let pattern = RecurrencePattern::new(RecurrenceType::Weekly, 1).with_days(vec![2, 4]);
        let created = cmd_add_recurring(store, &cfg, None, input, pattern, false, true).unwrap();

        let mut calendar = LocalCalendar::open(store).unwrap();
        cmd_calendar_sync(store, &mut calendar, &cfg, created.base_id, true).unwrap();

        let event: &CalendarEvent = &calendar.events()[0];
        assert_eq!(event.recurrence, vec!["RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=TU,TH".to_string()]);
        assert_eq!(event.time_zone, "Asia/Jerusalem");
        assert_eq!(event.start.format("%H:%M").to_string(), "17:00");
    });
}

#[test]
fn test_remove_deletes_calendar_event() {
    with_test_store(|store| {
        let mut cfg = config("dana");
        cfg.calendar = Some(CalendarSettings::default());
        let mut calendar = LocalCalendar::open(store).unwrap();
        let mut input = QuestInput::new("Haircut", Priority::Low, Category::Personal);
        input.due = Some(parse_date("2025-10-01").unwrap());
        let id = cmd_add(store, "dana", input, true).unwrap();
        cmd_calendar_sync(store, &mut calendar, &cfg, id, true).unwrap();

        cmd_remove(store, Some(&mut calendar), "dana", id, true).unwrap();

        assert!(calendar.events().is_empty());
        assert!(LocalCalendar::open(store).unwrap().events().is_empty());
    });
}

#[test]
fn test_preview_does_not_store() {
    with_test_store(|store| {
        let pattern = RecurrencePattern::new(RecurrenceType::Monthly, 1);
        let occurrences = cmd_preview(&pattern, parse_date("2025-01-31").unwrap(), 3, true).unwrap();
        assert_eq!(occurrences.len(), 3);
        assert_eq!(occurrences[0].due_date, parse_date("2025-02-28").unwrap());
        assert!(store.load_quests().unwrap().is_empty());
    });
}

#[test]
fn test_parse_days() {
    assert_eq!(parse_days("mon,wed,fri").unwrap(), vec![1, 3, 5]);
    assert_eq!(parse_days("0, 6").unwrap(), vec![0, 6]);
    assert_eq!(parse_days("Sunday,9").unwrap(), vec![0, 9]);
    assert!(parse_days("funday").is_err());
    assert!(parse_date("2025-13-01").is_err());
}

#[test]
fn test_reset_removes_data() {
    with_test_store(|store| {
        cmd_add(store, "dana", QuestInput::new("Anything", Priority::Low, Category::Personal), true).unwrap();
        cmd_reset(store, true).unwrap();
        assert!(store.load_quests().unwrap().is_empty());
    });
}
