use chrono::NaiveDate;
use questhub::filters::{summarize, QuestFilters, SortBy, SortOrder};
use questhub::models::{Category, Priority, Quest, Status};

#[test]
fn test_sort_keys_parse() {
    assert_eq!("due".parse::<SortBy>().unwrap(), SortBy::DueDate);
    assert_eq!("xpReward".parse::<SortBy>().unwrap(), SortBy::Xp);
    assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
    assert!("sideways".parse::<SortOrder>().is_err());
}

#[test]
fn test_filter_by_tag_and_summary() {
    let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
    let mut overdue = Quest::new("Library books", Priority::High, Category::School, "noa");
    overdue.due_date = Some(today.pred_opt().unwrap());
    overdue.tags = vec!["Errands".into()];
    let mut paused = Quest::new("Guitar", Priority::Low, Category::Personal, "noa");
    paused.status = Status::Paused;
    paused.due_date = Some(today.pred_opt().unwrap());
    let mut done = Quest::new("Bike", Priority::Medium, Category::Health, "noa");
    done.status = Status::Completed;

    let quests = vec![overdue, paused, done];
    let summary = summarize(&quests, today);
    assert_eq!((summary.active, summary.completed, summary.paused, summary.overdue), (1, 1, 1, 1));

    let mut tagged = quests.clone();
    let filters = QuestFilters { tag: Some("errands".into()), ..Default::default() };
    filters.apply(&mut tagged);
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].title, "Library books");

    let mut by_xp = quests;
    let filters = QuestFilters { sort_by: SortBy::Xp, sort_order: SortOrder::Asc, ..Default::default() };
    filters.apply(&mut by_xp);
    let xp: Vec<u32> = by_xp.iter().map(|q| q.xp_reward).collect();
    assert_eq!(xp, vec![10, 25, 50]);
}

#[test]
fn test_undated_quests_sort_last_ascending() {
    let mut soon = Quest::new("Soon", Priority::Low, Category::Chores, "eli");
    soon.due_date = NaiveDate::from_ymd_opt(2025, 5, 1);
    let mut later = Quest::new("Later", Priority::Low, Category::Chores, "eli");
    later.due_date = NaiveDate::from_ymd_opt(2025, 6, 1);
    let someday = Quest::new("Someday", Priority::Low, Category::Chores, "eli");

    let mut quests = vec![someday, later, soon];
    let filters = QuestFilters { sort_by: SortBy::DueDate, sort_order: SortOrder::Asc, ..Default::default() };
    filters.apply(&mut quests);

    let titles: Vec<&str> = quests.iter().map(|q| q.title.as_str()).collect();
    assert_eq!(titles, vec!["Soon", "Later", "Someday"]);
}
