use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::Error;
use crate::models::{Category, Priority, Quest, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Created,
    Priority,
    DueDate,
    Xp,
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" | "createdat" => Ok(SortBy::Created),
            "priority" => Ok(SortBy::Priority),
            "due" | "duedate" => Ok(SortBy::DueDate),
            "xp" | "xpreward" => Ok(SortBy::Xp),
            _ => Err(Error::InvalidValue { field: "sort key", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(Error::InvalidValue { field: "sort order", value: s.to_string() }),
        }
    }
}

/// Dashboard filters. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct QuestFilters {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub tag: Option<String>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl QuestFilters {
    pub fn matches(&self, quest: &Quest) -> bool {
        if self.status.is_some_and(|s| quest.status != s) {
            return false;
        }
        if self.priority.is_some_and(|p| quest.priority != p) {
            return false;
        }
        if self.category.is_some_and(|c| quest.category != c) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !quest.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !quest.title.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Keeps matching quests and sorts them in place.
    pub fn apply(&self, quests: &mut Vec<Quest>) {
        quests.retain(|q| self.matches(q));
        quests.sort_by(|a, b| {
            let ord = compare(a, b, self.sort_by);
            match self.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }
}

/// Ascending comparison on one sort key.
///
/// Quests without a due date sort after every dated quest.
fn compare(a: &Quest, b: &Quest, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Created => a.created_at.cmp(&b.created_at),
        SortBy::Priority => a.priority.cmp(&b.priority),
        SortBy::DueDate => match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortBy::Xp => a.xp_reward.cmp(&b.xp_reward),
    }
}

/// Counts shown under the quest list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub active: usize,
    pub completed: usize,
    pub paused: usize,
    pub overdue: usize,
}

pub fn summarize(quests: &[Quest], today: NaiveDate) -> Summary {
    let mut summary = Summary::default();
    for q in quests {
        match q.status {
            Status::Active => summary.active += 1,
            Status::Completed => summary.completed += 1,
            Status::Paused => summary.paused += 1,
        }
        if q.is_overdue(today) {
            summary.overdue += 1;
        }
    }
    summary
}
