use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How urgent a quest is. Ordered from `Low` to `Critical`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Fixed XP value awarded for completing a quest of this priority.
    pub fn xp(self) -> u32 {
        match self {
            Priority::Low => 10,
            Priority::Medium => 25,
            Priority::High => 50,
            Priority::Critical => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(Error::InvalidValue { field: "priority", value: s.to_string() }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    School,
    Health,
    Chores,
    Personal,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::School => "school",
            Category::Health => "health",
            Category::Chores => "chores",
            Category::Personal => "personal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "school" => Ok(Category::School),
            "health" => Ok(Category::Health),
            "chores" => Ok(Category::Chores),
            "personal" => Ok(Category::Personal),
            _ => Err(Error::InvalidValue { field: "category", value: s.to_string() }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Completed,
    Paused,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Completed => "completed",
            Status::Paused => "paused",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "completed" => Ok(Status::Completed),
            "paused" => Ok(Status::Paused),
            _ => Err(Error::InvalidValue { field: "status", value: s.to_string() }),
        }
    }
}

/// Unit a recurring quest repeats in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
}

impl RecurrenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Monthly => "monthly",
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RecurrenceType::Daily),
            "weekly" => Ok(RecurrenceType::Weekly),
            "monthly" => Ok(RecurrenceType::Monthly),
            _ => Err(Error::UnknownRecurrence(s.to_string())),
        }
    }
}

/// Describes how a base quest repeats.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    /// Repeat every `interval` units. Must be at least 1.
    pub interval: u32,
    /// Weekdays (0 = Sunday .. 6 = Saturday). Only used by weekly patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<i32>>,
    /// No occurrence may fall on or after this date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Upper bound on the instance number of generated occurrences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occurrences: Option<u32>,
}

impl RecurrencePattern {
    pub fn new(kind: RecurrenceType, interval: u32) -> Self {
        RecurrencePattern {
            kind,
            interval,
            days_of_week: None,
            end_date: None,
            max_occurrences: None,
        }
    }

    pub fn with_days(mut self, days: Vec<i32>) -> Self {
        self.days_of_week = Some(days);
        self
    }

    pub fn until(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn capped_at(mut self, max: u32) -> Self {
        self.max_occurrences = Some(max);
        self
    }

    /// Selected weekdays within 0..=6, sorted and deduplicated.
    ///
    /// Empty for non-weekly patterns.
    pub fn selected_days(&self) -> Vec<u32> {
        if self.kind != RecurrenceType::Weekly {
            return Vec::new();
        }
        let mut days: Vec<u32> = self
            .days_of_week
            .iter()
            .flatten()
            .filter(|d| (0..=6).contains(*d))
            .map(|d| *d as u32)
            .collect();
        days.sort_unstable();
        days.dedup();
        days
    }
}

/// A single quest (task), either standalone, a recurring base, or an instance.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Quest {
    /// Unique identifier. `0` until the store assigns one.
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Category,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// XP granted to the assignee on completion.
    pub xp_reward: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Estimated effort in minutes.
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    /// True only for the base quest of a recurring series.
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default)]
    pub sync_to_calendar: bool,
    /// Id of the linked calendar event, if synced.
    #[serde(default)]
    pub calendar_event_id: Option<String>,
    pub assigned_to: String,
    pub created_by: String,
}

impl Quest {
    /// Creates an active quest owned by and assigned to `user`.
    ///
    /// The XP reward defaults to the priority's fixed value.
    pub fn new(title: impl Into<String>, priority: Priority, category: Category, user: &str) -> Quest {
        Quest {
            id: 0,
            title: title.into(),
            description: None,
            priority,
            category,
            status: Status::Active,
            due_date: None,
            created_at: Utc::now(),
            completed_at: None,
            xp_reward: priority.xp(),
            tags: Vec::new(),
            estimated_minutes: None,
            is_recurring: false,
            recurrence_pattern: None,
            sync_to_calendar: false,
            calendar_event_id: None,
            assigned_to: user.to_string(),
            created_by: user.to_string(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Creator or assignee.
    pub fn can_modify(&self, user: &str) -> bool {
        self.created_by == user || self.assigned_to == user
    }

    /// Only the creator may delete a quest.
    pub fn can_delete(&self, user: &str) -> bool {
        self.created_by == user
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == Status::Active && self.due_date.is_some_and(|d| d < today)
    }
}
