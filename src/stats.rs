use std::collections::BTreeSet;

use chrono::{Days, Local, NaiveDate};
use serde::Serialize;

use crate::models::Quest;

/// XP needed to climb one level.
pub const XP_PER_LEVEL: u32 = 100;

/// A player's progress, projected from the quest set.
///
/// Never stored: recompute it with [`player_stats`] whenever the quests change.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    #[serde(rename = "totalXP")]
    pub total_xp: u32,
    pub level: u32,
    pub quests_completed: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_quests_created: u32,
    /// Completed on or before their due date.
    pub early_completions: u32,
}

/// Computes `user`'s stats as of `today`.
///
/// XP, completions and streaks count quests assigned to the user; the
/// created count looks at the creator instead. XP saturates at `u32::MAX`.
pub fn player_stats(quests: &[Quest], user: &str, today: NaiveDate) -> PlayerStats {
    let completed: Vec<&Quest> = quests
        .iter()
        .filter(|q| q.assigned_to == user && q.is_completed())
        .collect();

    let total_xp = completed.iter().fold(0u32, |acc, q| acc.saturating_add(q.xp_reward));
    let early_completions = completed
        .iter()
        .filter(|q| match (q.due_date, completion_day(q)) {
            (Some(due), Some(done)) => done <= due,
            _ => false,
        })
        .count() as u32;

    let days: BTreeSet<NaiveDate> = completed.iter().filter_map(|q| completion_day(q)).collect();
    let (current_streak, longest_streak) = streaks(&days, today);

    PlayerStats {
        total_xp,
        level: level_for_xp(total_xp),
        quests_completed: completed.len() as u32,
        current_streak,
        longest_streak,
        total_quests_created: quests.iter().filter(|q| q.created_by == user).count() as u32,
        early_completions,
    }
}

/// Level 1 starts at 0 XP; every [`XP_PER_LEVEL`] adds one.
pub fn level_for_xp(total_xp: u32) -> u32 {
    total_xp / XP_PER_LEVEL + 1
}

/// Local calendar day a quest was completed on.
fn completion_day(quest: &Quest) -> Option<NaiveDate> {
    quest.completed_at.map(|at| at.with_timezone(&Local).date_naive())
}

/// Returns `(current, longest)` streaks over a set of completion days.
///
/// The current streak counts back from `today` and is zero when nothing was
/// completed today. The longest streak is the longest run of consecutive
/// days anywhere in the set.
pub fn streaks(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> (u32, u32) {
    let mut current = 0;
    let mut cursor = Some(today);
    while let Some(day) = cursor.filter(|d| days.contains(d)) {
        current += 1;
        cursor = day.checked_sub_days(Days::new(1));
    }

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days.iter().rev() {
        run = match previous {
            Some(prev) if prev.checked_sub_days(Days::new(1)) == Some(*day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }

    (current, longest)
}

/// Where a player stands inside their current level.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub xp_in_level: u32,
    pub xp_to_next_level: u32,
    pub percent: u32,
    pub title: &'static str,
}

pub fn level_progress(total_xp: u32) -> LevelProgress {
    let level = level_for_xp(total_xp);
    let xp_in_level = total_xp % XP_PER_LEVEL;
    LevelProgress {
        level,
        xp_in_level,
        xp_to_next_level: XP_PER_LEVEL - xp_in_level,
        percent: xp_in_level * 100 / XP_PER_LEVEL,
        title: level_title(level),
    }
}

pub fn level_title(level: u32) -> &'static str {
    match level {
        50.. => "Legendary Quest Master",
        25..=49 => "Epic Quest Hero",
        15..=24 => "Advanced Questor",
        10..=14 => "Experienced Adventurer",
        5..=9 => "Rising Hero",
        _ => "Quest Apprentice",
    }
}

/// Which stat an achievement measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    QuestsCompleted,
    CurrentStreak,
    TotalXp,
    Level,
    EarlyCompletions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub xp_reward: u32,
    pub condition: Condition,
    pub threshold: u32,
}

pub const ACHIEVEMENTS: [Achievement; 8] = [
    Achievement {
        id: "first-quest",
        title: "Quest Beginner",
        description: "Complete your first quest",
        xp_reward: 50,
        condition: Condition::QuestsCompleted,
        threshold: 1,
    },
    Achievement {
        id: "streak-3",
        title: "3-Day Warrior",
        description: "Complete quests for 3 days in a row",
        xp_reward: 100,
        condition: Condition::CurrentStreak,
        threshold: 3,
    },
    Achievement {
        id: "streak-7",
        title: "Weekly Champion",
        description: "Complete quests for 7 days in a row",
        xp_reward: 250,
        condition: Condition::CurrentStreak,
        threshold: 7,
    },
    Achievement {
        id: "xp-100",
        title: "XP Collector",
        description: "Earn 100 total XP points",
        xp_reward: 50,
        condition: Condition::TotalXp,
        threshold: 100,
    },
    Achievement {
        id: "xp-500",
        title: "XP Master",
        description: "Earn 500 total XP points",
        xp_reward: 100,
        condition: Condition::TotalXp,
        threshold: 500,
    },
    Achievement {
        id: "level-5",
        title: "Leveling Up",
        description: "Reach level 5",
        xp_reward: 150,
        condition: Condition::Level,
        threshold: 5,
    },
    Achievement {
        id: "early-bird",
        title: "Early Bird",
        description: "Complete 5 quests before their due date",
        xp_reward: 100,
        condition: Condition::EarlyCompletions,
        threshold: 5,
    },
    Achievement {
        id: "quest-master",
        title: "Quest Master",
        description: "Complete 50 total quests",
        xp_reward: 300,
        condition: Condition::QuestsCompleted,
        threshold: 50,
    },
];

/// An achievement together with the player's progress towards it.
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementProgress {
    pub achievement: Achievement,
    /// In `0.0..=1.0`.
    pub progress: f64,
}

impl AchievementProgress {
    pub fn unlocked(&self) -> bool {
        self.progress >= 1.0
    }
}

pub fn achievement_progress(stats: &PlayerStats) -> Vec<AchievementProgress> {
    ACHIEVEMENTS
        .iter()
        .map(|a| {
            let value = match a.condition {
                Condition::QuestsCompleted => stats.quests_completed,
                Condition::CurrentStreak => stats.current_streak,
                Condition::TotalXp => stats.total_xp,
                Condition::Level => stats.level,
                Condition::EarlyCompletions => stats.early_completions,
            };
            AchievementProgress {
                achievement: *a,
                progress: (f64::from(value) / f64::from(a.threshold)).min(1.0),
            }
        })
        .collect()
}
