//! Task and habit models shared by every scoring component.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Study,
    Habit,
    Prayer,
    Work,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Study,
        Category::Habit,
        Category::Prayer,
        Category::Work,
        Category::Other,
    ];

    /// Study and Work are the "deep" categories that week modes reweight.
    pub fn is_focus(&self) -> bool {
        matches!(self, Category::Study | Category::Work)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Study => "study",
            Category::Habit => "habit",
            Category::Prayer => "prayer",
            Category::Work => "work",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "study" => Ok(Category::Study),
            "habit" => Ok(Category::Habit),
            "prayer" => Ok(Category::Prayer),
            "work" => Ok(Category::Work),
            "other" => Ok(Category::Other),
            other => bail!("unknown category: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Normal,
}

/// A unit of work captured by the user.
///
/// `priority_score` is derived by [`crate::priority`] and is only ever written
/// by the scorer or by shadow negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub priority: Priority,

    /// Minutes, always positive.
    pub estimated_minutes: u32,

    pub deadline: DateTime<Utc>,

    /// Slot on today's timeline, if the task has been placed.
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,

    /// Only incremented by an explicit defer.
    #[serde(default)]
    pub postponed_count: u32,

    #[serde(default)]
    pub is_completed: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub priority_score: i32,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: Category::Other,
            priority: Priority::Normal,
            estimated_minutes: 30,
            deadline: now,
            scheduled_at: None,
            postponed_count: 0,
            is_completed: false,
            created_at: now,
            priority_score: 0,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_postponed(mut self, count: u32) -> Self {
        self.postponed_count = count;
        self
    }

    pub fn scheduled(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn completed(mut self) -> Self {
        self.is_completed = true;
        self
    }

    /// Minimal invariants for safe downstream processing.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must be non-empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("title must be non-empty".to_string());
        }
        if self.estimated_minutes == 0 {
            return Err("estimated_minutes must be positive".to_string());
        }
        Ok(())
    }
}

/// Task fields extracted from free text, before the host assigns identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub category: Category,
    pub priority: Priority,
    pub estimated_minutes: u32,
    pub deadline: DateTime<Utc>,
    /// Local clock time mentioned in the text, if any.
    pub time: Option<NaiveTime>,
    pub is_completed: bool,
}

impl TaskDraft {
    pub fn into_task(self, id: impl Into<String>, now: DateTime<Utc>) -> Task {
        Task {
            id: id.into(),
            title: self.title,
            category: self.category,
            priority: self.priority,
            estimated_minutes: self.estimated_minutes.max(1),
            deadline: self.deadline,
            scheduled_at: None,
            postponed_count: 0,
            is_completed: self.is_completed,
            created_at: now,
            priority_score: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub streak_count: u32,
    #[serde(default)]
    pub is_completed_today: bool,
    /// Append-only, one entry per local date, written when the day closes.
    #[serde(default)]
    pub history: BTreeMap<NaiveDate, bool>,
    /// Local date `is_completed_today` refers to.
    #[serde(default)]
    pub day: Option<NaiveDate>,
}

impl Habit {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            streak_count: 0,
            is_completed_today: false,
            history: BTreeMap::new(),
            day: None,
        }
    }

    /// Record the outcome of `day`. Earlier entries are never rewritten.
    pub fn record(&mut self, day: NaiveDate, done: bool) {
        self.history.entry(day).or_insert(done);
    }

    /// Close the tracked day with its final flag and start `today`.
    /// The streak breaks unless the day before `today` was completed.
    /// No-op when `today` is already the tracked day.
    pub fn roll_over(&mut self, today: NaiveDate) {
        match self.day {
            Some(day) if day >= today => return,
            Some(day) => self.record(day, self.is_completed_today),
            None => {}
        }
        let kept = today.pred_opt().is_some_and(|yesterday| self.completed_on(yesterday));
        if !kept {
            self.streak_count = 0;
        }
        self.is_completed_today = false;
        self.day = Some(today);
    }

    pub fn completed_on(&self, day: NaiveDate) -> bool {
        self.history.get(&day).copied().unwrap_or(false)
    }
}
