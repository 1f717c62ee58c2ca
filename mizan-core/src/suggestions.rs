//! Context-aware quick-choice suggestions.
//!
//! Precedence:
//! 1) week-mode override for Study/Work (Crunch, Light, Review);
//! 2) time-of-day bucket for Study/Work;
//! 3) fixed lists for Habit, Prayer, Other.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Category, Priority};
use crate::task::Priority::{High, Normal};
use crate::time::local_hour;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekMode {
    #[default]
    Standard,
    Crunch,
    Light,
    Review,
}

impl WeekMode {
    pub const ALL: [WeekMode; 4] = [WeekMode::Standard, WeekMode::Crunch, WeekMode::Light, WeekMode::Review];
}

impl fmt::Display for WeekMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WeekMode::Standard => "standard",
            WeekMode::Crunch => "crunch",
            WeekMode::Light => "light",
            WeekMode::Review => "review",
        })
    }
}

impl FromStr for WeekMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(WeekMode::Standard),
            "crunch" => Ok(WeekMode::Crunch),
            "light" => Ok(WeekMode::Light),
            "review" => Ok(WeekMode::Review),
            other => bail!("unknown week mode: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub icon: String,
    pub label: String,
    /// Minutes.
    pub duration: u32,
    pub priority: Priority,
    pub title_suffix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    /// 05-12 morning, 12-18 afternoon, everything else evening.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayPart::Morning,
            12..=17 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }
}

struct Entry {
    icon: &'static str,
    label: &'static str,
    duration: u32,
    priority: Priority,
    suffix: Option<&'static str>,
}

const fn entry(icon: &'static str, label: &'static str, duration: u32, priority: Priority) -> Entry {
    Entry {
        icon,
        label,
        duration,
        priority,
        suffix: None,
    }
}

const fn with_suffix(mut s: Entry, suffix: &'static str) -> Entry {
    s.suffix = Some(suffix);
    s
}

const CRUNCH: &[Entry] = &[
    with_suffix(entry("🔥", "Deep work sprint", 90, High), " (deep work)"),
    entry("🎯", "Hardest item first", 120, High),
    entry("⚡", "Pomodoro block", 50, High),
];

const LIGHT: &[Entry] = &[
    entry("🌿", "Light review", 15, Normal),
    entry("☕", "Gentle start", 20, Normal),
    entry("📖", "Quick read", 10, Normal),
];

const REVIEW: &[Entry] = &[
    with_suffix(entry("🧭", "Weekly reflection", 30, Normal), " (review)"),
    entry("📝", "Summarize notes", 25, Normal),
    entry("🔁", "Revisit mistakes", 20, Normal),
];

const FOCUS_MORNING: &[Entry] = &[
    entry("🌅", "Morning deep focus", 60, High),
    entry("📚", "Fresh-mind session", 45, High),
    entry("⏱️", "Warm-up block", 25, Normal),
];

const FOCUS_AFTERNOON: &[Entry] = &[
    entry("☀️", "Steady block", 45, Normal),
    entry("✅", "Clear small tasks", 25, Normal),
    entry("🤝", "Collaborative slot", 30, Normal),
];

const FOCUS_EVENING: &[Entry] = &[
    entry("🌙", "Wind-down review", 20, Normal),
    entry("🗂️", "Plan tomorrow", 15, Normal),
    entry("📖", "Light reading", 25, Normal),
];

const HABIT: &[Entry] = &[
    entry("💧", "Drink water", 5, Normal),
    entry("🚶", "Short walk", 15, Normal),
    entry("🧘", "Stretch", 10, Normal),
];

const PRAYER: &[Entry] = &[
    entry("🕌", "Pray on time", 10, High),
    entry("📿", "Adhkar", 10, Normal),
    entry("📖", "Read Quran", 15, Normal),
];

const OTHER: &[Entry] = &[
    with_suffix(entry("😴", "Power nap", 20, Normal), " (nap)"),
    with_suffix(entry("🛌", "Full sleep cycle", 90, Normal), " (sleep cycle)"),
    entry("🧹", "Quick tidy", 15, Normal),
];

fn table(category: Category, mode: WeekMode, hour: u32) -> &'static [Entry] {
    match category {
        Category::Study | Category::Work => match mode {
            WeekMode::Crunch => CRUNCH,
            WeekMode::Light => LIGHT,
            WeekMode::Review => REVIEW,
            WeekMode::Standard => match DayPart::from_hour(hour) {
                DayPart::Morning => FOCUS_MORNING,
                DayPart::Afternoon => FOCUS_AFTERNOON,
                DayPart::Evening => FOCUS_EVENING,
            },
        },
        Category::Habit => HABIT,
        Category::Prayer => PRAYER,
        Category::Other => OTHER,
    }
}

/// Ordered suggestions for a category, week mode and local hour.
pub fn suggest(category: Category, mode: WeekMode, hour: u32) -> Vec<Suggestion> {
    table(category, mode, hour)
        .iter()
        .map(|s| Suggestion {
            icon: s.icon.to_string(),
            label: s.label.to_string(),
            duration: s.duration,
            priority: s.priority,
            title_suffix: s.suffix.map(str::to_string),
        })
        .collect()
}

/// [`suggest`] using the local hour of `now` in `tz`.
pub fn suggest_at<Z: TimeZone>(category: Category, mode: WeekMode, now: DateTime<Utc>, tz: &Z) -> Vec<Suggestion> {
    suggest(category, mode, local_hour(now, tz))
}
