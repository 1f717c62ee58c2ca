//! Badge engine: a declarative rule table evaluated against a snapshot.
//!
//! Each badge id maps to one [`BadgeRule`]: the actions that trigger it and a
//! progress function over [`RuleContext`]. Adding a badge means adding a
//! catalog entry and a rule row, never a new branch in the evaluator.
//!
//! Invariants:
//! - progress never decreases;
//! - an unlocked badge never re-locks and `unlocked_at` is written once;
//! - actions no rule listens to leave the badges untouched.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{BehaviorEvent, EventPayload};
use crate::task::{Category, Habit, Task};
use crate::time::{days_between, elapsed, local_day};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tier: Tier,
    pub is_locked: bool,
    /// 0..=100.
    pub progress: u8,
    pub unlocked_at: Option<DateTime<Utc>>,
}

struct CatalogEntry {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    tier: Tier,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "quiet-starter",
        name: "Quiet Starter",
        description: "Open the app three days in a row.",
        tier: Tier::Bronze,
    },
    CatalogEntry {
        id: "the-resilient",
        name: "The Resilient",
        description: "Come back after more than two days away.",
        tier: Tier::Silver,
    },
    CatalogEntry {
        id: "self-honest",
        name: "Self-Honest",
        description: "Correct your own task estimates honestly.",
        tier: Tier::Bronze,
    },
    CatalogEntry {
        id: "smart-planner",
        name: "Smart Planner",
        description: "Plan with the assistant three times.",
        tier: Tier::Silver,
    },
    CatalogEntry {
        id: "soul-balance",
        name: "Soul Balance",
        description: "Balance prayer, habits and focused work in a single day.",
        tier: Tier::Gold,
    },
    CatalogEntry {
        id: "realist",
        name: "Realist",
        description: "Finish at least 80% of a day holding five or more tasks.",
        tier: Tier::Gold,
    },
    CatalogEntry {
        id: "prayer-guardian",
        name: "Prayer Guardian",
        description: "Keep every prayer on time.",
        tier: Tier::Gold,
    },
];

/// Fresh, fully locked badge set in catalog order.
pub fn seed_catalog() -> Vec<Badge> {
    CATALOG
        .iter()
        .map(|c| Badge {
            id: c.id.to_string(),
            name: c.name.to_string(),
            description: c.description.to_string(),
            tier: c.tier,
            is_locked: true,
            progress: 0,
            unlocked_at: None,
        })
        .collect()
}

/// Trigger kinds, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AppOpen,
    CompleteTask,
    UpdateTaskHonest,
    UseAi,
    DailyCompletionCheck,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::AppOpen => "app_open",
            ActionKind::CompleteTask => "complete_task",
            ActionKind::UpdateTaskHonest => "update_task_honest",
            ActionKind::UseAi => "use_ai",
            ActionKind::DailyCompletionCheck => "daily_completion_check",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "app_open" => ActionKind::AppOpen,
            "complete_task" => ActionKind::CompleteTask,
            "update_task_honest" => ActionKind::UpdateTaskHonest,
            "use_ai" => ActionKind::UseAi,
            "daily_completion_check" => ActionKind::DailyCompletionCheck,
            other => bail!("unknown badge action: {other}"),
        })
    }
}

/// A qualifying action with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BadgeAction {
    AppOpen,
    CompleteTask { task_id: String },
    UpdateTaskHonest { task_id: String },
    UseAi,
    DailyCompletionCheck,
}

impl BadgeAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            BadgeAction::AppOpen => ActionKind::AppOpen,
            BadgeAction::CompleteTask { .. } => ActionKind::CompleteTask,
            BadgeAction::UpdateTaskHonest { .. } => ActionKind::UpdateTaskHonest,
            BadgeAction::UseAi => ActionKind::UseAi,
            BadgeAction::DailyCompletionCheck => ActionKind::DailyCompletionCheck,
        }
    }

    /// Build an action from its kind and an optional task id.
    pub fn from_parts(kind: ActionKind, task_id: Option<String>) -> anyhow::Result<Self> {
        Ok(match kind {
            ActionKind::AppOpen => BadgeAction::AppOpen,
            ActionKind::UseAi => BadgeAction::UseAi,
            ActionKind::DailyCompletionCheck => BadgeAction::DailyCompletionCheck,
            ActionKind::CompleteTask => match task_id {
                Some(task_id) => BadgeAction::CompleteTask { task_id },
                None => bail!("complete_task requires a task id"),
            },
            ActionKind::UpdateTaskHonest => match task_id {
                Some(task_id) => BadgeAction::UpdateTaskHonest { task_id },
                None => bail!("update_task_honest requires a task id"),
            },
        })
    }

    /// The badge action implied by a logged event, if any.
    pub fn from_event(event: &BehaviorEvent) -> Option<Self> {
        match &event.payload {
            EventPayload::AppOpen => Some(BadgeAction::AppOpen),
            EventPayload::UseAi { .. } => Some(BadgeAction::UseAi),
            EventPayload::TaskComplete {
                task_id: Some(task_id),
                ..
            } => Some(BadgeAction::CompleteTask {
                task_id: task_id.clone(),
            }),
            _ => None,
        }
    }
}

/// Counters the rules read but the task snapshot cannot provide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeLedger {
    pub ai_usage_count: u32,
    pub honest_updates: u32,
    /// `task_id@date` keys already counted, so a repeat on the same day is a no-op.
    #[serde(default)]
    pub honest_keys: BTreeSet<String>,
    pub open_streak_days: u32,
    pub last_open_day: Option<NaiveDate>,
    pub last_visit: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeState {
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub ledger: BadgeLedger,
}

impl Default for BadgeState {
    fn default() -> Self {
        Self {
            badges: seed_catalog(),
            ledger: BadgeLedger::default(),
        }
    }
}

impl BadgeState {
    pub fn get(&self, id: &str) -> Option<&Badge> {
        self.badges.iter().find(|b| b.id == id)
    }
}

/// What a rule may look at.
pub struct RuleContext<'a> {
    pub ledger: &'a BadgeLedger,
    /// Time since the visit before this one, for `app_open`.
    pub gap_since_last_visit: Option<Duration>,
    /// Tasks whose deadline falls on the current local day.
    pub tasks_today: Vec<&'a Task>,
    pub habits: &'a [Habit],
}

pub struct BadgeRule {
    pub id: &'static str,
    pub triggers: &'static [ActionKind],
    pub progress: fn(&RuleContext<'_>) -> u32,
}

pub const RULES: &[BadgeRule] = &[
    BadgeRule {
        id: "quiet-starter",
        triggers: &[ActionKind::AppOpen],
        progress: |ctx| ctx.ledger.open_streak_days * 100 / 3,
    },
    BadgeRule {
        id: "the-resilient",
        triggers: &[ActionKind::AppOpen],
        progress: |ctx| match ctx.gap_since_last_visit {
            Some(gap) if gap > Duration::days(2) => 100,
            _ => 0,
        },
    },
    BadgeRule {
        id: "self-honest",
        triggers: &[ActionKind::UpdateTaskHonest],
        progress: |ctx| ctx.ledger.honest_updates * 20,
    },
    BadgeRule {
        id: "smart-planner",
        triggers: &[ActionKind::UseAi],
        progress: |ctx| ctx.ledger.ai_usage_count * 100 / 3,
    },
    BadgeRule {
        id: "soul-balance",
        triggers: &[ActionKind::CompleteTask, ActionKind::DailyCompletionCheck],
        progress: soul_balance,
    },
    BadgeRule {
        id: "realist",
        triggers: &[ActionKind::DailyCompletionCheck],
        progress: realist,
    },
];

fn soul_balance(ctx: &RuleContext<'_>) -> u32 {
    let done = |pred: fn(Category) -> bool| {
        ctx.tasks_today
            .iter()
            .any(|t| t.is_completed && pred(t.category))
    };
    let prayed = done(|c| c == Category::Prayer);
    let focused = done(|c| c.is_focus());
    let habit = ctx.habits.iter().any(|h| h.is_completed_today);
    if prayed && focused && habit { 100 } else { 0 }
}

fn realist(ctx: &RuleContext<'_>) -> u32 {
    let total = ctx.tasks_today.len();
    if total < 5 {
        return 0;
    }
    let done = ctx.tasks_today.iter().filter(|t| t.is_completed).count();
    if done * 100 >= total * 80 { 100 } else { 0 }
}

pub fn rule_for(id: &str) -> Option<&'static BadgeRule> {
    RULES.iter().find(|r| r.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeOutcome {
    pub state: BadgeState,
    /// First badge unlocked by this call, in catalog order.
    pub newly_unlocked: Option<Badge>,
    /// Any further badges unlocked by the same call, in catalog order.
    pub also_unlocked: Vec<Badge>,
}

impl BadgeOutcome {
    /// Every badge unlocked by this call, in catalog order.
    pub fn unlocked(&self) -> impl Iterator<Item = &Badge> {
        self.newly_unlocked.iter().chain(&self.also_unlocked)
    }
}

/// Apply one action against the current tasks and habits.
pub fn apply_action<Z: TimeZone>(
    state: &BadgeState,
    tasks: &[Task],
    habits: &[Habit],
    action: &BadgeAction,
    now: DateTime<Utc>,
    tz: &Z,
) -> BadgeOutcome {
    let today = local_day(now, tz);
    let previous_visit = state.ledger.last_visit;
    let ledger = advance_ledger(&state.ledger, action, now, today);

    let ctx = RuleContext {
        ledger: &ledger,
        gap_since_last_visit: match action {
            BadgeAction::AppOpen => previous_visit.map(|v| elapsed(v, now)),
            _ => None,
        },
        tasks_today: tasks
            .iter()
            .filter(|t| local_day(t.deadline, tz) == today)
            .collect(),
        habits,
    };

    let kind = action.kind();
    let mut newly_unlocked = None;
    let mut also_unlocked = Vec::new();
    let mut badges = state.badges.clone();

    for badge in badges.iter_mut().filter(|b| b.is_locked) {
        let Some(rule) = rule_for(&badge.id) else { continue };
        if !rule.triggers.contains(&kind) {
            continue;
        }

        let computed = (rule.progress)(&ctx).min(100) as u8;
        let progress = badge.progress.max(computed);
        if progress >= 100 {
            badge.is_locked = false;
            badge.progress = 100;
            badge.unlocked_at = Some(now);
            tracing::info!(badge = %badge.id, action = %kind, "badge unlocked");
            if newly_unlocked.is_none() {
                newly_unlocked = Some(badge.clone());
            } else {
                also_unlocked.push(badge.clone());
            }
        } else {
            badge.progress = progress;
        }
    }

    BadgeOutcome {
        state: BadgeState { badges, ledger },
        newly_unlocked,
        also_unlocked,
    }
}

fn advance_ledger(ledger: &BadgeLedger, action: &BadgeAction, now: DateTime<Utc>, today: NaiveDate) -> BadgeLedger {
    let mut next = ledger.clone();
    match action {
        BadgeAction::AppOpen => {
            next.open_streak_days = match ledger.last_open_day {
                Some(day) if day == today => ledger.open_streak_days.max(1),
                Some(day) if days_between(day, today) == 1 => ledger.open_streak_days + 1,
                _ => 1,
            };
            next.last_open_day = Some(today);
            next.last_visit = Some(now);
        }
        BadgeAction::UpdateTaskHonest { task_id } => {
            if next.honest_keys.insert(format!("{task_id}@{today}")) {
                next.honest_updates += 1;
            }
        }
        BadgeAction::UseAi => next.ai_usage_count += 1,
        BadgeAction::CompleteTask { .. } | BadgeAction::DailyCompletionCheck => {}
    }
    next
}
