//! Snapshot + reducer: the single mutation entry point.
//!
//! `reduce` reads a snapshot, applies exactly one command and returns the
//! next snapshot. It logs the behaviour event the command implies, runs the
//! badge engine for any qualifying action and refreshes the persona. Callers
//! publish the returned state as a whole, so readers never see a partial
//! update. Hosts with concurrent writers must serialize `reduce` per user.

use std::cell::OnceCell;

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::badges::{apply_action, Badge, BadgeAction, BadgeState};
use crate::events::{BehaviorEvent, EventPayload};
use crate::load::{load_report, shadow_negotiate, LoadReport, DAILY_CAPACITY_MINUTES};
use crate::persona::Persona;
use crate::priority::{rank_tasks, score_task};
use crate::suggestions::WeekMode;
use crate::task::{Habit, Task};
use crate::time::local_day;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Bumped by every command that changes something.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub events: Vec<BehaviorEvent>,
    #[serde(default)]
    pub badges: BadgeState,
    #[serde(default)]
    pub persona: Persona,
    #[serde(default)]
    pub week_mode: WeekMode,
    #[serde(default = "default_capacity")]
    pub capacity_minutes: u32,
    /// One-slot undo buffer for the most recent delete.
    #[serde(default)]
    pub last_deleted: Option<Task>,
    /// Unlocked badges still waiting to be celebrated, oldest first.
    #[serde(default)]
    pub pending_unlocks: Vec<Badge>,

    #[serde(skip)]
    load_memo: OnceCell<LoadReport>,
}

fn default_capacity() -> u32 {
    DAILY_CAPACITY_MINUTES
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            revision: 0,
            tasks: vec![],
            habits: vec![],
            events: vec![],
            badges: BadgeState::default(),
            persona: Persona::default(),
            week_mode: WeekMode::default(),
            capacity_minutes: DAILY_CAPACITY_MINUTES,
            last_deleted: None,
            pending_unlocks: vec![],
            load_memo: OnceCell::new(),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load report, computed once per snapshot.
    pub fn load(&self) -> LoadReport {
        *self
            .load_memo
            .get_or_init(|| load_report(&self.tasks, self.capacity_minutes))
    }

    pub fn ranked(&self, now: DateTime<Utc>) -> Vec<Task> {
        rank_tasks(&self.tasks, now)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut Task> {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(t) => Ok(t),
            None => bail!("unknown task id: {id}"),
        }
    }

    fn habit_mut(&mut self, id: &str) -> Result<&mut Habit> {
        match self.habits.iter_mut().find(|h| h.id == id) {
            Some(h) => Ok(h),
            None => bail!("unknown habit id: {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    OpenApp,
    AddTask { task: Task },
    /// `honest` marks a self-correction (e.g. a more realistic estimate).
    EditTask {
        task: Task,
        #[serde(default)]
        honest: bool,
    },
    CompleteTask { task_id: String },
    /// Credit a self-correction without changing the task.
    HonestUpdate { task_id: String },
    PostponeTask { task_id: String },
    DeleteTask { task_id: String },
    UndoDelete,
    AddHabit { habit: Habit },
    ToggleHabit { habit_id: String },
    StartNewDay,
    LogEvent { event: EventPayload },
    UseAi {
        #[serde(default)]
        feature: Option<String>,
    },
    RecordFocusSession { minutes: u32 },
    DailyCompletionCheck,
    ShadowNegotiate,
    SetMood { mood: Option<String> },
    SetIntention { intention: Option<String> },
    SetWeekMode { mode: WeekMode },
    SetCapacity { minutes: u32 },
}

impl From<BadgeAction> for Command {
    fn from(action: BadgeAction) -> Self {
        match action {
            BadgeAction::AppOpen => Command::OpenApp,
            BadgeAction::CompleteTask { task_id } => Command::CompleteTask { task_id },
            BadgeAction::UpdateTaskHonest { task_id } => Command::HonestUpdate { task_id },
            BadgeAction::UseAi => Command::UseAi { feature: None },
            BadgeAction::DailyCompletionCheck => Command::DailyCompletionCheck,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: AppState,
    /// Badge to celebrate this cycle, if any. Others unlocked alongside it
    /// wait in `state.pending_unlocks` and surface on later commands.
    pub unlocked: Option<Badge>,
    /// Task ids demoted by shadow negotiation.
    pub demoted: Vec<String>,
}

impl Transition {
    fn unchanged(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            unlocked: None,
            demoted: vec![],
        }
    }
}

/// Apply one command to `state` at `now`.
pub fn reduce<Z: TimeZone>(state: &AppState, command: Command, now: DateTime<Utc>, tz: &Z) -> Result<Transition> {
    let mut next = state.clone();
    next.load_memo = OnceCell::new();

    let today = local_day(now, tz);
    let mut logged: Vec<EventPayload> = Vec::new();
    let mut actions: Vec<BadgeAction> = Vec::new();
    let mut demoted = Vec::new();

    tracing::debug!(?command, revision = state.revision, "reduce");

    match command {
        Command::OpenApp => logged.push(EventPayload::AppOpen),

        Command::AddTask { mut task } => {
            task.validate().map_err(|e| anyhow::anyhow!("invalid task: {e}"))?;
            if next.task(&task.id).is_some() {
                bail!("duplicate task id: {}", task.id);
            }
            task.priority_score = score_task(&task, now);
            next.tasks.push(task);
        }

        Command::EditTask { task, honest } => {
            task.validate().map_err(|e| anyhow::anyhow!("invalid task: {e}"))?;
            let slot = next.task_mut(&task.id)?;
            let mut edited = Task {
                created_at: slot.created_at,
                postponed_count: slot.postponed_count,
                is_completed: slot.is_completed,
                ..task
            };
            edited.priority_score = score_task(&edited, now);
            *slot = edited;
            if honest {
                actions.push(BadgeAction::UpdateTaskHonest {
                    task_id: slot.id.clone(),
                });
            }
        }

        Command::CompleteTask { task_id } => {
            let task = next.task_mut(&task_id)?;
            if task.is_completed {
                return Ok(Transition::unchanged(state));
            }
            task.is_completed = true;
            logged.push(EventPayload::TaskComplete {
                task_id: Some(task.id.clone()),
                estimated_minutes: Some(task.estimated_minutes),
                category: Some(task.category),
            });
        }

        Command::HonestUpdate { task_id } => {
            if next.task(&task_id).is_none() {
                bail!("unknown task id: {task_id}");
            }
            actions.push(BadgeAction::UpdateTaskHonest { task_id });
        }

        Command::PostponeTask { task_id } => {
            let task = next.task_mut(&task_id)?;
            if task.is_completed {
                bail!("cannot postpone completed task: {task_id}");
            }
            task.postponed_count += 1;
            task.deadline += Duration::days(1);
            task.scheduled_at = None;
            task.priority_score = score_task(task, now);
            logged.push(EventPayload::TaskPostpone { task_id: Some(task_id) });
        }

        Command::DeleteTask { task_id } => {
            let Some(idx) = next.tasks.iter().position(|t| t.id == task_id) else {
                bail!("unknown task id: {task_id}");
            };
            next.last_deleted = Some(next.tasks.remove(idx));
        }

        Command::UndoDelete => match next.last_deleted.take() {
            Some(task) if next.task(&task.id).is_none() => next.tasks.push(task),
            _ => return Ok(Transition::unchanged(state)),
        },

        Command::AddHabit { habit } => {
            if habit.id.trim().is_empty() {
                bail!("habit id must be non-empty");
            }
            if next.habits.iter().any(|h| h.id == habit.id) {
                bail!("duplicate habit id: {}", habit.id);
            }
            next.habits.push(habit);
        }

        Command::ToggleHabit { habit_id } => {
            let habit = next.habit_mut(&habit_id)?;
            habit.roll_over(today);
            habit.is_completed_today = !habit.is_completed_today;
            if habit.is_completed_today {
                habit.streak_count += 1;
            } else {
                habit.streak_count = habit.streak_count.saturating_sub(1);
            }
        }

        Command::StartNewDay => {
            for habit in next.habits.iter_mut() {
                habit.roll_over(today);
            }
        }

        Command::LogEvent { event } => logged.push(event),

        Command::UseAi { feature } => logged.push(EventPayload::UseAi { feature }),

        Command::RecordFocusSession { minutes } => {
            next.persona.add_focus_minutes(minutes);
            logged.push(EventPayload::FocusSessionComplete { minutes: Some(minutes) });
        }

        Command::DailyCompletionCheck => actions.push(BadgeAction::DailyCompletionCheck),

        Command::ShadowNegotiate => {
            let out = shadow_negotiate(&next.tasks, next.capacity_minutes);
            if out.demoted.is_empty() {
                return Ok(Transition::unchanged(state));
            }
            next.tasks = out.tasks;
            demoted = out.demoted;
            logged.push(EventPayload::DetoxTasks {
                task_ids: demoted.clone(),
            });
        }

        Command::SetMood { mood } => next.persona.current_mood = mood,
        Command::SetIntention { intention } => next.persona.daily_intention = intention,
        Command::SetWeekMode { mode } => next.week_mode = mode,
        Command::SetCapacity { minutes } => next.capacity_minutes = minutes.max(1),
    }

    let logged_any = !logged.is_empty();
    let mut queue = Vec::new();
    for payload in logged {
        let event = BehaviorEvent::new(payload, now);
        queue.extend(BadgeAction::from_event(&event));
        next.events.push(event);
    }
    queue.extend(actions);

    for action in &queue {
        let out = apply_action(&next.badges, &next.tasks, &next.habits, action, now, tz);
        next.pending_unlocks.extend(out.unlocked().cloned());
        next.badges = out.state;
    }
    let unlocked = (!next.pending_unlocks.is_empty()).then(|| next.pending_unlocks.remove(0));

    if logged_any {
        next.persona = next.persona.refreshed(&next.events, tz);
    }

    next.revision += 1;

    Ok(Transition {
        state: next,
        unlocked,
        demoted,
    })
}
