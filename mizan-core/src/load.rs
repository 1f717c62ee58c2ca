//! Psychological load: how full the remaining day feels.
//!
//! contribution = minutes x priority weight x friction penalty, summed over
//! uncompleted tasks and expressed as a percentage of daily capacity.

use serde::{Deserialize, Serialize};

use crate::task::{Category, Priority, Task};

/// Default daily capacity baseline, in minutes.
pub const DAILY_CAPACITY_MINUTES: u32 = 480;

/// Load above which low-value tasks are silently demoted.
pub const SHADOW_NEGOTIATION_THRESHOLD: f64 = 85.0;

/// Score forced onto demoted tasks.
pub const DEMOTED_SCORE: i32 = 10;

pub fn priority_weight(priority: Priority) -> f64 {
    match priority {
        Priority::High => 2.0,
        Priority::Normal => 1.0,
    }
}

/// Each deferral makes a task weigh 20% more.
pub fn friction_penalty(postponed_count: u32) -> f64 {
    1.0 + 0.2 * f64::from(postponed_count)
}

fn contribution(task: &Task) -> f64 {
    f64::from(task.estimated_minutes) * priority_weight(task.priority) * friction_penalty(task.postponed_count)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Display score, rounded and clamped to 0..=100.
    pub score: u8,
    /// Unclamped percentage of capacity.
    pub raw: f64,
    /// `raw > 100`: more work than the day can hold.
    pub survival_mode: bool,
}

/// Unclamped load percentage against `capacity_minutes`.
pub fn raw_load(tasks: &[Task], capacity_minutes: u32) -> f64 {
    let capacity = f64::from(capacity_minutes.max(1));
    let total: f64 = tasks.iter().filter(|t| !t.is_completed).map(contribution).sum();
    total / capacity * 100.0
}

pub fn load_report(tasks: &[Task], capacity_minutes: u32) -> LoadReport {
    let raw = raw_load(tasks, capacity_minutes);
    LoadReport {
        score: raw.round().clamp(0.0, 100.0) as u8,
        raw,
        survival_mode: raw > 100.0,
    }
}

/// Display load score (0..=100) against the default capacity.
pub fn compute_load(tasks: &[Task]) -> u8 {
    load_report(tasks, DAILY_CAPACITY_MINUTES).score
}

/// True when the unclamped load exceeds capacity.
pub fn is_overloaded(tasks: &[Task]) -> bool {
    load_report(tasks, DAILY_CAPACITY_MINUTES).survival_mode
}

#[derive(Debug, Clone, PartialEq)]
pub struct Negotiation {
    pub tasks: Vec<Task>,
    /// Ids of tasks that were demoted, in input order.
    pub demoted: Vec<String>,
}

/// Shadow negotiation: when load exceeds 85, demote every uncompleted
/// Normal-priority, non-Prayer task without deleting it.
///
/// Demoted tasks lose their scheduling slot and get [`DEMOTED_SCORE`].
pub fn shadow_negotiate(tasks: &[Task], capacity_minutes: u32) -> Negotiation {
    let raw = raw_load(tasks, capacity_minutes);
    if raw <= SHADOW_NEGOTIATION_THRESHOLD {
        return Negotiation {
            tasks: tasks.to_vec(),
            demoted: vec![],
        };
    }

    let mut demoted = Vec::new();
    let tasks = tasks
        .iter()
        .cloned()
        .map(|mut t| {
            if !t.is_completed && t.priority == Priority::Normal && t.category != Category::Prayer {
                t.scheduled_at = None;
                t.priority_score = DEMOTED_SCORE;
                demoted.push(t.id.clone());
            }
            t
        })
        .collect();

    tracing::debug!(raw, demoted = demoted.len(), "shadow negotiation demoted tasks");

    Negotiation { tasks, demoted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn task(id: &str, priority: Priority, minutes: u32) -> Task {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        Task::new(id, id, now).with_priority(priority).with_minutes(minutes)
    }

    #[test]
    fn empty_task_set_has_zero_load() {
        assert_eq!(compute_load(&[]), 0);
        assert!(!is_overloaded(&[]));
    }

    #[test]
    fn high_and_normal_hour_rounds_to_38() {
        let tasks = vec![task("a", Priority::High, 60), task("b", Priority::Normal, 60)];
        assert_eq!(compute_load(&tasks), 38);
    }

    #[test]
    fn completed_tasks_do_not_count() {
        let tasks = vec![task("a", Priority::High, 240).completed()];
        assert_eq!(compute_load(&tasks), 0);
    }

    #[test]
    fn postponing_never_lowers_load() {
        let mut prev = 0;
        for n in 0..6 {
            let tasks = vec![task("a", Priority::Normal, 90).with_postponed(n)];
            let load = compute_load(&tasks);
            assert!(load >= prev);
            prev = load;
        }
    }

    #[test]
    fn score_clamps_but_raw_keeps_survival_mode() {
        let tasks = vec![task("a", Priority::High, 300)];
        let report = load_report(&tasks, DAILY_CAPACITY_MINUTES);
        assert_eq!(report.score, 100);
        assert!(report.raw > 100.0);
        assert!(report.survival_mode);

        // Exactly at capacity is not survival mode.
        let tasks = vec![task("a", Priority::Normal, 480)];
        assert_eq!(compute_load(&tasks), 100);
        assert!(!is_overloaded(&tasks));
    }

    #[test]
    fn shadow_negotiation_only_above_threshold() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let calm = vec![task("a", Priority::Normal, 60).scheduled(now)];
        let out = shadow_negotiate(&calm, DAILY_CAPACITY_MINUTES);
        assert!(out.demoted.is_empty());
        assert_eq!(out.tasks, calm);
    }

    #[test]
    fn shadow_negotiation_spares_high_prayer_and_completed() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let tasks = vec![
            task("deep", Priority::High, 200),
            task("chore", Priority::Normal, 120).scheduled(now),
            task("fajr", Priority::Normal, 15).with_category(Category::Prayer),
            task("done", Priority::Normal, 30).completed(),
        ];
        let out = shadow_negotiate(&tasks, DAILY_CAPACITY_MINUTES);

        assert_eq!(out.demoted, vec!["chore".to_string()]);
        assert_eq!(out.tasks.len(), 4);
        let chore = &out.tasks[1];
        assert_eq!(chore.scheduled_at, None);
        assert_eq!(chore.priority_score, DEMOTED_SCORE);
        assert_eq!(out.tasks[0].priority_score, 0);
    }
}
