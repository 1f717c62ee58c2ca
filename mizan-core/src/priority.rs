//! Dynamic per-task rank score and the stable ranking order.

use chrono::{DateTime, Duration, Utc};

use crate::task::{Priority, Task};

fn priority_weight(priority: Priority) -> f64 {
    match priority {
        Priority::High => 10.0,
        Priority::Normal => 2.0,
    }
}

fn due_soon_weight(deadline: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let left = deadline - now;
    if left < Duration::zero() {
        15.0
    } else if left <= Duration::hours(24) {
        10.0
    } else if left <= Duration::hours(48) {
        5.0
    } else {
        0.0
    }
}

fn complexity_weight(minutes: u32) -> f64 {
    (f64::from(minutes) / 25.0).min(5.0)
}

/// Ranking friction grows faster than load friction: +50% per deferral.
fn friction_penalty(postponed_count: u32) -> f64 {
    1.0 + 0.5 * f64::from(postponed_count)
}

/// Integer rank score for one task at `now`.
pub fn score_task(task: &Task, now: DateTime<Utc>) -> i32 {
    let base = priority_weight(task.priority) * 2.0
        + due_soon_weight(task.deadline, now) * 3.0
        + complexity_weight(task.estimated_minutes);
    (base * friction_penalty(task.postponed_count)).round() as i32
}

/// Recompute every score and order: uncompleted first, then score
/// descending. Ties keep their input order.
pub fn rank_tasks(tasks: &[Task], now: DateTime<Utc>) -> Vec<Task> {
    let mut out: Vec<Task> = tasks
        .iter()
        .cloned()
        .map(|mut t| {
            t.priority_score = score_task(&t, now);
            t
        })
        .collect();

    // sort_by is stable
    out.sort_by(|a, b| {
        a.is_completed
            .cmp(&b.is_completed)
            .then_with(|| b.priority_score.cmp(&a.priority_score))
    });
    out
}
