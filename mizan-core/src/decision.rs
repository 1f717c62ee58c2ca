//! Advisory decision heuristics.
//!
//! Signals are checked in a fixed order and the first match wins:
//! overload, then procrastination, then morning boost. Evaluation never
//! mutates anything; the host decides whether to show or dismiss.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::load::{raw_load, DAILY_CAPACITY_MINUTES};
use crate::task::{Priority, Task};
use crate::time::local_hour;

pub const OVERLOAD_THRESHOLD: f64 = 90.0;
pub const PROCRASTINATION_POSTPONES: u32 = 3;
/// Inclusive local-hour window for the morning boost.
pub const MORNING_BOOST_HOURS: (u32, u32) = (6, 10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Overload,
    Procrastination,
    MorningBoost,
}

impl DecisionKind {
    pub fn confidence(&self) -> f64 {
        match self {
            DecisionKind::Overload => 0.9,
            DecisionKind::Procrastination => 0.8,
            DecisionKind::MorningBoost => 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPayload {
    Overload { load: f64 },
    Procrastination { task_id: String },
    MorningBoost { task_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "type")]
    pub kind: DecisionKind,
    pub confidence: f64,
    pub payload: DecisionPayload,
}

impl Decision {
    fn new(kind: DecisionKind, payload: DecisionPayload) -> Self {
        Self {
            kind,
            confidence: kind.confidence(),
            payload,
        }
    }
}

/// At most one advisory signal for the current tasks at `now`.
pub fn evaluate<Z: TimeZone>(tasks: &[Task], now: DateTime<Utc>, tz: &Z) -> Option<Decision> {
    evaluate_with_capacity(tasks, now, tz, DAILY_CAPACITY_MINUTES)
}

pub fn evaluate_with_capacity<Z: TimeZone>(
    tasks: &[Task],
    now: DateTime<Utc>,
    tz: &Z,
    capacity_minutes: u32,
) -> Option<Decision> {
    let load = raw_load(tasks, capacity_minutes);
    if load > OVERLOAD_THRESHOLD {
        return Some(Decision::new(DecisionKind::Overload, DecisionPayload::Overload { load }));
    }

    let open = || tasks.iter().filter(|t| !t.is_completed);

    if let Some(stuck) = open().find(|t| t.postponed_count >= PROCRASTINATION_POSTPONES) {
        return Some(Decision::new(
            DecisionKind::Procrastination,
            DecisionPayload::Procrastination {
                task_id: stuck.id.clone(),
            },
        ));
    }

    let (from, to) = MORNING_BOOST_HOURS;
    if (from..=to).contains(&local_hour(now, tz)) {
        if let Some(high) = open().find(|t| t.priority == Priority::High) {
            return Some(Decision::new(
                DecisionKind::MorningBoost,
                DecisionPayload::MorningBoost {
                    task_id: high.id.clone(),
                },
            ));
        }
    }

    None
}
