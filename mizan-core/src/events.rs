//! Behaviour event log types.
//!
//! The log is append-only and is the single source of truth for persona
//! inference. Each event type carries its own payload shape; missing payload
//! fields deserialize to `None` rather than failing.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Category;

/// Closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TaskComplete,
    TaskPostpone,
    ZenModeEnter,
    UseAi,
    IdleExit,
    DetoxTasks,
    AppOpen,
    FocusSessionComplete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TaskComplete => "task_complete",
            EventType::TaskPostpone => "task_postpone",
            EventType::ZenModeEnter => "zen_mode_enter",
            EventType::UseAi => "use_ai",
            EventType::IdleExit => "idle_exit",
            EventType::DetoxTasks => "detox_tasks",
            EventType::AppOpen => "app_open",
            EventType::FocusSessionComplete => "focus_session_complete",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "task_complete" => EventType::TaskComplete,
            "task_postpone" => EventType::TaskPostpone,
            "zen_mode_enter" => EventType::ZenModeEnter,
            "use_ai" => EventType::UseAi,
            "idle_exit" => EventType::IdleExit,
            "detox_tasks" => EventType::DetoxTasks,
            "app_open" => EventType::AppOpen,
            "focus_session_complete" => EventType::FocusSessionComplete,
            other => bail!("unknown event type: {other}"),
        })
    }
}

/// Per-type payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    TaskComplete {
        #[serde(default)]
        task_id: Option<String>,
        #[serde(default)]
        estimated_minutes: Option<u32>,
        #[serde(default)]
        category: Option<Category>,
    },
    TaskPostpone {
        #[serde(default)]
        task_id: Option<String>,
    },
    ZenModeEnter,
    UseAi {
        /// Which assistant feature was invoked (e.g. "breakdown").
        #[serde(default)]
        feature: Option<String>,
    },
    IdleExit {
        #[serde(default)]
        prompt_id: Option<String>,
        #[serde(default)]
        choice: Option<String>,
    },
    DetoxTasks {
        /// Ids demoted by shadow negotiation.
        #[serde(default)]
        task_ids: Vec<String>,
    },
    AppOpen,
    FocusSessionComplete {
        #[serde(default)]
        minutes: Option<u32>,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventType {
        match self {
            EventPayload::TaskComplete { .. } => EventType::TaskComplete,
            EventPayload::TaskPostpone { .. } => EventType::TaskPostpone,
            EventPayload::ZenModeEnter => EventType::ZenModeEnter,
            EventPayload::UseAi { .. } => EventType::UseAi,
            EventPayload::IdleExit { .. } => EventType::IdleExit,
            EventPayload::DetoxTasks { .. } => EventType::DetoxTasks,
            EventPayload::AppOpen => EventType::AppOpen,
            EventPayload::FocusSessionComplete { .. } => EventType::FocusSessionComplete,
        }
    }

    /// Payload with every optional field left empty.
    pub fn bare(kind: EventType) -> Self {
        match kind {
            EventType::TaskComplete => EventPayload::TaskComplete {
                task_id: None,
                estimated_minutes: None,
                category: None,
            },
            EventType::TaskPostpone => EventPayload::TaskPostpone { task_id: None },
            EventType::ZenModeEnter => EventPayload::ZenModeEnter,
            EventType::UseAi => EventPayload::UseAi { feature: None },
            EventType::IdleExit => EventPayload::IdleExit {
                prompt_id: None,
                choice: None,
            },
            EventType::DetoxTasks => EventPayload::DetoxTasks { task_ids: vec![] },
            EventType::AppOpen => EventPayload::AppOpen,
            EventType::FocusSessionComplete => EventPayload::FocusSessionComplete { minutes: None },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl BehaviorEvent {
    pub fn new(payload: EventPayload, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, payload }
    }

    pub fn kind(&self) -> EventType {
        self.payload.kind()
    }

    pub fn task_complete(task_id: impl Into<String>, minutes: u32, category: Category, at: DateTime<Utc>) -> Self {
        Self::new(
            EventPayload::TaskComplete {
                task_id: Some(task_id.into()),
                estimated_minutes: Some(minutes),
                category: Some(category),
            },
            at,
        )
    }
}

/// Count events of one kind.
pub fn count_kind(events: &[BehaviorEvent], kind: EventType) -> usize {
    events.iter().filter(|e| e.kind() == kind).count()
}

/// Most recent event of one kind, by timestamp.
pub fn last_of_kind(events: &[BehaviorEvent], kind: EventType) -> Option<&BehaviorEvent> {
    events
        .iter()
        .filter(|e| e.kind() == kind)
        .max_by_key(|e| e.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_json_uses_flat_type_tag() {
        let at = Utc.with_ymd_and_hms(2026, 2, 21, 8, 25, 0).unwrap();
        let ev = BehaviorEvent::task_complete("t1", 45, Category::Study, at);

        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"task_complete\""));
        assert!(json.contains("\"task_id\":\"t1\""));
        assert!(json.contains("\"category\":\"study\""));

        let back: BehaviorEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn missing_metadata_defaults_per_field() {
        let json = r#"{"timestamp":"2026-02-21T08:25:00Z","type":"task_complete"}"#;
        let ev: BehaviorEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.payload, EventPayload::bare(EventType::TaskComplete));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let json = r#"{"timestamp":"2026-02-21T08:25:00Z","type":"teleport"}"#;
        assert!(serde_json::from_str::<BehaviorEvent>(json).is_err());
        assert!("teleport".parse::<EventType>().is_err());
        assert_eq!("idle_exit".parse::<EventType>().unwrap(), EventType::IdleExit);
    }
}
