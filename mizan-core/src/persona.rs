//! Persona profiler: behavioural traits inferred from the event log.
//!
//! Derived traits are recomputed from the whole log every time, never patched
//! incrementally, so they cannot drift from the log.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{count_kind, last_of_kind, BehaviorEvent, EventPayload, EventType};
use crate::time::{elapsed, local_hour};

/// Completions needed before any trait is inferred.
pub const MIN_COMPLETIONS: usize = 5;

pub const DEFAULT_OVERWHELM_TRIGGER: u32 = 5;

/// Minimum spacing between two follow-up prompts.
pub const SOFT_ASK_COOLDOWN_HOURS: i64 = 24;

const DEFAULT_TASK_MINUTES: f64 = 30.0;
const MARATHON_MINUTES: f64 = 45.0;
const DOMINANT_SHARE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyProfile {
    MorningPerson,
    NightOwl,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStyle {
    Sprinter,
    Marathoner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub energy_profile: EnergyProfile,
    pub completion_style: CompletionStyle,
    pub overwhelm_trigger: u32,
    /// Accumulated focus time, in hours.
    pub deep_work_hours: f64,
    pub current_mood: Option<String>,
    pub daily_intention: Option<String>,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            energy_profile: EnergyProfile::Mixed,
            completion_style: CompletionStyle::Sprinter,
            overwhelm_trigger: DEFAULT_OVERWHELM_TRIGGER,
            deep_work_hours: 0.0,
            current_mood: None,
            daily_intention: None,
        }
    }
}

impl Persona {
    /// Recompute the derived traits from `events`, keeping the user-owned
    /// fields (mood, intention, deep-work hours) as they are.
    ///
    /// With too little signal the persona is returned unchanged.
    pub fn refreshed<Z: TimeZone>(&self, events: &[BehaviorEvent], tz: &Z) -> Persona {
        let Some(traits) = infer_traits(events, tz) else {
            return self.clone();
        };
        Persona {
            energy_profile: traits.energy_profile,
            completion_style: traits.completion_style,
            overwhelm_trigger: traits.overwhelm_trigger,
            ..self.clone()
        }
    }

    pub fn add_focus_minutes(&mut self, minutes: u32) {
        self.deep_work_hours += f64::from(minutes) / 60.0;
    }
}

/// Profile a fresh persona from the log.
pub fn profile<Z: TimeZone>(events: &[BehaviorEvent], tz: &Z) -> Persona {
    Persona::default().refreshed(events, tz)
}

struct Traits {
    energy_profile: EnergyProfile,
    completion_style: CompletionStyle,
    overwhelm_trigger: u32,
}

fn infer_traits<Z: TimeZone>(events: &[BehaviorEvent], tz: &Z) -> Option<Traits> {
    let completions: Vec<&BehaviorEvent> = events
        .iter()
        .filter(|e| e.kind() == EventType::TaskComplete)
        .collect();
    if completions.len() < MIN_COMPLETIONS {
        return None;
    }

    let total = completions.len() as f64;
    let (mut morning, mut night) = (0usize, 0usize);
    let mut minutes = 0.0;
    for ev in &completions {
        match local_hour(ev.timestamp, tz) {
            5..=11 => morning += 1,
            18..=23 | 0..=2 => night += 1,
            _ => {}
        }
        minutes += match &ev.payload {
            EventPayload::TaskComplete {
                estimated_minutes: Some(m),
                ..
            } => f64::from(*m),
            _ => DEFAULT_TASK_MINUTES,
        };
    }

    let energy_profile = if morning as f64 / total > DOMINANT_SHARE {
        EnergyProfile::MorningPerson
    } else if night as f64 / total > DOMINANT_SHARE {
        EnergyProfile::NightOwl
    } else {
        EnergyProfile::Mixed
    };

    let completion_style = if minutes / total >= MARATHON_MINUTES {
        CompletionStyle::Marathoner
    } else {
        CompletionStyle::Sprinter
    };

    let postpones = count_kind(events, EventType::TaskPostpone) as u32;
    let overwhelm_trigger = 8u32.saturating_sub(postpones / 2).max(3);

    Some(Traits {
        energy_profile,
        completion_style,
        overwhelm_trigger,
    })
}

/// A follow-up prompt may fire only if none fired in the last 24 hours.
pub fn can_soft_ask(last_prompt: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_prompt {
        None => true,
        Some(at) => elapsed(at, now) >= Duration::hours(SOFT_ASK_COOLDOWN_HOURS),
    }
}

/// Last time the user answered an idle prompt, read from the log.
pub fn last_prompt_at(events: &[BehaviorEvent]) -> Option<DateTime<Utc>> {
    last_of_kind(events, EventType::IdleExit).map(|e| e.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Category;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn complete(day: u32, hour: u32, minutes: Option<u32>) -> BehaviorEvent {
        BehaviorEvent::new(
            EventPayload::TaskComplete {
                task_id: None,
                estimated_minutes: minutes,
                category: Some(Category::Study),
            },
            at(day, hour),
        )
    }

    fn postpone(day: u32) -> BehaviorEvent {
        BehaviorEvent::new(EventPayload::TaskPostpone { task_id: None }, at(day, 12))
    }

    #[test]
    fn too_few_completions_keeps_default() {
        let events: Vec<_> = (1..=4).map(|d| complete(d, 7, Some(90))).collect();
        assert_eq!(profile(&events, &Utc), Persona::default());
    }

    #[test]
    fn five_of_six_morning_completions_is_morning_person() {
        let mut events: Vec<_> = (6..=10).map(|h| complete(1, h, None)).collect();
        events.push(complete(1, 20, None));
        let p = profile(&events, &Utc);
        assert_eq!(p.energy_profile, EnergyProfile::MorningPerson);
        assert_eq!(p.completion_style, CompletionStyle::Sprinter);
        assert_eq!(p.overwhelm_trigger, 8);
    }

    #[test]
    fn night_bucket_wraps_midnight() {
        let events: Vec<_> = [22, 23, 0, 1, 2, 14]
            .into_iter()
            .map(|h| complete(2, h, Some(60)))
            .collect();
        let p = profile(&events, &Utc);
        assert_eq!(p.energy_profile, EnergyProfile::NightOwl);
        assert_eq!(p.completion_style, CompletionStyle::Marathoner);
    }

    #[test]
    fn even_split_is_mixed() {
        let events: Vec<_> = [8, 9, 20, 21, 15]
            .into_iter()
            .map(|h| complete(3, h, Some(45)))
            .collect();
        let p = profile(&events, &Utc);
        assert_eq!(p.energy_profile, EnergyProfile::Mixed);
        assert_eq!(p.completion_style, CompletionStyle::Marathoner);
    }

    #[test]
    fn frequent_postponing_lowers_trigger_to_floor() {
        let mut events: Vec<_> = (6..=10).map(|h| complete(1, h, None)).collect();
        events.extend((1..=4).map(postpone));
        assert_eq!(profile(&events, &Utc).overwhelm_trigger, 6);

        events.extend((5..=20).map(postpone));
        assert_eq!(profile(&events, &Utc).overwhelm_trigger, 3);
    }

    #[test]
    fn refresh_keeps_user_fields() {
        let mut current = Persona::default();
        current.current_mood = Some("calm".to_string());
        current.add_focus_minutes(90);
        let events: Vec<_> = (6..=10).map(|h| complete(1, h, None)).collect();

        let next = current.refreshed(&events, &Utc);
        assert_eq!(next.current_mood.as_deref(), Some("calm"));
        assert_eq!(next.deep_work_hours, 1.5);
        assert_eq!(next.energy_profile, EnergyProfile::MorningPerson);
    }

    #[test]
    fn soft_ask_waits_a_full_day() {
        assert!(can_soft_ask(None, at(2, 9)));
        assert!(!can_soft_ask(Some(at(1, 10)), at(2, 9)));
        assert!(can_soft_ask(Some(at(1, 9)), at(2, 9)));

        let events = vec![BehaviorEvent::new(
            EventPayload::IdleExit {
                prompt_id: Some("p1".into()),
                choice: Some("later".into()),
            },
            at(1, 9),
        )];
        assert_eq!(last_prompt_at(&events), Some(at(1, 9)));
    }
}
