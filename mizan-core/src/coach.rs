//! Seam to an external generative-text service.
//!
//! The core only builds prompt strings and passes the reply through as an
//! opaque string. Nothing here parses generated text.

use anyhow::Result;

use crate::decision::{Decision, DecisionPayload};
use crate::persona::Persona;
use crate::task::Task;

/// Prompt in, plain text out. Real adapters live in the host.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

pub fn nudge_prompt(decision: &Decision, persona: &Persona, tasks: &[Task]) -> String {
    let subject = match &decision.payload {
        DecisionPayload::Overload { load } => {
            format!("The user's day is overloaded (load {load:.0}% of capacity).")
        }
        DecisionPayload::Procrastination { task_id } => {
            let title = title_of(tasks, task_id);
            format!("The user keeps postponing \"{title}\".")
        }
        DecisionPayload::MorningBoost { task_id } => {
            let title = title_of(tasks, task_id);
            format!("It is morning and \"{title}\" is a high-priority task still open.")
        }
    };

    let mut prompt = String::new();
    prompt.push_str("You are a gentle productivity companion. Reply in one or two short sentences, ");
    prompt.push_str("in the same language the task titles use.\n\n");
    prompt.push_str(&subject);
    prompt.push_str(&format!(
        "\nEnergy profile: {:?}. Completion style: {:?}.",
        persona.energy_profile, persona.completion_style
    ));
    if let Some(intention) = &persona.daily_intention {
        prompt.push_str(&format!("\nToday's intention: {intention}."));
    }
    prompt
}

pub fn breakdown_prompt(task: &Task) -> String {
    format!(
        "Break the task \"{}\" ({} minutes, category {}) into at most five small first steps, one per line.",
        task.title, task.estimated_minutes, task.category
    )
}

/// Deterministic copy used when no generator is available or it fails.
pub fn fallback_message(decision: &Decision, tasks: &[Task]) -> String {
    match &decision.payload {
        DecisionPayload::Overload { .. } => {
            "Today looks heavier than your time allows. Pick one thing that matters and let the rest wait.".to_string()
        }
        DecisionPayload::Procrastination { task_id } => {
            format!("\"{}\" keeps slipping. Try just five minutes on it.", title_of(tasks, task_id))
        }
        DecisionPayload::MorningBoost { task_id } => {
            format!("Fresh morning energy: a good moment for \"{}\".", title_of(tasks, task_id))
        }
    }
}

/// Ask the generator for a nudge, falling back to fixed copy on error.
pub fn nudge_message<G: TextGenerator + ?Sized>(
    generator: &G,
    decision: &Decision,
    persona: &Persona,
    tasks: &[Task],
) -> String {
    match generator.generate(&nudge_prompt(decision, persona, tasks)) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => fallback_message(decision, tasks),
        Err(e) => {
            tracing::warn!(error = %e, "text generator failed, using fallback copy");
            fallback_message(decision, tasks)
        }
    }
}

fn title_of<'a>(tasks: &'a [Task], id: &str) -> &'a str {
    tasks
        .iter()
        .find(|t| t.id == id)
        .map(|t| t.title.as_str())
        .unwrap_or("this task")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionKind;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;

    struct Echo {
        seen: RefCell<Vec<String>>,
    }

    impl TextGenerator for Echo {
        fn generate(&self, prompt: &str) -> Result<String> {
            self.seen.borrow_mut().push(prompt.to_string());
            Ok("  keep going  ".to_string())
        }
    }

    struct Down;

    impl TextGenerator for Down {
        fn generate(&self, _prompt: &str) -> Result<String> {
            anyhow::bail!("service unavailable")
        }
    }

    fn stuck() -> (Decision, Vec<Task>) {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let tasks = vec![Task::new("t1", "Write thesis intro", now).with_postponed(3)];
        let decision = Decision {
            kind: DecisionKind::Procrastination,
            confidence: 0.8,
            payload: DecisionPayload::Procrastination { task_id: "t1".into() },
        };
        (decision, tasks)
    }

    #[test]
    fn generator_output_is_passed_through() {
        let (decision, tasks) = stuck();
        let echo = Echo { seen: RefCell::new(vec![]) };
        let msg = nudge_message(&echo, &decision, &Persona::default(), &tasks);
        assert_eq!(msg, "keep going");
        assert!(echo.seen.borrow()[0].contains("Write thesis intro"));
    }

    #[test]
    fn generator_failure_falls_back() {
        let (decision, tasks) = stuck();
        let msg = nudge_message(&Down, &decision, &Persona::default(), &tasks);
        assert!(msg.contains("Write thesis intro"));
        assert!(msg.contains("five minutes"));
    }
}
