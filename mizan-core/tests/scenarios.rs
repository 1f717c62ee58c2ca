use chrono::{DateTime, Duration, TimeZone, Utc};
use mizan_core::badges::BadgeAction;
use mizan_core::load::{raw_load, DAILY_CAPACITY_MINUTES};
use mizan_core::time::local_day;
use mizan_core::{
    apply_action, compute_load, evaluate, parse_free_text, profile, rank_tasks, reduce, suggest, AppState, BadgeState,
    BehaviorEvent, Category, Command, DecisionKind, DecisionPayload, EnergyProfile, Priority, Task, WeekMode,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

fn mixed_tasks(now: DateTime<Utc>) -> Vec<Task> {
    vec![
        Task::new("a", "Thesis chapter", now)
            .with_priority(Priority::High)
            .with_minutes(180)
            .with_deadline(now + Duration::hours(5)),
        Task::new("b", "Groceries", now).with_minutes(45).with_postponed(2),
        Task::new("c", "Fajr", now).with_category(Category::Prayer).with_minutes(10).completed(),
        Task::new("d", "Gym", now).with_category(Category::Habit).with_minutes(60),
        Task::new("e", "Report", now)
            .with_category(Category::Work)
            .with_priority(Priority::High)
            .with_minutes(400)
            .with_deadline(now + Duration::days(4)),
    ]
}

#[test]
fn two_open_tasks_load_38() {
    let now = at(2, 8);
    let tasks = vec![
        Task::new("h", "High", now).with_priority(Priority::High).with_minutes(60),
        Task::new("n", "Normal", now).with_minutes(60),
    ];
    assert_eq!(compute_load(&tasks), 38);
}

#[test]
fn load_is_bounded_and_monotonic() {
    let now = at(2, 8);
    assert_eq!(compute_load(&[]), 0);

    let tasks = mixed_tasks(now);
    for n in 1..=tasks.len() {
        let score = compute_load(&tasks[..n]);
        assert!(score <= 100);
    }

    let mut previous = compute_load(&tasks[..2]);
    for postponed in 3..10 {
        let mut bumped = tasks[..2].to_vec();
        bumped[1].postponed_count = postponed;
        let score = compute_load(&bumped);
        assert!(score >= previous);
        previous = score;
    }
}

#[test]
fn load_never_drops_as_estimates_grow() {
    let now = at(2, 8);
    for priority in [Priority::High, Priority::Normal] {
        let mut tasks = mixed_tasks(now);
        tasks[1].priority = priority;
        tasks[1].estimated_minutes = 0;
        let mut previous_raw = raw_load(&tasks, DAILY_CAPACITY_MINUTES);
        let mut previous_score = compute_load(&tasks);
        for minutes in (0..=600).step_by(15) {
            tasks[1].estimated_minutes = minutes;
            let raw = raw_load(&tasks, DAILY_CAPACITY_MINUTES);
            let score = compute_load(&tasks);
            assert!(raw >= previous_raw, "{priority:?} at {minutes} min: {raw} < {previous_raw}");
            assert!(score >= previous_score, "{priority:?} at {minutes} min");
            assert!(score <= 100);
            previous_raw = raw;
            previous_score = score;
        }
    }
}

#[test]
fn ranking_puts_completed_last_and_is_idempotent() {
    let now = at(2, 8);
    let once = rank_tasks(&mixed_tasks(now), now);
    let first_done = once.iter().position(|t| t.is_completed).unwrap();
    assert!(once[first_done..].iter().all(|t| t.is_completed));
    assert_eq!(rank_tasks(&once, now), once);
}

#[test]
fn mostly_morning_completions_make_a_morning_person() {
    let mut events: Vec<BehaviorEvent> = (0..5)
        .map(|i| BehaviorEvent::task_complete(format!("m{i}"), 30, Category::Study, at(2 + i, 6 + i)))
        .collect();
    events.push(BehaviorEvent::task_complete("late", 30, Category::Work, at(8, 21)));

    assert_eq!(profile(&events, &Utc).energy_profile, EnergyProfile::MorningPerson);
}

#[test]
fn parse_study_tomorrow_two_hours() {
    let now = at(2, 8);
    let draft = parse_free_text("study math tomorrow for 2 hours", now, &Utc);
    assert_eq!(draft.category, Category::Study);
    assert_eq!(draft.estimated_minutes, 120);
    assert_eq!(draft.priority, Priority::Normal);
    assert_eq!(local_day(draft.deadline, &Utc), local_day(now, &Utc).succ_opt().unwrap());
    assert!(!draft.title.trim().is_empty());
}

#[test]
fn parser_never_returns_empty_titles() {
    let now = at(2, 8);
    for text in ["tomorrow", "2 hours", "بكرة", "مذاكرة", "  x  ", "at 5pm"] {
        let draft = parse_free_text(text, now, &Utc);
        assert!(!draft.title.trim().is_empty(), "{text:?}");
    }
}

#[test]
fn procrastination_below_overload() {
    let now = at(2, 14);
    let tasks = vec![
        Task::new("a", "Slides", now).with_minutes(120),
        Task::new("stuck", "Tax forms", now).with_minutes(100).with_postponed(3),
    ];
    let decision = evaluate(&tasks, now, &Utc).unwrap();
    assert_eq!(decision.kind, DecisionKind::Procrastination);
    assert_eq!(decision.payload, DecisionPayload::Procrastination { task_id: "stuck".into() });

    let mut heavy = tasks.clone();
    heavy.push(Task::new("big", "Move house", now).with_priority(Priority::High).with_minutes(200));
    assert_eq!(evaluate(&heavy, now, &Utc).unwrap().kind, DecisionKind::Overload);
}

#[test]
fn smart_planner_unlocks_on_third_ai_use() {
    let now = at(2, 9);
    let mut state = BadgeState::default();
    for n in 1..=3 {
        let out = apply_action(&state, &[], &[], &BadgeAction::UseAi, now, &Utc);
        assert_eq!(state.ledger.ai_usage_count + 1, out.state.ledger.ai_usage_count);
        match n {
            3 => assert_eq!(out.newly_unlocked.unwrap().id, "smart-planner"),
            _ => assert!(out.newly_unlocked.is_none()),
        }
        state = out.state;
    }
}

#[test]
fn unlocked_badges_stay_unlocked() {
    let now = at(2, 9);
    let mut state = BadgeState::default();
    for _ in 0..3 {
        state = apply_action(&state, &[], &[], &BadgeAction::UseAi, now, &Utc).state;
    }
    let actions = [
        BadgeAction::AppOpen,
        BadgeAction::DailyCompletionCheck,
        BadgeAction::CompleteTask { task_id: "x".into() },
        BadgeAction::UseAi,
    ];
    for action in &actions {
        state = apply_action(&state, &[], &[], action, now, &Utc).state;
        assert!(!state.get("smart-planner").unwrap().is_locked);
    }
}

#[test]
fn non_qualifying_action_is_a_no_op() {
    let now = at(2, 9);
    let state = BadgeState::default();
    let action = BadgeAction::CompleteTask { task_id: "nothing-today".into() };
    let once = apply_action(&state, &[], &[], &action, now, &Utc).state;
    let twice = apply_action(&once, &[], &[], &action, now, &Utc).state;
    assert_eq!(once, state);
    assert_eq!(
        serde_json::to_string(&twice).unwrap(),
        serde_json::to_string(&once).unwrap()
    );
}

#[test]
fn suggestions_cover_every_category_and_mode() {
    for category in Category::ALL {
        for mode in WeekMode::ALL {
            assert!(!suggest(category, mode, 9).is_empty());
        }
    }
}

#[test]
fn reducer_day_end_to_end() {
    let now = at(2, 7);
    let tasks = [
        Task::new("fajr", "Fajr", now).with_category(Category::Prayer).with_minutes(10),
        Task::new("read", "Read paper", now).with_category(Category::Study).with_minutes(60),
    ];

    let mut state = reduce(&AppState::new(), Command::OpenApp, now, &Utc).unwrap().state;
    for task in tasks {
        state = reduce(&state, Command::AddTask { task }, now, &Utc).unwrap().state;
    }
    let before = state.load();
    state = reduce(&state, Command::CompleteTask { task_id: "read".into() }, now, &Utc)
        .unwrap()
        .state;

    assert!(state.load().raw < before.raw);
    assert_eq!(state.revision, 4);
    assert_eq!(state.ranked(now).last().unwrap().id, "read");
}
