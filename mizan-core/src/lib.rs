//! mizan-core: load, priority, persona, badges and text signals for a
//! personal task and habit companion.

pub mod badges;
pub mod coach;
pub mod decision;
pub mod events;
pub mod load;
pub mod parser;
pub mod persona;
pub mod priority;
pub mod state;
pub mod suggestions;
pub mod task;
pub mod time;

pub use badges::{apply_action, seed_catalog, ActionKind, Badge, BadgeAction, BadgeOutcome, BadgeState, Tier};
pub use coach::{nudge_message, TextGenerator};
pub use decision::{evaluate, evaluate_with_capacity, Decision, DecisionKind, DecisionPayload};
pub use events::{BehaviorEvent, EventPayload, EventType};
pub use load::{compute_load, is_overloaded, load_report, shadow_negotiate, LoadReport, Negotiation};
pub use parser::parse_free_text;
pub use persona::{profile, CompletionStyle, EnergyProfile, Persona};
pub use priority::{rank_tasks, score_task};
pub use state::{reduce, AppState, Command, Transition};
pub use suggestions::{suggest, suggest_at, Suggestion, WeekMode};
pub use task::{Category, Habit, Priority, Task, TaskDraft};
