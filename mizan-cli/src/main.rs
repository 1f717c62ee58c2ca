use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use mizan_core::badges::ActionKind;
use mizan_core::coach::{breakdown_prompt, fallback_message, nudge_message};
use mizan_core::persona::{can_soft_ask, last_prompt_at};
use mizan_core::time::{parse_instant, parse_tz};
use mizan_core::{
    evaluate_with_capacity, parse_free_text, reduce, suggest, suggest_at, AppState, Badge, BadgeAction, Category,
    Command, Decision, LoadReport, Persona, TextGenerator, Transition, WeekMode,
};
use serde::Serialize;
use std::path::PathBuf;

mod coach;
mod config;
mod home;

use coach::CommandGenerator;
use config::Config;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("MIZAN_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "mizan", version, long_version = LONG_VERSION, about = "Mizan task and habit signals")]
struct Cli {
    /// IANA timezone; overrides config.toml
    #[arg(long, global = true)]
    tz: Option<String>,

    /// Act as of this RFC3339 instant instead of the system clock
    #[arg(long, global = true)]
    now: Option<String>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Psychological load of the open tasks
    Load,

    /// Tasks ordered by priority score, completed last
    Rank {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Persona inferred from the event log
    Profile,

    /// Quick-choice suggestions for a category
    Suggest {
        category: Category,

        /// Defaults to the snapshot's week mode
        #[arg(long)]
        mode: Option<WeekMode>,

        /// Local hour (0-23); defaults to now
        #[arg(long)]
        hour: Option<u32>,
    },

    /// Turn free text (English or Arabic) into a task draft
    Parse {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Also add the parsed task to the snapshot
        #[arg(long)]
        add: bool,
    },

    /// Advisory signal for the current tasks
    Evaluate {
        /// Attach a coach message (external generator if enabled)
        #[arg(long)]
        nudge: bool,
    },

    /// Ask the coach to split a task into first steps
    Breakdown { task_id: String },

    /// Record a badge action (app_open, complete_task, update_task_honest, use_ai, daily_completion_check)
    Apply {
        action: ActionKind,

        #[arg(long)]
        task_id: Option<String>,
    },

    /// Apply a reducer command given as JSON, e.g. '{"command":"postpone_task","task_id":"t1"}'
    Do { json: String },

    /// Badge catalog with progress
    Badges,

    /// Manage ~/.mizan/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "mizan=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    if let Cmd::Config { command } = &cli.command {
        return match command {
            ConfigCommand::Init => config::init_config(),
            ConfigCommand::Show => print_json(&config::load_config()?),
        };
    }

    let mut session = Session::open(cli.tz.as_deref(), cli.now.as_deref())?;

    match cli.command {
        Cmd::Load => print_json(&session.state.load())?,

        Cmd::Rank { limit } => {
            let ranked = session.state.ranked(session.now);
            let n = limit.unwrap_or(ranked.len());
            print_json(&ranked[..n.min(ranked.len())])?;
        }

        Cmd::Profile => {
            let state = &session.state;
            print_json(&ProfileOut {
                persona: state.persona.refreshed(&state.events, &session.tz),
                can_soft_ask: can_soft_ask(last_prompt_at(&state.events), session.now),
            })?;
        }

        Cmd::Suggest { category, mode, hour } => {
            let mode = mode.unwrap_or(session.state.week_mode);
            let suggestions = match hour {
                Some(h) if h > 23 => bail!("--hour must be 0-23, got {h}"),
                Some(h) => suggest(category, mode, h),
                None => suggest_at(category, mode, session.now, &session.tz),
            };
            print_json(&suggestions)?;
        }

        Cmd::Parse { text, add } => {
            let draft = parse_free_text(&text.join(" "), session.now, &session.tz);
            if !add {
                print_json(&draft)?;
                return Ok(());
            }
            let task = draft.into_task(next_task_id(&session.state), session.now);
            let t = session.apply(Command::AddTask { task: task.clone() })?;
            print_json(&Applied::new(&t, Some(task.id.as_str())))?;
        }

        Cmd::Evaluate { nudge } => {
            let state = &session.state;
            let decision = evaluate_with_capacity(&state.tasks, session.now, &session.tz, state.capacity_minutes);
            let message = match (&decision, nudge) {
                (Some(d), true) => Some(session.nudge(d)?),
                _ => None,
            };
            print_json(&Evaluated { decision, message })?;
        }

        Cmd::Breakdown { task_id } => {
            let Some(task) = session.state.task(&task_id).cloned() else {
                bail!("unknown task id: {task_id}");
            };
            let Some(generator) = CommandGenerator::from_config(&session.cfg.coach) else {
                bail!("coach is disabled; set coach.enabled = true in config.toml");
            };
            let steps = generator.generate(&breakdown_prompt(&task))?;
            let t = session.apply(Command::UseAi {
                feature: Some("breakdown".into()),
            })?;
            print_json(&Breakdown {
                task_id: &task.id,
                steps: &steps,
                unlocked: t.unlocked.as_ref(),
            })?;
        }

        Cmd::Apply { action, task_id } => {
            let action = BadgeAction::from_parts(action, task_id)?;
            let t = session.apply(Command::from(action))?;
            print_json(&Applied::new(&t, None))?;
        }

        Cmd::Do { json } => {
            let command: Command = serde_json::from_str(&json).context("parse command JSON")?;
            let t = session.apply(command)?;
            print_json(&Applied::new(&t, None))?;
        }

        Cmd::Badges => print_json(&session.state.badges.badges)?,

        Cmd::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Config, clock and snapshot for one invocation.
struct Session {
    cfg: Config,
    tz: Tz,
    now: DateTime<Utc>,
    path: PathBuf,
    state: AppState,
}

impl Session {
    fn open(tz: Option<&str>, now: Option<&str>) -> Result<Self> {
        let cfg = config::load_config()?;
        let tz = match tz {
            Some(name) => parse_tz(name)?,
            None => cfg.tz()?,
        };
        let now = match now {
            Some(raw) => parse_instant(raw).context("--now")?,
            None => Utc::now(),
        };

        let path = home::state_path()?;
        let mut state = match home::read_state(&path)? {
            Some(state) => state,
            None => {
                tracing::info!(path = %path.display(), "starting a fresh snapshot");
                let mode = Command::SetWeekMode { mode: cfg.week_mode };
                reduce(&AppState::new(), mode, now, &tz)?.state
            }
        };
        if state.capacity_minutes != cfg.daily_capacity_minutes {
            let minutes = cfg.daily_capacity_minutes;
            state = reduce(&state, Command::SetCapacity { minutes }, now, &tz)?.state;
        }

        Ok(Self {
            cfg,
            tz,
            now,
            path,
            state,
        })
    }

    /// Reduce, persist, and keep the new snapshot.
    fn apply(&mut self, command: Command) -> Result<Transition> {
        let t = reduce(&self.state, command, self.now, &self.tz)?;
        home::write_state(&self.path, &t.state)?;
        if let Some(badge) = &t.unlocked {
            tracing::info!(badge = %badge.id, "unlocked {}", badge.name);
        }
        self.state = t.state.clone();
        Ok(t)
    }

    fn nudge(&mut self, decision: &Decision) -> Result<String> {
        let Some(generator) = CommandGenerator::from_config(&self.cfg.coach) else {
            return Ok(fallback_message(decision, &self.state.tasks));
        };
        let message = nudge_message(&generator, decision, &self.state.persona, &self.state.tasks);
        self.apply(Command::UseAi {
            feature: Some("nudge".into()),
        })?;
        Ok(message)
    }
}

fn next_task_id(state: &AppState) -> String {
    (state.tasks.len() + 1..)
        .map(|n| format!("t{n}"))
        .find(|id| state.task(id).is_none())
        .unwrap_or_else(|| "t0".to_string())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serialize output")?);
    Ok(())
}

#[derive(Serialize)]
struct ProfileOut {
    persona: Persona,
    can_soft_ask: bool,
}

#[derive(Serialize)]
struct Evaluated {
    decision: Option<Decision>,
    message: Option<String>,
}

#[derive(Serialize)]
struct Breakdown<'a> {
    task_id: &'a str,
    steps: &'a str,
    unlocked: Option<&'a Badge>,
}

#[derive(Serialize)]
struct Applied<'a> {
    revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<&'a str>,
    load: LoadReport,
    unlocked: Option<&'a Badge>,
    demoted: &'a [String],
}

impl<'a> Applied<'a> {
    fn new(t: &'a Transition, task_id: Option<&'a str>) -> Self {
        Self {
            revision: t.state.revision,
            task_id,
            load: t.state.load(),
            unlocked: t.unlocked.as_ref(),
            demoted: &t.demoted,
        }
    }
}
