use anyhow::{Context, Result};
use chrono_tz::Tz;
use mizan_core::load::DAILY_CAPACITY_MINUTES;
use mizan_core::time::parse_tz;
use mizan_core::WeekMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::home::ensure_mizan_home;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Used when a fresh snapshot is created.
    #[serde(default)]
    pub week_mode: WeekMode,
    #[serde(default = "default_capacity")]
    pub daily_capacity_minutes: u32,
    #[serde(default)]
    pub coach: CoachSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachSection {
    #[serde(default)]
    pub enabled: bool,
    /// Program that reads a prompt argument and prints plain text.
    #[serde(default = "default_coach_command")]
    pub command: String,
    /// Extra args placed before the prompt, e.g. `["exec"]`.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_timezone() -> String {
    "Asia/Riyadh".to_string()
}

fn default_capacity() -> u32 {
    DAILY_CAPACITY_MINUTES
}

fn default_coach_command() -> String {
    "codex".to_string()
}

impl Default for CoachSection {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_coach_command(),
            args: vec!["exec".to_string()],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            week_mode: WeekMode::default(),
            daily_capacity_minutes: default_capacity(),
            coach: CoachSection::default(),
        }
    }
}

impl Config {
    pub fn tz(&self) -> Result<Tz> {
        parse_tz(&self.timezone).context("config.toml: timezone")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.daily_capacity_minutes == 0 {
            return Err("daily_capacity_minutes must be positive".to_string());
        }
        if self.coach.enabled && self.coach.command.trim().is_empty() {
            return Err("coach.command must be set when coach.enabled = true".to_string());
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_mizan_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    read_config(&config_path()?)
}

pub fn read_config(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    let cfg: Config = toml::from_str(&s).context("parse config.toml")?;
    cfg.validate()
        .map_err(|e| anyhow::anyhow!("invalid config.toml: {e}"))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        eprintln!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    eprintln!("Wrote {}", p.display());
    Ok(())
}
