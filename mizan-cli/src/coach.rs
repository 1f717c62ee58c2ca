use anyhow::{bail, Context, Result};
use mizan_core::TextGenerator;
use std::process::{Command, Stdio};

use crate::config::CoachSection;

/// Text generation by shelling out to a local CLI (e.g. `codex exec <prompt>`).
pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// `None` unless the coach is enabled in config.
    pub fn from_config(section: &CoachSection) -> Option<Self> {
        section
            .enabled
            .then(|| Self::new(section.command.clone(), section.args.clone()))
    }
}

impl TextGenerator for CommandGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let program = which::which(&self.command)
            .with_context(|| format!("{} not found on PATH (see coach.command in config.toml)", self.command))?;
        tracing::debug!(program = %program.display(), "running coach command");
        let out = Command::new(&program)
            .args(&self.args)
            .arg(prompt)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("running {}", self.command))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            bail!("{} failed with status {}: {}", self.command, out.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_section_has_no_generator() {
        assert!(CommandGenerator::from_config(&CoachSection::default()).is_none());
    }

    #[test]
    fn missing_program_is_an_error() {
        let g = CommandGenerator::new("mizan-no-such-program", vec![]);
        let err = g.generate("hello").unwrap_err();
        assert!(err.to_string().contains("not found on PATH"));
    }

    #[cfg(unix)]
    #[test]
    fn stdout_is_returned_trimmed() {
        let g = CommandGenerator::new("echo", vec!["coach:".to_string()]);
        assert_eq!(g.generate("keep going").unwrap(), "coach: keep going");
    }
}
