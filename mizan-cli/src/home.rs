use anyhow::{Context, Result};
use mizan_core::AppState;
use std::fs;
use std::path::{Path, PathBuf};

/// `$MIZAN_HOME`, or `~/.mizan`.
pub fn mizan_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("MIZAN_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set (or set MIZAN_HOME)")?;
    Ok(PathBuf::from(home).join(".mizan"))
}

pub fn ensure_mizan_home() -> Result<PathBuf> {
    let dir = mizan_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn state_path() -> Result<PathBuf> {
    Ok(ensure_mizan_home()?.join("state.json"))
}

/// `None` when no snapshot has been written yet.
pub fn read_state(path: &Path) -> Result<Option<AppState>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let state = serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(state))
}

/// Write to a sibling temp file, then rename over the snapshot.
pub fn write_state(path: &Path, state: &AppState) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("serialize state")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    tracing::debug!(path = %path.display(), revision = state.revision, "snapshot saved");
    Ok(())
}
