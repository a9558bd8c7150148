use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$JUSTDOIT_HOME`, or `~/.justdoit`.
pub fn justdoit_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("JUSTDOIT_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".justdoit"))
}

pub fn ensure_justdoit_home() -> Result<PathBuf> {
    let dir = justdoit_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn logs_dir() -> Result<PathBuf> {
    let dir = ensure_justdoit_home()?.join("logs");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
