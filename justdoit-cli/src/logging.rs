use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::state::logs_dir;

/// Overrides `log.level` when set.
pub const LOG_ENV: &str = "JUSTDOIT_LOG";

/// Daily-rolling file log under `~/.justdoit/logs/`. stdout belongs to the
/// commands and the TUI, so nothing is logged there.
///
/// Keep the returned guard alive for the life of the process.
pub fn init_logging(level: &str) -> Result<WorkerGuard> {
    let dir = logs_dir()?;
    let appender = tracing_appender::rolling::daily(&dir, "justdoit.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("init logging: {e}"))?;

    Ok(guard)
}
