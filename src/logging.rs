// src/logging.rs

//! Logging setup: the `--log-level` flag wins, then `KUBEFAN_LOG`, then
//! `info`.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise the global subscriber. Call once, before anything is spawned.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => Level::from(lvl),
        None => env_level()?.unwrap_or(Level::INFO),
    };

    fmt().with_max_level(level).with_target(true).init();
    Ok(())
}

/// Level from `KUBEFAN_LOG`, if set. An unparseable value is an error rather
/// than a silent fallback to the default.
fn env_level() -> Result<Option<Level>> {
    let Ok(raw) = std::env::var("KUBEFAN_LOG") else {
        return Ok(None);
    };
    let level = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid KUBEFAN_LOG level {raw:?}"))?;
    Ok(Some(level))
}
