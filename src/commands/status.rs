//! Implementation of the `lockfile-mutex status` command.
//!
//! Reports whether the lockfile exists, when it was last refreshed, and
//! whether a contender with the given timeout would consider it stale.

use crate::cli::StatusArgs;
use chrono::{DateTime, Local};
use lockfile_mutex::error::{LockfileError, Result};
use lockfile_mutex::{exit_codes, lockfile_modified};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Observed state of a lockfile.
#[derive(Debug, Clone, Serialize)]
pub struct LockStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
}

impl LockStatus {
    /// Inspect the lockfile at `path`.
    pub fn inspect(path: PathBuf, timeout: Duration) -> Result<Self> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let modified = match lockfile_modified(&path) {
            Ok(modified) => modified,
            Err(LockfileError::NotFound { .. }) => {
                return Ok(Self {
                    path,
                    exists: false,
                    timeout_ms,
                    age_ms: None,
                    modified: None,
                    stale: None,
                });
            }
            Err(e) => return Err(e),
        };

        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        Ok(Self {
            path,
            exists: true,
            timeout_ms,
            age_ms: Some(u64::try_from(age.as_millis()).unwrap_or(u64::MAX)),
            modified: Some(DateTime::<Local>::from(modified)),
            stale: Some(age > timeout),
        })
    }
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.age_ms, self.modified) {
            (Some(age_ms), Some(modified)) => write!(
                f,
                "{} (age: {}, refreshed: {}, timeout: {}{})",
                self.path.display(),
                format_age(Duration::from_millis(age_ms)),
                modified.format("%Y-%m-%d %H:%M:%S%.3f"),
                format_age(Duration::from_millis(self.timeout_ms)),
                if self.stale == Some(true) { ", STALE" } else { "" }
            ),
            _ => write!(f, "{} (no lockfile)", self.path.display()),
        }
    }
}

/// Format an age as a short human-readable string.
fn format_age(age: Duration) -> String {
    let millis = age.as_millis();
    let seconds = age.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else if seconds > 0 {
        format!("{}s", seconds)
    } else {
        format!("{}ms", millis)
    }
}

/// Execute the `status` command.
pub fn cmd_status(args: StatusArgs) -> Result<i32> {
    let options = args.lock.resolve_options()?;
    let status = LockStatus::inspect(args.lock.lockfile.clone(), options.timeout())?;

    if args.json {
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| LockfileError::Config(format!("failed to serialize status: {}", e)))?;
        println!("{}", json);
    } else {
        println!("{}", status);
    }

    Ok(exit_codes::SUCCESS)
}
