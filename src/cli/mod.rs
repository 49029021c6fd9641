//! CLI argument parsing for lockfile-mutex.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};
use lockfile_mutex::LockfileMutexOptions;
use lockfile_mutex::error::Result;
use std::path::PathBuf;

/// Lockfile mutex: make sure only one instance of a job runs at a time.
///
/// The lock is a single empty file. Its modification time is refreshed while
/// the lock is held; a lockfile that has not been refreshed within the
/// timeout is considered abandoned and may be taken over.
#[derive(Parser, Debug)]
#[command(name = "lockfile-mutex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding the lock.
    ///
    /// Exits with the command's exit code, or 4 if the lock is held elsewhere.
    Run(RunArgs),

    /// Check whether the lock could be acquired right now.
    ///
    /// Acquires and immediately releases the lock. Exits 0 if it was free,
    /// 4 if it is held by a live holder.
    Check(LockArgs),

    /// Print the lockfile age in milliseconds.
    Age(AgeArgs),

    /// Show whether the lockfile exists, its age, and whether it is stale.
    Status(StatusArgs),
}

/// Lockfile path and mutex options shared by the locking commands.
#[derive(Args, Debug, Clone)]
pub struct LockArgs {
    /// Path to the lockfile. Parent directories are created as needed.
    pub lockfile: PathBuf,

    /// Milliseconds after which an unrefreshed lockfile may be taken over.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// YAML file with mutex options (`timeout_ms`, `unlock_on_exit`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Do not remove the lockfile when interrupted; let it go stale instead.
    #[arg(long)]
    pub keep_on_exit: bool,
}

impl LockArgs {
    /// Resolve mutex options: config file (if any), then command-line overrides.
    pub fn resolve_options(&self) -> Result<LockfileMutexOptions> {
        let mut options = match &self.config {
            Some(path) => LockfileMutexOptions::load(path)?,
            None => LockfileMutexOptions::default(),
        };
        if let Some(timeout_ms) = self.timeout_ms {
            options.timeout_ms = timeout_ms;
        }
        if self.keep_on_exit {
            options.unlock_on_exit = false;
        }
        options.validate()?;
        Ok(options)
    }
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub lock: LockArgs,

    /// Exit 0 without running the command if the lock is held elsewhere.
    #[arg(long)]
    pub skip_if_locked: bool,

    /// Command to run, after `--`.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Arguments for the `age` command.
#[derive(Args, Debug)]
pub struct AgeArgs {
    /// Path to the lockfile.
    pub lockfile: PathBuf,
}

/// Arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub lock: LockArgs,

    /// Print the status as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
