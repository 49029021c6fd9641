//! Command implementations for lockfile-mutex.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Each command returns the process exit code on success;
//! errors are mapped to exit codes by the caller.

mod age;
mod check;
mod run;
mod status;

use crate::cli::Command;
use lockfile_mutex::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Run(args) => run::cmd_run(args),
        Command::Check(args) => check::cmd_check(args),
        Command::Age(args) => age::cmd_age(args),
        Command::Status(args) => status::cmd_status(args),
    }
}
