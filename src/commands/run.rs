//! Implementation of the `lockfile-mutex run` command.
//!
//! Acquires the lock, runs the child command while the lock is refreshed in
//! the background, then releases the lock. On Ctrl-C / SIGTERM the child is
//! stopped and reaped first, so the lock is never released while it still
//! runs.

use crate::cli::RunArgs;
use lockfile_mutex::error::{LockfileError, Result};
use lockfile_mutex::{LockfileMutex, exit_codes, exit_hook};
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Exit code used when interrupted by a signal (128 + SIGINT).
const INTERRUPTED: i32 = 130;

/// How often the child and the termination flag are checked.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How the supervised child came to an end.
#[derive(Debug)]
enum ChildOutcome {
    Exited(ExitStatus),
    Interrupted,
}

/// Execute the `run` command.
pub fn cmd_run(args: RunArgs) -> Result<i32> {
    let options = args.lock.resolve_options()?;
    let (program, program_args) = args
        .command
        .split_first()
        .ok_or_else(|| LockfileError::Config("no command given after `--`".to_string()))?;

    let termination = if options.unlock_on_exit {
        Some(exit_hook::termination_flag()?)
    } else {
        None
    };

    let mut mutex = LockfileMutex::with_options(&args.lock.lockfile, options);
    if !mutex.lock()? {
        if args.skip_if_locked {
            tracing::info!(path = %mutex.path().display(), "lock is held elsewhere, skipping");
            return Ok(exit_codes::SUCCESS);
        }
        eprintln!(
            "Error: lock '{}' is held by another process",
            mutex.path().display()
        );
        return Ok(exit_codes::LOCK_FAILURE);
    }

    tracing::debug!(program = %program, "running command under lock");
    let outcome = Command::new(program)
        .args(program_args)
        .spawn()
        .and_then(|mut child| supervise(&mut child, termination.as_deref()))
        .map_err(|e| LockfileError::Io {
            path: PathBuf::from(program),
            source: e,
        });

    if let Some(failure) = mutex.refresh_failure() {
        eprintln!("Warning: {}", failure);
    }
    mutex.unlock()?;

    match outcome? {
        ChildOutcome::Exited(status) => Ok(exit_code_of(status)),
        ChildOutcome::Interrupted => Ok(INTERRUPTED),
    }
}

/// Wait for `child`, stopping it once `termination` is raised.
///
/// Returns only after the child has been reaped.
fn supervise(child: &mut Child, termination: Option<&AtomicBool>) -> io::Result<ChildOutcome> {
    loop {
        if termination.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            tracing::warn!(pid = child.id(), "termination requested, stopping command");
            if let Err(e) = child.kill() {
                tracing::warn!(pid = child.id(), error = %e, "failed to stop command, waiting for it");
            }
            child.wait()?;
            return Ok(ChildOutcome::Interrupted);
        }

        if let Some(status) = child.try_wait()? {
            return Ok(ChildOutcome::Exited(status));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Exit code to report for a finished child, shell style for signals.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    exit_codes::INTERNAL_ERROR
}
