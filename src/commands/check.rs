//! Implementation of the `lockfile-mutex check` command.

use crate::cli::LockArgs;
use lockfile_mutex::error::Result;
use lockfile_mutex::{LockfileMutex, exit_codes};

/// Execute the `check` command.
///
/// Tries to acquire the lock and releases it right away. Note that a stale
/// lockfile is taken over (and then removed) by a successful check.
pub fn cmd_check(args: LockArgs) -> Result<i32> {
    let mut options = args.resolve_options()?;
    // The lock is released before returning; no exit cleanup needed.
    options.unlock_on_exit = false;

    let mut mutex = LockfileMutex::with_options(&args.lockfile, options);
    if mutex.lock()? {
        mutex.unlock()?;
        println!("free: {}", args.lockfile.display());
        Ok(exit_codes::SUCCESS)
    } else {
        println!("locked: {}", args.lockfile.display());
        Ok(exit_codes::LOCK_FAILURE)
    }
}
