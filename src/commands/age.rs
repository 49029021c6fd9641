//! Implementation of the `lockfile-mutex age` command.

use crate::cli::AgeArgs;
use lockfile_mutex::error::Result;
use lockfile_mutex::{exit_codes, lockfile_age};

/// Execute the `age` command: print the lockfile age in whole milliseconds.
pub fn cmd_age(args: AgeArgs) -> Result<i32> {
    let age = lockfile_age(&args.lockfile)?;
    println!("{}", age.as_millis());
    Ok(exit_codes::SUCCESS)
}
