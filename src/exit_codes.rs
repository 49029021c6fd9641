//! Exit code constants for the lockfile-mutex CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, misuse)
//! - 4: Lock not acquired (held by a live holder)
//! - 5: Filesystem failure
//! - 70: Internal error (inconsistent state)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid config, or API misuse.
pub const USER_ERROR: i32 = 1;

/// Lock acquisition failure: the lockfile is held and not stale.
pub const LOCK_FAILURE: i32 = 4;

/// Filesystem failure while creating, refreshing, querying, or removing the lockfile.
pub const IO_FAILURE: i32 = 5;

/// Internal invariant violation.
pub const INTERNAL_ERROR: i32 = 70;
