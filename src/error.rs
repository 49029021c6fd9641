//! Error types for lockfile-mutex.
//!
//! Uses thiserror for derive macros. Lock contention is deliberately absent:
//! a lock held by a live holder is reported as `Ok(false)`, never as an error.

use crate::exit_codes;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for lockfile mutex operations.
#[derive(Error, Debug)]
pub enum LockfileError {
    /// `unlock` was called non-idempotently on an instance that does not hold the lock.
    #[error("tried to unlock lockfile mutex '{}' that was not actively locked", path.display())]
    NotHeld { path: PathBuf },

    /// Creating or taking over the lockfile failed for a reason other than contention.
    #[error("could not acquire lockfile mutex '{}': {source}", path.display())]
    Acquire {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Removing the lockfile during release failed.
    #[error("could not release lockfile mutex '{}': {source}", path.display())]
    Release {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The background refresher stopped for a reason other than cancellation.
    #[error("lockfile refresh failed for '{}': {message}", path.display())]
    Refresh { path: PathBuf, message: String },

    /// The lockfile does not exist (e.g. when querying its age).
    #[error("lockfile '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    /// `new_locked` could not acquire the lock and was asked to treat that as fatal.
    #[error("could not lock '{}': lock is held by another holder", path.display())]
    CouldNotLock { path: PathBuf },

    /// The reported lock result disagrees with the observed held state.
    #[error(
        "inconsistent locking state for '{}': lock returned {reported}, held state is {held}",
        path.display()
    )]
    InconsistentState {
        path: PathBuf,
        reported: bool,
        held: bool,
    },

    /// The process-exit cleanup hook could not be installed.
    #[error("failed to install exit hook: {0}")]
    ExitHook(String),

    /// Invalid or unreadable configuration.
    #[error("{0}")]
    Config(String),

    /// Any other filesystem failure.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockfileError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockfileError::NotHeld { .. } => exit_codes::USER_ERROR,
            LockfileError::Config(_) => exit_codes::USER_ERROR,
            LockfileError::ExitHook(_) => exit_codes::INTERNAL_ERROR,
            LockfileError::CouldNotLock { .. } => exit_codes::LOCK_FAILURE,
            LockfileError::InconsistentState { .. } => exit_codes::INTERNAL_ERROR,
            LockfileError::Acquire { .. }
            | LockfileError::Release { .. }
            | LockfileError::Refresh { .. }
            | LockfileError::NotFound { .. }
            | LockfileError::Io { .. } => exit_codes::IO_FAILURE,
        }
    }
}

/// Result type alias for lockfile mutex operations.
pub type Result<T> = std::result::Result<T, LockfileError>;
