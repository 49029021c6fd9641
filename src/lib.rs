//! lockfile-mutex: cross-process mutual exclusion backed by a single lockfile.
//!
//! If the same lockfile path is used by two invocations of a program, only one
//! of them can hold the lock at a time. This suits long-lived or periodically
//! started processes that must not overlap, such as daemons or an hourly backup
//! that occasionally runs for several hours.
//!
//! - Acquisition creates the lockfile atomically (create-if-absent).
//! - A lockfile not refreshed within the timeout is stale and can be taken over.
//! - While held, a background thread refreshes the lockfile's modification time.
//! - Release removes the lockfile; so does dropping a holding handle and,
//!   when registered, the process-exit cleanup.
//!
//! Exit cleanup is not automatic. Handles created with `unlock_on_exit` only
//! register with [`ProcessExitHooks`]; the host runs it by calling
//! [`exit_hook::install_signal_handler`] or [`exit_hook::run_exit_hooks`].
//!
//! ```no_run
//! use lockfile_mutex::{LockfileMutex, NewLockedOptions};
//!
//! // Hold the lock for the rest of `main`, or fail.
//! let _lock = LockfileMutex::new_locked("/var/run/backup/.lockfile", NewLockedOptions::default())?;
//! # Ok::<(), lockfile_mutex::LockfileError>(())
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod exit_hook;
pub mod fs;
pub mod mutex;

pub use config::{LockOptions, LockfileMutexOptions, NewLockedOptions, UnlockOptions};
pub use error::{LockfileError, Result};
pub use exit_hook::{ExitHook, ProcessExitHooks};
pub use fs::{lockfile_age, lockfile_modified};
pub use mutex::{LockfileMutex, NewLocked};
