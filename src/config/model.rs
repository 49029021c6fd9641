//! Option structs and their default implementations.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Construction options for a [`LockfileMutex`](crate::LockfileMutex).
///
/// Deserializable from YAML; unknown fields are ignored for forward
/// compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockfileMutexOptions {
    /// Milliseconds after which an unrefreshed lockfile is considered
    /// abandoned and may be taken over.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether to release the lock (best effort) when the process exits.
    ///
    /// This only registers a cleanup with the exit hook registry. Nothing runs
    /// that registry on its own: the host must call
    /// [`install_signal_handler`](crate::exit_hook::install_signal_handler) or
    /// [`run_exit_hooks`](crate::exit_hook::run_exit_hooks) for the cleanup to
    /// happen. Dropping a holding handle still releases it regardless.
    #[serde(default = "default_true")]
    pub unlock_on_exit: bool,
}

impl Default for LockfileMutexOptions {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            unlock_on_exit: default_true(),
        }
    }
}

impl LockfileMutexOptions {
    /// Set the staleness timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set whether the lock is released on process exit.
    pub fn with_unlock_on_exit(mut self, unlock_on_exit: bool) -> Self {
        self.unlock_on_exit = unlock_on_exit;
        self
    }

    /// The staleness timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Period between two refreshes of a held lockfile.
    pub fn refresh_interval(&self) -> Duration {
        self.timeout().mul_f64(REFRESH_TIMEOUT_FRACTION)
    }
}

/// Options for [`LockfileMutex::new_locked`](crate::LockfileMutex::new_locked).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewLockedOptions {
    #[serde(flatten)]
    pub mutex: LockfileMutexOptions,

    /// Fail with `CouldNotLock` when the lock cannot be acquired, instead of
    /// returning `success: false`.
    #[serde(default = "default_true")]
    pub error_on_lock_failure: bool,
}

impl Default for NewLockedOptions {
    fn default() -> Self {
        Self {
            mutex: LockfileMutexOptions::default(),
            error_on_lock_failure: default_true(),
        }
    }
}

impl NewLockedOptions {
    /// Set the staleness timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.mutex = self.mutex.with_timeout(timeout);
        self
    }

    /// Set whether the lock is released on process exit.
    pub fn with_unlock_on_exit(mut self, unlock_on_exit: bool) -> Self {
        self.mutex = self.mutex.with_unlock_on_exit(unlock_on_exit);
        self
    }

    /// Set whether a failed acquisition is an error.
    pub fn with_error_on_lock_failure(mut self, error_on_lock_failure: bool) -> Self {
        self.error_on_lock_failure = error_on_lock_failure;
        self
    }
}

impl From<LockfileMutexOptions> for NewLockedOptions {
    fn from(mutex: LockfileMutexOptions) -> Self {
        Self {
            mutex,
            error_on_lock_failure: default_true(),
        }
    }
}
