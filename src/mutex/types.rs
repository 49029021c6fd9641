//! The `LockfileMutex` handle, its constructors, and drop behavior.

use super::refresh::{FailureSlot, Refresher};
use crate::config::LockfileMutexOptions;
use crate::error::LockfileError;
use crate::exit_hook::{ExitHook, HookId, ProcessExitHooks};
use crate::fs::lockfile;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Refresher slot shared between the handle and its exit cleanup.
///
/// `Some(refresher)` with a running refresher is exactly the "held by this
/// instance" state.
pub(super) type HeldSlot = Arc<Mutex<Option<Refresher>>>;

/// One process's handle to a lockfile-backed mutex.
///
/// If two handles (in this process or in others) use the same lockfile path,
/// at most one of them holds the lock at a time. Constructing a handle has no
/// filesystem effect; call [`lock`](Self::lock) to acquire.
///
/// Dropping a handle that holds the lock releases it. Intermediate
/// directories created for the lockfile are never removed.
///
/// # Example
///
/// ```no_run
/// use lockfile_mutex::LockfileMutex;
///
/// let mut mutex = LockfileMutex::new("/var/run/backup/.lockfile");
/// if mutex.lock()? {
///     // ... exclusive work ...
///     mutex.unlock()?;
/// }
/// # Ok::<(), lockfile_mutex::LockfileError>(())
/// ```
pub struct LockfileMutex {
    pub(super) path: PathBuf,
    pub(super) options: LockfileMutexOptions,
    pub(super) held: HeldSlot,
    pub(super) refresh_failure: FailureSlot,
    exit_registration: Option<(Arc<dyn ExitHook>, HookId)>,
}

/// Result of [`LockfileMutex::new_locked`].
#[derive(Debug)]
pub struct NewLocked {
    /// The constructed handle.
    pub mutex: LockfileMutex,
    /// Whether the handle holds the lock.
    pub success: bool,
}

impl LockfileMutex {
    /// Create a handle with default options (60 s timeout, unlock on exit).
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_options(path, LockfileMutexOptions::default())
    }

    /// Create a handle with the given options.
    ///
    /// With `unlock_on_exit`, the cleanup is registered with the process-wide
    /// [`ProcessExitHooks`] registry.
    pub fn with_options<P: AsRef<Path>>(path: P, options: LockfileMutexOptions) -> Self {
        let hook: Arc<dyn ExitHook> = ProcessExitHooks::global();
        Self::with_exit_hook(path, options, hook)
    }

    /// Create a handle that registers its exit cleanup with `hook`.
    ///
    /// The hook is only used when `options.unlock_on_exit` is set.
    pub fn with_exit_hook<P: AsRef<Path>>(
        path: P,
        options: LockfileMutexOptions,
        hook: Arc<dyn ExitHook>,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        let held = HeldSlot::default();

        let exit_registration = options.unlock_on_exit.then(|| {
            let id = hook.register(exit_cleanup(path.clone(), Arc::clone(&held)));
            (hook, id)
        });

        Self {
            path,
            options,
            held,
            refresh_failure: FailureSlot::default(),
            exit_registration,
        }
    }

    /// Path of the lockfile.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Staleness timeout.
    pub fn timeout(&self) -> Duration {
        self.options.timeout()
    }

    /// Period between two refreshes while the lock is held.
    pub fn refresh_interval(&self) -> Duration {
        self.options.refresh_interval()
    }

    /// Options this handle was created with.
    pub fn options(&self) -> &LockfileMutexOptions {
        &self.options
    }

    /// Whether this instance currently holds the lock.
    ///
    /// True exactly when a refresher is running for this instance. If the
    /// refresher stopped on a failure, the lock is no longer considered held;
    /// see [`refresh_failure`](Self::refresh_failure).
    pub fn held_by_this_instance(&self) -> bool {
        self.lock_held()
            .as_ref()
            .is_some_and(Refresher::is_running)
    }

    /// The failure that stopped the most recent refresher, if any.
    pub fn refresh_failure(&self) -> Option<LockfileError> {
        self.refresh_failure
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
            .map(|message| LockfileError::Refresh {
                path: self.path.clone(),
                message,
            })
    }

    pub(super) fn lock_held(&self) -> MutexGuard<'_, Option<Refresher>> {
        self.held.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Stop refreshing without releasing, as if the holder had frozen.
    #[cfg(test)]
    pub(crate) fn abandon(&mut self) {
        if let Some(refresher) = self.lock_held().take() {
            refresher.cancel();
        }
    }
}

/// Best-effort synchronous release run by the exit hook.
fn exit_cleanup(path: PathBuf, held: HeldSlot) -> crate::exit_hook::ExitCleanup {
    Box::new(move || {
        let mut slot = held.lock().unwrap_or_else(|poison| poison.into_inner());
        if let Some(refresher) = slot.take()
            && refresher.is_running()
        {
            refresher.cancel();
            if let Err(e) = lockfile::remove(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove lockfile on exit");
            }
        }
    })
}

impl Drop for LockfileMutex {
    fn drop(&mut self) {
        if let Some((hook, id)) = self.exit_registration.take() {
            hook.deregister(id);
        }
        if self.held_by_this_instance()
            && let Err(e) = self.unlock()
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lockfile on drop");
        }
        if let Some(refresher) = self.lock_held().take() {
            refresher.cancel();
        }
    }
}

impl std::fmt::Debug for LockfileMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockfileMutex")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("held_by_this_instance", &self.held_by_this_instance())
            .finish()
    }
}
