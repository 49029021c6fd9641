//! Background refresher for a held lockfile.
//!
//! While a lock is held, a dedicated thread rewrites the lockfile every
//! refresh interval so that other contenders never see it as stale. The
//! thread is driven by a [`CancelToken`]: cancellation wakes it immediately,
//! and it checks the token before every write.
//!
//! Failure policy:
//! - a write that fails after cancellation is expected (the lockfile was just
//!   removed by `unlock`) and is swallowed;
//! - any other failure stops the refresher, is logged at error level, and is
//!   recorded so the holder can query it. The lock can go stale silently
//!   otherwise.

use crate::fs::lockfile;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lower bound on the refresh period, so a tiny timeout cannot turn the
/// refresher into a busy loop.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// Shared slot for the message of the last fatal refresh failure.
pub(crate) type FailureSlot = Arc<Mutex<Option<String>>>;

/// Explicit stop signal checked by the refresher on every tick.
#[derive(Debug, Default)]
pub(crate) struct CancelToken {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl CancelToken {
    /// Cancel the token. Safe to call any number of times.
    pub(crate) fn cancel(&self) {
        *self.lock_flag() = true;
        self.wake.notify_all();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.lock_flag()
    }

    /// Sleep for `period` or until cancelled. Returns whether the token was cancelled.
    fn wait(&self, period: Duration) -> bool {
        let guard = self.lock_flag();
        let (guard, _timeout) = self
            .wake
            .wait_timeout_while(guard, period, |cancelled| !*cancelled)
            .unwrap_or_else(|poison| poison.into_inner());
        *guard
    }

    fn lock_flag(&self) -> MutexGuard<'_, bool> {
        self.cancelled
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Handle to a running refresher thread.
///
/// The thread is never joined: `cancel` returns immediately and an in-flight
/// write finishes in the background.
#[derive(Debug)]
pub(crate) struct Refresher {
    token: Arc<CancelToken>,
    handle: JoinHandle<()>,
}

impl Refresher {
    /// Spawn a refresher for `path`, rewriting it every `interval`.
    pub(crate) fn spawn(path: PathBuf, interval: Duration, failure: FailureSlot) -> io::Result<Self> {
        let token = Arc::new(CancelToken::default());
        let thread_token = Arc::clone(&token);
        let interval = interval.max(MIN_REFRESH_INTERVAL);

        let handle = thread::Builder::new()
            .name("lockfile-refresh".to_string())
            .spawn(move || refresh_loop(&path, interval, &thread_token, &failure))?;

        Ok(Self { token, handle })
    }

    /// Whether the refresher is still keeping the lockfile fresh.
    pub(crate) fn is_running(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }

    /// Stop the refresher before its next write.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}

fn refresh_loop(path: &Path, interval: Duration, token: &CancelToken, failure: &FailureSlot) {
    tracing::trace!(path = %path.display(), ?interval, "refresher started");
    loop {
        if token.wait(interval) {
            tracing::trace!(path = %path.display(), "refresher cancelled");
            return;
        }

        match lockfile::touch_existing(path) {
            Ok(()) => tracing::trace!(path = %path.display(), "refreshed lockfile"),
            Err(_) if token.is_cancelled() => return,
            Err(e) => {
                let message = if e.kind() == io::ErrorKind::NotFound {
                    "lockfile was removed while still held".to_string()
                } else {
                    e.to_string()
                };
                tracing::error!(
                    path = %path.display(),
                    error = %message,
                    "lockfile refresh failed, lock will go stale"
                );
                *failure.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(message);
                return;
            }
        }
    }
}
