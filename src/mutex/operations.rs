//! Lock acquisition, release, and the convenience constructor.

use super::refresh::Refresher;
use super::types::{LockfileMutex, NewLocked};
use crate::config::{LockOptions, NewLockedOptions, UnlockOptions};
use crate::error::{LockfileError, Result};
use crate::fs::lockfile::{self, CreateOutcome};
use std::io;
use std::path::Path;

impl LockfileMutex {
    /// Try to acquire the lock; returns whether this instance now holds it.
    ///
    /// Equivalent to `lock_with(LockOptions::default())`: re-locking a held
    /// instance succeeds trivially.
    pub fn lock(&mut self) -> Result<bool> {
        self.lock_with(LockOptions::default())
    }

    /// Try to acquire the lock.
    ///
    /// - Already held by this instance: returns `options.idempotent` without
    ///   touching the lockfile.
    /// - Lockfile absent: creates it (and any parent directories) atomically.
    /// - Lockfile present and not older than the timeout: returns `Ok(false)`.
    /// - Lockfile present and older than the timeout: takes it over.
    ///
    /// On success a background refresher keeps the lockfile fresh until
    /// [`unlock`](Self::unlock). Filesystem failures other than contention are
    /// returned as [`LockfileError::Acquire`].
    ///
    /// Two contenders can both judge the same stale lockfile abandoned and
    /// both take it over; this primitive gives best-effort exclusion, not a
    /// linearizable lock.
    pub fn lock_with(&mut self, options: LockOptions) -> Result<bool> {
        let path = self.path.clone();
        let mut held = self.lock_held();

        if held.as_ref().is_some_and(Refresher::is_running) {
            return Ok(options.idempotent);
        }
        if held.take().is_some() {
            tracing::warn!(path = %path.display(), "previous refresher had stopped, lock was no longer held");
        }

        match lockfile::create_exclusive(&path).map_err(|e| acquire_error(&path, e))? {
            CreateOutcome::Created => {
                tracing::debug!(path = %path.display(), "created lockfile");
            }
            CreateOutcome::AlreadyExists => {
                let age = match lockfile::age_of(&path) {
                    Ok(age) => age,
                    // Released between our create attempt and the age check.
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        tracing::debug!(path = %path.display(), "lockfile vanished during acquisition");
                        return Ok(false);
                    }
                    Err(e) => return Err(acquire_error(&path, e)),
                };

                if age <= self.options.timeout() {
                    tracing::debug!(
                        path = %path.display(),
                        age_ms = u64::try_from(age.as_millis()).unwrap_or(u64::MAX),
                        "lockfile is held by a live holder"
                    );
                    return Ok(false);
                }

                tracing::info!(
                    path = %path.display(),
                    age_ms = u64::try_from(age.as_millis()).unwrap_or(u64::MAX),
                    timeout_ms = self.options.timeout_ms,
                    "taking over stale lockfile"
                );
                lockfile::overwrite(&path).map_err(|e| acquire_error(&path, e))?;
            }
        }

        *self
            .refresh_failure
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = None;

        let refresher = match Refresher::spawn(
            path.clone(),
            self.options.refresh_interval(),
            self.refresh_failure.clone(),
        ) {
            Ok(refresher) => refresher,
            Err(e) => {
                // Without a refresher the lock would silently go stale; give it back.
                if let Err(remove_err) = lockfile::remove(&path) {
                    tracing::warn!(path = %path.display(), error = %remove_err, "failed to remove lockfile after refresher spawn failure");
                }
                return Err(LockfileError::Io { path, source: e });
            }
        };
        *held = Some(refresher);

        Ok(true)
    }

    /// Release the lock if held; a no-op otherwise.
    pub fn unlock(&mut self) -> Result<()> {
        self.unlock_with(UnlockOptions::default())
    }

    /// Release the lock.
    ///
    /// Stops the refresher and removes the lockfile. When the lock is not
    /// held, returns quietly if `options.idempotent`, otherwise fails with
    /// [`LockfileError::NotHeld`]. Never waits for an in-flight refresh write.
    ///
    /// If the lockfile cannot be removed, [`LockfileError::Release`] is
    /// returned and the lock stays held and refreshed, so the release can be
    /// retried.
    pub fn unlock_with(&mut self, options: UnlockOptions) -> Result<()> {
        let refresher = self
            .lock_held()
            .take()
            .filter(Refresher::is_running);

        let Some(refresher) = refresher else {
            if options.idempotent {
                return Ok(());
            }
            return Err(LockfileError::NotHeld {
                path: self.path.clone(),
            });
        };

        refresher.cancel();

        match lockfile::remove(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "released lockfile");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "lockfile was already gone at release");
                Ok(())
            }
            Err(e) => {
                self.resume_refresh();
                Err(LockfileError::Release {
                    path: self.path.clone(),
                    source: e,
                })
            }
        }
    }

    /// Restart refreshing after a failed release.
    fn resume_refresh(&mut self) {
        match Refresher::spawn(
            self.path.clone(),
            self.options.refresh_interval(),
            self.refresh_failure.clone(),
        ) {
            Ok(refresher) => *self.lock_held() = Some(refresher),
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "could not restart refresher after failed release, lock will go stale");
            }
        }
    }

    /// Construct a handle and acquire the lock in one call.
    ///
    /// Intended for "hold this lock for the lifetime of the program": keep the
    /// returned handle alive for as long as the lock should be held.
    ///
    /// With `error_on_lock_failure` (the default), failing to acquire is a
    /// [`LockfileError::CouldNotLock`] error; otherwise it is reported as
    /// `success: false`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lockfile_mutex::{LockfileMutex, NewLockedOptions};
    ///
    /// // Errors unless we now hold the lock.
    /// let _guard = LockfileMutex::new_locked("/var/run/backup/.lockfile", NewLockedOptions::default())?;
    ///
    /// // Query for success instead.
    /// let options = NewLockedOptions::default().with_error_on_lock_failure(false);
    /// let other = LockfileMutex::new_locked("/var/run/backup/.lockfile", options)?;
    /// assert!(!other.success);
    /// # Ok::<(), lockfile_mutex::LockfileError>(())
    /// ```
    pub fn new_locked<P: AsRef<Path>>(path: P, options: NewLockedOptions) -> Result<NewLocked> {
        options.validate()?;

        let mut mutex = LockfileMutex::with_options(path, options.mutex.clone());
        let reported = mutex.lock()?;
        let held = mutex.held_by_this_instance();

        if reported != held {
            tracing::error!(path = %mutex.path.display(), reported, held, "inconsistent locking state");
            return Err(LockfileError::InconsistentState {
                path: mutex.path.clone(),
                reported,
                held,
            });
        }

        if !held && options.error_on_lock_failure {
            return Err(LockfileError::CouldNotLock {
                path: mutex.path.clone(),
            });
        }

        Ok(NewLocked {
            mutex,
            success: held,
        })
    }
}

fn acquire_error(path: &Path, source: io::Error) -> LockfileError {
    LockfileError::Acquire {
        path: path.to_path_buf(),
        source,
    }
}
