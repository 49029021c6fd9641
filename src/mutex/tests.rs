//! Tests for the lockfile mutex.
//!
//! Handles created with default options register with the process-wide exit
//! hook registry, and one test runs that registry, so these tests are serial.

use super::*;
use crate::config::{LockOptions, LockfileMutexOptions, NewLockedOptions, UnlockOptions};
use crate::error::LockfileError;
use crate::exit_hook::{ExitHook, ProcessExitHooks, run_exit_hooks};
use crate::fs::lockfile_age;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn lockfile_in(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("lockfile")
}

fn with_timeout_ms(ms: u64) -> LockfileMutexOptions {
    LockfileMutexOptions::default().with_timeout(Duration::from_millis(ms))
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
#[serial]
fn test_construction_has_no_filesystem_effect() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("lockfile");

    let mutex = LockfileMutex::new(&path);

    assert!(!mutex.held_by_this_instance());
    assert!(!path.exists());
    assert!(!path.parent().unwrap().exists());
}

#[test]
#[serial]
fn test_lock_and_unlock_create_and_remove_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("lockfile");
    let mut mutex = LockfileMutex::new(&path);

    assert!(mutex.lock().unwrap());
    assert!(path.exists());

    mutex.unlock().unwrap();
    assert!(!path.exists());
    // Intermediate directories are left behind.
    assert!(path.parent().unwrap().is_dir());
}

#[test]
#[serial]
fn test_lock_cycles() {
    let temp_dir = TempDir::new().unwrap();
    let mut mutex = LockfileMutex::new(lockfile_in(&temp_dir));

    for _ in 0..3 {
        assert!(!mutex.held_by_this_instance());
        assert!(mutex.lock().unwrap());
        assert!(mutex.lock().unwrap());

        assert!(!mutex.lock_with(LockOptions { idempotent: false }).unwrap());
        assert!(mutex.held_by_this_instance());

        mutex.unlock().unwrap();
        assert!(!mutex.held_by_this_instance());
        mutex.unlock().unwrap();

        let err = mutex
            .unlock_with(UnlockOptions { idempotent: false })
            .unwrap_err();
        assert!(matches!(err, LockfileError::NotHeld { .. }));
    }
}

#[test]
#[serial]
fn test_new_locked_holds_lock() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);

    let NewLocked { mut mutex, success } =
        LockfileMutex::new_locked(&path, NewLockedOptions::default()).unwrap();

    assert!(success);
    assert!(mutex.held_by_this_instance());
    assert!(path.exists());

    mutex.unlock().unwrap();
    assert!(!mutex.held_by_this_instance());
}

#[test]
#[serial]
fn test_contention_and_takeover() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let mut first = LockfileMutex::with_options(&path, with_timeout_ms(200));
    let mut second = LockfileMutex::with_options(&path, with_timeout_ms(200));

    assert!(first.lock().unwrap());
    assert!(!second.lock().unwrap());

    // An external rewrite after release looks like a live holder until it times out.
    first.unlock().unwrap();
    fs::write(&path, "").unwrap();
    assert!(!second.lock().unwrap());

    sleep(Duration::from_millis(300));
    assert!(second.lock().unwrap());
    assert!(!first.lock().unwrap());
    assert!(!first.held_by_this_instance());
}

#[test]
#[serial]
fn test_new_locked_on_locked_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);

    let holder = LockfileMutex::new_locked(&path, NewLockedOptions::default()).unwrap();
    assert!(holder.success);

    let err = LockfileMutex::new_locked(&path, NewLockedOptions::default()).unwrap_err();
    assert!(matches!(err, LockfileError::CouldNotLock { .. }));

    let options = NewLockedOptions::default().with_error_on_lock_failure(false);
    let contender = LockfileMutex::new_locked(&path, options).unwrap();
    assert!(!contender.success);
    assert!(!contender.mutex.held_by_this_instance());

    // The failed contenders must not have disturbed the holder.
    drop(contender);
    assert!(path.exists());
    assert!(holder.mutex.held_by_this_instance());
}

#[test]
#[serial]
fn test_new_locked_rejects_zero_timeout() {
    let temp_dir = TempDir::new().unwrap();
    let options = NewLockedOptions::default().with_timeout(Duration::ZERO);

    let err = LockfileMutex::new_locked(lockfile_in(&temp_dir), options).unwrap_err();
    assert!(matches!(err, LockfileError::Config(_)));
}

#[test]
#[serial]
fn test_lockfile_age() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let mut mutex = LockfileMutex::new(&path);

    let err = lockfile_age(&path).unwrap_err();
    assert!(matches!(err, LockfileError::NotFound { .. }));

    assert!(mutex.lock().unwrap());
    assert!(lockfile_age(&path).unwrap() < Duration::from_millis(1000));

    sleep(Duration::from_millis(100));
    assert!(lockfile_age(&path).unwrap() >= Duration::from_millis(100));
}

#[test]
#[serial]
fn test_refresh_keeps_lockfile_fresh() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let options = NewLockedOptions::default().with_timeout(Duration::from_millis(200));

    let locked = LockfileMutex::new_locked(&path, options).unwrap();
    assert!(locked.success);

    // Several timeout windows pass; the refresher keeps every sample below the timeout.
    for _ in 0..25 {
        sleep(Duration::from_millis(30));
        assert!(lockfile_age(&path).unwrap() < Duration::from_millis(200));
    }

    let mut contender = LockfileMutex::with_options(&path, with_timeout_ms(200));
    assert!(!contender.lock().unwrap());
}

#[test]
#[serial]
fn test_abandoned_lock_can_be_taken_over() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let mut frozen = LockfileMutex::with_options(&path, with_timeout_ms(100));
    let mut contender = LockfileMutex::with_options(&path, with_timeout_ms(100));

    assert!(frozen.lock().unwrap());
    frozen.abandon();
    assert!(!frozen.held_by_this_instance());

    sleep(Duration::from_millis(200));
    assert!(lockfile_age(&path).unwrap() > Duration::from_millis(100));

    assert!(contender.lock().unwrap());
    assert!(lockfile_age(&path).unwrap() < Duration::from_millis(100));
    assert!(!frozen.lock().unwrap());
}

#[test]
#[serial]
fn test_same_process_instances_are_independent_contenders() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let mut a = LockfileMutex::new(&path);
    let mut b = LockfileMutex::new(&path);

    assert!(a.lock().unwrap());
    assert!(!b.lock().unwrap());
    assert!(!b.held_by_this_instance());

    // Releasing through the non-holder does nothing.
    b.unlock().unwrap();
    assert!(path.exists());

    a.unlock().unwrap();
    assert!(b.lock().unwrap());
}

#[test]
#[serial]
fn test_drop_releases_lock() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);

    {
        let mut mutex = LockfileMutex::new(&path);
        assert!(mutex.lock().unwrap());

        let options = NewLockedOptions::default().with_error_on_lock_failure(false);
        assert!(!LockfileMutex::new_locked(&path, options).unwrap().success);
    }

    assert!(!path.exists());
    let options = NewLockedOptions::default().with_error_on_lock_failure(false);
    assert!(LockfileMutex::new_locked(&path, options).unwrap().success);
}

#[test]
#[serial]
fn test_drop_of_never_locked_instance() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    fs::write(&path, "").unwrap();

    drop(LockfileMutex::new(&path));

    assert!(path.exists());
}

#[test]
#[serial]
fn test_acquire_io_error_is_not_contention() {
    let temp_dir = TempDir::new().unwrap();
    let not_a_dir = temp_dir.path().join("plain-file");
    fs::write(&not_a_dir, "").unwrap();
    let mut mutex = LockfileMutex::new(not_a_dir.join("lockfile"));

    let err = mutex.lock().unwrap_err();
    assert!(matches!(err, LockfileError::Acquire { .. }));
    assert!(!mutex.held_by_this_instance());
}

#[test]
#[serial]
fn test_external_removal_surfaces_refresh_failure() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let mut mutex = LockfileMutex::with_options(&path, with_timeout_ms(20));

    assert!(mutex.lock().unwrap());
    assert!(mutex.refresh_failure().is_none());
    fs::remove_file(&path).unwrap();

    let stopped = wait_until(Duration::from_secs(5), || !mutex.held_by_this_instance());
    assert!(stopped);
    let failure = mutex.refresh_failure().unwrap();
    assert!(matches!(failure, LockfileError::Refresh { .. }));

    // Not held any more: unlocking is a no-op and re-locking starts fresh.
    mutex.unlock().unwrap();
    assert!(mutex.lock().unwrap());
    assert!(mutex.refresh_failure().is_none());
}

#[test]
#[serial]
fn test_exit_hook_releases_held_lock() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let hooks = Arc::new(ProcessExitHooks::new());
    let hook: Arc<dyn ExitHook> = hooks.clone();

    let mut mutex = LockfileMutex::with_exit_hook(&path, LockfileMutexOptions::default(), hook);
    assert_eq!(hooks.len(), 1);
    assert!(mutex.lock().unwrap());

    assert_eq!(hooks.run(), 1);
    assert!(!path.exists());
    assert!(!mutex.held_by_this_instance());

    mutex.unlock().unwrap();
    let err = mutex
        .unlock_with(UnlockOptions { idempotent: false })
        .unwrap_err();
    assert!(matches!(err, LockfileError::NotHeld { .. }));
}

#[test]
#[serial]
fn test_exit_hook_leaves_unheld_lockfile_alone() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let hooks = Arc::new(ProcessExitHooks::new());

    let mut holder = LockfileMutex::new(&path);
    assert!(holder.lock().unwrap());
    let _contender =
        LockfileMutex::with_exit_hook(&path, LockfileMutexOptions::default(), hooks.clone());

    hooks.run();
    assert!(path.exists());
    assert!(holder.held_by_this_instance());
}

#[test]
#[serial]
fn test_exit_hook_registration_follows_options() {
    let temp_dir = TempDir::new().unwrap();
    let hooks = Arc::new(ProcessExitHooks::new());

    let without = LockfileMutex::with_exit_hook(
        lockfile_in(&temp_dir),
        LockfileMutexOptions::default().with_unlock_on_exit(false),
        hooks.clone(),
    );
    assert!(hooks.is_empty());

    let with = LockfileMutex::with_exit_hook(
        lockfile_in(&temp_dir),
        LockfileMutexOptions::default(),
        hooks.clone(),
    );
    assert_eq!(hooks.len(), 1);

    drop(with);
    drop(without);
    assert!(hooks.is_empty());
}

#[test]
#[serial]
fn test_global_exit_hooks_release_default_handles() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let mut mutex = LockfileMutex::new(&path);
    assert!(mutex.lock().unwrap());

    assert!(run_exit_hooks() >= 1);

    assert!(!path.exists());
    assert!(!mutex.held_by_this_instance());
}

#[test]
#[serial]
fn test_failed_release_keeps_lock_held() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let mut mutex = LockfileMutex::new(&path);
    assert!(mutex.lock().unwrap());

    // A directory in place of the lockfile cannot be removed as a file.
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();

    let err = mutex.unlock().unwrap_err();
    assert!(matches!(err, LockfileError::Release { .. }));
    assert!(mutex.held_by_this_instance());
    assert!(path.exists());

    fs::remove_dir(&path).unwrap();
    fs::write(&path, "").unwrap();

    mutex
        .unlock_with(UnlockOptions { idempotent: false })
        .unwrap();
    assert!(!mutex.held_by_this_instance());
    assert!(!path.exists());
}

#[test]
#[serial]
fn test_short_timeout_refresh_and_takeover() {
    let temp_dir = TempDir::new().unwrap();
    let path = lockfile_in(&temp_dir);
    let timeout = Duration::from_millis(10);
    let mut holder = LockfileMutex::with_options(&path, with_timeout_ms(10));
    assert!(holder.lock().unwrap());

    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(105) {
        assert!(lockfile_age(&path).unwrap() < timeout);
        sleep(Duration::from_millis(1));
    }
    assert!(holder.held_by_this_instance());

    holder.abandon();
    sleep(Duration::from_millis(30));
    assert!(lockfile_age(&path).unwrap() > timeout);

    let mut contender = LockfileMutex::with_options(&path, with_timeout_ms(10));
    assert!(contender.lock().unwrap());
    assert!(contender.held_by_this_instance());
}
