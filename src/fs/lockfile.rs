//! Filesystem primitives for lockfiles.
//!
//! A lockfile is always empty; only its existence and its modification time
//! carry meaning. Everything the mutex needs from the filesystem goes through
//! this module:
//!
//! 1. Exclusive creation (`create_new` semantics) as the exclusion primitive
//! 2. Overwrite on takeover, which resets the modification time
//! 3. Refresh of an existing lockfile without ever re-creating it
//! 4. Age queries based on the modification time
//!
//! # Important Notes
//!
//! - Parent directories are created on demand and never removed afterwards.
//! - Timestamps are set explicitly after truncation, since truncating an
//!   already-empty file is not guaranteed to bump the modification time on
//!   every platform.

use crate::error::{LockfileError, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Result of an exclusive create attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The lockfile did not exist and was created by this call.
    Created,
    /// The lockfile already exists (someone else holds or held it).
    AlreadyExists,
}

/// Atomically create an empty lockfile if none exists.
///
/// Parent directories are created as needed. Any failure other than the file
/// already existing is returned as an error.
pub fn create_exclusive(path: &Path) -> io::Result<CreateOutcome> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(CreateOutcome::Created),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(CreateOutcome::AlreadyExists),
        Err(e) => Err(e),
    }
}

/// Overwrite the lockfile with empty content and reset its modification time.
///
/// Used when taking over a stale lock. Creates the file if it vanished in the
/// meantime.
pub fn overwrite(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    stamp_now(&file)
}

/// Refresh an existing lockfile's modification time.
///
/// Unlike [`overwrite`], this never creates the file: if the lockfile has been
/// removed (released, or deleted externally) the call fails with `NotFound`.
pub fn touch_existing(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().write(true).truncate(true).open(path)?;
    stamp_now(&file)
}

/// Remove the lockfile.
pub fn remove(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

fn stamp_now(file: &File) -> io::Result<()> {
    file.set_modified(SystemTime::now())
}

/// Age of an existing lockfile, as an I/O result.
///
/// A modification time in the future (clock skew between hosts sharing the
/// filesystem) counts as age zero.
pub(crate) fn age_of(path: &Path) -> io::Result<Duration> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO))
}

fn query_error(path: &Path, e: io::Error) -> LockfileError {
    if e.kind() == io::ErrorKind::NotFound {
        LockfileError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        LockfileError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

/// Return when the lockfile at `path` was last created or refreshed.
pub fn lockfile_modified<P: AsRef<Path>>(path: P) -> Result<SystemTime> {
    let path = path.as_ref();
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| query_error(path, e))
}

/// Return how long ago the lockfile at `path` was last created or refreshed.
///
/// Callers must only use this when the lockfile is known to exist, or be
/// prepared for [`LockfileError::NotFound`].
///
/// # Example
///
/// ```no_run
/// use lockfile_mutex::lockfile_age;
/// use std::path::Path;
///
/// let age = lockfile_age(Path::new("/var/run/backup.lock"))?;
/// println!("last refreshed {} ms ago", age.as_millis());
/// # Ok::<(), lockfile_mutex::LockfileError>(())
/// ```
pub fn lockfile_age<P: AsRef<Path>>(path: P) -> Result<Duration> {
    let path = path.as_ref();
    age_of(path).map_err(|e| query_error(path, e))
}
