//! Configuration for lockfile mutexes.
//!
//! Construction options (`LockfileMutexOptions`), convenience-constructor
//! options (`NewLockedOptions`), and per-call options (`LockOptions`,
//! `UnlockOptions`). Construction options can be loaded from YAML; unknown
//! fields are ignored, missing fields take their defaults.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::{LockfileMutexOptions, NewLockedOptions};
pub use types::{DEFAULT_TIMEOUT_MS, LockOptions, REFRESH_TIMEOUT_FRACTION, UnlockOptions};
