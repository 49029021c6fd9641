//! Lockfile-backed mutual exclusion.
//!
//! # Protocol
//!
//! - Acquire by creating the lockfile with **create_new** semantics; only one
//!   contender can create a given file.
//! - If the lockfile already exists, look at its modification time. A lockfile
//!   not refreshed for longer than the timeout is abandoned and may be taken
//!   over by overwriting it.
//! - While held, a background refresher rewrites the lockfile every
//!   `timeout * 0.45`, so a live holder's lockfile never looks stale.
//! - Release stops the refresher and removes the lockfile.
//!
//! Handles on the same path within one process contend exactly like handles
//! in different processes.

mod operations;
mod refresh;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use types::{LockfileMutex, NewLocked};
