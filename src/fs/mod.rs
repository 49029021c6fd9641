//! Filesystem utilities for lockfile-mutex.
//!
//! This module provides the lockfile primitives the mutex is built on:
//! exclusive creation, overwrite, refresh, removal, and age queries.

pub mod lockfile;

pub use lockfile::{lockfile_age, lockfile_modified};
