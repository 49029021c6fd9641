//! Per-call option types, constants, and default value functions.

/// Default staleness timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Fraction of the timeout between two refreshes of a held lockfile.
///
/// Refreshing roughly twice per timeout window keeps the lockfile fresh even
/// if one refresh cycle is missed.
pub const REFRESH_TIMEOUT_FRACTION: f64 = 0.45;

/// Options for a single `lock` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// When the lock is already held by this instance, report success (`true`)
    /// or failure (`false`). Defaults to `true`.
    pub idempotent: bool,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self { idempotent: true }
    }
}

/// Options for a single `unlock` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockOptions {
    /// When the lock is not held, return quietly (`true`) or fail with a
    /// usage error (`false`). Defaults to `true`.
    pub idempotent: bool,
}

impl Default for UnlockOptions {
    fn default() -> Self {
        Self { idempotent: true }
    }
}

pub(crate) fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
pub(crate) fn default_true() -> bool {
    true
}
