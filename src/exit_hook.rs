//! Process-exit cleanup for held lockfiles.
//!
//! A `LockfileMutex` created with `unlock_on_exit` registers a cleanup
//! callback with an [`ExitHook`] at construction and deregisters it on drop.
//! The core never talks to a host exit mechanism directly: the default
//! [`ProcessExitHooks`] registry only collects callbacks, and the host decides
//! when to run them (signal handler, end of `main`, ...).
//!
//! Callbacks are `FnOnce`: running the registry drains it, so each callback
//! runs at most once. Callbacks must be synchronous and must finish before the
//! process dies. Nothing here runs on a forced kill.

use crate::error::{LockfileError, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, OnceLock};

/// A synchronous cleanup callback run at most once before process exit.
pub type ExitCleanup = Box<dyn FnOnce() + Send + 'static>;

/// Handle identifying a registered cleanup callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookId(u64);

/// Capability for registering cleanup work to run on process exit.
pub trait ExitHook: Send + Sync {
    /// Register a callback; returns an id usable with [`ExitHook::deregister`].
    fn register(&self, cleanup: ExitCleanup) -> HookId;

    /// Remove a previously registered callback without running it.
    ///
    /// Deregistering an unknown or already-run id is a no-op.
    fn deregister(&self, id: HookId);
}

static GLOBAL: LazyLock<Arc<ProcessExitHooks>> =
    LazyLock::new(|| Arc::new(ProcessExitHooks::new()));

/// In-memory registry of exit cleanup callbacks.
#[derive(Default)]
pub struct ProcessExitHooks {
    next_id: AtomicU64,
    hooks: Mutex<BTreeMap<HookId, ExitCleanup>>,
}

impl ProcessExitHooks {
    /// Create an empty, standalone registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by default-constructed mutexes.
    pub fn global() -> Arc<ProcessExitHooks> {
        Arc::clone(&GLOBAL)
    }

    /// Run and remove every registered callback. Returns how many ran.
    ///
    /// Callbacks run in registration order, outside the registry lock, so a
    /// callback may itself (de)register without deadlocking.
    pub fn run(&self) -> usize {
        let drained = std::mem::take(&mut *self.lock_hooks());
        let count = drained.len();
        for (id, cleanup) in drained {
            tracing::debug!(hook = id.0, "running exit cleanup");
            cleanup();
        }
        count
    }

    /// Number of callbacks currently registered.
    pub fn len(&self) -> usize {
        self.lock_hooks().len()
    }

    /// Whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_hooks(&self) -> std::sync::MutexGuard<'_, BTreeMap<HookId, ExitCleanup>> {
        // A panicking cleanup must not prevent the remaining ones from running.
        self.hooks
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl ExitHook for ProcessExitHooks {
    fn register(&self, cleanup: ExitCleanup) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_hooks().insert(id, cleanup);
        id
    }

    fn deregister(&self, id: HookId) {
        self.lock_hooks().remove(&id);
    }
}

impl std::fmt::Debug for ProcessExitHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessExitHooks")
            .field("registered", &self.len())
            .finish()
    }
}

/// Run the process-wide registry. Returns how many callbacks ran.
pub fn run_exit_hooks() -> usize {
    ProcessExitHooks::global().run()
}

/// Install a Ctrl-C / SIGTERM handler that runs the process-wide registry
/// and then exits with `exit_code`.
///
/// Only one termination handler can be installed per process, so this and
/// [`termination_flag`] are mutually exclusive.
pub fn install_signal_handler(exit_code: i32) -> Result<()> {
    set_termination_handler(move || {
        let ran = run_exit_hooks();
        tracing::debug!(ran, "received termination signal, released lockfiles");
        std::process::exit(exit_code);
    })
}

static TERMINATION: OnceLock<std::result::Result<Arc<AtomicBool>, String>> = OnceLock::new();

/// Flag set by Ctrl-C / SIGTERM, for hosts that must stop work of their own
/// (such as a child process) before releasing their locks.
///
/// The handler is installed on first call and only records the signal; the
/// process keeps running. Later calls return the same flag.
pub fn termination_flag() -> Result<Arc<AtomicBool>> {
    TERMINATION
        .get_or_init(|| {
            let flag = Arc::new(AtomicBool::new(false));
            let handler_flag = Arc::clone(&flag);
            set_termination_handler(move || {
                tracing::debug!("received termination signal");
                handler_flag.store(true, Ordering::SeqCst);
            })
            .map(|()| flag)
            .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(LockfileError::ExitHook)
}

fn set_termination_handler<F>(handler: F) -> Result<()>
where
    F: FnMut() + Send + 'static,
{
    ctrlc::set_handler(handler).map_err(|e| LockfileError::ExitHook(e.to_string()))
}
