//! Fork safety (spec §4.8).
//!
//! On `fork()`, pre-callbacks visit every loader in destruction order and
//! ask whether its runtime survives a fork (some GIL-holding interpreters
//! do not); back-ends that cannot survive are quiesced. Post-callbacks in
//! parent and child re-acquire runtime locks. An embedder may register a
//! callback that runs after a successful fork, on either side.
//!
//! On platforms lacking `fork` (spec §9 "Fork on platforms without it"),
//! [`ForkGuard::initialize`] is a no-op that returns `false`, and callers
//! proceed without pre/post callbacks.

use metacall_value::MetaCallResult;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// A loader (or other embedded runtime) that can be asked to quiesce before
/// a fork and resume afterward.
pub trait ForkSurvivor: Send + Sync {
    /// Identifies this survivor in logs.
    fn name(&self) -> &str;

    /// `false` if this runtime cannot safely continue after `fork()` (the
    /// common case for GIL-holding interpreters that hold internal locks).
    fn survives_fork(&self) -> bool;

    /// Called pre-fork when [`ForkSurvivor::survives_fork`] is `false`: the
    /// implementation should release or otherwise quiesce anything that
    /// would deadlock a forked child.
    fn quiesce(&self);

    /// Called post-fork in both parent and child to re-acquire runtime
    /// locks in the correct order.
    fn resume(&self, in_child: bool);
}

type PostForkCallback = Box<dyn Fn(bool) + Send + Sync>;

/// Coordinates fork-safety callbacks across every registered survivor.
pub struct ForkGuard {
    survivors: RwLock<Vec<Arc<dyn ForkSurvivor>>>,
    post_callbacks: RwLock<Vec<PostForkCallback>>,
    installed: AtomicBool,
}

impl Default for ForkGuard {
    fn default() -> Self {
        Self {
            survivors: RwLock::new(Vec::new()),
            post_callbacks: RwLock::new(Vec::new()),
            installed: AtomicBool::new(false),
        }
    }
}

impl ForkGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a survivor. Visited in registration order during
    /// `pre_fork`/`post_fork`, which callers should keep aligned with the
    /// loader manager's destruction order (spec §4.8 "in destruction
    /// order").
    pub fn register_survivor(&self, survivor: Arc<dyn ForkSurvivor>) {
        self.survivors.write().push(survivor);
    }

    /// Registers a callback run after a successful fork, in either the
    /// parent (`in_child = false`) or the child (`in_child = true`).
    pub fn register_post_fork(&self, callback: impl Fn(bool) + Send + Sync + 'static) {
        self.post_callbacks.write().push(Box::new(callback));
    }

    /// Installs the platform `fork()` detour. Returns `true` if the
    /// platform supports it; `false` on platforms without `fork`, in which
    /// case no pre/post callbacks will ever run (spec §9).
    pub fn initialize(self: &Arc<Self>) -> MetaCallResult<bool> {
        if self.installed.swap(true, Ordering::AcqRel) {
            return Ok(platform_supports_fork());
        }
        if !platform_supports_fork() {
            return Ok(false);
        }
        install_platform_hooks(self.clone());
        Ok(true)
    }

    /// Runs every registered pre-fork quiesce, in registration order.
    pub fn pre_fork(&self) {
        for survivor in self.survivors.read().iter() {
            if !survivor.survives_fork() {
                survivor.quiesce();
            }
        }
    }

    /// Runs every registered resume, then any embedder post-fork callbacks,
    /// in the parent process.
    pub fn post_fork_parent(&self) {
        self.post_fork(false);
    }

    /// Runs every registered resume, then any embedder post-fork callbacks,
    /// in the child process.
    pub fn post_fork_child(&self) {
        self.post_fork(true);
    }

    fn post_fork(&self, in_child: bool) {
        for survivor in self.survivors.read().iter() {
            survivor.resume(in_child);
        }
        for callback in self.post_callbacks.read().iter() {
            callback(in_child);
        }
    }
}

#[cfg(unix)]
fn platform_supports_fork() -> bool {
    true
}

#[cfg(not(unix))]
fn platform_supports_fork() -> bool {
    false
}

#[cfg(unix)]
static ACTIVE_GUARD: OnceLock<Arc<ForkGuard>> = OnceLock::new();

#[cfg(unix)]
fn install_platform_hooks(guard: Arc<ForkGuard>) {
    // `pthread_atfork` requires plain `extern "C" fn()` pointers, so the
    // active guard is published to a process-global and the trampolines
    // below look it up rather than closing over it directly.
    let _ = ACTIVE_GUARD.set(guard);
    unsafe {
        libc::pthread_atfork(
            Some(atfork_prepare),
            Some(atfork_parent),
            Some(atfork_child),
        );
    }
}

#[cfg(unix)]
extern "C" fn atfork_prepare() {
    if let Some(guard) = ACTIVE_GUARD.get() {
        guard.pre_fork();
    }
}

#[cfg(unix)]
extern "C" fn atfork_parent() {
    if let Some(guard) = ACTIVE_GUARD.get() {
        guard.post_fork_parent();
    }
}

#[cfg(unix)]
extern "C" fn atfork_child() {
    if let Some(guard) = ACTIVE_GUARD.get() {
        guard.post_fork_child();
    }
}

#[cfg(not(unix))]
fn install_platform_hooks(_guard: Arc<ForkGuard>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSurvivor {
        survives: bool,
        quiesced: AtomicUsize,
        resumed: AtomicUsize,
    }

    impl ForkSurvivor for CountingSurvivor {
        fn name(&self) -> &str {
            "counting"
        }
        fn survives_fork(&self) -> bool {
            self.survives
        }
        fn quiesce(&self) {
            self.quiesced.fetch_add(1, Ordering::SeqCst);
        }
        fn resume(&self, _in_child: bool) {
            self.resumed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn pre_fork_quiesces_only_non_survivors() {
        let guard = ForkGuard::new();
        let gil_engine = Arc::new(CountingSurvivor {
            survives: false,
            quiesced: AtomicUsize::new(0),
            resumed: AtomicUsize::new(0),
        });
        let free_threaded = Arc::new(CountingSurvivor {
            survives: true,
            quiesced: AtomicUsize::new(0),
            resumed: AtomicUsize::new(0),
        });
        guard.register_survivor(gil_engine.clone());
        guard.register_survivor(free_threaded.clone());
        guard.pre_fork();
        assert_eq!(gil_engine.quiesced.load(Ordering::SeqCst), 1);
        assert_eq!(free_threaded.quiesced.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn post_fork_resumes_every_survivor() {
        let guard = ForkGuard::new();
        let s = Arc::new(CountingSurvivor {
            survives: true,
            quiesced: AtomicUsize::new(0),
            resumed: AtomicUsize::new(0),
        });
        guard.register_survivor(s.clone());
        guard.post_fork_parent();
        assert_eq!(s.resumed.load(Ordering::SeqCst), 1);
    }
}
