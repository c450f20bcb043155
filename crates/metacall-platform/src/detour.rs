//! Function-hook abstraction (spec §4.7 "Detour").
//!
//! The C original rewrites a target's machine-code prologue in place
//! (funchook/plthook). Doing the equivalent in safe Rust means patching
//! executable pages at runtime, which has no safe representation and buys
//! nothing here: every call site this crate hooks (`fork`, in §4.8) already
//! goes through our own call boundary. So a [`Detour`] is instead a named
//! hook point holding an always-reachable original and a swappable current
//! hook, with install/uninstall serialised through the same process-wide
//! lock the spec calls for. This preserves the externally observable
//! contract (`install`, `trampoline`, serialised (un)installation) without
//! unsafe binary patching.

use metacall_value::{ErrorKind, MetaCallResult};
use parking_lot::Mutex as PLMutex;
use std::sync::Mutex as StdMutex;

static INSTALL_LOCK: StdMutex<()> = StdMutex::new(());

/// A hook point over calls of shape `F`. `original` is always reachable via
/// [`Detour::trampoline`]; `hook` is whatever was last installed, if any.
pub struct Detour<F: Clone + Send + Sync + 'static> {
    name: &'static str,
    original: F,
    hook: PLMutex<Option<F>>,
}

impl<F: Clone + Send + Sync + 'static> Detour<F> {
    /// Creates a detour over `original`, initially uninstalled (calls to
    /// [`Detour::current`] return `original` until [`Detour::install`] runs).
    pub fn new(name: &'static str, original: F) -> Self {
        Self {
            name,
            original,
            hook: PLMutex::new(None),
        }
    }

    /// Installs `hook`, replacing any previously installed hook. Serialised
    /// process-wide (spec §4.7 "Installation and uninstallation are
    /// serialised through a process-wide lock").
    pub fn install(&self, hook: F) -> MetaCallResult<()> {
        let _guard = INSTALL_LOCK
            .lock()
            .map_err(|_| ErrorKind::Fatal(format!("detour '{}': install lock poisoned", self.name)))?;
        *self.hook.lock() = Some(hook);
        Ok(())
    }

    /// Removes the installed hook, if any, restoring `original` as the
    /// effective target.
    pub fn uninstall(&self) -> MetaCallResult<()> {
        let _guard = INSTALL_LOCK
            .lock()
            .map_err(|_| ErrorKind::Fatal(format!("detour '{}': install lock poisoned", self.name)))?;
        *self.hook.lock() = None;
        Ok(())
    }

    /// Returns a pointer-equivalent that always invokes the original,
    /// bypassing any installed hook (spec §4.7 `detour_trampoline`).
    pub fn trampoline(&self) -> F {
        self.original.clone()
    }

    /// Returns the currently effective target: the installed hook if one is
    /// present, otherwise the original.
    pub fn current(&self) -> F {
        self.hook.lock().clone().unwrap_or_else(|| self.original.clone())
    }

    /// `true` if a hook is currently installed.
    pub fn is_installed(&self) -> bool {
        self.hook.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn trampoline_always_reaches_original() {
        let calls = Arc::new(AtomicUsize::new(0));
        let original: Arc<dyn Fn() + Send + Sync> = {
            let calls = calls.clone();
            Arc::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        let detour = Detour::new("test", original);
        detour.install(Arc::new(|| {}));
        assert!(detour.is_installed());
        (detour.trampoline())();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn uninstall_restores_original_as_current() {
        let original: Arc<dyn Fn() + Send + Sync> = Arc::new(|| {});
        let detour = Detour::new("test", original.clone());
        detour.install(Arc::new(|| {}));
        detour.uninstall().unwrap();
        assert!(!detour.is_installed());
    }
}
