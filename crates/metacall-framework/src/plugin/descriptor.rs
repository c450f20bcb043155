//! Plugin descriptors (spec §4.4 "A *plugin descriptor* names: the shared
//! library filename, the symbol-interface name, and a singleton getter that
//! returns the interface table").

use metacall_value::MetaCallResult;
use std::sync::Arc;

/// Where a plugin's interface instance comes from.
#[derive(Debug, Clone, Copy)]
pub enum PluginSource {
    /// Built directly into the host process (e.g. the `mock` loader used in
    /// tests, or an in-process extension per spec §8 scenario 6).
    InProcess,
    /// Distributed as a shared object the manager must load and resolve a
    /// singleton getter from (spec §6 "Plugin naming": `<tag>_loader<debug
    /// suffix>.<ext>` exporting `<tag>_loader_impl_interface_singleton()`).
    Dynamic {
        library_name: &'static str,
        interface_symbol: &'static str,
    },
}

/// A statically describable plugin: metadata plus a factory that produces
/// its live interface instance. Generic over the interface trait object the
/// plugin manager is registering (`dyn LoaderImpl`, `dyn Serial`, ...).
pub struct PluginDescriptor<I: ?Sized> {
    /// Unique name within the owning manager (a loader tag, a serial tag, ...).
    pub name: &'static str,
    /// Names of other plugins (in the same manager) that must be live
    /// before this one loads, and that must outlive it at destruction.
    pub depends_on: &'static [&'static str],
    /// Where the interface instance comes from, for diagnostics and for
    /// `Dynamic` plugins' lazy `dlopen`.
    pub source: PluginSource,
    /// Produces the live interface instance. For `Dynamic` plugins this
    /// closure is expected to perform the `dlopen` + symbol resolution
    /// itself (see `metacall_platform::dynlink`); for `InProcess` plugins
    /// it typically just constructs a value directly.
    pub factory: Arc<dyn Fn() -> MetaCallResult<Arc<I>> + Send + Sync>,
}

impl<I: ?Sized> Clone for PluginDescriptor<I> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            depends_on: self.depends_on,
            source: self.source,
            factory: self.factory.clone(),
        }
    }
}

impl<I: ?Sized> PluginDescriptor<I> {
    /// Builds an in-process descriptor from a plain factory closure.
    pub fn in_process(
        name: &'static str,
        depends_on: &'static [&'static str],
        factory: impl Fn() -> MetaCallResult<Arc<I>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            depends_on,
            source: PluginSource::InProcess,
            factory: Arc::new(factory),
        }
    }
}
