//! Plugin registry, loader registry, and call pipeline for the MetaCall
//! polyglot core (spec §4.4, §4.5, §4.6).

pub mod dispatch;
pub mod loader;
pub mod plugin;

#[cfg(test)]
pub(crate) mod loader_test_support;

pub use dispatch::{metacall_await, metacallfms, metacallfv, metacallt, metacallv, EngineThread};
pub use loader::{LoaderImpl, LoaderInstance, LoaderManager};
pub use plugin::{PluginDescriptor, PluginManager, PluginSource};
