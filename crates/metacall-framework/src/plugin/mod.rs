//! Descriptor-driven plugin registry (spec §4.4).

pub mod descriptor;
pub mod manager;

pub use descriptor::{PluginDescriptor, PluginSource};
pub use manager::PluginManager;
