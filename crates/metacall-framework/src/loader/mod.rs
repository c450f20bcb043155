//! Loader back ends, the registry that owns them, and the pipeline that
//! turns a `load_from_*` call into a handle folded into a host context
//! (spec §4.5).

pub mod manager;
pub mod pipeline;
pub mod vtable;

pub use manager::{LoaderInstance, LoaderManager};
pub use pipeline::{load_from_file, load_from_memory, load_from_package};
pub use vtable::LoaderImpl;
