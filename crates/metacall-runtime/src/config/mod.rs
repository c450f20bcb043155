//! Configuration-file loading (spec §6 "Configuration file").

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::LoadConfiguration;
