//! Configuration loading, logging bootstrap, and runtime orchestration for
//! the MetaCall polyglot core (spec §6, §9 "Global singletons").
//!
//! This crate does not define the public façade itself — that is
//! `metacall` (`crates/metacall`) — but it supplies everything the façade
//! assembles: [`Runtime`], the configuration-file pipeline, the cached
//! environment reader, and the `tracing`-based logging builder.

pub mod config;
pub mod env;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, LoadConfiguration};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{HandleRef, Runtime};
