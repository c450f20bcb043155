//! The per-language back-end interface (spec §4.5 "Loader-implementation
//! interface").
//!
//! An open set — unlike the closed `TypeId`/`ErrorKind` enums, new loaders
//! arrive without touching this crate — so it is modeled as a trait object
//! rather than a sum type (spec §9 "prefer sum types for closed sets ...
//! and interface traits for open sets (loader back-ends, serial codecs)").

use async_trait::async_trait;
use metacall_value::loader::{Affinity, Handle};
use metacall_value::{Context, MetaCallResult};
use std::path::{Path, PathBuf};

/// A long-lived per-language engine (spec §3 "Loader implementation").
///
/// Per spec §5 "Suspension points", `initialize`, every `load_from_*`, and
/// `destroy` may suspend; `execution_path`, `clear`, and `discover` do not.
#[async_trait]
pub trait LoaderImpl: Send + Sync {
    /// Short tag this implementation answers to (`"py"`, `"node"`, `"mock"`, ...).
    fn tag(&self) -> &str;

    /// The thread-entry rule the loader manager must honour for this engine.
    fn affinity(&self) -> Affinity;

    /// One-time per-process engine start; may spin threads.
    async fn initialize(&self, config: &serde_json::Value) -> MetaCallResult<()>;

    /// Adds `path` to the engine's module search path. Idempotent.
    fn execution_path(&self, path: &Path) -> MetaCallResult<()>;

    /// Produces a handle by reading the listed files.
    async fn load_from_file(&self, paths: &[PathBuf]) -> MetaCallResult<Handle>;

    /// Produces a handle from an in-memory source fingerprinted by `name`.
    async fn load_from_memory(&self, name: &str, buffer: &[u8]) -> MetaCallResult<Handle>;

    /// Produces a handle from a pre-compiled artefact (archive, DLL, bytecode).
    async fn load_from_package(&self, path: &Path) -> MetaCallResult<Handle>;

    /// Disposes a single handle.
    fn clear(&self, handle: &mut Handle) -> MetaCallResult<()>;

    /// Enumerates the top-level symbols of `handle`, populating `context`
    /// with reflected entities whose back-end native references are stored
    /// in each entity's `impl`/backend payload field.
    fn discover(&self, handle: &Handle, context: &mut Context) -> MetaCallResult<()>;

    /// Tears down the engine. Must be idempotent against the manager's
    /// destroy-map: a second call after a successful first is a no-op,
    /// never a panic or an error.
    async fn destroy(&self) -> MetaCallResult<()>;
}
