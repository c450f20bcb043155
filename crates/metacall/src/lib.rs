//! # metacall
//!
//! A polyglot FFI runtime: load a function written in one language and call
//! it from any other, through one reflected [`Value`](metacall_value::Value)
//! model and one dynamically extensible loader registry (spec §1, §2).
//!
//! This crate is the façade (spec §6): it holds the single process-wide
//! [`metacall_runtime::Runtime`] behind [`initialize`]/[`destroy`] and
//! exposes the flat, name-illustrative API the spec describes, the way
//! `alloy`'s top-level crate assembles `alloy-core`/`alloy-framework`/
//! `alloy-runtime` into one `AlloyRuntime` entry point.
//!
//! ```rust,ignore
//! # async fn run() -> metacall_value::MetaCallResult<()> {
//! metacall::initialize()?;
//! metacall::load_from_memory("mock", "greet", b"echo(1)\n").await?;
//! let result = metacall::metacallv("echo", &[metacall_value::Value::Int(1)]).await?;
//! metacall::destroy().await?;
//! # Ok(())
//! # }
//! ```

pub use metacall_framework::{LoaderImpl, PluginDescriptor, PluginSource};
pub use metacall_runtime::{ConfigLoader, HandleRef, LoadConfiguration, LoggingBuilder, Runtime, SpanEvents};
pub use metacall_serial::Serial;
pub use metacall_value::allocator::{Allocator, AllocatorHandle};
pub use metacall_value::{
    error_from_value, Class, Constructor, Context, ErrorInfo, ErrorKind, Exception, Function,
    FutureResolver, Method, MetaCallError, MetaCallResult, MetaFuture, Object, Parameter,
    Signature, Throwable, Type, TypeId, Value, Visibility,
};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod log_kind;
pub use log_kind::LogKind;

static RUNTIME: Lazy<RwLock<Option<Arc<Runtime>>>> = Lazy::new(|| RwLock::new(None));

/// Returns the live runtime, or [`ErrorKind::BadArgument`] if
/// [`initialize`]/[`initialize_ex`] has not been called (or [`destroy`] has
/// already torn it down).
fn runtime() -> MetaCallResult<Arc<Runtime>> {
    RUNTIME
        .read()
        .clone()
        .ok_or_else(|| ErrorKind::BadArgument("metacall has not been initialized".into()).into())
}

/// Brings up the process-wide runtime with no configuration documents
/// (spec §6 `initialize`). Idempotent: a second call while already
/// initialised is a no-op.
pub fn initialize() -> MetaCallResult<()> {
    let mut slot = RUNTIME.write();
    if slot.is_none() {
        *slot = Some(Arc::new(Runtime::new()));
    }
    Ok(())
}

/// Brings up the runtime and loads every configuration document in
/// `configurations`, in the order given (spec §6 `initialize_ex`).
pub async fn initialize_ex(configurations: &[PathBuf]) -> MetaCallResult<()> {
    initialize()?;
    let runtime = runtime()?;
    for path in configurations {
        runtime.load_from_configuration(path).await?;
    }
    Ok(())
}

/// `true` once `tag`'s loader has been created (spec §6 `is_initialized`).
pub async fn is_initialized(tag: &str) -> MetaCallResult<bool> {
    Ok(runtime()?.is_initialized(tag).await)
}

/// Registers a loader back-end descriptor under its tag, to be
/// lazily instantiated on first use (spec §3, §4.4).
pub async fn register_loader(descriptor: PluginDescriptor<dyn LoaderImpl>) -> MetaCallResult<()> {
    runtime()?.register_loader(descriptor).await;
    Ok(())
}

/// Adds `path` to `tag`'s module search path (spec §6 `execution_path`).
pub async fn execution_path(tag: &str, path: impl Into<PathBuf>) -> MetaCallResult<()> {
    runtime()?.execution_path(tag, path).await
}

/// Loads from one or more files on disk (spec §6 `load_from_file`).
pub async fn load_from_file(tag: &str, paths: &[PathBuf]) -> MetaCallResult<HandleRef> {
    runtime()?.load_from_file(tag, paths).await
}

/// Loads from an in-memory buffer (spec §6 `load_from_memory`).
pub async fn load_from_memory(tag: &str, name: &str, buffer: &[u8]) -> MetaCallResult<HandleRef> {
    runtime()?.load_from_memory(tag, name, buffer).await
}

/// Loads from a pre-compiled package artefact (spec §6 `load_from_package`).
pub async fn load_from_package(tag: &str, path: &Path) -> MetaCallResult<HandleRef> {
    runtime()?.load_from_package(tag, path).await
}

/// Resolves and loads a §6 configuration file's dependency tree
/// (spec §6 `load_from_configuration`).
pub async fn load_from_configuration(path: impl AsRef<Path>) -> MetaCallResult<HandleRef> {
    runtime()?.load_from_configuration(path).await
}

/// Looks up a function discovered so far, by its anonymous name
/// (spec §6 `function`).
pub fn function(name: &str) -> MetaCallResult<Option<Arc<Function>>> {
    Ok(runtime()?.function(name))
}

/// Finds the handle registered under `tag` whose script identity names
/// `name` (spec §6 `handle(tag, name)`).
pub async fn handle(tag: &str, name: &str) -> MetaCallResult<Option<HandleRef>> {
    Ok(runtime()?.handle(tag, name).await)
}

/// Disposes a single handle (spec §6 `clear`).
pub async fn clear(handle: &HandleRef) -> MetaCallResult<()> {
    runtime()?.clear(handle).await
}

/// Canonical by-name, pre-boxed-value call (spec §4.6 `metacallv`).
pub async fn metacallv(name: &str, args: &[Value]) -> MetaCallResult<Value> {
    runtime()?.metacallv(name, args).await
}

/// Type-tagged variadic call: casts arguments to the target signature
/// before invoking (spec §4.6 `metacallt`).
pub async fn metacallt(name: &str, args: &[Value]) -> MetaCallResult<Value> {
    runtime()?.metacallt(name, args).await
}

/// Calls an already-resolved function handle directly (spec §4.6 `metacallfv`).
pub async fn metacallfv(function: &Arc<Function>, args: &[Value]) -> MetaCallResult<Value> {
    runtime()?.metacallfv(function, args).await
}

/// Map-shaped call: deserializes `serialized` with `codec_tag`'s codec,
/// binds named arguments, casts, and invokes (spec §4.6 `metacallfms`).
pub async fn metacallfms(
    name: &str,
    codec_tag: &str,
    serialized: &[u8],
    defaults: &[(Value, Value)],
) -> MetaCallResult<Value> {
    runtime()?
        .metacallfms(name, codec_tag, serialized, defaults)
        .await
}

/// Async call, guaranteed to return a [`Value::Future`] (spec §4.6 `metacall_await`).
pub async fn metacall_await(name: &str, args: &[Value]) -> MetaCallResult<Value> {
    runtime()?.metacall_await(name, args).await
}

/// Registers a serial codec under `tag`, alongside the built-in
/// `"json"`/`"native"` pair (spec §4.3).
pub fn register_serial(tag: impl Into<String>, codec: Arc<dyn Serial>) -> MetaCallResult<()> {
    runtime()?.register_serial(tag, codec);
    Ok(())
}

/// Wraps `allocator` for use by the handful of allocator-aware operations
/// (spec §6 `allocator_create`). A thin identity wrapper in this rendition:
/// ownership is already `Arc`-managed, so there is no separate native
/// handle to create.
pub fn allocator_create(allocator: Arc<dyn Allocator>) -> AllocatorHandle {
    allocator
}

/// Releases an allocator handle (spec §6 `allocator_free`). A no-op beyond
/// dropping the `Arc`: kept for API-shape parity with the spec's explicit
/// create/free pair.
pub fn allocator_free(_allocator: AllocatorHandle) {}

/// Builds the introspection document spec §6's `inspect()` names: every
/// live tag, its handles, and each handle's discovered symbols, as JSON
/// text, alongside its byte length.
pub async fn inspect() -> MetaCallResult<(String, usize)> {
    runtime()?.inspect().await
}

/// Emits a structured log event at `kind`'s level, tagged with `context`
/// (spec §6 `log`). `context` becomes the `tracing` event's `ctx` field.
pub fn log(kind: LogKind, context: &str) {
    kind.emit(context);
}

/// Installs the fork detour, if the platform supports one
/// (spec §6 `fork_initialize`, §4.8).
pub fn fork_initialize() -> MetaCallResult<bool> {
    runtime()?.fork_guard().clone().initialize()
}

/// Registers a callback run after a successful fork, in parent or child
/// (spec §6 `fork_callback`).
pub fn fork_callback(callback: impl Fn(bool) + Send + Sync + 'static) -> MetaCallResult<()> {
    runtime()?.fork_guard().register_post_fork(callback);
    Ok(())
}

/// Tears down fork-safety wiring alongside the rest of [`destroy`]; exposed
/// separately (spec §6 `fork_destroy`) for embedders that want to retire
/// fork-safety ahead of a full runtime shutdown. A no-op beyond what
/// `destroy` already does, since this rendition's `ForkGuard` has no
/// separate teardown state of its own.
pub fn fork_destroy() -> MetaCallResult<()> {
    runtime().map(|_| ())
}

/// Returns a clone of this thread's last recorded error, if any
/// (spec §6 `error_last` / §7).
pub fn error_last() -> Option<MetaCallError> {
    metacall_value::error::last_error()
}

/// Clears this thread's last error slot (spec §6 `error_clear`).
pub fn error_clear() {
    metacall_value::error::clear_error();
}

/// Tears down every live loader in strictly decreasing initialisation id
/// order and releases the process-wide runtime (spec §6 `destroy`).
/// [`initialize`] may be called again afterward to stand up a fresh one.
pub async fn destroy() -> MetaCallResult<()> {
    let runtime = runtime()?;
    runtime.destroy().await?;
    *RUNTIME.write() = None;
    Ok(())
}

#[cfg(test)]
mod tests;
