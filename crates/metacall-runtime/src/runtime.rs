//! Orchestration: the single object that bundles the loader registry, the
//! serial codec registry, fork-safety wiring, and the host context into one
//! `initialize`-created value (spec §9 "Global singletons" — "keep them as
//! a single *runtime context* struct created by `initialize`, threaded
//! explicitly through public APIs where that fits the target language").
//!
//! `metacall-runtime` owns this struct; the `metacall` façade crate holds
//! one behind a process-wide `OnceLock` so its flat, name-illustrative API
//! (spec §6) has somewhere to route calls without every embedder having to
//! thread a `Runtime` through their own call sites by hand.

use crate::config::{ConfigLoader, LoadConfiguration};
use metacall_framework::loader::{LoaderImpl, LoaderManager};
use metacall_framework::plugin::PluginDescriptor;
use metacall_framework::{metacall_await, metacallfms, metacallfv, metacallt, metacallv};
use metacall_platform::ForkGuard;
use metacall_serial::{JsonSerial, NativeSerial, Serial};
use metacall_value::allocator::AllocatorHandle;
use metacall_value::loader::{Handle, ScriptIdentity};
use metacall_value::{Context, ErrorKind, Function, MetaCallResult, Value};
use parking_lot::RwLock as SyncRwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A handle reference stable enough to hand back across the façade: the
/// owning loader's tag plus the handle's id within that loader (spec §3
/// "id should be unique within the owning loader").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleRef {
    pub tag: String,
    pub id: u64,
}

/// The runtime context created by `initialize` (spec §9). Not `Clone`: the
/// façade holds exactly one behind an `Arc`.
pub struct Runtime {
    loaders: Arc<LoaderManager>,
    serials: SyncRwLock<HashMap<String, Arc<dyn Serial>>>,
    fork_guard: Arc<ForkGuard>,
    host_context: SyncRwLock<Context>,
    allocator: AllocatorHandle,
}

impl Runtime {
    /// Builds a fresh runtime: an empty loader registry, the two built-in
    /// serial codecs (spec §4.3 "a JSON codec ... and a MetaCall native
    /// format") registered under `"json"`/`"native"`, and the system
    /// allocator as the default (spec §4.2).
    pub fn new() -> Self {
        let mut serials: HashMap<String, Arc<dyn Serial>> = HashMap::new();
        serials.insert("json".to_string(), Arc::new(JsonSerial));
        serials.insert("native".to_string(), Arc::new(NativeSerial));
        Self {
            loaders: Arc::new(LoaderManager::new()),
            serials: SyncRwLock::new(serials),
            fork_guard: Arc::new(ForkGuard::new()),
            host_context: SyncRwLock::new(Context::new()),
            allocator: metacall_value::allocator::system(),
        }
    }

    /// The allocator this runtime was constructed with (spec §4.2
    /// "Allocator selection is per-operation, not process-global" — this is
    /// merely the default an embedder did not override).
    pub fn allocator(&self) -> AllocatorHandle {
        self.allocator.clone()
    }

    /// Registers a loader back-end descriptor under its tag. The loader
    /// itself is instantiated lazily on first use (spec §3).
    pub async fn register_loader(&self, descriptor: PluginDescriptor<dyn LoaderImpl>) {
        self.loaders.register_descriptor(descriptor).await;
    }

    /// Registers an additional serial codec under `tag`, alongside the
    /// built-in `"json"`/`"native"` pair.
    pub fn register_serial(&self, tag: impl Into<String>, codec: Arc<dyn Serial>) {
        self.serials.write().insert(tag.into(), codec);
    }

    /// Looks up a registered serial codec by tag.
    pub fn serial(&self, tag: &str) -> Option<Arc<dyn Serial>> {
        self.serials.read().get(tag).cloned()
    }

    /// `true` once `tag`'s loader has been created (spec §6 `is_initialized`).
    pub async fn is_initialized(&self, tag: &str) -> bool {
        self.loaders.find(tag).await.is_some()
    }

    /// Adds `path` to `tag`'s module search path (spec §6 `execution_path`).
    pub async fn execution_path(&self, tag: &str, path: impl Into<PathBuf>) -> MetaCallResult<()> {
        self.loaders.execution_path(tag, path.into()).await
    }

    /// Loads from one or more files on disk (spec §6 `load_from_file`).
    pub async fn load_from_file(&self, tag: &str, paths: &[PathBuf]) -> MetaCallResult<HandleRef> {
        let mut host_context = self.host_context.write().clone();
        let shared =
            metacall_framework::loader::pipeline::load_from_file(&self.loaders, tag, &mut host_context, paths)
                .await?;
        *self.host_context.write() = host_context;
        Ok(HandleRef {
            tag: tag.to_string(),
            id: shared.read().id(),
        })
    }

    /// Loads from an in-memory buffer (spec §6 `load_from_memory`).
    pub async fn load_from_memory(
        &self,
        tag: &str,
        name: &str,
        buffer: &[u8],
    ) -> MetaCallResult<HandleRef> {
        let mut host_context = self.host_context.write().clone();
        let shared = metacall_framework::loader::pipeline::load_from_memory(
            &self.loaders,
            tag,
            &mut host_context,
            name,
            buffer,
        )
        .await?;
        *self.host_context.write() = host_context;
        Ok(HandleRef {
            tag: tag.to_string(),
            id: shared.read().id(),
        })
    }

    /// Loads from a pre-compiled package artefact (spec §6 `load_from_package`).
    pub async fn load_from_package(&self, tag: &str, path: &Path) -> MetaCallResult<HandleRef> {
        let mut host_context = self.host_context.write().clone();
        let shared = metacall_framework::loader::pipeline::load_from_package(
            &self.loaders,
            tag,
            &mut host_context,
            path,
        )
        .await?;
        *self.host_context.write() = host_context;
        Ok(HandleRef {
            tag: tag.to_string(),
            id: shared.read().id(),
        })
    }

    /// Resolves a configuration document's dependency tree and loads every
    /// entry in dependency-first order (spec §6 `load_from_configuration`).
    /// Returns the handle for the document that was the root of the tree.
    pub async fn load_from_configuration(
        &self,
        path: impl AsRef<Path>,
    ) -> MetaCallResult<HandleRef> {
        let plan = ConfigLoader::new().load_from_file(path)?;
        self.apply_configuration_plan(plan).await
    }

    /// Applies an already-parsed configuration document (and its flattened
    /// dependency plan), without touching the filesystem for the root
    /// document itself. Exposed for embedders that construct configuration
    /// programmatically rather than from a file.
    pub async fn load_from_configuration_value(
        &self,
        config: LoadConfiguration,
    ) -> MetaCallResult<HandleRef> {
        let plan = ConfigLoader::new().flatten(config)?;
        self.apply_configuration_plan(plan).await
    }

    async fn apply_configuration_plan(
        &self,
        plan: Vec<LoadConfiguration>,
    ) -> MetaCallResult<HandleRef> {
        let mut last = None;
        for doc in plan {
            for execution_path in &doc.execution_paths {
                self.execution_path(&doc.language_id, execution_path.clone())
                    .await?;
            }
            let mut paths: Vec<PathBuf> = doc.path.into_iter().collect();
            paths.extend(doc.scripts);
            if paths.is_empty() {
                continue;
            }
            last = Some(self.load_from_file(&doc.language_id, &paths).await?);
        }
        last.ok_or_else(|| {
            ErrorKind::BadArgument("configuration document named no scripts to load".into()).into()
        })
    }

    /// Looks up a function discovered so far under its anonymous name
    /// (spec §6 `function`); per `SPEC_FULL.md`'s Open Question resolution,
    /// the most recently discovered definition of a name wins, which falls
    /// out directly of [`Context::append`](metacall_value::Context::append)'s
    /// overwrite-on-insert behaviour.
    pub fn function(&self, name: &str) -> Option<Arc<Function>> {
        self.host_context.read().function(name).cloned()
    }

    /// Finds the handle registered under `tag` whose script identity names
    /// `name` (a file stem, an in-memory fingerprint name, or a package
    /// path) — spec §6 `handle(tag, name)`.
    pub async fn handle(&self, tag: &str, name: &str) -> Option<HandleRef> {
        let instance = self.loaders.find(tag).await?;
        for shared in instance.handles() {
            let h = shared.read();
            if identity_matches(h.identity(), name) {
                return Some(HandleRef {
                    tag: tag.to_string(),
                    id: h.id(),
                });
            }
        }
        None
    }

    /// Disposes a single handle (spec §6 `clear`). Per `SPEC_FULL.md`'s
    /// Open Question resolution, the context is torn down eagerly and
    /// synchronously; values already copied out of it are unaffected.
    pub async fn clear(&self, handle: &HandleRef) -> MetaCallResult<()> {
        let instance = self
            .loaders
            .find(&handle.tag)
            .await
            .ok_or_else(|| ErrorKind::NotFound(handle.tag.clone()))?;
        let shared = instance
            .take_handle(handle.id)
            .ok_or_else(|| ErrorKind::NotFound(format!("handle #{}", handle.id)))?;
        let mut guard = shared.write();
        instance.loader().clear(&mut guard)?;
        Ok(())
    }

    /// Canonical by-name, pre-boxed-value call (spec §4.6 `metacallv`).
    pub async fn metacallv(&self, name: &str, args: &[Value]) -> MetaCallResult<Value> {
        let context = self.host_context.read().clone();
        metacallv(&self.loaders, &context, name, args).await
    }

    /// Type-tagged variadic call (spec §4.6 `metacallt`).
    pub async fn metacallt(&self, name: &str, args: &[Value]) -> MetaCallResult<Value> {
        let context = self.host_context.read().clone();
        metacallt(&self.loaders, &context, name, args).await
    }

    /// Calls an already-resolved function handle, skipping name lookup
    /// (spec §4.6 `metacallfv`).
    pub async fn metacallfv(&self, function: &Arc<Function>, args: &[Value]) -> MetaCallResult<Value> {
        metacallfv(&self.loaders, function, args).await
    }

    /// Map-shaped call: deserialises `serialized` with the codec registered
    /// under `codec_tag`, binds by name, casts, and invokes (spec §4.6
    /// `metacallfms`).
    pub async fn metacallfms(
        &self,
        name: &str,
        codec_tag: &str,
        serialized: &[u8],
        defaults: &[(Value, Value)],
    ) -> MetaCallResult<Value> {
        let codec = self
            .serial(codec_tag)
            .ok_or_else(|| ErrorKind::NotFound(format!("serial codec '{codec_tag}'")))?;
        let context = self.host_context.read().clone();
        metacallfms(&self.loaders, &context, name, codec.as_ref(), serialized, defaults).await
    }

    /// Async call, guaranteed to return a future (spec §4.6 `metacall_await`).
    pub async fn metacall_await(&self, name: &str, args: &[Value]) -> MetaCallResult<Value> {
        let context = self.host_context.read().clone();
        metacall_await(&self.loaders, &context, name, args).await
    }

    /// The fork-safety coordinator backing `fork_initialize`/`fork_callback`
    /// (spec §6, §4.8).
    pub fn fork_guard(&self) -> &Arc<ForkGuard> {
        &self.fork_guard
    }

    /// Builds the introspection document spec §6's `inspect()` names: every
    /// live tag, its handles, and each handle's discovered function/class
    /// names with signatures, as JSON text. Returns the byte length
    /// alongside the text, mirroring `inspect(&size, allocator)`'s
    /// out-parameter.
    pub async fn inspect(&self) -> MetaCallResult<(String, usize)> {
        let mut tags = serde_json::Map::new();
        for instance in self.loaders.live_instances().await {
            let mut handles = Vec::new();
            for shared in instance.handles() {
                let h = shared.read();
                let mut functions = Vec::new();
                if let Ok(ctx) = h.context() {
                    for name in ctx.function_names() {
                        if let Some(f) = ctx.function(name) {
                            functions.push(serde_json::json!({
                                "name": f.name(),
                                "arity": f.signature().arity(),
                            }));
                        }
                    }
                }
                handles.push(serde_json::json!({
                    "id": h.id(),
                    "cleared": h.is_cleared(),
                    "functions": functions,
                }));
            }
            tags.insert(
                instance.tag().to_string(),
                serde_json::json!({
                    "init_id": instance.init_id(),
                    "affinity": format!("{:?}", instance.affinity()),
                    "handles": handles,
                }),
            );
        }
        let document = serde_json::Value::Object(tags);
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| ErrorKind::BackEndError(format!("inspect: {e}")))?;
        let size = text.len();
        Ok((text, size))
    }

    /// Installs the fork detour, if the platform supports one (spec §4.8,
    /// §9 "Fork on platforms without it").
    pub fn fork_initialize(&self) -> MetaCallResult<bool> {
        self.fork_guard.clone().initialize()
    }

    /// Tears down every live loader, in strictly decreasing initialisation
    /// id order (spec §4.5, §8 "Initialization order"), and clears the host
    /// context.
    pub async fn destroy(&self) -> MetaCallResult<()> {
        self.loaders.destroy_all().await?;
        *self.host_context.write() = Context::new();
        info!("runtime destroyed");
        Ok(())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

fn identity_matches(identity: &ScriptIdentity, name: &str) -> bool {
    match identity {
        ScriptIdentity::Files(paths) => paths.iter().any(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|stem| stem == name)
                .unwrap_or(false)
        }),
        ScriptIdentity::Memory { name: n, .. } => n.as_ref() == name,
        ScriptIdentity::Package(path) => path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|stem| stem == name)
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metacall_framework::loader::LoaderImpl;
    use metacall_value::loader::Affinity;
    use metacall_value::{Signature, TypeId};

    struct EchoLoader;

    #[async_trait::async_trait]
    impl LoaderImpl for EchoLoader {
        fn tag(&self) -> &str {
            "mock"
        }
        fn affinity(&self) -> Affinity {
            Affinity::FreeThreaded
        }
        async fn initialize(&self, _config: &serde_json::Value) -> MetaCallResult<()> {
            Ok(())
        }
        fn execution_path(&self, _path: &Path) -> MetaCallResult<()> {
            Ok(())
        }
        async fn load_from_file(&self, paths: &[PathBuf]) -> MetaCallResult<Handle> {
            Ok(Handle::new(1, "mock", ScriptIdentity::Files(paths.to_vec()), None, Context::new()))
        }
        async fn load_from_memory(&self, name: &str, buffer: &[u8]) -> MetaCallResult<Handle> {
            let mut ctx = Context::new();
            ctx.insert_function(Arc::new(Function::new(
                "echo",
                Signature::new(vec![metacall_value::Parameter::new("x", None)], None),
                "mock",
                Arc::new(|args| Ok(args[0].clone())),
            )));
            let _ = TypeId::Int;
            Ok(Handle::new(2, "mock", ScriptIdentity::memory(name, buffer), None, ctx))
        }
        async fn load_from_package(&self, path: &Path) -> MetaCallResult<Handle> {
            Ok(Handle::new(3, "mock", ScriptIdentity::Package(path.to_path_buf()), None, Context::new()))
        }
        fn clear(&self, handle: &mut Handle) -> MetaCallResult<()> {
            handle.clear();
            Ok(())
        }
        fn discover(&self, handle: &Handle, context: &mut Context) -> MetaCallResult<()> {
            if let Ok(ctx) = handle.context() {
                context.append(ctx.clone());
            }
            Ok(())
        }
        async fn destroy(&self) -> MetaCallResult<()> {
            Ok(())
        }
    }

    async fn runtime_with_mock() -> Runtime {
        let runtime = Runtime::new();
        runtime
            .register_loader(PluginDescriptor::in_process("mock", &[], || {
                Ok(Arc::new(EchoLoader) as Arc<dyn LoaderImpl>)
            }))
            .await;
        runtime
    }

    #[tokio::test]
    async fn load_from_memory_then_call_round_trips() {
        let runtime = runtime_with_mock().await;
        runtime.load_from_memory("mock", "mod", b"source").await.unwrap();
        let result = runtime.metacallv("echo", &[Value::Int(7)]).await.unwrap();
        assert!(matches!(result, Value::Int(7)));
    }

    #[tokio::test]
    async fn clear_removes_handle_from_the_instance() {
        let runtime = runtime_with_mock().await;
        let handle = runtime.load_from_memory("mock", "mod", b"source").await.unwrap();
        runtime.clear(&handle).await.unwrap();
        let found = runtime.handle("mock", "mod").await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn inspect_reports_loaded_tags_and_functions() {
        let runtime = runtime_with_mock().await;
        runtime.load_from_memory("mock", "mod", b"source").await.unwrap();
        let (text, size) = runtime.inspect().await.unwrap();
        assert_eq!(text.len(), size);
        assert!(text.contains("\"mock\""));
        assert!(text.contains("echo"));
    }
}
