//! The loader registry (spec §4.5 "Loader manager state", §3 "Loader
//! implementation").

use super::vtable::LoaderImpl;
use crate::dispatch::engine_thread::EngineThread;
use crate::plugin::{PluginDescriptor, PluginManager};
use metacall_value::loader::{Affinity, Handle};
use metacall_value::{ErrorKind, MetaCallResult};
use parking_lot::RwLock as SyncRwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::info;

/// A live loader: its back-end, the handles it has produced, and whatever
/// affinity coordination its back-end requires.
pub struct LoaderInstance {
    tag: Arc<str>,
    init_id: u64,
    loader: Arc<dyn LoaderImpl>,
    affinity: Affinity,
    /// Keyed by the id each back end assigns its own handles (spec §3
    /// "Handle": "id should be unique within the owning loader").
    handles: SyncRwLock<HashMap<u64, Arc<SyncRwLock<Handle>>>>,
    /// Entry point for `Affinity::Serialised` back-ends: the invoke path
    /// holds this for the duration of a call.
    serial_lock: AsyncMutex<()>,
    /// Present only for `Affinity::EngineThreadOnly` back-ends; every call
    /// into the loader (including `initialize`) is marshalled onto it.
    engine_thread: Option<EngineThread>,
    destroyed: AtomicBool,
}

impl LoaderInstance {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn init_id(&self) -> u64 {
        self.init_id
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    pub fn loader(&self) -> &Arc<dyn LoaderImpl> {
        &self.loader
    }

    /// Holds the serialisation mutex for the duration of a call, when this
    /// loader's affinity requires it. A no-op guard for every other
    /// affinity.
    pub async fn lock_for_call(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        if self.affinity == Affinity::Serialised {
            Some(self.serial_lock.lock().await)
        } else {
            None
        }
    }

    /// The engine thread a call must be marshalled onto, if this loader
    /// requires one.
    pub fn engine_thread(&self) -> Option<&EngineThread> {
        self.engine_thread.as_ref()
    }

    /// Registers a freshly produced handle and returns its shared handle.
    pub fn insert_handle(&self, handle: Handle) -> Arc<SyncRwLock<Handle>> {
        let id = handle.id();
        let shared = Arc::new(SyncRwLock::new(handle));
        self.handles.write().insert(id, shared.clone());
        shared
    }

    /// Looks up a previously produced handle by id.
    pub fn handle(&self, id: u64) -> Option<Arc<SyncRwLock<Handle>>> {
        self.handles.read().get(&id).cloned()
    }

    /// Removes and returns a previously produced handle by id.
    pub fn take_handle(&self, id: u64) -> Option<Arc<SyncRwLock<Handle>>> {
        self.handles.write().remove(&id)
    }

    /// Every handle this loader has produced and not yet cleared/removed,
    /// in no particular order. Used by `inspect()` (spec §6) to enumerate
    /// live state without reaching into the registry's internals.
    pub fn handles(&self) -> Vec<Arc<SyncRwLock<Handle>>> {
        self.handles.read().values().cloned().collect()
    }
}

/// Owns the `tag → loader instance` registry (spec §4.5): lazily creates
/// loaders on first use of their tag, tracks insertion order for shutdown,
/// and records the thread that initialised the manager itself, which
/// `engine-thread-only` loaders are expected to have been reachable from.
pub struct LoaderManager {
    init_thread: std::thread::ThreadId,
    descriptors: PluginManager<dyn LoaderImpl>,
    configs: SyncRwLock<HashMap<String, serde_json::Value>>,
    search_paths: SyncRwLock<HashMap<String, Vec<PathBuf>>>,
    next_init_id: AtomicU64,
    /// Ascending by `init_id`; destruction order is this list reversed
    /// (spec §4.5 "Initialization order").
    live: RwLock<Vec<Arc<LoaderInstance>>>,
    /// Serialises `get_or_create`'s lookup-or-create so two concurrent
    /// first-uses of the same tag cannot both pass the `find` → `None`
    /// check and each initialise the back-end (spec §5: the registry
    /// mutex must be held across "lookup-or-create").
    creation_lock: AsyncMutex<()>,
}

impl LoaderManager {
    pub fn new() -> Self {
        Self {
            init_thread: std::thread::current().id(),
            descriptors: PluginManager::new(),
            configs: SyncRwLock::new(HashMap::new()),
            search_paths: SyncRwLock::new(HashMap::new()),
            next_init_id: AtomicU64::new(0),
            live: RwLock::new(Vec::new()),
            creation_lock: AsyncMutex::new(()),
        }
    }

    /// The thread this manager was created on.
    pub fn init_thread(&self) -> std::thread::ThreadId {
        self.init_thread
    }

    /// Registers the descriptor for a loader tag. Does not instantiate it —
    /// the loader is created lazily on first use (spec §3).
    pub async fn register_descriptor(&self, descriptor: PluginDescriptor<dyn LoaderImpl>) {
        self.descriptors.register(descriptor).await;
    }

    /// Sets the JSON configuration object passed to `tag`'s `initialize`.
    pub fn set_config(&self, tag: &str, config: serde_json::Value) {
        self.configs.write().insert(tag.to_string(), config);
    }

    /// Adds `path` to `tag`'s module search path. Idempotent: recorded once
    /// and replayed against the live loader if it exists, and against any
    /// future (re-)creation of that tag.
    pub async fn execution_path(&self, tag: &str, path: PathBuf) -> MetaCallResult<()> {
        {
            let mut paths = self.search_paths.write();
            let entry = paths.entry(tag.to_string()).or_default();
            if entry.contains(&path) {
                return Ok(());
            }
            entry.push(path.clone());
        }
        if let Some(instance) = self.find(tag).await {
            instance.loader().execution_path(&path)?;
        }
        Ok(())
    }

    /// Returns the live instance for `tag`, if one has already been created.
    pub async fn find(&self, tag: &str) -> Option<Arc<LoaderInstance>> {
        self.live.read().await.iter().find(|i| i.tag() == tag).cloned()
    }

    /// Returns the live instance for `tag`, lazily creating and
    /// initialising it on first use.
    pub async fn get_or_create(&self, tag: &str) -> MetaCallResult<Arc<LoaderInstance>> {
        if let Some(instance) = self.find(tag).await {
            return Ok(instance);
        }

        // Hold the creation lock across the re-check-and-insert below so a
        // second concurrent first-use of `tag` that lost the race above
        // observes the winner's freshly-pushed instance instead of also
        // creating and initialising one.
        let _guard = self.creation_lock.lock().await;
        if let Some(instance) = self.find(tag).await {
            return Ok(instance);
        }

        let loader = self.descriptors.get_or_load(tag).await.map_err(|_| {
            ErrorKind::LoaderUnavailable(tag.to_string())
        })?;
        let affinity = loader.affinity();
        let config = self
            .configs
            .read()
            .get(tag)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let replay_paths: Vec<PathBuf> = self
            .search_paths
            .read()
            .get(tag)
            .cloned()
            .unwrap_or_default();

        let engine_thread = matches!(affinity, Affinity::EngineThreadOnly)
            .then(|| EngineThread::spawn(format!("metacall-{tag}")));

        if let Some(engine) = &engine_thread {
            let loader = loader.clone();
            let config = config.clone();
            engine
                .run(move || futures::executor::block_on(loader.initialize(&config)))
                .await?;
            for path in &replay_paths {
                loader.execution_path(path)?;
            }
        } else {
            loader.initialize(&config).await?;
            for path in &replay_paths {
                loader.execution_path(path)?;
            }
        }

        let instance = Arc::new(LoaderInstance {
            tag: Arc::from(tag),
            init_id: self.next_init_id.fetch_add(1, Ordering::SeqCst),
            loader,
            affinity,
            handles: SyncRwLock::new(HashMap::new()),
            serial_lock: AsyncMutex::new(()),
            engine_thread,
            destroyed: AtomicBool::new(false),
        });

        self.live.write().await.push(instance.clone());
        info!(tag, init_id = instance.init_id, "loader initialised");
        Ok(instance)
    }

    /// Destroys every live loader in strictly decreasing initialisation id
    /// order (spec §4.5, §8 "Initialization order"). Idempotent: a loader
    /// already marked destroyed (the manager's double-destroy guard, spec
    /// §4.5 "a set of destroyed loader pointers") is skipped.
    pub async fn destroy_all(&self) -> MetaCallResult<()> {
        let mut instances = self.live.write().await;
        instances.sort_by_key(|i| i.init_id);
        for instance in instances.iter().rev() {
            if instance.destroyed.swap(true, Ordering::AcqRel) {
                continue;
            }
            if let Some(engine) = instance.engine_thread() {
                let loader = instance.loader().clone();
                engine
                    .run(move || futures::executor::block_on(loader.destroy()))
                    .await?;
            } else {
                instance.loader().destroy().await?;
            }
            info!(tag = instance.tag(), init_id = instance.init_id, "loader destroyed");
        }
        instances.clear();
        Ok(())
    }

    /// Tags of every currently live loader, in initialisation order.
    pub async fn live_tags(&self) -> Vec<String> {
        self.live.read().await.iter().map(|i| i.tag().to_string()).collect()
    }

    /// Every currently live loader instance, in initialisation order. Used
    /// by `inspect()` (spec §6) to walk tags, handles, and discovered
    /// symbols without exposing the registry's internal lock.
    pub async fn live_instances(&self) -> Vec<Arc<LoaderInstance>> {
        self.live.read().await.clone()
    }
}

impl Default for LoaderManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginDescriptor;
    use async_trait::async_trait;
    use metacall_value::loader::ScriptIdentity;
    use metacall_value::Context;
    use parking_lot::Mutex as SyncMutex;
    use std::path::{Path, PathBuf};

    /// A `LoaderImpl` whose `destroy` records its tag into a shared log, so
    /// tests can assert on destruction order without a real engine.
    struct RecordingLoader {
        tag: &'static str,
        log: Arc<SyncMutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl LoaderImpl for RecordingLoader {
        fn tag(&self) -> &str {
            self.tag
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
            Ok(Handle::new(0, self.tag, ScriptIdentity::Files(paths.to_vec()), None, Context::new()))
        }
        async fn load_from_memory(&self, name: &str, buffer: &[u8]) -> MetaCallResult<Handle> {
            Ok(Handle::new(0, self.tag, ScriptIdentity::memory(name, buffer), None, Context::new()))
        }
        async fn load_from_package(&self, path: &Path) -> MetaCallResult<Handle> {
            Ok(Handle::new(0, self.tag, ScriptIdentity::Package(path.to_path_buf()), None, Context::new()))
        }
        fn clear(&self, handle: &mut Handle) -> MetaCallResult<()> {
            handle.clear();
            Ok(())
        }
        fn discover(&self, _handle: &Handle, _context: &mut Context) -> MetaCallResult<()> {
            Ok(())
        }
        async fn destroy(&self) -> MetaCallResult<()> {
            self.log.lock().push(self.tag);
            Ok(())
        }
    }

    async fn register(manager: &LoaderManager, tag: &'static str, log: Arc<SyncMutex<Vec<&'static str>>>) {
        manager
            .register_descriptor(PluginDescriptor::in_process(tag, &[], move || {
                Ok(Arc::new(RecordingLoader { tag, log: log.clone() }) as Arc<dyn LoaderImpl>)
            }))
            .await;
    }

    /// Spec §8 scenario 5: initialising `mock`, then `py`, then `node` and
    /// triggering shutdown destroys in the order `node, py, mock` — the
    /// strict reverse of initialisation id (spec §4.5, §8 "Initialization
    /// order").
    #[tokio::test]
    async fn destroy_all_runs_in_strictly_decreasing_init_id_order() {
        let manager = LoaderManager::new();
        let log = Arc::new(SyncMutex::new(Vec::new()));
        register(&manager, "mock", log.clone()).await;
        register(&manager, "py", log.clone()).await;
        register(&manager, "node", log.clone()).await;

        manager.get_or_create("mock").await.unwrap();
        manager.get_or_create("py").await.unwrap();
        manager.get_or_create("node").await.unwrap();

        manager.destroy_all().await.unwrap();

        assert_eq!(*log.lock(), vec!["node", "py", "mock"]);
    }

    #[tokio::test]
    async fn destroy_all_is_idempotent_against_double_destroy() {
        let manager = LoaderManager::new();
        let log = Arc::new(SyncMutex::new(Vec::new()));
        register(&manager, "mock", log.clone()).await;
        manager.get_or_create("mock").await.unwrap();

        manager.destroy_all().await.unwrap();
        manager.destroy_all().await.unwrap();

        assert_eq!(*log.lock(), vec!["mock"]);
    }

    /// A `LoaderImpl` whose `initialize` counts how many times it actually
    /// ran and sleeps briefly first, to widen the window a racing
    /// `get_or_create` would need to land in.
    struct CountingInitLoader {
        tag: &'static str,
        init_calls: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl LoaderImpl for CountingInitLoader {
        fn tag(&self) -> &str {
            self.tag
        }
        fn affinity(&self) -> Affinity {
            Affinity::FreeThreaded
        }
        async fn initialize(&self, _config: &serde_json::Value) -> MetaCallResult<()> {
            tokio::task::yield_now().await;
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn execution_path(&self, _path: &Path) -> MetaCallResult<()> {
            Ok(())
        }
        async fn load_from_file(&self, paths: &[PathBuf]) -> MetaCallResult<Handle> {
            Ok(Handle::new(0, self.tag, ScriptIdentity::Files(paths.to_vec()), None, Context::new()))
        }
        async fn load_from_memory(&self, name: &str, buffer: &[u8]) -> MetaCallResult<Handle> {
            Ok(Handle::new(0, self.tag, ScriptIdentity::memory(name, buffer), None, Context::new()))
        }
        async fn load_from_package(&self, path: &Path) -> MetaCallResult<Handle> {
            Ok(Handle::new(0, self.tag, ScriptIdentity::Package(path.to_path_buf()), None, Context::new()))
        }
        fn clear(&self, handle: &mut Handle) -> MetaCallResult<()> {
            handle.clear();
            Ok(())
        }
        fn discover(&self, _handle: &Handle, _context: &mut Context) -> MetaCallResult<()> {
            Ok(())
        }
        async fn destroy(&self) -> MetaCallResult<()> {
            Ok(())
        }
    }

    /// Spec §5: the registry mutex must be held across "lookup-or-create".
    /// Two concurrent first-uses of the same tag must initialise the
    /// back-end exactly once and leave exactly one live instance behind.
    #[tokio::test]
    async fn concurrent_get_or_create_initialises_once() {
        let manager = Arc::new(LoaderManager::new());
        let init_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        manager
            .register_descriptor(PluginDescriptor::in_process("race", &[], {
                let init_calls = init_calls.clone();
                move || {
                    Ok(Arc::new(CountingInitLoader {
                        tag: "race",
                        init_calls: init_calls.clone(),
                    }) as Arc<dyn LoaderImpl>)
                }
            }))
            .await;

        let a = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_or_create("race").await })
        };
        let b = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_or_create("race").await })
        };
        let (first, second) = tokio::join!(a, b);
        first.unwrap().unwrap();
        second.unwrap().unwrap();

        assert_eq!(init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.live_tags().await, vec!["race".to_string()]);
    }
}
