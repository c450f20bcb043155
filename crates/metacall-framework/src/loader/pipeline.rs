//! The load pipeline (spec §4.5 "Load pipeline"): resolve a tag to a live
//! loader, delegate to the right `load_from_*`, discover its symbols into
//! the host context, and register the resulting handle.

use super::manager::{LoaderInstance, LoaderManager};
use metacall_value::loader::{Affinity, Handle};
use metacall_value::{Context, MetaCallResult};
use parking_lot::RwLock as SyncRwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

enum Source<'a> {
    Files(&'a [PathBuf]),
    Memory { name: &'a str, buffer: &'a [u8] },
    Package(&'a Path),
}

/// Runs the full pipeline for one `load_from_*` call and folds the
/// resulting handle's discovered symbols into `host_context`.
async fn load(
    manager: &LoaderManager,
    tag: &str,
    host_context: &mut Context,
    source: Source<'_>,
) -> MetaCallResult<Arc<SyncRwLock<Handle>>> {
    let instance = manager.get_or_create(tag).await?;
    let handle = run_source(&instance, source).await?;

    let mut discovered = Context::new();
    instance.loader().discover(&handle, &mut discovered)?;
    host_context.append(discovered);

    Ok(instance.insert_handle(handle))
}

/// Loads from one or more files on disk.
pub async fn load_from_file(
    manager: &LoaderManager,
    tag: &str,
    host_context: &mut Context,
    paths: &[PathBuf],
) -> MetaCallResult<Arc<SyncRwLock<Handle>>> {
    load(manager, tag, host_context, Source::Files(paths)).await
}

/// Loads from an in-memory buffer.
pub async fn load_from_memory(
    manager: &LoaderManager,
    tag: &str,
    host_context: &mut Context,
    name: &str,
    buffer: &[u8],
) -> MetaCallResult<Arc<SyncRwLock<Handle>>> {
    load(manager, tag, host_context, Source::Memory { name, buffer }).await
}

/// Loads from a pre-compiled package artefact.
pub async fn load_from_package(
    manager: &LoaderManager,
    tag: &str,
    host_context: &mut Context,
    path: &Path,
) -> MetaCallResult<Arc<SyncRwLock<Handle>>> {
    load(manager, tag, host_context, Source::Package(path)).await
}

async fn run_source(instance: &Arc<LoaderInstance>, source: Source<'_>) -> MetaCallResult<Handle> {
    if instance.affinity() == Affinity::EngineThreadOnly {
        let engine = instance
            .engine_thread()
            .expect("engine-thread-only loader without an engine thread");
        return match source {
            Source::Files(paths) => {
                let loader = instance.loader().clone();
                let paths = paths.to_vec();
                engine
                    .run(move || futures::executor::block_on(loader.load_from_file(&paths)))
                    .await
            }
            Source::Memory { name, buffer } => {
                let loader = instance.loader().clone();
                let name = name.to_string();
                let buffer = buffer.to_vec();
                engine
                    .run(move || {
                        futures::executor::block_on(loader.load_from_memory(&name, &buffer))
                    })
                    .await
            }
            Source::Package(path) => {
                let loader = instance.loader().clone();
                let path = path.to_path_buf();
                engine
                    .run(move || futures::executor::block_on(loader.load_from_package(&path)))
                    .await
            }
        };
    }

    let _guard = instance.lock_for_call().await;
    match source {
        Source::Files(paths) => instance.loader().load_from_file(paths).await,
        Source::Memory { name, buffer } => instance.loader().load_from_memory(name, buffer).await,
        Source::Package(path) => instance.loader().load_from_package(path).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoaderManager;

    #[tokio::test]
    async fn load_from_memory_registers_a_handle_on_the_instance() {
        let manager = LoaderManager::new();
        crate::loader_test_support::register_mock(&manager).await;

        let mut host_context = Context::new();
        let handle = load_from_memory(&manager, "mock", &mut host_context, "mod", b"source")
            .await
            .unwrap();

        let instance = manager.find("mock").await.unwrap();
        let id = handle.read().id();
        assert!(instance.handle(id).is_some());
    }
}
