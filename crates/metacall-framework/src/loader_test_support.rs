//! Minimal in-process `LoaderImpl` used only by this crate's own tests, so
//! the dispatch and pipeline tests have a loader tag to register calls
//! against without depending on `metacall-loaders-mock`.

use crate::loader::{LoaderImpl, LoaderManager};
use crate::plugin::PluginDescriptor;
use async_trait::async_trait;
use metacall_value::loader::{Affinity, Handle, ScriptIdentity};
use metacall_value::{Context, MetaCallResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct NoopLoader;

#[async_trait]
impl LoaderImpl for NoopLoader {
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

    async fn load_from_file(&self, _paths: &[PathBuf]) -> MetaCallResult<Handle> {
        Ok(Handle::new(0, "mock", ScriptIdentity::Files(vec![]), None, Context::new()))
    }

    async fn load_from_memory(&self, name: &str, buffer: &[u8]) -> MetaCallResult<Handle> {
        Ok(Handle::new(
            0,
            "mock",
            ScriptIdentity::memory(name, buffer),
            None,
            Context::new(),
        ))
    }

    async fn load_from_package(&self, path: &Path) -> MetaCallResult<Handle> {
        Ok(Handle::new(
            0,
            "mock",
            ScriptIdentity::Package(path.to_path_buf()),
            None,
            Context::new(),
        ))
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

/// Registers the `"mock"` tag against `manager` so tests can route calls
/// and loads through it.
pub async fn register_mock(manager: &LoaderManager) {
    manager
        .register_descriptor(PluginDescriptor::in_process("mock", &[], || {
            Ok(Arc::new(NoopLoader) as Arc<dyn LoaderImpl>)
        }))
        .await;
}
