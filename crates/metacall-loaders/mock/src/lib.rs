//! A bundled `LoaderImpl` backend that needs no real language engine.
//!
//! Real back ends (`py`, `node`, ...) read source text and hand it to an
//! embedded interpreter; this one reads source text and looks each declared
//! symbol up in a small fixed builtin table, so the loader/dispatch/plugin
//! machinery can be exercised end to end (spec §8's map-shaped call,
//! exception translation, async future, and extension scenarios) without a
//! real interpreter anywhere in the dependency graph.
//!
//! A module's source is one declaration per non-empty, non-`#`-prefixed
//! line: `name(param, param, ...)`, e.g. `mul(left, right)`. Parameter names
//! double as the keys `metacallfms` binds against. Unknown names are
//! accepted — they are just never callable — so a module can freely declare
//! the same builtin under several local names.

mod builtins;

use async_trait::async_trait;
use metacall_framework::loader::LoaderImpl;
use metacall_value::loader::{Affinity, Handle, ScriptIdentity};
use metacall_value::{Context, Function, MetaCallResult, Parameter, Signature};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The `"mock"` loader tag's back end.
pub struct MockLoader {
    next_handle_id: AtomicU64,
}

impl MockLoader {
    pub fn new() -> Self {
        Self {
            next_handle_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_handle_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Parses `source` and populates a fresh [`Context`] with every
    /// recognised declaration (spec §4.5 `discover`, run eagerly here since
    /// this back end has no separate discovery pass from its load).
    fn load_source(&self, source: &str) -> Context {
        let mut context = Context::new();
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, params)) = builtins::parse_declaration(line) else {
                tracing::warn!(line, "mock loader: unrecognised declaration, skipping");
                continue;
            };
            let Some(invoke) = builtins::lookup(name) else {
                tracing::warn!(name, "mock loader: no builtin under this name, skipping");
                continue;
            };
            let parameters = params.into_iter().map(|p| Parameter::new(p, None)).collect();
            context.insert_function(Arc::new(Function::new(
                name,
                Signature::new(parameters, None),
                "mock",
                invoke,
            )));
        }
        context
    }
}

impl Default for MockLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoaderImpl for MockLoader {
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
        let mut source = String::new();
        for path in paths {
            source.push_str(&std::fs::read_to_string(path).map_err(|e| {
                metacall_value::ErrorKind::BackEndError(format!("{}: {e}", path.display()))
            })?);
            source.push('\n');
        }
        let context = self.load_source(&source);
        Ok(Handle::new(
            self.next_id(),
            "mock",
            ScriptIdentity::Files(paths.to_vec()),
            None,
            context,
        ))
    }

    async fn load_from_memory(&self, name: &str, buffer: &[u8]) -> MetaCallResult<Handle> {
        let source = String::from_utf8_lossy(buffer);
        let context = self.load_source(&source);
        Ok(Handle::new(
            self.next_id(),
            "mock",
            ScriptIdentity::memory(name, buffer),
            None,
            context,
        ))
    }

    async fn load_from_package(&self, path: &Path) -> MetaCallResult<Handle> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            metacall_value::ErrorKind::BackEndError(format!("{}: {e}", path.display()))
        })?;
        let context = self.load_source(&source);
        Ok(Handle::new(
            self.next_id(),
            "mock",
            ScriptIdentity::Package(path.to_path_buf()),
            None,
            context,
        ))
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

metacall_macros::define_loader_plugin! {
    name: "mock",
    depends_on: [],
    factory: || Ok(::std::sync::Arc::new(MockLoader::new()) as ::std::sync::Arc<dyn ::metacall_framework::loader::LoaderImpl>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use metacall_value::Value;

    #[tokio::test]
    async fn load_from_memory_discovers_declared_builtins() {
        let loader = MockLoader::new();
        let handle = loader
            .load_from_memory("mod", b"sum(left, right)\nmul(left, right)\n")
            .await
            .unwrap();
        let ctx = handle.context().unwrap();
        assert!(ctx.function("sum").is_some());
        assert!(ctx.function("mul").is_some());
        assert!(ctx.function("unknown").is_none());
    }

    #[tokio::test]
    async fn sum_adds_two_longs() {
        let loader = MockLoader::new();
        let handle = loader
            .load_from_memory("mod", b"sum(left, right)\n")
            .await
            .unwrap();
        let f = handle.context().unwrap().function("sum").unwrap();
        let result = f.call(&[Value::Long(3), Value::Long(4)]).unwrap();
        assert!(matches!(result, Value::Long(7)));
    }

    #[tokio::test]
    async fn bad_returns_a_throwable() {
        let loader = MockLoader::new();
        let handle = loader.load_from_memory("mod", b"bad()\n").await.unwrap();
        let f = handle.context().unwrap().function("bad").unwrap();
        let result = f.call(&[]).unwrap();
        let info = metacall_value::error_from_value(&result).expect("expected a throwable");
        assert_eq!(info.message, "yeet");
        assert_eq!(info.label, "TypeError");
    }

    #[tokio::test]
    async fn slow_resolves_a_future_with_its_argument() {
        let loader = MockLoader::new();
        let handle = loader.load_from_memory("mod", b"slow(n)\n").await.unwrap();
        let f = handle.context().unwrap().function("slow").unwrap();
        let result = f.call(&[Value::Int(32)]).unwrap();
        match result {
            Value::Future(fut) => {
                let settled = fut.await.unwrap();
                assert!(matches!(settled, Value::Int(32)));
            }
            other => panic!("expected a future, got {}", other.type_id()),
        }
    }

    #[tokio::test]
    async fn unrecognised_lines_are_skipped_without_failing_the_load() {
        let loader = MockLoader::new();
        let handle = loader
            .load_from_memory("mod", b"# a comment\nnonsense\nsum(left, right)\n")
            .await
            .unwrap();
        assert!(handle.context().unwrap().function("sum").is_some());
    }
}
