//! Loader-local load results (spec §3 "Handle").

use crate::error::{ErrorKind, MetaCallResult};
use crate::foundation::context::Context;
use crate::foundation::type_id::BackendPayload;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a handle's script identity was established.
#[derive(Debug, Clone)]
pub enum ScriptIdentity {
    /// Loaded from one or more files on disk.
    Files(Vec<PathBuf>),
    /// Loaded from an in-memory buffer, identified by a caller-supplied
    /// name plus a content fingerprint (a 64-bit hash of the buffer),
    /// so two in-memory loads under the same name but different content are
    /// distinguishable handles.
    Memory { name: Arc<str>, fingerprint: u64 },
    /// Loaded from a pre-compiled artefact (archive, DLL, bytecode).
    Package(PathBuf),
}

impl ScriptIdentity {
    /// Builds a memory identity, hashing `buffer` into the fingerprint.
    pub fn memory(name: impl Into<Arc<str>>, buffer: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        buffer.hash(&mut hasher);
        ScriptIdentity::Memory {
            name: name.into(),
            fingerprint: hasher.finish(),
        }
    }
}

/// A single successful `load_from_*` result (spec §3 "Handle").
///
/// Owned exclusively by the loader that produced it; independently
/// clearable via [`Handle::clear`] without tearing down the owning loader.
pub struct Handle {
    id: u64,
    tag: Arc<str>,
    identity: ScriptIdentity,
    backend: Option<BackendPayload>,
    context: Context,
    cleared: AtomicBool,
}

impl Handle {
    /// Creates a handle. `id` should be unique within the owning loader
    /// (monotonic handle counters are the simplest source).
    pub fn new(
        id: u64,
        tag: impl Into<Arc<str>>,
        identity: ScriptIdentity,
        backend: Option<BackendPayload>,
        context: Context,
    ) -> Self {
        Self {
            id,
            tag: tag.into(),
            identity,
            backend,
            context,
            cleared: AtomicBool::new(false),
        }
    }

    /// The handle's identity, unique within its owning loader.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Tag of the loader that produced this handle.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// How the handle's script was identified.
    pub fn identity(&self) -> &ScriptIdentity {
        &self.identity
    }

    /// The opaque back-end load state, downcast to `T`.
    pub fn backend<T: 'static>(&self) -> Option<&T> {
        self.backend.as_ref().and_then(|b| b.downcast_ref::<T>())
    }

    /// The context discovered for this handle. Returns
    /// [`ErrorKind::NotFound`] once the handle has been cleared (spec §8
    /// "`clear(h)` followed by any access ... returns `NotFound`").
    pub fn context(&self) -> MetaCallResult<&Context> {
        if self.is_cleared() {
            return Err(ErrorKind::NotFound(format!("handle '{}' was cleared", self.id)).into());
        }
        Ok(&self.context)
    }

    /// `true` once [`Handle::clear`] has run.
    pub fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::Acquire)
    }

    /// Marks the handle cleared. Idempotent: a second call is a no-op.
    /// Breaks any reference cycle the discovered context's entities may
    /// hold (spec §9 "Design Notes", "an explicit `break_cycles` operation
    /// on handle clear") by dropping the context's strong references; any
    /// value already copied out by a caller keeps its own `Arc` alive.
    pub fn clear(&mut self) {
        if self.cleared.swap(true, Ordering::AcqRel) {
            return;
        }
        self.context = Context::new();
    }
}
