//! The closed discriminant set and [`Type`] descriptor (spec §3 "Type").

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The fixed, closed set of value discriminants the core understands.
///
/// New kinds are never added by a loader; a loader may only attach an opaque
/// back-end payload to an existing `TypeId` via [`Type::with_backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeId {
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Buffer,
    Array,
    Map,
    Pointer,
    Future,
    Function,
    Null,
    Class,
    Object,
    Exception,
    Throwable,
}

impl TypeId {
    /// All discriminants, in declaration order. Used by diagnostics and by
    /// the native [`crate::serial`]-adjacent codecs to enumerate tags.
    pub const ALL: &'static [TypeId] = &[
        TypeId::Bool,
        TypeId::Char,
        TypeId::Short,
        TypeId::Int,
        TypeId::Long,
        TypeId::Float,
        TypeId::Double,
        TypeId::String,
        TypeId::Buffer,
        TypeId::Array,
        TypeId::Map,
        TypeId::Pointer,
        TypeId::Future,
        TypeId::Function,
        TypeId::Null,
        TypeId::Class,
        TypeId::Object,
        TypeId::Exception,
        TypeId::Throwable,
    ];

    /// True for the numeric kinds eligible for promotion/demotion (spec §4.2).
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeId::Short
                | TypeId::Int
                | TypeId::Long
                | TypeId::Float
                | TypeId::Double
                | TypeId::Char
        )
    }

    /// True for kinds whose payload is reference-shaped (heap-allocated,
    /// ref-counted children) rather than inlined scalar bytes.
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            TypeId::String
                | TypeId::Buffer
                | TypeId::Array
                | TypeId::Map
                | TypeId::Function
                | TypeId::Future
                | TypeId::Class
                | TypeId::Object
                | TypeId::Exception
                | TypeId::Throwable
        )
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeId::Bool => "bool",
            TypeId::Char => "char",
            TypeId::Short => "short",
            TypeId::Int => "int",
            TypeId::Long => "long",
            TypeId::Float => "float",
            TypeId::Double => "double",
            TypeId::String => "string",
            TypeId::Buffer => "buffer",
            TypeId::Array => "array",
            TypeId::Map => "map",
            TypeId::Pointer => "pointer",
            TypeId::Future => "future",
            TypeId::Function => "function",
            TypeId::Null => "null",
            TypeId::Class => "class",
            TypeId::Object => "object",
            TypeId::Exception => "exception",
            TypeId::Throwable => "throwable",
        };
        f.write_str(s)
    }
}

/// Opaque back-end payload a loader attaches to a [`Type`] at discovery time.
///
/// Holds the language-specific native type reference (e.g. a Python `PyTypeObject*`
/// wrapper, a V8 `Local<Value>` kind tag). Core code never inspects the
/// payload; only the owning loader downcasts it.
pub type BackendPayload = Arc<dyn Any + Send + Sync>;

/// A named, polymorphic type descriptor (spec §3 "Type").
///
/// Created by loaders at discovery time and owned by the [`Context`](crate::foundation::context::Context)
/// that discovered them. Cheap to clone: the optional backend payload is
/// `Arc`-shared.
#[derive(Clone)]
pub struct Type {
    name: Arc<str>,
    id: TypeId,
    backend: Option<BackendPayload>,
}

impl Type {
    /// Creates a type descriptor with no back-end payload.
    pub fn new(name: impl Into<Arc<str>>, id: TypeId) -> Self {
        Self {
            name: name.into(),
            id,
            backend: None,
        }
    }

    /// Attaches an opaque back-end payload, returning the updated descriptor.
    pub fn with_backend(mut self, payload: BackendPayload) -> Self {
        self.backend = Some(payload);
        self
    }

    /// The type's name (language-neutral, as assigned by the discovering loader).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type's discriminant.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The opaque back-end payload, if any, downcast to `T`.
    pub fn backend<T: 'static>(&self) -> Option<&T> {
        self.backend.as_ref().and_then(|b| b.downcast_ref::<T>())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("has_backend", &self.backend.is_some())
            .finish()
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.id == other.id
    }
}
