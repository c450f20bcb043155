//! Reflection, value marshalling, and error model for the MetaCall polyglot
//! core (spec §3, §4.2, §4.9).
//!
//! This crate has no knowledge of loaders-as-plugins, the call pipeline, or
//! configuration — it defines the vocabulary those higher layers share:
//! [`Value`](foundation::Value) and its reflected neighbours, the
//! [`Handle`](loader::Handle) a loader hands back, and the
//! [`MetaCallError`](error::MetaCallError)/[`ErrorKind`](error::ErrorKind)
//! pair every fallible operation in the core returns.

pub mod allocator;
pub mod error;
pub mod foundation;
pub mod loader;

pub use error::{ErrorKind, MetaCallError, MetaCallResult};
pub use foundation::{
    error_from_value, Attribute, Class, Constructor, Context, ErrorInfo, Exception, Function,
    FutureResolver, Method, MetaFuture, NativeInvoke, Object, Parameter, Signature, Throwable,
    Type, TypeId, Value, Visibility,
};
pub use loader::{Affinity, Handle, ScriptIdentity};
