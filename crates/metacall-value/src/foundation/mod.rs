//! The value model and reflection surface shared by every loader and by the
//! public façade (spec §3, §4).

pub mod context;
pub mod exception;
pub mod future;
pub mod reflect;
pub mod signature;
pub mod type_id;
pub mod value;

pub use context::Context;
pub use exception::{error_from_value, ErrorInfo, Exception, Throwable};
pub use future::{FutureResolver, MetaFuture};
pub use reflect::{Attribute, Class, Constructor, Function, Method, NativeInvoke, Object, Visibility};
pub use signature::{Parameter, Signature};
pub use type_id::{BackendPayload, Type, TypeId};
pub use value::Value;
