//! The call pipeline (spec §4.6): argument coercion plus the five call
//! variants dispatched through a loader's declared affinity.

pub mod call;
pub mod coercion;
pub mod engine_thread;

pub use call::{metacall_await, metacallfms, metacallfv, metacallt, metacallv};
pub use coercion::{bind_named_arguments, coerce_to_signature};
pub use engine_thread::EngineThread;
