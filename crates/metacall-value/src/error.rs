//! Unified error kinds for the MetaCall core (see spec §7).
//!
//! Two orthogonal channels exist in the wider system: *return-value errors*
//! (this module) and *in-band exceptions* ([`crate::foundation::exception`]).
//! A failing operation anywhere in the core returns a [`MetaCallError`] and
//! also records it in the calling thread's [`last_error`] slot, mirroring the
//! C original's `metacall_error_last()` / `metacall_error_clear()` pair.

use std::cell::RefCell;

/// Closed set of error kinds produced by the core (spec §7).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ErrorKind {
    /// An argument failed validation before a call could proceed.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// A named entity (function, handle, tag, service) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity with the same identity was already registered.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// No loader is registered (and none could be created) for a tag.
    #[error("loader unavailable for tag '{0}'")]
    LoaderUnavailable(String),

    /// A `load_from_*` call failed at the back end.
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// `discover` failed to enumerate a handle's symbols.
    #[error("discovery failed: {0}")]
    DiscoveryFailed(String),

    /// The supplied argument vector does not match a signature's arity.
    #[error("arity mismatch: expected {expected}, got {got}")]
    ArityMismatch {
        /// Declared arity of the target signature.
        expected: usize,
        /// Length of the supplied argument vector.
        got: usize,
    },

    /// A value could not be cast or coerced to a required type.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected discriminant, stringified.
        expected: String,
        /// Actual discriminant, stringified.
        got: String,
    },

    /// A by-name call was missing a required (non-default) named argument.
    #[error("missing argument: {0}")]
    MissingArgument(String),

    /// A foreign back-end failure, wrapped verbatim.
    #[error("back-end error: {0}")]
    BackEndError(String),

    /// A stringify/serialize sink was too small for its output.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes required to complete the write.
        needed: usize,
        /// Bytes actually available in the sink.
        available: usize,
    },

    /// A configuration's `dependencies` graph contains a cycle.
    #[error("cyclic configuration involving '{0}'")]
    CyclicConfiguration(String),

    /// The allocator reported exhaustion.
    #[error("out of memory")]
    OutOfMemory,

    /// An unrecoverable condition; the process should terminate after
    /// flushing logs (spec §7 propagation policy).
    #[error("fatal: {0}")]
    Fatal(String),
}

/// The error type returned by fallible core operations.
///
/// Wraps an [`ErrorKind`] plus an optional human-readable context chain,
/// the way `thiserror`-based errors accumulate context in the teacher's
/// `TransportError` / `AdapterError` hierarchy.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}")]
pub struct MetaCallError {
    /// The classified kind of failure.
    pub kind: ErrorKind,
}

impl MetaCallError {
    /// Constructs an error from a kind and records it as this thread's last error.
    pub fn new(kind: ErrorKind) -> Self {
        let err = Self { kind };
        set_last_error(err.clone());
        err
    }

    /// Returns the error kind without consuming `self`.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl From<ErrorKind> for MetaCallError {
    fn from(kind: ErrorKind) -> Self {
        MetaCallError::new(kind)
    }
}

/// Result alias used throughout the core crates.
pub type MetaCallResult<T> = Result<T, MetaCallError>;

thread_local! {
    static LAST_ERROR: RefCell<Option<MetaCallError>> = const { RefCell::new(None) };
}

/// Records `err` as this thread's last error. Called automatically by
/// [`MetaCallError::new`]; exposed so loader back ends can set a last error
/// without constructing a fresh [`MetaCallError`] first.
pub fn set_last_error(err: MetaCallError) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err));
}

/// Returns a clone of this thread's last recorded error, if any.
pub fn last_error() -> Option<MetaCallError> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Clears this thread's last error slot.
pub fn clear_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}
