//! The `Serial` capability trait (spec §4.3).
//!
//! The spec's C-shaped `initialize(allocator) → handle` / `destroy(handle)`
//! pair collapses to ordinary construction and `Drop` here: a `Serial`
//! implementation is a plain value, constructed once and shared behind an
//! `Arc` by the plugin manager's serial registry, rather than an opaque
//! handle threaded through free functions.

use metacall_value::{MetaCallResult, Value};

/// A value ↔ bytestring codec (spec §4.3 "Serial").
///
/// Round-trip guarantee (spec §8): for any value composed of `{null, bool,
/// integer families, float families, string without embedded NUL, array,
/// map of string→value}`, `deserialize(serialize(v))` equals `v`
/// structurally. Implementations are free to widen integer width on
/// round-trip (the JSON codec widens to `long`, per spec §4.3).
pub trait Serial: Send + Sync {
    /// Short identifying name (`"json"`, `"native"`), used by the plugin
    /// manager's serial registry and by configuration files that name a
    /// codec explicitly.
    fn tag(&self) -> &str;

    /// Encodes `value` to its wire form.
    fn serialize(&self, value: &Value) -> MetaCallResult<Vec<u8>>;

    /// Decodes a wire-form buffer back into a value.
    fn deserialize(&self, bytes: &[u8]) -> MetaCallResult<Value>;
}
