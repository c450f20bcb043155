//! The reference-counted, tagged [`Value`] (spec §3 "Value", §4.2).
//!
//! A `Value` is immutable in shape: its discriminant never changes after
//! creation, and conversions (promotion, demotion, cast) always produce a
//! new value. Sharing and lifetime are modeled with `Arc` rather than a
//! hand-rolled refcount (Design Notes, "Manual lifetime plus reference
//! counts") — cloning a composite value is an atomic strong-count bump, and
//! the recursive destructor the spec describes falls out of `Drop` for free.
//! [`Value::deep_copy`] implements the spec's distinct `value_copy`
//! operation, which deep-clones composites instead of sharing them.

use super::exception::{Exception, Throwable};
use super::future::MetaFuture;
use super::reflect::{Class, Function, Object};
use super::type_id::TypeId;
use crate::error::{ErrorKind, MetaCallResult};
use std::sync::Arc;

/// The reflected, reference-counted datum exchanged across language
/// boundaries (spec §3 "Value").
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Arc<str>),
    Buffer(Arc<[u8]>),
    Array(Arc<Vec<Value>>),
    Map(Arc<Vec<(Value, Value)>>),
    /// Raw address with no ownership claim (spec §3).
    Pointer(usize),
    Function(Arc<Function>),
    Future(MetaFuture),
    Class(Arc<Class>),
    Object(Arc<Object>),
    Exception(Arc<Exception>),
    Throwable(Arc<Throwable>),
    Null,
}

impl Value {
    /// This value's stable discriminant.
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Bool(_) => TypeId::Bool,
            Value::Char(_) => TypeId::Char,
            Value::Short(_) => TypeId::Short,
            Value::Int(_) => TypeId::Int,
            Value::Long(_) => TypeId::Long,
            Value::Float(_) => TypeId::Float,
            Value::Double(_) => TypeId::Double,
            Value::String(_) => TypeId::String,
            Value::Buffer(_) => TypeId::Buffer,
            Value::Array(_) => TypeId::Array,
            Value::Map(_) => TypeId::Map,
            Value::Pointer(_) => TypeId::Pointer,
            Value::Function(_) => TypeId::Function,
            Value::Future(_) => TypeId::Future,
            Value::Class(_) => TypeId::Class,
            Value::Object(_) => TypeId::Object,
            Value::Exception(_) => TypeId::Exception,
            Value::Throwable(_) => TypeId::Throwable,
            Value::Null => TypeId::Null,
        }
    }

    /// `true` when `type_id()` matches `id`.
    pub fn is(&self, id: TypeId) -> bool {
        self.type_id() == id
    }

    /// The live strong-count of this value's backing allocation, when the
    /// kind is composite (`Arc`-backed). Scalars, the pointer kind, and
    /// `Null` have no separate heap allocation to count — Rust's ownership
    /// model already guarantees the spec's refcount-monotonicity invariant
    /// for them via move/`Drop`, so this returns `None`.
    pub fn refcount(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(Arc::strong_count(s)),
            Value::Buffer(b) => Some(Arc::strong_count(b)),
            Value::Array(a) => Some(Arc::strong_count(a)),
            Value::Map(m) => Some(Arc::strong_count(m)),
            Value::Function(f) => Some(Arc::strong_count(f)),
            Value::Class(c) => Some(Arc::strong_count(c)),
            Value::Object(o) => Some(Arc::strong_count(o)),
            Value::Exception(e) => Some(Arc::strong_count(e)),
            Value::Throwable(t) => Some(Arc::strong_count(t)),
            _ => None,
        }
    }

    /// Spec `value_copy`: an atomic refcount bump for scalars (here, a plain
    /// `Clone`, which is equally cheap), a structural deep copy for
    /// composites. Use this — not [`Clone::clone`] — when the caller needs
    /// an independent value whose children are not aliased with the
    /// original (e.g. before handing a value across a boundary that may
    /// mutate it in place).
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Array(items) => {
                Value::Array(Arc::new(items.iter().map(Value::deep_copy).collect()))
            }
            Value::Map(pairs) => Value::Map(Arc::new(
                pairs
                    .iter()
                    .map(|(k, v)| (k.deep_copy(), v.deep_copy()))
                    .collect(),
            )),
            Value::String(s) => Value::String(Arc::from(s.as_ref())),
            Value::Buffer(b) => Value::Buffer(Arc::from(b.as_ref())),
            other => other.clone(),
        }
    }

    // ─── Accessors ────────────────────────────────────────────────────────

    /// Returns the boolean payload; `None` if not a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value widened to `i64`; `None` for non-integer kinds.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            Value::Char(c) => Some(*c as i64),
            _ => None,
        }
    }

    /// Returns the value widened to `f64`; `None` for non-float kinds.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string payload; `None` if not a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the array payload; `None` if not an `Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the map payload as key/value pairs; `None` if not a `Map`.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    // ─── Promotion / demotion (spec §4.2) ────────────────────────────────

    /// Widens a numeric value to `Long` without loss. Returns
    /// [`ErrorKind::TypeMismatch`] for non-numeric kinds.
    pub fn promote_to_long(&self) -> MetaCallResult<Value> {
        match self {
            Value::Short(v) => Ok(Value::Long(*v as i64)),
            Value::Int(v) => Ok(Value::Long(*v as i64)),
            Value::Long(v) => Ok(Value::Long(*v)),
            Value::Char(c) => Ok(Value::Long(*c as i64)),
            other => Err(ErrorKind::TypeMismatch {
                expected: "numeric".into(),
                got: other.type_id().to_string(),
            }
            .into()),
        }
    }

    /// Widens a float value to `Double` without loss.
    pub fn promote_to_double(&self) -> MetaCallResult<Value> {
        match self {
            Value::Float(v) => Ok(Value::Double(*v as f64)),
            Value::Double(v) => Ok(Value::Double(*v)),
            other => Err(ErrorKind::TypeMismatch {
                expected: "float|double".into(),
                got: other.type_id().to_string(),
            }
            .into()),
        }
    }

    /// Narrows `Long` to `Int`. Returns `Value::Null` — not an error — when
    /// the source value does not fit in range, per spec §4.2/§8.
    pub fn demote_to_int(&self) -> MetaCallResult<Value> {
        match self {
            Value::Long(v) => {
                if *v >= i32::MIN as i64 && *v <= i32::MAX as i64 {
                    Ok(Value::Int(*v as i32))
                } else {
                    Ok(Value::Null)
                }
            }
            Value::Int(v) => Ok(Value::Int(*v)),
            other => Err(ErrorKind::TypeMismatch {
                expected: "long|int".into(),
                got: other.type_id().to_string(),
            }
            .into()),
        }
    }

    /// Narrows `Long`/`Int` to `Short`. `Null` on overflow.
    pub fn demote_to_short(&self) -> MetaCallResult<Value> {
        let as_long = self.as_int().ok_or_else(|| ErrorKind::TypeMismatch {
            expected: "integer".into(),
            got: self.type_id().to_string(),
        })?;
        if as_long >= i16::MIN as i64 && as_long <= i16::MAX as i64 {
            Ok(Value::Short(as_long as i16))
        } else {
            Ok(Value::Null)
        }
    }

    /// Narrows `Double` to `Float`. `Null` when the magnitude does not fit.
    pub fn demote_to_float(&self) -> MetaCallResult<Value> {
        match self {
            Value::Double(v) => {
                if v.is_finite() && v.abs() <= f32::MAX as f64 {
                    Ok(Value::Float(*v as f32))
                } else if !v.is_finite() {
                    Ok(Value::Float(*v as f32))
                } else {
                    Ok(Value::Null)
                }
            }
            Value::Float(v) => Ok(Value::Float(*v)),
            other => Err(ErrorKind::TypeMismatch {
                expected: "double|float".into(),
                got: other.type_id().to_string(),
            }
            .into()),
        }
    }

    // ─── Cast (spec §4.2) ─────────────────────────────────────────────────

    /// Casts between unrelated kinds following the fixed cast table: string
    /// parses to the target numeric kind, numeric kinds format to string,
    /// and identical-kind casts are identity. Unsupported pairs return
    /// [`ErrorKind::TypeMismatch`].
    pub fn cast(&self, target: TypeId) -> MetaCallResult<Value> {
        if self.type_id() == target {
            return Ok(self.clone());
        }
        match (self, target) {
            (Value::String(s), TypeId::Int) => s
                .trim()
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|_| cast_err(self, target)),
            (Value::String(s), TypeId::Long) => s
                .trim()
                .parse::<i64>()
                .map(Value::Long)
                .map_err(|_| cast_err(self, target)),
            (Value::String(s), TypeId::Double) => s
                .trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| cast_err(self, target)),
            (Value::String(s), TypeId::Float) => s
                .trim()
                .parse::<f32>()
                .map(Value::Float)
                .map_err(|_| cast_err(self, target)),
            (Value::String(s), TypeId::Bool) => match s.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(cast_err(self, target)),
            },
            (_, TypeId::String) => self.stringify().map(|s| Value::String(Arc::from(s))),
            (v, TypeId::Long) if v.type_id().is_numeric() => v.promote_to_long(),
            (v, TypeId::Int) if v.type_id().is_numeric() => v.promote_to_long()?.demote_to_int(),
            (v, TypeId::Double) if v.type_id().is_numeric() => v.promote_to_double(),
            (v, TypeId::Float) if v.type_id().is_numeric() => {
                v.promote_to_double()?.demote_to_float()
            }
            _ => Err(cast_err(self, target)),
        }
    }

    // ─── Stringify (spec §4.2) ────────────────────────────────────────────

    /// Renders the language-neutral textual form described in spec §4.2.
    pub fn stringify(&self) -> MetaCallResult<String> {
        Ok(match self {
            Value::Bool(b) => b.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Short(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => format!("{v}"),
            Value::Double(v) => format!("{v}"),
            Value::String(s) => s.to_string(),
            Value::Buffer(b) => format!("<buffer:{} bytes>", b.len()),
            Value::Pointer(p) => format!("{:#x}", p),
            Value::Array(items) => {
                let parts: MetaCallResult<Vec<String>> =
                    items.iter().map(Value::stringify).collect();
                format!("[{}]", parts?.join(","))
            }
            Value::Map(pairs) => {
                let mut parts = Vec::with_capacity(pairs.len());
                for (k, v) in pairs.iter() {
                    parts.push(format!("{}:{}", k.stringify()?, v.stringify()?));
                }
                format!("{{{}}}", parts.join(","))
            }
            Value::Null => "null".to_string(),
            Value::Function(f) => format!("<function:{}>", f.name()),
            Value::Future(_) => "<future>".to_string(),
            Value::Class(c) => format!("<class:{}>", c.name()),
            Value::Object(_) => "<object>".to_string(),
            Value::Exception(e) => format!("<exception:{}:{}>", e.label(), e.message()),
            Value::Throwable(t) => format!("<throwable:{}>", t.value().stringify()?),
        })
    }

    /// Writes [`stringify`](Self::stringify)'s output into `sink`, returning
    /// the number of bytes written. Returns [`ErrorKind::BufferTooSmall`]
    /// rather than truncating, unless `allow_truncate` is set.
    pub fn stringify_into(&self, sink: &mut [u8], allow_truncate: bool) -> MetaCallResult<usize> {
        let s = self.stringify()?;
        let bytes = s.as_bytes();
        if bytes.len() > sink.len() {
            if allow_truncate {
                sink.copy_from_slice(&bytes[..sink.len()]);
                return Ok(sink.len());
            }
            return Err(ErrorKind::BufferTooSmall {
                needed: bytes.len(),
                available: sink.len(),
            }
            .into());
        }
        sink[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }
}

fn cast_err(from: &Value, to: TypeId) -> crate::error::MetaCallError {
    ErrorKind::TypeMismatch {
        expected: to.to_string(),
        got: from.type_id().to_string(),
    }
    .into()
}

// ─── Native scalar conversions ────────────────────────────────────────────
//
// Spec §9 "Variadic C calls" asks for a typed argument builder in place of
// C varargs; `metacall-macros::metacall_args!` expands to `Value::from(_)`
// calls over whatever a caller writes literally, so every native kind the
// cast table treats as a distinct discriminant gets a direct `From` here
// rather than going through `cast`, which only handles conversions *between
// already-constructed* values.

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Arc::from(v.as_str()))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Buffer(Arc::from(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(Arc::new(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refcount_monotonicity_on_array() {
        let v = Value::Array(Arc::new(vec![Value::Int(1)]));
        assert_eq!(v.refcount(), Some(1));
        let copy = v.clone();
        assert_eq!(v.refcount(), Some(2));
        drop(copy);
        assert_eq!(v.refcount(), Some(1));
    }

    #[test]
    fn deep_copy_is_independent() {
        let inner = Value::Array(Arc::new(vec![Value::Int(1)]));
        let outer = Value::Array(Arc::new(vec![inner.clone()]));
        let copied = outer.deep_copy();
        // The shallow clone shares the inner Arc (refcount bumps)...
        let shallow = outer.clone();
        if let (Value::Array(o), Value::Array(s)) = (&outer, &shallow) {
            assert!(Arc::ptr_eq(o, s));
        }
        // ...but the deep copy does not alias the original array allocation.
        if let (Value::Array(o), Value::Array(c)) = (&outer, &copied) {
            assert!(!Arc::ptr_eq(o, c));
        }
        let _ = inner;
    }

    #[test]
    fn promotion_widens_without_loss() {
        let v = Value::Int(42);
        assert!(matches!(v.promote_to_long(), Ok(Value::Long(42))));
    }

    #[test]
    fn demotion_out_of_range_returns_null() {
        let v = Value::Long(i64::MAX);
        assert!(matches!(v.demote_to_int(), Ok(Value::Null)));
    }

    #[test]
    fn stringify_matches_spec_forms() {
        assert_eq!(Value::Bool(true).stringify().unwrap(), "true");
        assert_eq!(Value::Null.stringify().unwrap(), "null");
        let arr = Value::Array(Arc::new(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(arr.stringify().unwrap(), "[1,2]");
    }

    #[test]
    fn cast_string_to_int_parses() {
        let v = Value::String(Arc::from("42"));
        assert!(matches!(v.cast(TypeId::Int), Ok(Value::Int(42))));
    }

    #[test]
    fn cast_int_to_string_formats() {
        let v = Value::Int(7);
        assert_eq!(v.cast(TypeId::String).unwrap().as_str(), Some("7"));
    }
}
