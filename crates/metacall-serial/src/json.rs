//! The JSON codec (spec §4.3 "a JSON codec (rapidjson-equivalent)").

use crate::codec::Serial;
use metacall_value::{ErrorKind, MetaCallResult, Value};
use std::sync::Arc;

/// `serde_json`-backed implementation of [`Serial`].
///
/// Integers round-trip widened to `long` (`i64`) per spec §4.3: JSON has no
/// notion of integer width, so `deserialize` always produces `Value::Long`
/// for whole numbers rather than guessing a narrower kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerial;

impl Serial for JsonSerial {
    fn tag(&self) -> &str {
        "json"
    }

    fn serialize(&self, value: &Value) -> MetaCallResult<Vec<u8>> {
        let json = to_json(value)?;
        serde_json::to_vec(&json)
            .map_err(|e| ErrorKind::BackEndError(format!("json serialize: {e}")).into())
    }

    fn deserialize(&self, bytes: &[u8]) -> MetaCallResult<Value> {
        let json: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| ErrorKind::BackEndError(format!("json parse: {e}")))?;
        from_json(&json)
    }
}

fn to_json(value: &Value) -> MetaCallResult<serde_json::Value> {
    use serde_json::Value as J;
    Ok(match value {
        Value::Null => J::Null,
        Value::Bool(b) => J::Bool(*b),
        Value::Char(c) => J::String(c.to_string()),
        Value::Short(v) => J::from(*v),
        Value::Int(v) => J::from(*v),
        Value::Long(v) => J::from(*v),
        Value::Float(v) => serde_json::Number::from_f64(*v as f64)
            .map(J::Number)
            .unwrap_or(J::Null),
        Value::Double(v) => serde_json::Number::from_f64(*v)
            .map(J::Number)
            .unwrap_or(J::Null),
        Value::String(s) => J::String(s.to_string()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(to_json(item)?);
            }
            J::Array(out)
        }
        Value::Map(pairs) => {
            let mut map = serde_json::Map::with_capacity(pairs.len());
            for (k, v) in pairs.iter() {
                let key = k.as_str().ok_or_else(|| {
                    ErrorKind::TypeMismatch {
                        expected: "string key".into(),
                        got: k.type_id().to_string(),
                    }
                })?;
                map.insert(key.to_string(), to_json(v)?);
            }
            J::Object(map)
        }
        Value::Buffer(b) => {
            // No native byte-string kind in JSON: represent as an array of
            // unsigned bytes, the same representation rapidjson-based
            // MetaCall embedders use for opaque buffers.
            J::Array(b.iter().map(|byte| J::from(*byte)).collect())
        }
        other => {
            return Err(ErrorKind::TypeMismatch {
                expected: "json-representable value".into(),
                got: other.type_id().to_string(),
            }
            .into())
        }
    })
}

fn from_json(json: &serde_json::Value) -> MetaCallResult<Value> {
    use serde_json::Value as J;
    Ok(match json {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(*b),
        J::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Long(i)
            } else if let Some(f) = n.as_f64() {
                Value::Double(f)
            } else {
                return Err(ErrorKind::BackEndError(format!("unrepresentable json number: {n}")).into());
            }
        }
        J::String(s) => Value::String(Arc::from(s.as_str())),
        J::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_json(item)?);
            }
            Value::Array(Arc::new(out))
        }
        J::Object(map) => {
            let mut out = Vec::with_capacity(map.len());
            for (k, v) in map.iter() {
                out.push((Value::String(Arc::from(k.as_str())), from_json(v)?));
            }
            Value::Map(Arc::new(out))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_array_of_scalars() {
        let codec = JsonSerial;
        let v = Value::Array(Arc::new(vec![
            Value::Long(1),
            Value::Bool(true),
            Value::String(Arc::from("hi")),
            Value::Null,
        ]));
        let bytes = codec.serialize(&v).unwrap();
        let back = codec.deserialize(&bytes).unwrap();
        assert_eq!(back.stringify().unwrap(), v.stringify().unwrap());
    }

    #[test]
    fn round_trips_string_keyed_map() {
        let codec = JsonSerial;
        let v = Value::Map(Arc::new(vec![(
            Value::String(Arc::from("left")),
            Value::Long(10),
        )]));
        let bytes = codec.serialize(&v).unwrap();
        let back = codec.deserialize(&bytes).unwrap();
        assert_eq!(back.as_map().unwrap().len(), 1);
    }

    #[test]
    fn int_round_trips_widened_to_long() {
        let codec = JsonSerial;
        let v = Value::Int(42);
        let bytes = codec.serialize(&v).unwrap();
        let back = codec.deserialize(&bytes).unwrap();
        assert!(matches!(back, Value::Long(42)));
    }
}
