//! The MetaCall native wire format (spec §4.3 "a MetaCall native format").
//!
//! A small tagged binary encoding: one discriminant byte followed by a
//! kind-specific payload. Composite kinds are length-prefixed so a reader
//! never has to guess where a nested value ends.

use crate::codec::Serial;
use metacall_value::{ErrorKind, MetaCallResult, TypeId, Value};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSerial;

impl Serial for NativeSerial {
    fn tag(&self) -> &str {
        "native"
    }

    fn serialize(&self, value: &Value) -> MetaCallResult<Vec<u8>> {
        let mut out = Vec::new();
        write_value(&mut out, value)?;
        Ok(out)
    }

    fn deserialize(&self, bytes: &[u8]) -> MetaCallResult<Value> {
        let mut cursor = Cursor::new(bytes);
        let value = read_value(&mut cursor)?;
        Ok(value)
    }
}

fn tag_byte(id: TypeId) -> u8 {
    match id {
        TypeId::Null => 0,
        TypeId::Bool => 1,
        TypeId::Char => 2,
        TypeId::Short => 3,
        TypeId::Int => 4,
        TypeId::Long => 5,
        TypeId::Float => 6,
        TypeId::Double => 7,
        TypeId::String => 8,
        TypeId::Buffer => 9,
        TypeId::Array => 10,
        TypeId::Map => 11,
        TypeId::Pointer => 12,
        // Reference-kind values attached to a live loader (Function, Future,
        // Class, Object, Exception, Throwable) have no portable wire
        // representation; callers must not serialize them.
        _ => 255,
    }
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> MetaCallResult<()> {
    out.push(tag_byte(value.type_id()));
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push(*b as u8),
        Value::Char(c) => out.extend_from_slice(&(*c as u32).to_le_bytes()),
        Value::Short(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Long(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Pointer(p) => out.extend_from_slice(&(*p as u64).to_le_bytes()),
        Value::String(s) => write_bytes(out, s.as_bytes()),
        Value::Buffer(b) => write_bytes(out, b),
        Value::Array(items) => {
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items.iter() {
                write_value(out, item)?;
            }
        }
        Value::Map(pairs) => {
            out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
            for (k, v) in pairs.iter() {
                write_value(out, k)?;
                write_value(out, v)?;
            }
        }
        other => {
            return Err(ErrorKind::TypeMismatch {
                expected: "native-representable value".into(),
                got: other.type_id().to_string(),
            }
            .into())
        }
    }
    Ok(())
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> MetaCallResult<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(ErrorKind::BackEndError("native codec: truncated buffer".into()).into());
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> MetaCallResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> MetaCallResult<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }
}

fn read_value(cursor: &mut Cursor<'_>) -> MetaCallResult<Value> {
    let tag = cursor.u8()?;
    Ok(match tag {
        0 => Value::Null,
        1 => Value::Bool(cursor.u8()? != 0),
        2 => {
            let raw = u32::from_le_bytes(cursor.take(4)?.try_into().unwrap());
            Value::Char(char::from_u32(raw).unwrap_or('\u{FFFD}'))
        }
        3 => Value::Short(i16::from_le_bytes(cursor.take(2)?.try_into().unwrap())),
        4 => Value::Int(i32::from_le_bytes(cursor.take(4)?.try_into().unwrap())),
        5 => Value::Long(i64::from_le_bytes(cursor.take(8)?.try_into().unwrap())),
        6 => Value::Float(f32::from_le_bytes(cursor.take(4)?.try_into().unwrap())),
        7 => Value::Double(f64::from_le_bytes(cursor.take(8)?.try_into().unwrap())),
        8 => {
            let len = cursor.u32()? as usize;
            let bytes = cursor.take(len)?;
            Value::String(Arc::from(
                std::str::from_utf8(bytes)
                    .map_err(|e| ErrorKind::BackEndError(format!("native codec: {e}")))?,
            ))
        }
        9 => {
            let len = cursor.u32()? as usize;
            Value::Buffer(Arc::from(cursor.take(len)?))
        }
        10 => {
            let len = cursor.u32()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(read_value(cursor)?);
            }
            Value::Array(Arc::new(items))
        }
        11 => {
            let len = cursor.u32()? as usize;
            let mut pairs = Vec::with_capacity(len);
            for _ in 0..len {
                let k = read_value(cursor)?;
                let v = read_value(cursor)?;
                pairs.push((k, v));
            }
            Value::Map(Arc::new(pairs))
        }
        12 => {
            let raw = u64::from_le_bytes(cursor.take(8)?.try_into().unwrap());
            Value::Pointer(raw as usize)
        }
        other => {
            return Err(ErrorKind::BackEndError(format!("native codec: unknown tag {other}")).into())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_nested_array_and_map() {
        let codec = NativeSerial;
        let v = Value::Array(Arc::new(vec![
            Value::Long(7),
            Value::Map(Arc::new(vec![(
                Value::String(Arc::from("k")),
                Value::Bool(true),
            )])),
        ]));
        let bytes = codec.serialize(&v).unwrap();
        let back = codec.deserialize(&bytes).unwrap();
        assert_eq!(back.stringify().unwrap(), v.stringify().unwrap());
    }

    #[test]
    fn truncated_buffer_errors_rather_than_panics() {
        let codec = NativeSerial;
        let err = codec.deserialize(&[8, 255, 0, 0, 0]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::BackEndError(_)));
    }
}
