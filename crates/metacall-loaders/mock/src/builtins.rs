//! The fixed set of callables the mock loader can wire a declared name to.

use metacall_value::{Exception, MetaCallResult, NativeInvoke, Throwable, Value};
use std::sync::Arc;

/// Parses one `name(param, param, ...)` declaration line into its name and
/// parameter names. `name()` declares a nullary function. Returns `None`
/// for anything that doesn't match that shape.
pub fn parse_declaration(line: &str) -> Option<(&str, Vec<&str>)> {
    let line = line.strip_suffix(')')?;
    let (name, params) = line.split_once('(')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let params = params.trim();
    let parameters = if params.is_empty() {
        Vec::new()
    } else {
        params.split(',').map(str::trim).collect()
    };
    Some((name, parameters))
}

/// Resolves a declared name to its native trampoline, if it is one of the
/// builtins this crate knows how to run.
pub fn lookup(name: &str) -> Option<NativeInvoke> {
    let invoke: NativeInvoke = match name {
        "sum" => Arc::new(|args: &[Value]| -> MetaCallResult<Value> {
            let left = args[0].as_int().ok_or_else(|| arity_type_error("sum"))?;
            let right = args[1].as_int().ok_or_else(|| arity_type_error("sum"))?;
            Ok(Value::Long(left + right))
        }),
        "mul" => Arc::new(|args: &[Value]| -> MetaCallResult<Value> {
            let left = args[0].as_int().ok_or_else(|| arity_type_error("mul"))?;
            let right = args[1].as_int().ok_or_else(|| arity_type_error("mul"))?;
            Ok(Value::Long(left * right))
        }),
        "echo" => Arc::new(|args: &[Value]| Ok(args[0].clone())),
        "bad" => Arc::new(|_args: &[Value]| {
            let exc = Exception::new("yeet", "TypeError", 0, "");
            Ok(Value::Throwable(Arc::new(Throwable::wrap(Value::Exception(Arc::new(exc))))))
        }),
        "slow" => Arc::new(|args: &[Value]| {
            Ok(Value::Future(metacall_value::MetaFuture::ready(args[0].clone())))
        }),
        _ => return None,
    };
    Some(invoke)
}

fn arity_type_error(function: &str) -> metacall_value::MetaCallError {
    metacall_value::ErrorKind::TypeMismatch {
        expected: "numeric".to_string(),
        got: format!("argument to '{function}'"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_parameters() {
        assert_eq!(parse_declaration("mul(left, right)"), Some(("mul", vec!["left", "right"])));
        assert_eq!(parse_declaration("  echo(x)  "), Some(("echo", vec!["x"])));
        assert_eq!(parse_declaration("bad()"), Some(("bad", vec![])));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_declaration("sum left"), None);
        assert_eq!(parse_declaration("(x)"), None);
    }

    #[test]
    fn lookup_is_none_for_unknown_names() {
        assert!(lookup("frobnicate").is_none());
    }
}
