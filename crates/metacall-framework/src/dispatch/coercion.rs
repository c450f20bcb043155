//! Argument coercion for the typed call variants (spec §4.6 "metacallt").

use metacall_value::{ErrorKind, MetaCallResult, Parameter, Signature, Value};

/// Casts each argument in `args` to the declared type of the matching
/// signature parameter. Parameters with no declared type (`None`) pass
/// their argument through unchanged.
///
/// Validates arity first (spec §4.5(a): "validates arity against the
/// signature" happens before coercion is applied): `zip`ping mismatched
/// lengths would otherwise silently truncate to the shorter side and let
/// an over- or under-supplied call through.
pub fn coerce_to_signature(signature: &Signature, args: &[Value]) -> MetaCallResult<Vec<Value>> {
    if args.len() != signature.arity() {
        return Err(ErrorKind::ArityMismatch {
            expected: signature.arity(),
            got: args.len(),
        }
        .into());
    }
    signature
        .parameters()
        .iter()
        .zip(args.iter())
        .map(|(param, arg)| coerce_one(param, arg))
        .collect()
}

fn coerce_one(param: &Parameter, arg: &Value) -> MetaCallResult<Value> {
    match param.ty() {
        Some(ty) => arg.cast(ty.id()),
        None => Ok(arg.clone()),
    }
}

/// Binds a map-shaped call (`metacallfms`) to positional arguments following
/// the signature's declared parameter order (spec §4.6 "metacallfms"): each
/// declared parameter looks itself up by name in `named`, falling back to
/// `defaults` (looked up by the same name) when absent, and erroring with
/// [`metacall_value::ErrorKind::MissingArgument`] when neither is supplied.
pub fn bind_named_arguments(
    signature: &Signature,
    named: &[(Value, Value)],
    defaults: &[(Value, Value)],
) -> MetaCallResult<Vec<Value>> {
    signature
        .parameters()
        .iter()
        .map(|param| {
            lookup_named(named, param.name())
                .or_else(|| lookup_named(defaults, param.name()))
                .ok_or_else(|| {
                    metacall_value::ErrorKind::MissingArgument(param.name().to_string()).into()
                })
                .and_then(|value| coerce_one(param, &value))
        })
        .collect()
}

fn lookup_named(pairs: &[(Value, Value)], name: &str) -> Option<Value> {
    pairs
        .iter()
        .find(|(k, _)| k.as_str() == Some(name))
        .map(|(_, v)| v.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metacall_value::{Parameter, Type, TypeId};

    fn sig_with_types() -> Signature {
        Signature::new(
            vec![
                Parameter::new("a", Some(Type::new("int", TypeId::Int))),
                Parameter::new("b", None),
            ],
            None,
        )
    }

    #[test]
    fn coerce_casts_only_typed_parameters() {
        let sig = sig_with_types();
        let args = vec![Value::String(std::sync::Arc::from("7")), Value::Bool(true)];
        let coerced = coerce_to_signature(&sig, &args).unwrap();
        assert!(matches!(coerced[0], Value::Int(7)));
        assert!(matches!(coerced[1], Value::Bool(true)));
    }

    #[test]
    fn coerce_rejects_over_supplied_arguments() {
        let sig = sig_with_types();
        let args = vec![
            Value::String(std::sync::Arc::from("7")),
            Value::Bool(true),
            Value::Int(99),
        ];
        let err = coerce_to_signature(&sig, &args).unwrap_err();
        assert!(matches!(
            err.kind(),
            metacall_value::ErrorKind::ArityMismatch {
                expected: 2,
                got: 3
            }
        ));
    }

    #[test]
    fn coerce_rejects_under_supplied_arguments() {
        let sig = sig_with_types();
        let args = vec![Value::String(std::sync::Arc::from("7"))];
        let err = coerce_to_signature(&sig, &args).unwrap_err();
        assert!(matches!(
            err.kind(),
            metacall_value::ErrorKind::ArityMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn bind_named_uses_default_when_missing() {
        let sig = sig_with_types();
        let named = vec![(Value::String(std::sync::Arc::from("b")), Value::Bool(false))];
        let defaults = vec![(
            Value::String(std::sync::Arc::from("a")),
            Value::Int(9),
        )];
        let bound = bind_named_arguments(&sig, &named, &defaults).unwrap();
        assert!(matches!(bound[0], Value::Int(9)));
        assert!(matches!(bound[1], Value::Bool(false)));
    }

    #[test]
    fn bind_named_missing_argument_errors() {
        let sig = sig_with_types();
        let err = bind_named_arguments(&sig, &[], &[]).unwrap_err();
        assert!(matches!(
            err.kind(),
            metacall_value::ErrorKind::MissingArgument(_)
        ));
    }
}
