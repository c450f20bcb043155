//! The call pipeline variants (spec §4.6): `metacallv`, `metacallt`,
//! `metacallfv`, `metacallfms`, and `metacall_await`.

use super::coercion::{bind_named_arguments, coerce_to_signature};
use crate::loader::LoaderManager;
use metacall_serial::Serial;
use metacall_value::{Context, ErrorKind, Function, MetaCallResult, Value};
use std::sync::Arc;

/// Canonical call: looks `name` up in `context` and invokes it with
/// pre-boxed arguments, no coercion (spec §4.6 "metacallv").
pub async fn metacallv(
    manager: &LoaderManager,
    context: &Context,
    name: &str,
    args: &[Value],
) -> MetaCallResult<Value> {
    let function = context
        .function(name)
        .ok_or_else(|| ErrorKind::NotFound(name.to_string()))?
        .clone();
    metacallfv(manager, &function, args).await
}

/// Type-tagged call: casts each argument via the signature's declared
/// parameter types before invoking (spec §4.6 "metacallt").
pub async fn metacallt(
    manager: &LoaderManager,
    context: &Context,
    name: &str,
    args: &[Value],
) -> MetaCallResult<Value> {
    let function = context
        .function(name)
        .ok_or_else(|| ErrorKind::NotFound(name.to_string()))?
        .clone();
    let coerced = coerce_to_signature(function.signature(), args)?;
    metacallfv(manager, &function, &coerced).await
}

/// Invokes an already-resolved function handle directly, skipping name
/// lookup (spec §4.6 "metacallfv").
pub async fn metacallfv(
    manager: &LoaderManager,
    function: &Arc<Function>,
    args: &[Value],
) -> MetaCallResult<Value> {
    let instance = manager.get_or_create(function.loader_tag()).await?;

    if let Some(engine) = instance.engine_thread() {
        let function = function.clone();
        let args = args.to_vec();
        return engine.run(move || function.call(&args)).await;
    }

    let _guard = instance.lock_for_call().await;
    function.call(args)
}

/// Map-shaped call: deserializes `serialized` via `codec`, binds its entries
/// by name to `name`'s declared parameters (falling back to `defaults`),
/// casts, then invokes (spec §4.6 "metacallfms").
pub async fn metacallfms(
    manager: &LoaderManager,
    context: &Context,
    name: &str,
    codec: &dyn Serial,
    serialized: &[u8],
    defaults: &[(Value, Value)],
) -> MetaCallResult<Value> {
    let function = context
        .function(name)
        .ok_or_else(|| ErrorKind::NotFound(name.to_string()))?
        .clone();

    let decoded = codec.deserialize(serialized)?;
    let named = decoded.as_map().ok_or_else(|| ErrorKind::TypeMismatch {
        expected: "map".to_string(),
        got: decoded.type_id().to_string(),
    })?;

    let bound = bind_named_arguments(function.signature(), named, defaults)?;
    metacallfv(manager, &function, &bound).await
}

/// Async call: invokes `name` and guarantees a [`Value::Future`] result,
/// wrapping an already-settled (synchronous) return in a ready future
/// (spec §4.6 "metacall_await").
pub async fn metacall_await(
    manager: &LoaderManager,
    context: &Context,
    name: &str,
    args: &[Value],
) -> MetaCallResult<Value> {
    let result = metacallv(manager, context, name, args).await?;
    match result {
        Value::Future(_) => Ok(result),
        other => Ok(Value::Future(metacall_value::MetaFuture::ready(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metacall_value::Signature;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_function(name: &str, calls: Arc<AtomicUsize>) -> Arc<Function> {
        Arc::new(Function::new(
            name,
            Signature::any(1),
            "mock",
            Arc::new(move |args| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(args[0].clone())
            }),
        ))
    }

    #[tokio::test]
    async fn metacallv_looks_up_by_name_and_invokes() {
        let manager = LoaderManager::new();
        crate::loader_test_support::register_mock(&manager).await;

        let mut context = Context::new();
        let calls = Arc::new(AtomicUsize::new(0));
        context.insert_function(counting_function("echo", calls.clone()));

        let result = metacallv(&manager, &context, "echo", &[Value::Int(5)])
            .await
            .unwrap();
        assert!(matches!(result, Value::Int(5)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn metacallv_missing_function_errors_not_found() {
        let manager = LoaderManager::new();
        let context = Context::new();
        let err = metacallv(&manager, &context, "missing", &[])
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn metacall_await_wraps_synchronous_result_in_a_future() {
        let manager = LoaderManager::new();
        crate::loader_test_support::register_mock(&manager).await;

        let mut context = Context::new();
        let calls = Arc::new(AtomicUsize::new(0));
        context.insert_function(counting_function("echo", calls));

        let result = metacall_await(&manager, &context, "echo", &[Value::Bool(true)])
            .await
            .unwrap();
        match result {
            Value::Future(fut) => {
                let settled = fut.await.unwrap();
                assert!(matches!(settled, Value::Bool(true)));
            }
            other => panic!("expected a future, got type {}", other.type_id()),
        }
    }
}
