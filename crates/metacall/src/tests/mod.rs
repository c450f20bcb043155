//! End-to-end façade tests against the bundled `mock` loader, covering the
//! scenarios from spec §8 that don't require a real language engine.
//!
//! These tests share process-wide state (the [`crate::RUNTIME`] singleton),
//! so each one calls [`crate::destroy`] on the way out and they must not run
//! concurrently with each other — `cargo test` runs this crate's tests
//! single-threaded by default only if `--test-threads=1` is passed, so
//! instead each test takes its own serialising lock.

use crate::{self as metacall, LogKind};
use metacall_framework::plugin::PluginDescriptor;
use metacall_loader_mock::MockLoader;
use metacall_value::Value;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

static SERIAL: Lazy<AsyncMutex<()>> = Lazy::new(|| AsyncMutex::new(()));

async fn with_mock_runtime<F, Fut>(body: F)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let _guard = SERIAL.lock().await;
    metacall::initialize().unwrap();
    metacall::register_loader(PluginDescriptor::in_process("mock", &[], || {
        Ok(Arc::new(MockLoader::new()) as Arc<dyn metacall_framework::loader::LoaderImpl>)
    }))
    .await
    .unwrap();

    body().await;

    metacall::destroy().await.unwrap();
}

#[tokio::test]
async fn scenario_map_shaped_call() {
    with_mock_runtime(|| async {
        metacall::load_from_memory("mock", "mod", b"mul(left, right)\n")
            .await
            .unwrap();

        let ok = metacall::metacallfms("mul", "json", br#"{"left":10,"right":2}"#, &[])
            .await
            .unwrap();
        assert!(matches!(ok, Value::Long(20)));

        let err = metacall::metacallfms("mul", "json", br#"{"right":2}"#, &[])
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), metacall::ErrorKind::MissingArgument(_)));
    })
    .await;
}

#[tokio::test]
async fn scenario_extension_registration() {
    with_mock_runtime(|| async {
        metacall::load_from_memory("mock", "ext", b"sum(left, right)\n")
            .await
            .unwrap();
        let args = metacall_macros::metacall_args!(3_i64, 4_i64);
        let result = metacall::metacallv("sum", &args).await.unwrap();
        assert!(matches!(result, Value::Long(7)));
    })
    .await;
}

#[tokio::test]
async fn scenario_exception_translation() {
    with_mock_runtime(|| async {
        metacall::load_from_memory("mock", "mod", b"bad()\n")
            .await
            .unwrap();
        let result = metacall::metacallv("bad", &[]).await.unwrap();
        let info = metacall::error_from_value(&result).expect("expected a throwable value");
        assert_eq!(info.message, "yeet");
        assert_eq!(info.label, "TypeError");
    })
    .await;
}

#[tokio::test]
async fn scenario_async_future() {
    with_mock_runtime(|| async {
        metacall::load_from_memory("mock", "mod", b"slow(n)\n")
            .await
            .unwrap();
        let result = metacall::metacall_await("slow", &[Value::Int(32)])
            .await
            .unwrap();
        match result {
            Value::Future(fut) => {
                let settled = fut.await.unwrap();
                assert!(matches!(settled, Value::Int(32)));
            }
            other => panic!("expected a future, got {}", other.type_id()),
        }
    })
    .await;
}

#[tokio::test]
async fn clear_then_lookup_returns_not_found() {
    with_mock_runtime(|| async {
        let h = metacall::load_from_memory("mock", "mod", b"echo(x)\n")
            .await
            .unwrap();
        metacall::clear(&h).await.unwrap();
        let found = metacall::handle("mock", "mod").await.unwrap();
        assert!(found.is_none());
    })
    .await;
}

#[tokio::test]
async fn inspect_and_log_do_not_panic() {
    with_mock_runtime(|| async {
        metacall::load_from_memory("mock", "mod", b"echo(x)\n")
            .await
            .unwrap();
        let (text, size) = metacall::inspect().await.unwrap();
        assert_eq!(text.len(), size);
        metacall::log(LogKind::Info, "facade test");
    })
    .await;
}

#[tokio::test]
async fn operating_before_initialize_is_a_bad_argument() {
    let _guard = SERIAL.lock().await;
    // Ensure no previous test left the singleton initialised.
    let _ = metacall::destroy().await;
    let err = metacall::metacallv("anything", &[]).await.unwrap_err();
    assert!(matches!(err.kind(), metacall::ErrorKind::BadArgument(_)));
}
