//! Deferred results (spec §3 "Future").
//!
//! Open Question resolved in `SPEC_FULL.md`: futures are **single-shot**.
//! `await_with` may be called exactly once; a second call returns
//! [`ErrorKind::BadArgument`](crate::error::ErrorKind::BadArgument). A loader
//! that needs multi-shot semantics for its own native future kind is free to
//! model that as an opaque back-end payload on a `pointer`/`object` value
//! instead of using this type.

use super::value::Value;
use crate::error::{ErrorKind, MetaCallResult};
use parking_lot::Mutex;
use std::future::Future as StdFuture;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll, Waker};

type ResolveFn = Box<dyn FnOnce(Value) + Send>;
type RejectFn = Box<dyn FnOnce(Value) + Send>;

/// Continuations parked by a prior `await_with` call, invoked once the
/// future settles.
struct Parked {
    on_resolve: ResolveFn,
    on_reject: RejectFn,
}

enum State {
    Pending {
        waker: Option<Waker>,
        parked: Option<Parked>,
    },
    Resolved(Value),
    Rejected(Value),
    /// Already delivered to a continuation or polled to completion.
    Consumed,
}

struct Inner {
    state: Mutex<State>,
}

/// An opaque deferred result (spec §3 "Future").
///
/// Resolution passes a value to the appropriate continuation exactly once.
/// Implements [`std::future::Future`] so Rust call sites can `.await` it
/// directly in addition to the spec-literal callback form.
#[derive(Clone)]
pub struct MetaFuture {
    inner: Arc<Inner>,
}

/// The producer half of a future: created alongside its [`MetaFuture`] and
/// handed to the back end that will eventually resolve or reject it.
#[derive(Clone)]
pub struct FutureResolver {
    inner: Arc<Inner>,
}

impl MetaFuture {
    /// Creates a pending future and its paired resolver.
    pub fn pending() -> (MetaFuture, FutureResolver) {
        let inner = Arc::new(Inner {
            state: Mutex::new(State::Pending {
                waker: None,
                parked: None,
            }),
        });
        (
            MetaFuture {
                inner: inner.clone(),
            },
            FutureResolver { inner },
        )
    }

    /// An already-resolved future, useful for loaders whose call is
    /// synchronous but whose signature declares a future return type.
    pub fn ready(value: Value) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(State::Resolved(value)),
        });
        MetaFuture { inner }
    }

    /// Registers `on_resolve` / `on_reject` continuations, passing `user_data`
    /// through to whichever fires (spec §3 "await(on_resolve, on_reject, user_data)").
    ///
    /// Returns [`ErrorKind::BadArgument`] if the future was already consumed
    /// by a previous `await_with` call.
    pub fn await_with<T, R, J>(
        &self,
        on_resolve: R,
        on_reject: J,
        user_data: T,
    ) -> MetaCallResult<()>
    where
        T: Clone + Send + 'static,
        R: FnOnce(Value, T) + Send + 'static,
        J: FnOnce(Value, T) + Send + 'static,
    {
        let data_for_reject = user_data.clone();
        let on_resolve: ResolveFn = Box::new(move |v| on_resolve(v, user_data));
        let on_reject: RejectFn = Box::new(move |v| on_reject(v, data_for_reject));

        let mut state = self.inner.state.lock();
        match std::mem::replace(&mut *state, State::Consumed) {
            State::Resolved(v) => {
                drop(state);
                on_resolve(v);
                Ok(())
            }
            State::Rejected(v) => {
                drop(state);
                on_reject(v);
                Ok(())
            }
            State::Consumed => {
                *state = State::Consumed;
                Err(ErrorKind::BadArgument("future already awaited".into()).into())
            }
            State::Pending { waker, parked: _ } => {
                *state = State::Pending {
                    waker,
                    parked: Some(Parked {
                        on_resolve,
                        on_reject,
                    }),
                };
                Ok(())
            }
        }
    }
}

impl FutureResolver {
    /// Resolves the paired future with `value`. A no-op if it was already
    /// settled (resolved, rejected, or consumed).
    pub fn resolve(&self, value: Value) {
        self.settle(true, value);
    }

    /// Rejects the paired future with `value`. A no-op if it was already
    /// settled.
    pub fn reject(&self, value: Value) {
        self.settle(false, value);
    }

    fn settle(&self, ok: bool, value: Value) {
        let mut state = self.inner.state.lock();
        let (waker, parked) = match std::mem::replace(&mut *state, State::Consumed) {
            State::Pending { waker, parked } => (waker, parked),
            other => {
                // Already settled or consumed: restore and ignore.
                *state = other;
                return;
            }
        };
        *state = if ok {
            State::Resolved(value.clone())
        } else {
            State::Rejected(value.clone())
        };
        drop(state);

        if let Some(w) = waker {
            w.wake();
        }
        if let Some(Parked {
            on_resolve,
            on_reject,
        }) = parked
        {
            // A continuation was parked via `await_with`; deliver now and
            // mark consumed so a subsequent poll/await_with sees Consumed.
            *self.inner.state.lock() = State::Consumed;
            if ok {
                on_resolve(value);
            } else {
                on_reject(value);
            }
        }
    }
}

impl StdFuture for MetaFuture {
    type Output = Result<Value, Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.state.lock();
        match &mut *state {
            State::Pending { waker, .. } => {
                *waker = Some(cx.waker().clone());
                Poll::Pending
            }
            State::Resolved(_) => match std::mem::replace(&mut *state, State::Consumed) {
                State::Resolved(v) => Poll::Ready(Ok(v)),
                _ => unreachable!(),
            },
            State::Rejected(_) => match std::mem::replace(&mut *state, State::Consumed) {
                State::Rejected(v) => Poll::Ready(Err(v)),
                _ => unreachable!(),
            },
            State::Consumed => {
                // Polling a consumed future again has no well-defined result;
                // surface it as a rejected null rather than panicking.
                Poll::Ready(Err(Value::Null))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_before_await_delivers_immediately() {
        let (fut, resolver) = MetaFuture::pending();
        resolver.resolve(Value::Int(32));
        let seen = Arc::new(Mutex::new(None));
        let seen2 = seen.clone();
        fut.await_with(
            move |v, _| *seen2.lock() = Some(v),
            |_, _| panic!("on_reject must not run"),
            (),
        )
        .unwrap();
        assert!(matches!(*seen.lock(), Some(Value::Int(32))));
    }

    #[test]
    fn await_after_resolve_then_second_await_errors() {
        let (fut, resolver) = MetaFuture::pending();
        resolver.resolve(Value::Int(1));
        fut.await_with(|_, _| {}, |_, _| {}, ()).unwrap();
        let err = fut.await_with(|_, _| {}, |_, _| {}, ()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::BadArgument(_)));
    }

    #[test]
    fn parked_await_fires_on_resolve() {
        let (fut, resolver) = MetaFuture::pending();
        let seen = Arc::new(Mutex::new(None));
        let seen2 = seen.clone();
        fut.await_with(
            move |v, _| *seen2.lock() = Some(v),
            |_, _| panic!("on_reject must not run"),
            (),
        )
        .unwrap();
        assert!(seen.lock().is_none());
        resolver.resolve(Value::Bool(true));
        assert!(matches!(*seen.lock(), Some(Value::Bool(true))));
    }
}
