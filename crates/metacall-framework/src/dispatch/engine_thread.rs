//! A dedicated OS thread a caller can marshal closures onto, used for
//! `engine-thread-only` loader affinity (spec §5: NodeJS-style event-loop
//! engines must be entered from the thread that initialised them).

use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send>;

/// Owns a thread whose only job is to run submitted closures in the order
/// they arrive, then report each result back to its submitter.
pub struct EngineThread {
    sender: Option<Sender<Job>>,
    join_handle: Option<JoinHandle<()>>,
}

impl EngineThread {
    /// Spawns the thread. The loader that requires affinity should perform
    /// its own `initialize()` via [`EngineThread::run`] so the engine's
    /// internal state is actually created on this thread.
    pub fn spawn(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let join_handle = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                for job in rx {
                    job();
                }
            })
            .expect("failed to spawn engine thread");
        Self {
            sender: Some(tx),
            join_handle: Some(join_handle),
        }
    }

    /// Runs `f` on the engine thread and awaits its result.
    pub async fn run<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let job: Job = Box::new(move || {
            let _ = tx.send(f());
        });
        self.sender
            .as_ref()
            .expect("engine thread sender dropped before shutdown")
            .send(job)
            .expect("engine thread channel closed unexpectedly");
        rx.await.expect("engine thread dropped its result sender")
    }
}

impl Drop for EngineThread {
    fn drop(&mut self) {
        // `Drop::drop` runs before fields are dropped, so the worker's
        // `for job in rx` loop won't see the channel disconnect until we
        // drop `sender` ourselves here; only then can `join` return.
        self.sender.take();
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_closures_on_the_same_thread() {
        let engine = EngineThread::spawn("test-engine");
        let first = engine.run(|| std::thread::current().id()).await;
        let second = engine.run(|| std::thread::current().id()).await;
        assert_eq!(first, second);
    }

    /// Regression test: `drop` must not deadlock. It has to close the
    /// sender itself before joining, since the worker's `for job in rx`
    /// loop only ends once every `Sender` has been dropped.
    #[tokio::test]
    async fn drop_does_not_deadlock() {
        let engine = EngineThread::spawn("drop-test-engine");
        engine.run(|| ()).await;
        tokio::task::spawn_blocking(move || drop(engine))
            .await
            .unwrap();
    }
}
