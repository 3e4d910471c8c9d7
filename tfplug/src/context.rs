//! Context implementation for deadlines and cancellation
//!
//! A Context is handed to every async trait method. It carries an optional
//! deadline and a cancellation signal; child contexts created with
//! [`Context::with_timeout`] are cancelled when their parent is.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};

/// Context carries request-scoped cancellation signals and deadlines
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done,
                done_tx,
            }),
        }
    }

    /// Derive a child context that is cancelled when the timeout elapses or
    /// when this context is cancelled, whichever comes first. The child never
    /// outlives the parent's deadline.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut deadline = Instant::now() + timeout;
        if let Some(parent_deadline) = self.inner.deadline {
            deadline = deadline.min(parent_deadline);
        }

        let (done_tx, done) = watch::channel(self.is_cancelled());
        let watcher_tx = done_tx.clone();
        let parent = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline) => {
                    let _ = watcher_tx.send(true);
                }
                _ = parent.cancelled() => {
                    let _ = watcher_tx.send(true);
                }
                // every handle on the child is gone
                _ = watcher_tx.closed() => {}
            }
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// True once the deadline has passed
    pub fn deadline_exceeded(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Resolves once work done on behalf of this context should stop
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    pub fn cancel(&self) {
        self.inner.done_tx.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
