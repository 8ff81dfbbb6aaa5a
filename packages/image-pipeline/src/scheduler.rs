//! Bounded FIFO admission control for outbound extraction calls.
//!
//! One [`RequestScheduler`] is built at process start and cloned into every
//! caller; clones share the same queue and active count. Work is admitted in
//! submission order and at most `max_concurrent` operations run at once.
//! Completion order is whatever order the operations finish in.
//!
//! # Usage
//!
//! ```rust,ignore
//! let scheduler = RequestScheduler::default();
//! let images = scheduler
//!     .submit(move || async move { extractor.extract(&url, true).await })
//!     .await??;
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::SchedulerError;

/// Default cap on concurrently running operations.
pub const MAX_CONCURRENT: usize = 20;

type Execute = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A submitted operation waiting for a slot.
///
/// The operation's output reaches the caller through the oneshot captured
/// inside `execute`, not through this record.
struct QueueItem {
    id: Uuid,
    execute: Execute,
}

struct SchedulerState {
    active: usize,
    pending: VecDeque<QueueItem>,
}

/// Point-in-time view of the queue.
///
/// Advisory only: it can be stale by the time it is read, so it is meant for
/// progress display and never for a second admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub active: usize,
    pub pending: usize,
    pub max_concurrent: usize,
}

impl QueueStatus {
    pub fn is_idle(&self) -> bool {
        self.active == 0 && self.pending == 0
    }
}

struct Inner {
    max_concurrent: usize,
    state: Mutex<SchedulerState>,
    status_tx: watch::Sender<QueueStatus>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, state: &SchedulerState) -> QueueStatus {
        QueueStatus {
            active: state.active,
            pending: state.pending.len(),
            max_concurrent: self.max_concurrent,
        }
    }

    fn publish(&self, state: &SchedulerState) {
        let status = self.snapshot(state);
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

/// Process-wide admission gate. Cheap to clone.
#[derive(Clone)]
pub struct RequestScheduler {
    inner: Arc<Inner>,
}

impl Default for RequestScheduler {
    fn default() -> Self {
        Self::new(MAX_CONCURRENT)
    }
}

impl std::fmt::Debug for RequestScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScheduler")
            .field("status", &self.status())
            .finish()
    }
}

impl RequestScheduler {
    /// Create a scheduler admitting at most `max_concurrent` operations (minimum 1).
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let (status_tx, _) = watch::channel(QueueStatus {
            active: 0,
            pending: 0,
            max_concurrent,
        });
        Self {
            inner: Arc::new(Inner {
                max_concurrent,
                state: Mutex::new(SchedulerState {
                    active: 0,
                    pending: VecDeque::new(),
                }),
                status_tx,
            }),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Current active count and queue length.
    pub fn status(&self) -> QueueStatus {
        let state = self.inner.lock_state();
        self.inner.snapshot(&state)
    }

    /// Observe queue changes. Dropping or calling
    /// [`QueueSubscription::unsubscribe`] ends the subscription.
    pub fn subscribe(&self) -> QueueSubscription {
        QueueSubscription {
            rx: self.inner.status_tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.status_tx.receiver_count()
    }

    /// Queue `operation` and return a future for its output.
    ///
    /// The operation is enqueued before this returns, so admission order is
    /// the order of `submit` calls even if the returned futures are polled
    /// later or never. The output is passed through untouched: an operation
    /// returning `Result` settles the caller with that same `Result`.
    pub fn submit<F, Fut, T>(
        &self,
        operation: F,
    ) -> impl Future<Output = Result<T, SchedulerError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();

        let execute: Execute = Box::new(move || {
            async move {
                let output = operation().await;
                // Caller may have stopped listening
                let _ = tx.send(output);
            }
            .boxed()
        });

        {
            let mut state = self.inner.lock_state();
            state.pending.push_back(QueueItem { id, execute });
            trace!(%id, pending = state.pending.len(), "Operation queued");
        }
        self.dispatch();

        async move { rx.await.map_err(|_| SchedulerError::Abandoned { id }) }
    }

    /// Fill free slots from the head of the queue.
    fn dispatch(&self) {
        let Ok(handle) = Handle::try_current() else {
            warn!("No tokio runtime available; queued operations stay pending");
            return;
        };

        let ready: Vec<QueueItem> = {
            let mut state = self.inner.lock_state();
            let mut ready = Vec::new();
            while state.active < self.inner.max_concurrent {
                let Some(item) = state.pending.pop_front() else {
                    break;
                };
                state.active += 1;
                ready.push(item);
            }
            self.inner.publish(&state);
            if !ready.is_empty() {
                debug!(
                    dispatched = ready.len(),
                    active = state.active,
                    pending = state.pending.len(),
                    "Dispatched queued operations"
                );
            }
            ready
        };

        for item in ready {
            let slot = Slot {
                scheduler: self.clone(),
                id: item.id,
            };
            handle.spawn(async move {
                // Released on every exit path, panics included
                let _slot = slot;
                (item.execute)().await;
            });
        }
    }

    fn release(&self, id: Uuid) {
        {
            let mut state = self.inner.lock_state();
            state.active = state.active.saturating_sub(1);
            trace!(%id, active = state.active, "Operation settled");
        }
        self.dispatch();
    }
}

/// An occupied concurrency slot; frees itself on drop.
struct Slot {
    scheduler: RequestScheduler,
    id: Uuid,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.scheduler.release(self.id);
    }
}

/// Subscription handle for queue progress.
pub struct QueueSubscription {
    rx: watch::Receiver<QueueStatus>,
}

impl QueueSubscription {
    /// Latest published status.
    pub fn current(&self) -> QueueStatus {
        *self.rx.borrow()
    }

    /// Wait for the next change. `None` once the scheduler is gone.
    pub async fn changed(&mut self) -> Option<QueueStatus> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Stream of statuses, starting with the current one.
    pub fn into_stream(self) -> WatchStream<QueueStatus> {
        WatchStream::new(self.rx)
    }

    pub fn unsubscribe(self) {}
}
