// ── Timer registry ──
//
// Delayed tasks tracked by handle. Each registry is bound to a
// cancellation token; cancelling it (or calling `cancel_all`) stops every
// timer that has not fired yet.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Boxed task run when a timer fires.
pub(crate) type TimerTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub(crate) struct TimerRegistry {
    next_key: AtomicU64,
    /// `None` until the spawned task's handle is stored.
    handles: Arc<DashMap<u64, Option<JoinHandle<()>>>>,
    cancel: CancellationToken,
}

impl TimerRegistry {
    pub(crate) fn new(parent: &CancellationToken) -> Self {
        Self {
            next_key: AtomicU64::new(0),
            handles: Arc::new(DashMap::new()),
            cancel: parent.child_token(),
        }
    }

    /// Run `task` after `delay`. The timer leaves the registry the moment
    /// it fires, before `task` starts.
    pub(crate) fn schedule(&self, delay: Duration, task: TimerTask) {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.handles.insert(key, None);

        let handles = Arc::clone(&self.handles);
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    handles.remove(&key);
                }
                () = tokio::time::sleep(delay) => {
                    handles.remove(&key);
                    task.await;
                }
            }
        });

        // The task may already have fired and removed its entry.
        if let Some(mut slot) = self.handles.get_mut(&key) {
            *slot = Some(handle);
        }
    }

    /// Timers scheduled but not yet fired.
    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    /// Abort every pending timer. The registry stays usable.
    pub(crate) fn cancel_all(&self) {
        let keys: Vec<u64> = self.handles.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, Some(handle))) = self.handles.remove(&key) {
                handle.abort();
            }
        }
    }

    /// Cancel every timer and refuse to run any scheduled later.
    pub(crate) fn shutdown(&self) {
        self.cancel.cancel();
        self.cancel_all();
    }
}
