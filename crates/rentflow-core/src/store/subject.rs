// ── Observer ──
//
// Synchronous publish/subscribe. Listeners run on the notifying thread,
// in subscription order, after the listener table lock is released so a
// listener may subscribe or unsubscribe from inside its callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use indexmap::IndexMap;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: AtomicU64,
    table: Mutex<IndexMap<u64, Listener<T>>>,
}

/// A value stream that pushes every published value to its listeners.
pub struct Subject<T> {
    inner: Arc<Listeners<T>>,
}

impl<T: 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Listeners {
                next_id: AtomicU64::new(0),
                table: Mutex::new(IndexMap::new()),
            }),
        }
    }

    /// Register a listener. It stays registered until
    /// [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(listener));

        let weak: Weak<Listeners<T>> = Arc::downgrade(&self.inner);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .table
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .shift_remove(&id);
                }
            })),
        }
    }

    /// Invoke every listener with `value`.
    pub(crate) fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(value);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T: 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`Subject::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn listeners_receive_values_in_order() {
        let subject: Subject<u32> = Subject::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let a = Arc::clone(&seen);
        let _s1 = subject.subscribe(move |v| a.lock().unwrap_or_else(PoisonError::into_inner).push(("a", *v)));
        let b = Arc::clone(&seen);
        let _s2 = subject.subscribe(move |v| b.lock().unwrap_or_else(PoisonError::into_inner).push(("b", *v)));

        subject.notify(&7);
        let seen = seen.lock().unwrap_or_else(PoisonError::into_inner).clone();
        assert_eq!(seen, vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let subject: Subject<()> = Subject::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sub = subject.subscribe(move |()| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        subject.notify(&());
        sub.unsubscribe();
        subject.notify(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(subject.listener_count(), 0);
    }

    #[test]
    fn dropping_handle_keeps_listener() {
        let subject: Subject<()> = Subject::new();
        drop(subject.subscribe(|()| {}));
        assert_eq!(subject.listener_count(), 1);
    }

    #[test]
    fn unsubscribe_after_subject_dropped_is_harmless() {
        let subject: Subject<()> = Subject::new();
        let sub = subject.subscribe(|()| {});
        drop(subject);
        sub.unsubscribe();
    }
}
