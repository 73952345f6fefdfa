//! Observer registry for record-set changes.

use concession_types::Record;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::debug;

type Listener = Arc<dyn Fn(&[Record]) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

/// Broadcasts the entire current record set to every subscriber.
///
/// Listeners are called outside the registry lock, so a callback may
/// subscribe or unsubscribe without deadlocking.
#[derive(Clone, Default)]
pub struct Notifier {
    registry: Arc<Mutex<Registry>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`. It stays registered until the returned
    /// [`Subscription`] is explicitly unsubscribed or the notifier is cleared.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Record]) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(callback)));
        debug!("Listener {} subscribed", id);
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Calls every listener with `records`.
    pub fn notify(&self, records: &[Record]) {
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(records);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }

    /// Drops every listener.
    pub fn clear(&self) {
        lock(&self.registry).listeners.clear();
    }
}

/// Handle returned by [`Notifier::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Removes the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(shared) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = lock(&shared);
        let before = registry.listeners.len();
        registry.listeners.retain(|(id, _)| *id != self.id);
        before != registry.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(notifier: &Notifier) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let subscription = notifier.subscribe(move |_records| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, subscription)
    }

    #[test]
    fn notifies_every_listener() {
        let notifier = Notifier::new();
        let (a, _sa) = counter(&notifier);
        let (b, _sb) = counter(&notifier);

        notifier.notify(&[]);
        notifier.notify(&[]);

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let notifier = Notifier::new();
        let (a, sa) = counter(&notifier);
        let (b, _sb) = counter(&notifier);

        assert!(sa.unsubscribe());
        notifier.notify(&[]);

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.listener_count(), 1);
    }

    #[test]
    fn unsubscribe_after_clear_reports_false() {
        let notifier = Notifier::new();
        let (_, subscription) = counter(&notifier);
        notifier.clear();
        assert!(!subscription.unsubscribe());
    }

    #[test]
    fn unsubscribe_after_notifier_dropped() {
        let notifier = Notifier::new();
        let (_, subscription) = counter(&notifier);
        drop(notifier);
        assert!(!subscription.unsubscribe());
    }

    #[test]
    fn listener_may_subscribe_during_notify() {
        let notifier = Notifier::new();
        let inner = notifier.clone();
        let _s = notifier.subscribe(move |_| {
            let _ = inner.subscribe(|_| {});
        });

        notifier.notify(&[]);
        assert_eq!(notifier.listener_count(), 2);
    }
}
