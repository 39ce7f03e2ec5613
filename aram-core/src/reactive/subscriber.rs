//! Subscriber types for the reactive system.
//!
//! A Subscriber is any zero-argument callback a state cell notifies on
//! change: an effect's re-run trigger, a control-flow renderer's update, or a
//! plain `subscribe` callback. Its identity is its [`SubscriberId`]; the same
//! subscriber registered twice on one cell is stored once.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A notification callback with a stable identity.
///
/// Cloning shares the callback and keeps the identity.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    notify: Rc<dyn Fn()>,
}

impl Subscriber {
    /// Create a new subscriber with the given notification callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            id: SubscriberId::new(),
            notify: Rc::new(notify),
        }
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Notify the subscriber that one of its dependencies changed.
    pub fn notify(&self) {
        (self.notify)();
    }

    /// A handle that does not keep the callback alive.
    pub fn downgrade(&self) -> WeakSubscriber {
        WeakSubscriber {
            id: self.id,
            notify: Rc::downgrade(&self.notify),
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Subscriber").field(&self.id).finish()
    }
}

/// Non-owning counterpart of [`Subscriber`].
#[derive(Clone)]
pub struct WeakSubscriber {
    id: SubscriberId,
    notify: Weak<dyn Fn()>,
}

impl WeakSubscriber {
    /// The subscriber's ID, whether or not it is still alive.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Recover the subscriber if its callback is still alive.
    pub fn upgrade(&self) -> Option<Subscriber> {
        self.notify.upgrade().map(|notify| Subscriber {
            id: self.id,
            notify,
        })
    }
}

impl fmt::Debug for WeakSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakSubscriber").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_notify_calls_callback() {
        let called = Rc::new(Cell::new(false));
        let called_clone = called.clone();

        let subscriber = Subscriber::new(move || called_clone.set(true));

        assert!(!called.get());
        subscriber.notify();
        assert!(called.get());
    }

    #[test]
    fn weak_subscriber_dies_with_its_callback() {
        let subscriber = Subscriber::new(|| {});
        let weak = subscriber.downgrade();
        assert_eq!(weak.upgrade().map(|s| s.id()), Some(subscriber.id()));

        drop(subscriber);
        assert!(weak.upgrade().is_none());
    }
}
