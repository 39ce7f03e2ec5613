//! Disposal handles and teardown callbacks.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::Source;
use super::subscriber::SubscriberId;

/// A teardown callback, run at most once.
pub type Cleanup = Box<dyn FnOnce()>;

/// Box a closure as a [`Cleanup`].
pub fn cleanup<F>(f: F) -> Cleanup
where
    F: FnOnce() + 'static,
{
    Box::new(f)
}

/// Values an effect body or mount callback may return: nothing, or a
/// teardown to run later.
pub trait IntoCleanup {
    /// Convert into an optional teardown.
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

impl IntoCleanup for Disposer {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(Box::new(move || self.dispose()))
    }
}

/// Removes one subscription from one cell.
///
/// Disposing is idempotent, and a disposer outliving its cell is harmless.
/// Clones share the disposed flag. Dropping a disposer does not dispose.
#[derive(Clone)]
pub struct Disposer {
    inner: Rc<DisposerInner>,
}

struct DisposerInner {
    source: Weak<dyn Source>,
    subscriber: SubscriberId,
    disposed: Cell<bool>,
}

impl Disposer {
    pub(crate) fn new(source: Weak<dyn Source>, subscriber: SubscriberId) -> Self {
        Self {
            inner: Rc::new(DisposerInner {
                source,
                subscriber,
                disposed: Cell::new(false),
            }),
        }
    }

    /// Remove the subscription. Later calls do nothing.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        if let Some(source) = self.inner.source.upgrade() {
            source.unsubscribe(self.inner.subscriber);
        }
    }

    /// Check if [`Disposer::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// The subscription this disposer removes.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("subscriber", &self.inner.subscriber)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
