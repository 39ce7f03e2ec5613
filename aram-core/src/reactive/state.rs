//! State Implementation
//!
//! A State is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How State Works
//!
//! 1. When a state is read within a reactive context (computed/effect), the
//!    state registers that context as a subscriber and records itself in the
//!    context's read-set.
//!
//! 2. When a state's value changes, every subscriber is routed through the
//!    [`Runtime`] in the order it subscribed.
//!
//! 3. Setting a value equal to the current one does nothing.
//!
//! # Memory Layout
//!
//! Each state consists of:
//! - A unique ID (8 bytes)
//! - The value
//! - An insertion-ordered map of subscribers (grows with number of dependents)

use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::warn;

use super::context::{ReactiveContext, Source};
use super::disposer::Disposer;
use super::guard::is_pollution_payload;
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};
use crate::dom::Node;
use crate::error::Result;
use crate::lifecycle::register_cleanup;

/// Counter for generating unique state IDs.
static STATE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique state ID.
fn next_state_id() -> u64 {
    STATE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The read/subscribe surface shared by [`State`] and
/// [`Computed`](super::Computed).
///
/// Control-flow renderers and bindings take `Rc<dyn StateCell<T>>`, so they
/// accept either kind of cell.
pub trait StateCell<T> {
    /// Read the value, registering the running computation as a dependent.
    fn get(&self) -> T;

    /// Read the value without registering anything.
    fn get_untracked(&self) -> T;

    /// Write the value. Fails with [`Error::ComputedWrite`](crate::Error::ComputedWrite)
    /// on derived cells.
    fn try_set(&self, value: T) -> Result<()>;

    /// Register an existing subscriber. Registering the same subscriber twice
    /// keeps one entry.
    fn subscribe_with(&self, subscriber: Subscriber) -> Disposer;

    /// An untracked reader that does not keep the cell alive. It returns
    /// `None` once the cell is gone.
    fn weak_reader(&self) -> Box<dyn Fn() -> Option<T>>;
}

/// A reactive state cell holding a value of type T.
///
/// Cloning a `State` clones the handle; both handles refer to the same cell.
///
/// # Example
///
/// ```rust
/// use aram_core::reactive::state;
///
/// let count = state(0);
/// count.update(|n| n + 1);
/// assert_eq!(count.get(), 1);
/// ```
pub struct State<T: 'static> {
    inner: Rc<StateInner<T>>,
}

struct StateInner<T> {
    /// Unique identifier for this state.
    id: u64,

    /// The current value.
    value: RefCell<T>,

    /// Subscribers in the order they were added.
    subscribers: RefCell<IndexMap<SubscriberId, Subscriber>>,
}

impl<T> Source for StateInner<T> {
    fn unsubscribe(&self, subscriber: SubscriberId) {
        self.subscribers.borrow_mut().shift_remove(&subscriber);
    }

    fn is_subscribed(&self, subscriber: SubscriberId) -> bool {
        self.subscribers.borrow().contains_key(&subscriber)
    }
}

/// Create a state cell.
pub fn state<T>(initial: T) -> State<T>
where
    T: Clone + PartialEq + 'static,
{
    State::new(initial)
}

impl<T> State<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new state with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(StateInner {
                id: next_state_id(),
                value: RefCell::new(value),
                subscribers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Get the state's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Check if two handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the value by reference. Tracked like [`State::get`].
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Set a new value and notify subscribers.
    ///
    /// Equal values and JSON objects carrying a `__proto__` or `prototype`
    /// key are ignored.
    pub fn set(&self, value: T) {
        if is_pollution_payload(&value) {
            warn!(source = self.inner.id, "blocked prototype pollution attempt");
            return;
        }

        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }

        self.notify_subscribers();
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.inner.value.borrow();
            f(&current)
        };
        self.set(next);
    }

    /// Call `notify` after every change until the returned disposer runs.
    ///
    /// Each call registers a distinct subscription, even for the same closure.
    pub fn subscribe<F>(&self, notify: F) -> Disposer
    where
        F: Fn() + 'static,
    {
        self.subscribe_with(Subscriber::new(notify))
    }

    /// Register an existing subscriber.
    pub fn subscribe_with(&self, subscriber: Subscriber) -> Disposer {
        let id = subscriber.id();
        self.inner
            .subscribers
            .borrow_mut()
            .entry(id)
            .or_insert(subscriber);
        Disposer::new(self.source(), id)
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// A `span` whose text follows the value.
    ///
    /// The update subscription is disposed when the span leaves the document.
    pub fn text_node(&self) -> Node
    where
        T: Display,
    {
        let span = Node::element("span");
        span.set_text_content(self.get_untracked().to_string());

        let target = span.downgrade();
        let cell = Rc::downgrade(&self.inner);
        let disposer = self.subscribe(move || {
            if let (Some(span), Some(cell)) = (target.upgrade(), cell.upgrade()) {
                span.set_text_content(cell.value.borrow().to_string());
            }
        });
        register_cleanup(&span, move || disposer.dispose());
        span
    }

    fn source(&self) -> Weak<dyn Source> {
        Rc::downgrade(&self.inner) as Weak<dyn Source>
    }

    fn track(&self) {
        if let Some(subscriber) = ReactiveContext::current_subscriber() {
            self.inner
                .subscribers
                .borrow_mut()
                .entry(subscriber.id())
                .or_insert(subscriber);
            ReactiveContext::track_dependency(self.inner.id, self.source());
        }
    }

    fn notify_subscribers(&self) {
        let source = self.source();
        let snapshot: SmallVec<[Subscriber; 4]> =
            self.inner.subscribers.borrow().values().cloned().collect();

        for subscriber in snapshot {
            // Skip subscribers disposed by an earlier one in this loop.
            let live = self
                .inner
                .subscribers
                .borrow()
                .contains_key(&subscriber.id());
            if live {
                Runtime::schedule_from(&source, &subscriber);
            }
        }
    }
}

impl<T> StateCell<T> for State<T>
where
    T: Clone + PartialEq + 'static,
{
    fn get(&self) -> T {
        State::get(self)
    }

    fn get_untracked(&self) -> T {
        State::get_untracked(self)
    }

    fn try_set(&self, value: T) -> Result<()> {
        self.set(value);
        Ok(())
    }

    fn subscribe_with(&self, subscriber: Subscriber) -> Disposer {
        State::subscribe_with(self, subscriber)
    }

    fn weak_reader(&self) -> Box<dyn Fn() -> Option<T>> {
        let cell = Rc::downgrade(&self.inner);
        Box::new(move || cell.upgrade().map(|cell| cell.value.borrow().clone()))
    }
}

impl<T: 'static> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Debug + 'static> Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}
