//! Computed Implementation
//!
//! A Computed is a derived cell: an effect evaluates the function and pushes
//! the result into a backing [`State`], which readers subscribe to like any
//! other cell.
//!
//! # How Computeds Work
//!
//! 1. On creation the function runs immediately (eagerly, not on first
//!    access) and its result becomes the backing value.
//!
//! 2. When a dependency changes, the function re-runs and the result is
//!    written to the backing cell.
//!
//! 3. The backing cell's equality check means downstream readers are only
//!    notified when the derived value actually changed.
//!
//! Writes from outside fail with [`Error::ComputedWrite`].

use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::rc::Rc;

use super::disposer::Disposer;
use super::effect::{effect, Effect};
use super::state::{State, StateCell};
use super::subscriber::Subscriber;
use crate::dom::Node;
use crate::error::{Error, Result};

/// Derive a cell from `f`.
///
/// Fails with [`Error::ComputedInit`] if the first evaluation panics, since
/// there is no value to start from.
///
/// ```rust
/// use aram_core::reactive::{computed, state};
///
/// let base = state(2);
/// let b = base.clone();
/// let doubled = computed(move || b.get() * 2).unwrap();
/// assert_eq!(doubled.get(), 4);
///
/// base.set(3);
/// assert_eq!(doubled.get(), 6);
/// ```
pub fn computed<T, F>(mut f: F) -> Result<Computed<T>>
where
    T: Clone + PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    let slot: Rc<RefCell<Option<State<T>>>> = Rc::new(RefCell::new(None));

    let target = slot.clone();
    let effect = effect(move || {
        let value = f();
        let existing = target.borrow().clone();
        match existing {
            Some(state) => state.set(value),
            None => *target.borrow_mut() = Some(State::new(value)),
        }
    });

    let state = slot.borrow().clone();
    match state {
        Some(state) => Ok(Computed { state, effect }),
        None => {
            effect.dispose();
            Err(Error::ComputedInit)
        }
    }
}

/// A read-only cell derived from other cells.
pub struct Computed<T: 'static> {
    state: State<T>,
    effect: Effect,
}

impl<T> Computed<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Get the current value, tracked like [`State::get`].
    pub fn get(&self) -> T {
        self.state.get()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.state.get_untracked()
    }

    /// Read the value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.state.with(f)
    }

    /// Always fails: computed values are written only by their function.
    pub fn set(&self, _value: T) -> Result<()> {
        Err(Error::ComputedWrite)
    }

    /// Call `notify` after every change of the derived value.
    pub fn subscribe<F>(&self, notify: F) -> Disposer
    where
        F: Fn() + 'static,
    {
        self.state.subscribe(notify)
    }

    /// A `span` whose text follows the derived value.
    pub fn text_node(&self) -> Node
    where
        T: Display,
    {
        self.state.text_node()
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.effect.dispose();
    }

    /// Check if [`Computed::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.effect.is_disposed()
    }

    /// Number of times the function has been evaluated.
    pub fn run_count(&self) -> usize {
        self.effect.run_count()
    }
}

impl<T> StateCell<T> for Computed<T>
where
    T: Clone + PartialEq + 'static,
{
    fn get(&self) -> T {
        Computed::get(self)
    }

    fn get_untracked(&self) -> T {
        Computed::get_untracked(self)
    }

    fn try_set(&self, value: T) -> Result<()> {
        self.set(value)
    }

    fn subscribe_with(&self, subscriber: Subscriber) -> Disposer {
        self.state.subscribe_with(subscriber)
    }

    fn weak_reader(&self) -> Box<dyn Fn() -> Option<T>> {
        StateCell::weak_reader(&self.state)
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T: Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("state", &self.state)
            .field("effect", &self.effect)
            .finish()
    }
}
