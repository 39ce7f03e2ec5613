//! Reactive Control Flow
//!
//! Renderers that keep a region of the document in step with a cell.
//!
//! # Overview
//!
//! Each reactive renderer builds a stable `display: contents` wrapper and
//! patches the wrapper's children when its cell changes:
//!
//! - [`watch`] re-renders one child from the cell's value.
//! - [`when`] / [`when_else`] hold zero or one child chosen by a boolean.
//! - [`show`] holds its children while a boolean is true.
//! - [`for_each`] / [`for_each_keyed`] rebuild one child per list item.
//!
//! The wrapper's subscription is disposed when the wrapper leaves the
//! document. Static inputs skip the wrapper and render once.
//!
//! The `bind_*` helpers apply a value to one node's attribute, style or text
//! and keep it applied.

mod bind;
mod branch;
mod list;
mod watch;

use std::fmt;
use std::rc::Rc;

use crate::dom::Node;
use crate::lifecycle::register_cleanup;
use crate::reactive::{untrack, Computed, State, StateCell, Subscriber};

pub use bind::{bind_attribute, bind_style, bind_text, subscribe_with_cleanup};
pub use branch::{show, when, when_else};
pub use list::{for_each, for_each_keyed};
pub use watch::watch;

/// An input that is either a plain value or a cell.
pub enum MaybeReactive<T: 'static> {
    /// Render once.
    Static(T),
    /// Render now and again on every change.
    Reactive(Rc<dyn StateCell<T>>),
}

impl<T: Clone + 'static> MaybeReactive<T> {
    /// Check if the input is a cell.
    pub fn is_reactive(&self) -> bool {
        matches!(self, MaybeReactive::Reactive(_))
    }

    /// The current value, tracked when the input is a cell.
    pub fn get(&self) -> T {
        match self {
            MaybeReactive::Static(value) => value.clone(),
            MaybeReactive::Reactive(cell) => cell.get(),
        }
    }

    /// The current value, never tracked.
    pub fn get_untracked(&self) -> T {
        match self {
            MaybeReactive::Static(value) => value.clone(),
            MaybeReactive::Reactive(cell) => cell.get_untracked(),
        }
    }
}

impl<T: 'static> Clone for MaybeReactive<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            MaybeReactive::Static(value) => MaybeReactive::Static(value.clone()),
            MaybeReactive::Reactive(cell) => MaybeReactive::Reactive(cell.clone()),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for MaybeReactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaybeReactive::Static(value) => f.debug_tuple("Static").field(value).finish(),
            MaybeReactive::Reactive(_) => f.write_str("Reactive(..)"),
        }
    }
}

impl From<bool> for MaybeReactive<bool> {
    fn from(value: bool) -> Self {
        MaybeReactive::Static(value)
    }
}

impl From<&str> for MaybeReactive<String> {
    fn from(value: &str) -> Self {
        MaybeReactive::Static(value.to_owned())
    }
}

impl From<String> for MaybeReactive<String> {
    fn from(value: String) -> Self {
        MaybeReactive::Static(value)
    }
}

impl<T: 'static> From<Vec<T>> for MaybeReactive<Vec<T>> {
    fn from(items: Vec<T>) -> Self {
        MaybeReactive::Static(items)
    }
}

impl<T: Clone + PartialEq + 'static> From<State<T>> for MaybeReactive<T> {
    fn from(cell: State<T>) -> Self {
        MaybeReactive::Reactive(Rc::new(cell))
    }
}

impl<T: Clone + PartialEq + 'static> From<&State<T>> for MaybeReactive<T> {
    fn from(cell: &State<T>) -> Self {
        MaybeReactive::Reactive(Rc::new(cell.clone()))
    }
}

impl<T: Clone + PartialEq + 'static> From<Computed<T>> for MaybeReactive<T> {
    fn from(cell: Computed<T>) -> Self {
        MaybeReactive::Reactive(Rc::new(cell))
    }
}

impl<T: Clone + PartialEq + 'static> From<&Computed<T>> for MaybeReactive<T> {
    fn from(cell: &Computed<T>) -> Self {
        MaybeReactive::Reactive(Rc::new(cell.clone()))
    }
}

impl<T: 'static> From<Rc<dyn StateCell<T>>> for MaybeReactive<T> {
    fn from(cell: Rc<dyn StateCell<T>>) -> Self {
        MaybeReactive::Reactive(cell)
    }
}

/// Content for [`show`]: a fixed node, or a render function called each
/// time the content is shown.
#[derive(Clone)]
pub enum Children {
    /// The same node every time.
    Node(Node),
    /// A fresh render every time. `None` leaves the region unchanged.
    Render(Rc<dyn Fn() -> Option<Node>>),
}

impl Children {
    /// Wrap a render function.
    pub fn render<F>(f: F) -> Self
    where
        F: Fn() -> Option<Node> + 'static,
    {
        Children::Render(Rc::new(f))
    }

    fn produce(&self) -> Option<Node> {
        match self {
            Children::Node(node) => Some(node.clone()),
            Children::Render(render) => render(),
        }
    }
}

impl From<Node> for Children {
    fn from(node: Node) -> Self {
        Children::Node(node)
    }
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Children::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Children::Render(_) => f.write_str("Render(..)"),
        }
    }
}

/// Call `apply` with every new value of `cell` until `owner` is detached.
///
/// `apply` runs untracked, so reads inside it never subscribe a computation
/// that happens to be running when the cell changes. The subscription reads
/// the cell weakly: it never keeps the cell alive on its own.
pub(crate) fn follow<T, F>(cell: Rc<dyn StateCell<T>>, owner: &Node, apply: F)
where
    T: 'static,
    F: Fn(T) + 'static,
{
    let read = cell.weak_reader();
    let disposer = cell.subscribe_with(Subscriber::new(move || {
        if let Some(value) = read() {
            untrack(|| apply(value));
        }
    }));
    register_cleanup(owner, move || disposer.dispose());
}
