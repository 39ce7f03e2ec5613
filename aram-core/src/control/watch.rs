//! Value-driven re-rendering, and the single-child slot shared with the
//! branch renderers.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use super::{follow, MaybeReactive};
use crate::dom::{Node, WeakNode};
use crate::reactive::untrack;

/// Render `render(value)` inside a stable wrapper, replacing it whenever
/// the value changes.
///
/// ```rust
/// use aram_core::control::watch;
/// use aram_core::dom::Node;
/// use aram_core::reactive::state;
///
/// let count = state(1);
/// let region = watch(&count, |n| Node::text(format!("count: {n}")));
/// assert_eq!(region.text_content(), "count: 1");
///
/// count.set(2);
/// assert_eq!(region.text_content(), "count: 2");
/// ```
pub fn watch<T, F>(source: impl Into<MaybeReactive<T>>, render: F) -> Node
where
    T: Clone + 'static,
    F: Fn(T) -> Node + 'static,
{
    let container = Node::contents("span");
    let slot = Slot::new(&container);
    let source = source.into();

    slot.swap(Some(untrack(|| render(source.get_untracked()))));

    if let MaybeReactive::Reactive(cell) = source {
        follow(cell, &container, move |value| slot.swap(Some(render(value))));
    }
    container
}

/// A wrapper holding at most one rendered child.
#[derive(Clone)]
pub(super) struct Slot {
    inner: Rc<SlotInner>,
}

struct SlotInner {
    container: WeakNode,
    current: RefCell<Option<Node>>,
}

impl Slot {
    pub(super) fn new(container: &Node) -> Self {
        Self {
            inner: Rc::new(SlotInner {
                container: container.downgrade(),
                current: RefCell::new(None),
            }),
        }
    }

    /// Make `next` the only child: replace the current one in place, append
    /// into an empty slot, or remove the current one for `None`.
    pub(super) fn swap(&self, next: Option<Node>) {
        let Some(container) = self.inner.container.upgrade() else {
            return;
        };
        let current = self.inner.current.borrow().clone();

        match (current, next) {
            (Some(old), Some(new)) => {
                if old.ptr_eq(&new) {
                    return;
                }
                if let Err(err) = container.replace_child(&new, &old) {
                    warn!(node = %container.id(), %err, "in-place patch failed; appending");
                    if let Err(err) = container.append_child(&new) {
                        warn!(node = %container.id(), %err, "could not insert rendered node");
                        return;
                    }
                }
                *self.inner.current.borrow_mut() = Some(new);
            }
            (None, Some(new)) => {
                if let Err(err) = container.append_child(&new) {
                    warn!(node = %container.id(), %err, "could not insert rendered node");
                    return;
                }
                *self.inner.current.borrow_mut() = Some(new);
            }
            (Some(old), None) => {
                if let Err(err) = container.remove_child(&old) {
                    warn!(node = %container.id(), %err, "could not remove rendered node");
                }
                *self.inner.current.borrow_mut() = None;
            }
            (None, None) => {}
        }
    }
}
