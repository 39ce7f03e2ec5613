//! Conditional rendering.

use std::rc::Rc;

use super::watch::Slot;
use super::{follow, Children, MaybeReactive};
use crate::dom::{Node, View};
use crate::reactive::untrack;

type Branch = Rc<dyn Fn() -> Option<Node>>;

/// Render `then` while `condition` holds, nothing otherwise.
pub fn when<F>(condition: impl Into<MaybeReactive<bool>>, then: F) -> View
where
    F: Fn() -> Option<Node> + 'static,
{
    branch(condition.into(), Rc::new(then), None)
}

/// Render `then` or `otherwise` depending on `condition`.
///
/// A plain `bool` renders once. A cell gets a wrapper that holds the chosen
/// branch's node and swaps it in place on every change; a branch returning
/// `None` empties the wrapper.
///
/// ```rust
/// use aram_core::control::when_else;
/// use aram_core::dom::Node;
/// use aram_core::reactive::state;
///
/// let flag = state(false);
/// let view = when_else(&flag, || Some(Node::text("A")), || Some(Node::text("B")));
/// let region = view.as_node().unwrap();
/// assert_eq!(region.text_content(), "B");
///
/// flag.set(true);
/// assert_eq!(region.text_content(), "A");
/// ```
pub fn when_else<F, G>(condition: impl Into<MaybeReactive<bool>>, then: F, otherwise: G) -> View
where
    F: Fn() -> Option<Node> + 'static,
    G: Fn() -> Option<Node> + 'static,
{
    branch(condition.into(), Rc::new(then), Some(Rc::new(otherwise)))
}

fn branch(condition: MaybeReactive<bool>, then: Branch, otherwise: Option<Branch>) -> View {
    let choose = move |flag: bool| {
        if flag {
            then()
        } else {
            otherwise.as_ref().and_then(|render| render())
        }
    };

    let cell = match condition {
        MaybeReactive::Static(flag) => return View::from(choose(flag)),
        MaybeReactive::Reactive(cell) => cell,
    };

    let container = Node::contents("span");
    let slot = Slot::new(&container);
    slot.swap(untrack(|| choose(cell.get_untracked())));

    follow(cell, &container, move |flag| slot.swap(choose(flag)));
    View::Node(container)
}

/// Hold `children` while `condition` holds.
///
/// Unlike [`when`], a render function that returns `None` while shown leaves
/// the current content in place.
pub fn show(condition: impl Into<MaybeReactive<bool>>, children: impl Into<Children>) -> View {
    let children = children.into();

    let cell = match condition.into() {
        MaybeReactive::Static(true) => return View::from(children.produce()),
        MaybeReactive::Static(false) => return View::Empty,
        MaybeReactive::Reactive(cell) => cell,
    };

    let container = Node::contents("span");
    let slot = Slot::new(&container);
    let update = move |visible: bool| {
        if !visible {
            slot.swap(None);
        } else if let Some(content) = children.produce() {
            slot.swap(Some(content));
        }
    };

    untrack(|| update(cell.get_untracked()));
    follow(cell, &container, update);
    View::Node(container)
}
