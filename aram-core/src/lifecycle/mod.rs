//! Node Lifecycle
//!
//! Ties callbacks to a node's presence in the live tree.
//!
//! # Overview
//!
//! - Mount callbacks run when their node is attached to the document, once.
//!   A teardown returned by a mount callback runs when the node is detached.
//! - Cleanup callbacks run when their node is detached, once.
//! - Attach and detach are observed asynchronously: callbacks fire at the
//!   next [`Document::run_until_idle`] checkpoint, after the mutation.
//! - Only the inserted or removed node itself is reported. Removing a
//!   subtree does not run cleanups registered on its descendants.
//! - Only elements are reported. Callbacks registered on a text node never
//!   run.
//!
//! [`on_mount`] and [`on_cleanup`] register against the node currently being
//! built, set with [`with_current_node`]. Without one, `on_mount` defers its
//! callback to the next microtask and runs it unconditionally, and
//! `on_cleanup` does nothing.
//!
//! [`Document::run_until_idle`]: crate::dom::Document::run_until_idle

mod registry;

use std::cell::RefCell;

use tracing::trace;

use crate::dom::{Document, Node};
use crate::reactive::IntoCleanup;

use registry::registry;

thread_local! {
    static CURRENT_NODE: RefCell<Vec<Node>> = const { RefCell::new(Vec::new()) };
}

/// Pops the current-node stack when dropped.
struct NodeScope;

impl Drop for NodeScope {
    fn drop(&mut self) {
        CURRENT_NODE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run `f` with `node` as the registration target for [`on_mount`] and
/// [`on_cleanup`]. Nested calls restore the outer node on return.
pub fn with_current_node<R>(node: &Node, f: impl FnOnce() -> R) -> R {
    CURRENT_NODE.with(|stack| stack.borrow_mut().push(node.clone()));
    let _scope = NodeScope;
    f()
}

/// The node currently being built, if any.
pub fn current_node() -> Option<Node> {
    CURRENT_NODE.with(|stack| stack.borrow().last().cloned())
}

/// Run `f` when the current node is attached.
///
/// If `f` returns a teardown it runs when the node is detached. With no
/// current node, `f` runs at the next microtask and its teardown is dropped.
pub fn on_mount<F, R>(f: F)
where
    F: FnOnce() -> R + 'static,
    R: IntoCleanup,
{
    let registry = registry();
    match current_node() {
        Some(node) => registry.push_mount(node.id(), Box::new(move || f().into_cleanup())),
        None => Document::queue_microtask(move || {
            drop(f().into_cleanup());
        }),
    }
}

/// Run `f` when the current node is detached. Does nothing with no current
/// node.
pub fn on_cleanup<F>(f: F)
where
    F: FnOnce() + 'static,
{
    let registry = registry();
    match current_node() {
        Some(node) => registry.push_cleanup(node.id(), Box::new(f)),
        None => trace!("on_cleanup without a current node ignored"),
    }
}

/// Run `f` when `node` is detached, regardless of the current node.
pub fn register_cleanup<F>(node: &Node, f: F)
where
    F: FnOnce() + 'static,
{
    registry().push_cleanup(node.id(), Box::new(f));
}

/// Mount callbacks still waiting for `node` to be attached.
pub fn pending_mount_count(node: &Node) -> usize {
    registry().mount_count(node.id())
}

/// Cleanup callbacks still waiting for `node` to be detached.
pub fn pending_cleanup_count(node: &Node) -> usize {
    registry().cleanup_count(node.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{cleanup, Cleanup};
    use std::cell::Cell;
    use std::rc::Rc;

    fn log() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn mount_then_teardown_on_detach() {
        let events = log();
        let node = Node::element("div");

        let e = events.clone();
        with_current_node(&node, || {
            on_mount(move || {
                e.borrow_mut().push("mount");
                let e = e.clone();
                cleanup(move || e.borrow_mut().push("teardown"))
            });
        });
        assert_eq!(pending_mount_count(&node), 1);

        Document::run_until_idle();
        assert!(events.borrow().is_empty());

        Document::body().append_child(&node).unwrap();
        assert!(events.borrow().is_empty());
        Document::run_until_idle();
        assert_eq!(*events.borrow(), vec!["mount"]);
        assert_eq!(pending_cleanup_count(&node), 1);

        Document::body().remove_child(&node).unwrap();
        Document::run_until_idle();
        assert_eq!(*events.borrow(), vec!["mount", "teardown"]);

        Document::body().append_child(&node).unwrap();
        Document::body().remove_child(&node).unwrap();
        Document::run_until_idle();
        assert_eq!(*events.borrow(), vec!["mount", "teardown"]);
    }

    #[test]
    fn on_cleanup_runs_on_detach() {
        let ran = Rc::new(Cell::new(0));
        let node = Node::element("section");

        let r = ran.clone();
        with_current_node(&node, || on_cleanup(move || r.set(r.get() + 1)));

        Document::body().append_child(&node).unwrap();
        Document::run_until_idle();
        assert_eq!(ran.get(), 0);

        Document::body().remove_child(&node).unwrap();
        Document::run_until_idle();
        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn without_current_node() {
        let mounted = Rc::new(Cell::new(false));
        let m = mounted.clone();
        on_mount(move || m.set(true));
        on_cleanup(|| panic!("never registered"));

        assert!(!mounted.get());
        Document::run_until_idle();
        assert!(mounted.get());
    }

    #[test]
    fn nested_scopes_restore_the_outer_node() {
        let outer = Node::element("div");
        let inner = Node::element("span");

        with_current_node(&outer, || {
            with_current_node(&inner, || {
                assert_eq!(current_node(), Some(inner.clone()));
            });
            assert_eq!(current_node(), Some(outer.clone()));
            on_cleanup(|| {});
        });

        assert_eq!(current_node(), None);
        assert_eq!(pending_cleanup_count(&outer), 1);
        assert_eq!(pending_cleanup_count(&inner), 0);
    }

    #[test]
    fn descendants_are_not_cleaned_up() {
        let parent = Node::element("div");
        let child = Node::element("span");
        parent.append_child(&child).unwrap();

        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        register_cleanup(&child, move || r.set(true));

        Document::body().append_child(&parent).unwrap();
        Document::run_until_idle();
        Document::body().remove_child(&parent).unwrap();
        Document::run_until_idle();

        assert!(!ran.get());
        assert_eq!(pending_cleanup_count(&child), 1);
    }

    #[test]
    fn moving_between_live_parents_is_not_a_detach() {
        let a = Node::element("div");
        let b = Node::element("div");
        let moved = Node::element("p");
        Document::body().append_child(&a).unwrap();
        Document::body().append_child(&b).unwrap();
        a.append_child(&moved).unwrap();
        Document::run_until_idle();

        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        register_cleanup(&moved, move || r.set(true));

        b.append_child(&moved).unwrap();
        Document::run_until_idle();
        assert!(!ran.get());
    }

    #[test]
    fn mount_without_teardown() {
        let node = Node::element("div");
        with_current_node(&node, || on_mount(|| None::<Cleanup>));

        Document::body().append_child(&node).unwrap();
        Document::run_until_idle();
        assert_eq!(pending_mount_count(&node), 0);
        assert_eq!(pending_cleanup_count(&node), 0);
    }
}
