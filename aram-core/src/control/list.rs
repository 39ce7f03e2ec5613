//! List rendering.
//!
//! A reactive list is rebuilt in full on every change: the wrapper's
//! children are removed and one node is rendered per current item, in order.
//! Nodes are not carried over between renders, even for unchanged items.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::warn;

use super::{follow, MaybeReactive};
use crate::config::is_dev_mode;
use crate::dom::{Node, View};
use crate::reactive::untrack;

/// Render one node per item.
///
/// A plain `Vec` renders once into [`View::List`]. A cell renders into a
/// `display: contents` wrapper that is rebuilt whenever the list changes.
///
/// ```rust
/// use aram_core::control::for_each;
/// use aram_core::dom::Node;
/// use aram_core::reactive::state;
///
/// let list = state(vec![1, 2, 3]);
/// let view = for_each(&list, |n, _| Node::text(n.to_string()));
/// let region = view.as_node().unwrap();
/// assert_eq!(region.text_content(), "123");
///
/// list.set(vec![3, 1]);
/// assert_eq!(region.text_content(), "31");
/// ```
pub fn for_each<T, F>(items: impl Into<MaybeReactive<Vec<T>>>, render: F) -> View
where
    T: Clone + 'static,
    F: Fn(&T, usize) -> Node + 'static,
{
    list(items.into(), render, |_: &T, index| index)
}

/// [`for_each`] with a key per item.
///
/// The list is still rebuilt in full on every change; keys do not preserve
/// nodes across renders. They are computed on every rebuild, and a key that
/// repeats within one render is reported as a warning in dev mode. Keyed
/// reconciliation may use them later without changing this signature.
pub fn for_each_keyed<T, K, F, G>(
    items: impl Into<MaybeReactive<Vec<T>>>,
    render: F,
    key: G,
) -> View
where
    T: Clone + 'static,
    K: Hash + Eq + Debug,
    F: Fn(&T, usize) -> Node + 'static,
    G: Fn(&T, usize) -> K + 'static,
{
    list(items.into(), render, key)
}

fn list<T, K, F, G>(items: MaybeReactive<Vec<T>>, render: F, key: G) -> View
where
    T: Clone + 'static,
    K: Hash + Eq + Debug,
    F: Fn(&T, usize) -> Node + 'static,
    G: Fn(&T, usize) -> K + 'static,
{
    let cell = match items {
        MaybeReactive::Static(items) => {
            return View::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| render(item, index))
                    .collect(),
            )
        }
        MaybeReactive::Reactive(cell) => cell,
    };

    let container = Node::contents("div");
    let target = container.downgrade();
    let rebuild = move |items: Vec<T>| {
        let Some(container) = target.upgrade() else {
            return;
        };
        container.clear_children();

        let check_keys = is_dev_mode();
        let mut seen = HashSet::new();
        for (index, item) in items.iter().enumerate() {
            let item_key = key(item, index);
            if check_keys {
                if seen.contains(&item_key) {
                    warn!(key = ?item_key, index, "duplicate key in list");
                } else {
                    seen.insert(item_key);
                }
            }

            let node = render(item, index);
            if let Err(err) = container.append_child(&node) {
                warn!(node = %container.id(), index, %err, "could not insert list item");
            }
        }
    };

    untrack(|| rebuild(cell.get_untracked()));
    follow(cell, &container, rebuild);
    View::Node(container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::reactive::state;

    fn texts(node: &Node) -> Vec<String> {
        node.children().iter().map(Node::text_content).collect()
    }

    #[test]
    fn static_list_maps_eagerly() {
        let view = for_each(vec!["a", "b"], |s, i| Node::text(format!("{i}:{s}")));
        match view {
            View::List(nodes) => {
                let texts: Vec<_> = nodes.iter().map(Node::text_content).collect();
                assert_eq!(texts, vec!["0:a", "1:b"]);
            }
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn reactive_list_is_rebuilt_in_full() {
        let list = state(vec![1, 2, 3]);
        let view = for_each(&list, |n, _| Node::text(n.to_string()));
        let region = view.as_node().unwrap().clone();
        assert_eq!(texts(&region), vec!["1", "2", "3"]);
        let old = region.children();

        list.set(vec![3, 1]);
        assert_eq!(texts(&region), vec!["3", "1"]);
        assert!(region.children().iter().all(|node| !old.contains(node)));
    }

    #[test]
    fn keyed_list_still_rebuilds() {
        let list = state(vec!["x".to_string(), "y".to_string()]);
        let view = for_each_keyed(
            &list,
            |s, _| Node::text(s.clone()),
            |s, _| s.clone(),
        );
        let region = view.as_node().unwrap().clone();
        let before = region.children();

        list.set(vec!["x".to_string(), "y".to_string(), "x".to_string()]);
        assert_eq!(texts(&region), vec!["x", "y", "x"]);
        assert!(!region.children().contains(&before[0]));
    }

    #[test]
    fn empty_list_clears_the_region() {
        let list = state(vec![1]);
        let view = for_each(&list, |n, _| Node::text(n.to_string()));
        let region = view.as_node().unwrap().clone();

        list.set(Vec::new());
        assert_eq!(region.child_count(), 0);
    }

    #[test]
    fn list_subscription_ends_on_detach() {
        let list = state(vec![1]);
        let view = for_each(&list, |n, _| Node::text(n.to_string()));
        let region = view.as_node().unwrap().clone();
        Document::body().append_child(&region).unwrap();
        Document::run_until_idle();

        Document::body().remove_child(&region).unwrap();
        Document::run_until_idle();
        assert_eq!(list.subscriber_count(), 0);
    }
}
