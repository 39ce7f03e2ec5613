//! One-value bindings onto an existing node.

use std::fmt::Display;
use std::rc::Rc;

use super::{follow, MaybeReactive};
use crate::dom::Node;

/// Keep attribute `name` of `node` equal to `value`.
pub fn bind_attribute<T>(value: impl Into<MaybeReactive<T>>, node: &Node, name: &str)
where
    T: Clone + Display + 'static,
{
    let name = name.to_owned();
    bind(value.into(), node, move |node, value| {
        node.set_attribute(name.as_str(), value.to_string())
    });
}

/// Keep inline style `property` of `node` equal to `value`.
pub fn bind_style<T>(value: impl Into<MaybeReactive<T>>, node: &Node, property: &str)
where
    T: Clone + Display + 'static,
{
    let property = property.to_owned();
    bind(value.into(), node, move |node, value| {
        node.set_style(property.as_str(), value.to_string())
    });
}

/// Keep the text of `node` equal to `value`.
pub fn bind_text<T>(value: impl Into<MaybeReactive<T>>, node: &Node)
where
    T: Clone + Display + 'static,
{
    bind(value.into(), node, |node, value| {
        node.set_text_content(value.to_string())
    });
}

/// Call `callback` with the current value now and with every new value
/// until `node` is detached.
pub fn subscribe_with_cleanup<T, F>(value: impl Into<MaybeReactive<T>>, node: &Node, callback: F)
where
    T: Clone + 'static,
    F: Fn(T) + 'static,
{
    let value = value.into();
    let callback = Rc::new(callback);
    if let MaybeReactive::Reactive(cell) = &value {
        let notify = callback.clone();
        follow(cell.clone(), node, move |next| notify(next));
    }
    callback(value.get_untracked());
}

fn bind<T, F>(value: MaybeReactive<T>, node: &Node, apply: F)
where
    T: Clone + 'static,
    F: Fn(&Node, T) + 'static,
{
    apply(node, value.get_untracked());

    if let MaybeReactive::Reactive(cell) = value {
        let target = node.downgrade();
        follow(cell, node, move |next| {
            if let Some(node) = target.upgrade() {
                apply(&node, next);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::reactive::state;
    use std::cell::RefCell;

    #[test]
    fn static_values_apply_once() {
        let node = Node::element("a");
        bind_attribute("/home", &node, "href");
        bind_style(MaybeReactive::Static(12), &node, "z-index");
        bind_text("Home", &node);

        assert_eq!(node.attribute("href").as_deref(), Some("/home"));
        assert_eq!(node.style("z-index").as_deref(), Some("12"));
        assert_eq!(node.text_content(), "Home");
    }

    #[test]
    fn reactive_values_follow_the_cell() {
        let color = state("red".to_string());
        let node = Node::element("div");
        bind_style(&color, &node, "color");
        bind_attribute(&color, &node, "data-color");

        color.set("blue".to_string());
        assert_eq!(node.style("color").as_deref(), Some("blue"));
        assert_eq!(node.attribute("data-color").as_deref(), Some("blue"));
    }

    #[test]
    fn bindings_end_on_detach() {
        let label = state(1);
        let node = Node::element("span");
        bind_text(&label, &node);
        Document::body().append_child(&node).unwrap();
        Document::run_until_idle();

        Document::body().remove_child(&node).unwrap();
        Document::run_until_idle();
        label.set(2);

        assert_eq!(node.text_content(), "1");
        assert_eq!(label.subscriber_count(), 0);
    }

    #[test]
    fn subscribe_with_cleanup_calls_immediately() {
        let count = state(0);
        let node = Node::element("div");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        subscribe_with_cleanup(&count, &node, move |n| s.borrow_mut().push(n));
        count.set(4);

        assert_eq!(*seen.borrow(), vec![0, 4]);
    }
}
