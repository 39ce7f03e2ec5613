//! Context Propagation
//!
//! A context carries a value down the tree without threading it through
//! every render function. A provider wraps its children in a transparent
//! `div` and records the value against that wrapper; a lookup walks up from
//! a node to the nearest wrapper carrying the context.
//!
//! Lookups are point-in-time: they read the table when called and do not
//! re-run when a provider's value changes. Put a cell in the context to get
//! reactive updates.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dom::{Node, NodeId, View, WeakNode};
use crate::error::Result;

/// Identifies one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct ProviderEntry {
    node: WeakNode,
    values: HashMap<ContextId, Rc<dyn Any>>,
}

thread_local! {
    static PROVIDERS: RefCell<HashMap<NodeId, ProviderEntry>> = RefCell::new(HashMap::new());
}

/// A typed context token with its default value.
#[derive(Clone)]
pub struct Context<T> {
    id: ContextId,
    default: T,
}

/// Create a context whose lookups fall back to `default`.
pub fn create_context<T>(default: T) -> Context<T>
where
    T: Clone + 'static,
{
    Context {
        id: ContextId::next(),
        default,
    }
}

impl<T> Context<T>
where
    T: Clone + 'static,
{
    /// The context's identity.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The value returned when no provider is found.
    pub fn default_value(&self) -> T {
        self.default.clone()
    }

    /// Wrap `children` in a provider carrying `value`.
    ///
    /// Fails only if a child cannot be inserted (for example the document
    /// body).
    pub fn provider(&self, value: T, children: impl Into<View>) -> Result<Node> {
        let container = Node::contents("div");
        PROVIDERS.with(|providers| {
            let mut providers = providers.borrow_mut();
            providers.retain(|_, entry| entry.node.upgrade().is_some());
            providers
                .entry(container.id())
                .or_insert_with(|| ProviderEntry {
                    node: container.downgrade(),
                    values: HashMap::new(),
                })
                .values
                .insert(self.id, Rc::new(value));
        });

        children.into().append_to(&container)?;
        Ok(container)
    }

    fn provided_by(&self, node: &Node) -> Option<T> {
        PROVIDERS.with(|providers| {
            providers
                .borrow()
                .get(&node.id())
                .and_then(|entry| entry.values.get(&self.id))
                .and_then(|value| value.downcast_ref::<T>())
                .cloned()
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("default", &self.default)
            .finish()
    }
}

/// The value of the nearest provider above `node`, or the default.
///
/// The search starts at the node's parent, so a provider wrapper does not
/// see its own value. With no node, returns the default.
pub fn use_context<T>(context: &Context<T>, node: Option<&Node>) -> T
where
    T: Clone + 'static,
{
    match node {
        Some(node) => use_context_with(context, node, Node::parent),
        None => context.default_value(),
    }
}

/// [`use_context`] over an arbitrary parent relation.
pub fn use_context_with<T, P>(context: &Context<T>, node: &Node, parent_of: P) -> T
where
    T: Clone + 'static,
    P: Fn(&Node) -> Option<Node>,
{
    let mut current = parent_of(node);
    while let Some(candidate) = current {
        if let Some(value) = context.provided_by(&candidate) {
            return value;
        }
        current = parent_of(&candidate);
    }
    context.default_value()
}

/// The context's default value, without a tree lookup.
pub fn get_context<T>(context: &Context<T>) -> T
where
    T: Clone + 'static,
{
    context.default_value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_provider_wins() {
        let theme = create_context("light".to_string());
        let leaf = Node::element("button");
        let inner = theme.provider("dark".to_string(), leaf.clone()).unwrap();
        let _outer = theme.provider("contrast".to_string(), inner.clone()).unwrap();

        assert_eq!(use_context(&theme, Some(&leaf)), "dark");
        assert_eq!(use_context(&theme, Some(&inner)), "contrast");
    }

    #[test]
    fn default_without_provider_or_node() {
        let size = create_context(12);
        let lone = Node::element("p");

        assert_eq!(use_context(&size, Some(&lone)), 12);
        assert_eq!(use_context(&size, None), 12);
        assert_eq!(get_context(&size), 12);
    }

    #[test]
    fn contexts_do_not_leak_into_each_other() {
        let a = create_context(0);
        let b = create_context(0);
        let leaf = Node::element("i");
        let _provider = a.provider(1, leaf.clone()).unwrap();

        assert_eq!(use_context(&a, Some(&leaf)), 1);
        assert_eq!(use_context(&b, Some(&leaf)), 0);
    }

    #[test]
    fn provider_accepts_lists_and_nothing() {
        let ctx = create_context(false);
        let items = vec![Node::text("a"), Node::text("b")];
        let provider = ctx.provider(true, items).unwrap();
        assert_eq!(provider.child_count(), 2);
        assert_eq!(provider.style("display").as_deref(), Some("contents"));

        let empty = ctx.provider(true, ()).unwrap();
        assert_eq!(empty.child_count(), 0);
    }

    #[test]
    fn custom_parent_relation() {
        let ctx = create_context("none");
        let provider = ctx.provider("found", ()).unwrap();
        let detached = Node::element("span");

        let target = provider.clone();
        let value = use_context_with(&ctx, &detached, move |node| {
            (!node.ptr_eq(&target)).then(|| target.clone())
        });
        assert_eq!(value, "found");
    }
}
