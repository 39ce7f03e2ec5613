//! Tree Nodes
//!
//! This module defines the nodes of the headless presentation tree. A node is
//! a cheap, reference-counted handle; cloning it clones the handle, and two
//! handles are equal when they point at the same node.
//!
//! Child-list mutations on a node that is part of the live document are
//! recorded and delivered to observers at the next checkpoint
//! (see [`super::Document::run_until_idle`]).

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::{smallvec, SmallVec};

use super::document::{self, MutationRecord};
use crate::error::{Error, Result};

/// Unique identifier for a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with a tag name, attributes, inline styles and children.
    Element {
        /// Lower-case tag name.
        tag: String,
    },

    /// A text leaf. Text nodes never have children.
    Text,
}

struct NodeInner {
    id: NodeId,
    kind: NodeKind,
    /// Set only for the document body; a root is always connected.
    root: bool,
    parent: RefCell<Weak<NodeInner>>,
    children: RefCell<Vec<Node>>,
    text: RefCell<String>,
    attributes: RefCell<IndexMap<String, String>>,
    styles: RefCell<IndexMap<String, String>>,
}

/// A handle to a node in the presentation tree.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

/// A non-owning handle to a node.
#[derive(Clone, Default)]
pub struct WeakNode(Weak<NodeInner>);

impl WeakNode {
    /// Recover the node if it is still alive.
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakNode")
            .field(&self.upgrade().map(|node| node.id()))
            .finish()
    }
}

impl Node {
    fn new(kind: NodeKind, text: String, root: bool) -> Self {
        Self(Rc::new(NodeInner {
            id: NodeId::next(),
            kind,
            root,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            text: RefCell::new(text),
            attributes: RefCell::new(IndexMap::new()),
            styles: RefCell::new(IndexMap::new()),
        }))
    }

    /// Create a detached element.
    pub fn element(tag: impl Into<String>) -> Self {
        let tag = tag.into().to_ascii_lowercase();
        Self::new(NodeKind::Element { tag }, String::new(), false)
    }

    /// Create a detached text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text, content.into(), false)
    }

    /// Create a layout-transparent wrapper element (`display: contents`).
    ///
    /// Control-flow fragments and context providers use these so that the
    /// wrapper does not affect the rendered layout.
    pub fn contents(tag: impl Into<String>) -> Self {
        let node = Self::element(tag);
        node.set_style("display", "contents");
        node
    }

    pub(crate) fn root(tag: &str) -> Self {
        Self::new(
            NodeKind::Element {
                tag: tag.to_owned(),
            },
            String::new(),
            true,
        )
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// The tag name, for elements.
    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Text => None,
        }
    }

    /// Check if this is a text node.
    pub fn is_text(&self) -> bool {
        self.0.kind == NodeKind::Text
    }

    /// Check whether two handles refer to the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Create a non-owning handle.
    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    /// The parent node, if attached to one.
    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    /// Snapshot of the children, in order.
    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    /// The first child, if any.
    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    /// Inclusive descendant check: a node contains itself.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Whether the node is part of the live document.
    pub fn is_connected(&self) -> bool {
        let mut current = self.clone();
        loop {
            if current.0.root {
                return true;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Append `child` as the last child, moving it from its current parent.
    pub fn append_child(&self, child: &Node) -> Result<()> {
        self.check_insert(child)?;
        child.detach_from_parent();

        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
        self.record(smallvec![child.clone()], SmallVec::new());
        Ok(())
    }

    /// Replace the child `old` with `new` in place.
    ///
    /// `new` is moved from its current parent first. Replacing a node with
    /// itself is a no-op.
    pub fn replace_child(&self, new: &Node, old: &Node) -> Result<()> {
        if !self.is_parent_of(old) {
            return Err(self.not_a_child(old));
        }
        if new.ptr_eq(old) {
            return Ok(());
        }
        self.check_insert(new)?;
        new.detach_from_parent();

        {
            let mut children = self.0.children.borrow_mut();
            let index = children
                .iter()
                .position(|child| child.ptr_eq(old))
                .ok_or_else(|| self.not_a_child(old))?;
            children[index] = new.clone();
        }
        *old.0.parent.borrow_mut() = Weak::new();
        *new.0.parent.borrow_mut() = Rc::downgrade(&self.0);

        self.record(smallvec![new.clone()], smallvec![old.clone()]);
        Ok(())
    }

    /// Remove `child` from this node.
    pub fn remove_child(&self, child: &Node) -> Result<()> {
        if self.take_child(child).is_none() {
            return Err(self.not_a_child(child));
        }
        self.record(SmallVec::new(), smallvec![child.clone()]);
        Ok(())
    }

    /// Remove every child, recording a single mutation.
    pub fn clear_children(&self) {
        let removed: SmallVec<[Node; 1]> = self.0.children.borrow_mut().drain(..).collect();
        if removed.is_empty() {
            return;
        }
        for child in &removed {
            *child.0.parent.borrow_mut() = Weak::new();
        }
        self.record(SmallVec::new(), removed);
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        match self.0.kind {
            NodeKind::Text => self.0.text.borrow().clone(),
            NodeKind::Element { .. } => {
                let mut out = String::new();
                for child in self.0.children.borrow().iter() {
                    out.push_str(&child.text_content());
                }
                out
            }
        }
    }

    /// Set the text of a text node, or replace an element's children with a
    /// single text node.
    pub fn set_text_content(&self, content: impl Into<String>) {
        let content = content.into();
        match self.0.kind {
            NodeKind::Text => *self.0.text.borrow_mut() = content,
            NodeKind::Element { .. } => {
                self.clear_children();
                if !content.is_empty() {
                    let text = Node::text(content);
                    *text.0.parent.borrow_mut() = Rc::downgrade(&self.0);
                    self.0.children.borrow_mut().push(text.clone());
                    self.record(smallvec![text], SmallVec::new());
                }
            }
        }
    }

    /// Set an attribute. Ignored on text nodes.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        if !self.is_text() {
            self.0.attributes.borrow_mut().insert(name.into(), value.into());
        }
    }

    /// Read an attribute.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(name).cloned()
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow_mut().shift_remove(name)
    }

    /// Set an inline style property. Ignored on text nodes.
    pub fn set_style(&self, property: impl Into<String>, value: impl Into<String>) {
        if !self.is_text() {
            self.0.styles.borrow_mut().insert(property.into(), value.into());
        }
    }

    /// Read an inline style property.
    pub fn style(&self, property: &str) -> Option<String> {
        self.0.styles.borrow().get(property).cloned()
    }

    /// Serialize this subtree as HTML-like markup. Handy in tests and logs.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        let tag = match &self.0.kind {
            NodeKind::Text => {
                escape_into(out, &self.0.text.borrow());
                return;
            }
            NodeKind::Element { tag } => tag,
        };

        out.push('<');
        out.push_str(tag);
        for (name, value) in self.0.attributes.borrow().iter() {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(out, value);
            out.push('"');
        }
        let styles = self.0.styles.borrow();
        if !styles.is_empty() {
            let inline = styles
                .iter()
                .map(|(property, value)| format!("{property}: {value}"))
                .collect::<Vec<_>>()
                .join("; ");
            out.push_str(" style=\"");
            escape_into(out, &inline);
            out.push('"');
        }
        out.push('>');
        for child in self.0.children.borrow().iter() {
            child.write_markup(out);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }

    fn is_parent_of(&self, child: &Node) -> bool {
        child.parent().is_some_and(|parent| parent.ptr_eq(self))
    }

    fn not_a_child(&self, child: &Node) -> Error {
        Error::NotAChild {
            parent: self.id(),
            child: child.id(),
        }
    }

    fn check_insert(&self, child: &Node) -> Result<()> {
        if self.is_text() || child.0.root || child.contains(self) {
            return Err(Error::HierarchyRequest {
                parent: self.id(),
                child: child.id(),
            });
        }
        Ok(())
    }

    /// Unlink from the current parent, recording the removal there.
    fn detach_from_parent(&self) {
        if let Some(parent) = self.parent() {
            if parent.take_child(self).is_some() {
                parent.record(SmallVec::new(), smallvec![self.clone()]);
            }
        }
    }

    fn take_child(&self, child: &Node) -> Option<usize> {
        let index = {
            let mut children = self.0.children.borrow_mut();
            let index = children.iter().position(|c| c.ptr_eq(child))?;
            children.remove(index);
            index
        };
        *child.0.parent.borrow_mut() = Weak::new();
        Some(index)
    }

    fn record(&self, added: SmallVec<[Node; 1]>, removed: SmallVec<[Node; 1]>) {
        if self.is_connected() {
            document::enqueue_record(MutationRecord {
                target: self.clone(),
                added,
                removed,
            });
        }
    }
}

fn escape_into(out: &mut String, raw: &str) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Node");
        debug.field("id", &self.id());
        match &self.0.kind {
            NodeKind::Element { tag } => debug
                .field("tag", tag)
                .field("child_count", &self.child_count()),
            NodeKind::Text => debug.field("text", &*self.0.text.borrow()),
        };
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn node_ids_are_unique() {
        let a = Node::element("div");
        let b = Node::element("div");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn append_sets_parent_and_order() {
        let parent = Node::element("ul");
        let first = Node::element("li");
        let second = Node::element("li");

        parent.append_child(&first).unwrap();
        parent.append_child(&second).unwrap();

        assert_eq!(parent.children(), vec![first.clone(), second.clone()]);
        assert_eq!(first.parent(), Some(parent.clone()));
        assert_eq!(parent.first_child(), Some(first));
    }

    #[test]
    fn append_moves_between_parents() {
        let a = Node::element("div");
        let b = Node::element("div");
        let child = Node::text("x");

        a.append_child(&child).unwrap();
        b.append_child(&child).unwrap();

        assert_eq!(a.child_count(), 0);
        assert_eq!(child.parent(), Some(b));
    }

    #[test]
    fn replace_child_keeps_position() {
        let parent = Node::element("div");
        let a = Node::text("a");
        let b = Node::text("b");
        let c = Node::text("c");
        parent.append_child(&a).unwrap();
        parent.append_child(&b).unwrap();

        parent.replace_child(&c, &a).unwrap();

        assert_eq!(parent.text_content(), "cb");
        assert!(a.parent().is_none());
    }

    #[test]
    fn replace_non_child_is_an_error() {
        let parent = Node::element("div");
        let stranger = Node::text("?");
        let err = parent.replace_child(&Node::text("x"), &stranger).unwrap_err();
        assert!(matches!(err, Error::NotAChild { .. }));

        let err = parent.remove_child(&stranger).unwrap_err();
        assert!(matches!(err, Error::NotAChild { .. }));
    }

    #[test]
    fn inserting_an_ancestor_is_rejected() {
        let outer = Node::element("div");
        let inner = Node::element("div");
        outer.append_child(&inner).unwrap();

        let err = inner.append_child(&outer).unwrap_err();
        assert!(matches!(err, Error::HierarchyRequest { .. }));
        assert!(outer.append_child(&outer).is_err());
        assert!(Node::text("leaf").append_child(&Node::text("x")).is_err());
    }

    #[test]
    fn connected_follows_the_body() {
        let wrapper = Node::element("div");
        let leaf = Node::text("leaf");
        wrapper.append_child(&leaf).unwrap();
        assert!(!leaf.is_connected());

        Document::body().append_child(&wrapper).unwrap();
        assert!(leaf.is_connected());

        Document::body().remove_child(&wrapper).unwrap();
        assert!(!leaf.is_connected());
    }

    #[test]
    fn detached_mutations_are_not_recorded() {
        let wrapper = Node::element("div");
        wrapper.append_child(&Node::text("a")).unwrap();
        assert_eq!(Document::pending_records(), 0);

        Document::body().append_child(&wrapper).unwrap();
        wrapper.append_child(&Node::text("b")).unwrap();
        assert_eq!(Document::pending_records(), 2);
    }

    #[test]
    fn text_content_round_trip() {
        let span = Node::element("span");
        span.set_text_content("hello");
        assert_eq!(span.text_content(), "hello");
        assert_eq!(span.child_count(), 1);

        span.set_text_content("");
        assert_eq!(span.child_count(), 0);
    }

    #[test]
    fn markup_includes_attributes_and_styles() {
        let wrapper = Node::contents("span");
        wrapper.set_attribute("id", "greeting");
        wrapper.append_child(&Node::text("a < b")).unwrap();

        assert_eq!(
            wrapper.to_markup(),
            r#"<span id="greeting" style="display: contents">a &lt; b</span>"#
        );
    }
}
