//! Renderable results.

use super::node::Node;
use crate::error::Result;

/// What a render function or control-flow renderer produces: nothing, one
/// node, or a flat list of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum View {
    /// Nothing to render.
    #[default]
    Empty,
    /// A single node.
    Node(Node),
    /// Sibling nodes, in order.
    List(Vec<Node>),
}

impl View {
    /// Check if the view renders nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            View::Empty => true,
            View::Node(_) => false,
            View::List(nodes) => nodes.is_empty(),
        }
    }

    /// The single node, if this view is one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            View::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Flatten into the nodes to insert.
    pub fn into_nodes(self) -> Vec<Node> {
        match self {
            View::Empty => Vec::new(),
            View::Node(node) => vec![node],
            View::List(nodes) => nodes,
        }
    }

    /// Append every node of the view into `parent`, in order.
    pub fn append_to(self, parent: &Node) -> Result<()> {
        for node in self.into_nodes() {
            parent.append_child(&node)?;
        }
        Ok(())
    }
}

impl From<Node> for View {
    fn from(node: Node) -> Self {
        View::Node(node)
    }
}

impl From<Option<Node>> for View {
    fn from(node: Option<Node>) -> Self {
        node.map_or(View::Empty, View::Node)
    }
}

impl From<Vec<Node>> for View {
    fn from(nodes: Vec<Node>) -> Self {
        View::List(nodes)
    }
}

impl From<()> for View {
    fn from(_: ()) -> Self {
        View::Empty
    }
}
