//! Attachment observation.
//!
//! The lifecycle registry needs exactly one thing from a host: to be told
//! when a node enters or leaves the live tree. These traits are that seam;
//! [`Document`] is the headless implementation.

use std::rc::Rc;

use tracing::trace;

use super::document::{Document, ObserverId};
use super::node::Node;

/// Receives attach/detach notifications for top-level inserted and removed
/// nodes. Descendants of those nodes are not reported individually.
pub trait AttachmentObserver {
    /// `node` was inserted and is part of the live tree.
    fn attached(&self, node: &Node);

    /// `node` was removed and is no longer part of the live tree.
    fn detached(&self, node: &Node);
}

/// A host that can report attach/detach of its nodes asynchronously.
pub trait AttachmentHost {
    /// Start reporting to `observer`.
    fn observe_attachment(&self, observer: Rc<dyn AttachmentObserver>) -> ObserverId;
}

impl AttachmentHost for Document {
    /// Records are filtered by the node's connectivity at delivery time, so a
    /// node moved between two live parents within one task is reported as
    /// neither detached nor (re)attached.
    fn observe_attachment(&self, observer: Rc<dyn AttachmentObserver>) -> ObserverId {
        Document::observe(move |records| {
            for record in records {
                for node in &record.added {
                    if node.is_connected() {
                        trace!(node = %node.id(), "attached");
                        observer.attached(node);
                    }
                }
                for node in &record.removed {
                    if !node.is_connected() {
                        trace!(node = %node.id(), "detached");
                        observer.detached(node);
                    }
                }
            }
        })
    }
}
