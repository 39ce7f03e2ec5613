//! Per-node callback tables.
//!
//! Two maps keyed by node: callbacks waiting for the node to be attached,
//! and teardowns waiting for it to be detached. Each list is removed from
//! its map before any of its callbacks run, so every callback runs at most
//! once even if a callback re-enters the registry.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::dom::{AttachmentHost, AttachmentObserver, Document, Node, NodeId};
use crate::reactive::Cleanup;

/// A mount callback. Its result, if any, is queued as a detach teardown.
pub(crate) type MountCallback = Box<dyn FnOnce() -> Option<Cleanup>>;

#[derive(Default)]
pub(crate) struct Registry {
    mount: RefCell<HashMap<NodeId, SmallVec<[MountCallback; 2]>>>,
    cleanup: RefCell<HashMap<NodeId, SmallVec<[Cleanup; 2]>>>,
}

thread_local! {
    static REGISTRY: Rc<Registry> = Rc::new(Registry::default());
    static INSTALLED: Cell<bool> = const { Cell::new(false) };
}

/// The thread's registry, observing the document from the first use on.
pub(crate) fn registry() -> Rc<Registry> {
    let registry = REGISTRY.with(Rc::clone);
    if !INSTALLED.with(|installed| installed.replace(true)) {
        registry.install(&Document);
    }
    registry
}

impl Registry {
    fn install(self: &Rc<Self>, host: &dyn AttachmentHost) {
        let id = host.observe_attachment(self.clone());
        debug!(observer = ?id, "lifecycle observer installed");
    }

    pub(crate) fn push_mount(&self, node: NodeId, callback: MountCallback) {
        self.mount.borrow_mut().entry(node).or_default().push(callback);
    }

    pub(crate) fn push_cleanup(&self, node: NodeId, callback: Cleanup) {
        self.cleanup
            .borrow_mut()
            .entry(node)
            .or_default()
            .push(callback);
    }

    pub(crate) fn mount_count(&self, node: NodeId) -> usize {
        self.mount.borrow().get(&node).map_or(0, SmallVec::len)
    }

    pub(crate) fn cleanup_count(&self, node: NodeId) -> usize {
        self.cleanup.borrow().get(&node).map_or(0, SmallVec::len)
    }
}

impl AttachmentObserver for Registry {
    fn attached(&self, node: &Node) {
        if node.is_text() {
            return;
        }
        let Some(callbacks) = self.mount.borrow_mut().remove(&node.id()) else {
            return;
        };
        for callback in callbacks {
            trace!(node = %node.id(), "mount callback");
            if let Some(teardown) = callback() {
                self.push_cleanup(node.id(), teardown);
            }
        }
    }

    fn detached(&self, node: &Node) {
        if node.is_text() {
            return;
        }
        let Some(callbacks) = self.cleanup.borrow_mut().remove(&node.id()) else {
            return;
        };
        for callback in callbacks {
            trace!(node = %node.id(), "cleanup callback");
            callback();
        }
    }
}
