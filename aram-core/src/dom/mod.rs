//! Headless Presentation Surface
//!
//! The reactive core needs a live tree that can create nodes, append, replace
//! and remove children, and report structural mutations asynchronously after
//! each task. This module provides one such host, entirely in memory:
//!
//! - [`Node`]: reference-counted tree nodes (elements and text).
//! - [`Document`]: the live document, its mutation queue and its event loop
//!   (microtasks and animation frames).
//! - [`AttachmentHost`] / [`AttachmentObserver`]: the host-agnostic seam the
//!   lifecycle registry consumes.
//! - [`View`]: what render functions return.

mod document;
mod node;
mod observer;
mod view;

pub use document::{mount, mount_by_id, Document, MutationRecord, ObserverId};
pub use node::{Node, NodeId, NodeKind, WeakNode};
pub use observer::{AttachmentHost, AttachmentObserver};
pub use view::View;
