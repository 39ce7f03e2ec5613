//! Error types for the Aram core.
//!
//! Only misuse and host-tree errors are surfaced to callers. Failures inside
//! a running computation are caught at the run boundary and logged instead
//! (see [`crate::reactive::Effect`]).

use thiserror::Error;

use crate::dom::NodeId;

/// Errors returned by the reactive core and the headless document.
#[derive(Debug, Error)]
pub enum Error {
    /// A write was attempted on a derived cell.
    #[error("cannot set a computed value")]
    ComputedWrite,

    /// The first evaluation of a computed cell panicked, so there is no value
    /// to back the cell with.
    #[error("computed value failed to produce an initial value")]
    ComputedInit,

    /// `mount_by_id` could not resolve its target.
    #[error("mount target not found: {0}")]
    MountTargetNotFound(String),

    /// A replace/remove referenced a node that is not a child of the parent.
    #[error("node {child} is not a child of node {parent}")]
    NotAChild {
        /// The node whose children were searched.
        parent: NodeId,
        /// The node that was expected among them.
        child: NodeId,
    },

    /// An insertion would make a node its own ancestor, or the child cannot
    /// have a parent at all (the document body).
    #[error("cannot insert node {child} into node {parent}")]
    HierarchyRequest {
        /// The insertion target.
        parent: NodeId,
        /// The node being inserted.
        child: NodeId,
    },

    /// Runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
