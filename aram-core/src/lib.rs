//! Aram Core
//!
//! This crate provides the core runtime for the Aram reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (state cells, computed values, effects, batching)
//! - A node lifecycle registry driven by attach/detach observation
//! - Reactive control flow (`watch`, conditional and list rendering)
//! - Context propagation through the node tree
//! - A headless, single-threaded document to render into
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `dom`: The headless document, its nodes and its event loop
//! - `lifecycle`: Mount and cleanup callbacks keyed by node
//! - `control`: Renderers that patch a region of the tree in place
//! - `context`: Values provided to a subtree
//! - `config`: Runtime tunables
//!
//! Everything is per thread: each thread has its own document, scheduler
//! and registries, and none of the handle types are `Send`.
//!
//! # Example
//!
//! ```rust
//! use aram_core::control::when_else;
//! use aram_core::dom::{mount, Document, Node};
//! use aram_core::reactive::{computed, state};
//!
//! let count = state(0);
//! let c = count.clone();
//! let is_even = computed(move || c.get() % 2 == 0).unwrap();
//!
//! let badge = when_else(
//!     &is_even,
//!     || Some(Node::text("even")),
//!     || Some(Node::text("odd")),
//! );
//! mount(badge, &Document::body()).unwrap();
//! Document::run_until_idle();
//!
//! count.update(|n| n + 1);
//! assert_eq!(Document::body().text_content(), "odd");
//! ```

pub mod config;
pub mod context;
pub mod control;
pub mod dom;
pub mod error;
pub mod lifecycle;
pub mod reactive;

pub use error::{Error, Result};
