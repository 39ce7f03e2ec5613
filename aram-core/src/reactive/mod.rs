//! Reactive Primitives
//!
//! This module implements the core reactive system: state cells, computed
//! values, and effects. These primitives form the foundation of Aram's
//! fine-grained reactivity.
//!
//! # Concepts
//!
//! ## State
//!
//! A State is a container for mutable data. When a state's value is read
//! within a tracking context (such as a computed or effect), the state
//! automatically registers that context as a dependent. When the state's
//! value changes, all dependents are notified.
//!
//! ## Computed
//!
//! A Computed is a derived value backed by its own state cell. It is
//! evaluated eagerly and re-evaluated whenever one of its dependencies
//! changes; dependents are notified only when the result differs.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Effects are used to synchronize reactive state with
//! the document.
//!
//! ## Batching
//!
//! [`batch`] defers notifications until the closure returns, running each
//! affected subscriber once.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking stack to detect
//! dependencies. When a state is read, we check if there is an active
//! tracking context and, if so, register the dependency. Every run records
//! its read-set, and an effect unsubscribes from cells it stopped reading.

mod computed;
mod context;
mod disposer;
mod effect;
mod guard;
mod runtime;
mod state;
mod subscriber;

pub use computed::{computed, Computed};
pub use context::{untrack, ReactiveContext};
pub use disposer::{cleanup, Cleanup, Disposer, IntoCleanup};
pub use effect::{create_effect, effect, Effect};
pub use runtime::{batch, is_batching, safe_schedule_update, schedule_update, Runtime};
pub use state::{state, State, StateCell};
pub use subscriber::{Subscriber, SubscriberId, WeakSubscriber};
