//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a state cell is read,
//! it registers the current computation as a subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack rather than a single "current computation"
//! slot. Running a computation pushes an entry and the returned guard pops it,
//! so a computation started inside another one (an effect created while an
//! effect runs, a computed read inside an effect) cannot clobber the outer
//! tracking target, and a panic unwinding through a run still restores it.
//!
//! Each entry also collects the cells read during the run. The effect that
//! owns the entry diffs this read-set against the previous run's to drop
//! subscriptions it no longer needs.

use std::cell::RefCell;
use std::rc::Weak;

use indexmap::IndexMap;

use super::subscriber::{Subscriber, SubscriberId};

/// A cell a computation can depend on.
pub(crate) trait Source {
    /// Stop notifying `subscriber`.
    fn unsubscribe(&self, subscriber: SubscriberId);

    /// Check if `subscriber` is still registered.
    fn is_subscribed(&self, subscriber: SubscriberId) -> bool;
}

/// Read-set of one computation run, keyed by source ID in first-read order.
pub(crate) type Dependencies = IndexMap<u64, Weak<dyn Source>>;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// `None` for an untracked scope: reads inside it register nothing.
    subscriber: Option<Subscriber>,
    /// Cells read during this run.
    dependencies: Dependencies,
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub struct ReactiveContext {
    subscriber: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, any cells that are read will register
    /// the subscriber. The context is exited when the guard is dropped.
    pub fn enter(subscriber: Subscriber) -> Self {
        let id = subscriber.id();
        Self::push(Some(subscriber));
        Self { subscriber: Some(id) }
    }

    /// Enter a scope in which reads are not tracked, even when nested inside
    /// a running computation.
    pub fn untracked() -> Self {
        Self::push(None);
        Self { subscriber: None }
    }

    fn push(subscriber: Option<Subscriber>) {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber,
                dependencies: Dependencies::new(),
            });
        });
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|entry| entry.subscriber.is_some())
        })
    }

    /// Get the current subscriber, if any.
    pub fn current_subscriber() -> Option<Subscriber> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.subscriber.clone())
        })
    }

    /// Record that the current computation read `source`.
    pub(crate) fn track_dependency(source_id: u64, source: Weak<dyn Source>) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if entry.subscriber.is_some() {
                    entry.dependencies.entry(source_id).or_insert(source);
                }
            }
        });
    }

    /// Take the read-set collected so far in this context.
    pub(crate) fn take_dependencies(&self) -> Dependencies {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            match stack.last_mut() {
                Some(entry) => {
                    debug_assert_eq!(
                        entry.subscriber.as_ref().map(Subscriber::id),
                        self.subscriber,
                        "take_dependencies called on a context that is not on top"
                    );
                    std::mem::take(&mut entry.dependencies)
                }
                None => Dependencies::new(),
            }
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Verify we're popping the right context.
            // This helps catch bugs where contexts are mismatched.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber.as_ref().map(Subscriber::id),
                    self.subscriber,
                    "ReactiveContext mismatch"
                );
            }
        });
    }
}

/// Run `f` without registering any reads as dependencies.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_subscriber() {
        let subscriber = Subscriber::new(|| {});

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(subscriber.clone());

            assert!(ReactiveContext::is_active());
            assert_eq!(
                ReactiveContext::current_subscriber().map(|s| s.id()),
                Some(subscriber.id())
            );
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn nested_contexts() {
        let outer = Subscriber::new(|| {});
        let inner = Subscriber::new(|| {});

        {
            let _ctx1 = ReactiveContext::enter(outer.clone());
            {
                let _ctx2 = ReactiveContext::enter(inner.clone());
                assert_eq!(
                    ReactiveContext::current_subscriber().map(|s| s.id()),
                    Some(inner.id())
                );
            }

            // After inner context drops, outer should be current
            assert_eq!(
                ReactiveContext::current_subscriber().map(|s| s.id()),
                Some(outer.id())
            );
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn untracked_scope_hides_the_outer_subscriber() {
        let outer = Subscriber::new(|| {});
        let _ctx = ReactiveContext::enter(outer);

        untrack(|| {
            assert!(!ReactiveContext::is_active());
            assert!(ReactiveContext::current_subscriber().is_none());
        });

        assert!(ReactiveContext::is_active());
    }

    #[test]
    fn context_is_restored_after_a_panic() {
        let result = std::panic::catch_unwind(|| {
            let _ctx = ReactiveContext::enter(Subscriber::new(|| {}));
            panic!("boom");
        });

        assert!(result.is_err());
        assert!(!ReactiveContext::is_active());
    }
}
