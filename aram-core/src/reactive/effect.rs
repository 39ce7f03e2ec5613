//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect re-runs (or, inside a batch,
//!    is queued to re-run once when the batch exits).
//!
//! 3. Every run records the cells it read. After the run, the effect
//!    unsubscribes from cells it read last time but not this time, so its
//!    subscriptions are always exactly its latest read-set.
//!
//! # Failure
//!
//! A panic in the effect body is caught at the run boundary and logged. The
//! effect goes back to idle with its tracking frame popped, and later changes
//! still trigger it.
//!
//! # Re-entrancy
//!
//! A notification that arrives while the effect is already running (because
//! the body wrote to a cell it reads) does not recurse. It marks the effect
//! for one more run once the current one finishes.
//!
//! # Cleanup
//!
//! Effects created with [`create_effect`] can return a teardown. It is called
//! before the next run and when the effect is disposed.
//!
//! # Ownership
//!
//! The cells an effect reads keep it alive; dropping the [`Effect`] handle
//! does not stop it. Call [`Effect::dispose`] to detach it.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;
use tracing::error;

use super::context::{Dependencies, ReactiveContext};
use super::disposer::{Cleanup, IntoCleanup};
use super::subscriber::{Subscriber, SubscriberId, WeakSubscriber};

/// Counter for generating unique effect IDs.
static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique effect ID.
fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type RunFn = Box<dyn FnMut() -> Option<Cleanup>>;

/// Run `f` as an effect.
///
/// ```rust
/// use aram_core::reactive::{effect, state};
/// use std::{cell::Cell, rc::Rc};
///
/// let count = state(0);
/// let seen = Rc::new(Cell::new(0));
///
/// let (c, s) = (count.clone(), seen.clone());
/// effect(move || s.set(c.get()));
///
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// ```
pub fn effect<F>(mut f: F) -> Effect
where
    F: FnMut() + 'static,
{
    Effect::from_run(Box::new(move || {
        f();
        None
    }))
}

/// Run `f` as an effect whose return value may be a teardown.
///
/// The teardown runs before each re-run and on disposal.
pub fn create_effect<F, R>(mut f: F) -> Effect
where
    F: FnMut() -> R + 'static,
    R: IntoCleanup,
{
    Effect::from_run(Box::new(move || f().into_cleanup()))
}

/// A side-effecting computation that runs when dependencies change.
///
/// Clones share the same computation.
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

struct EffectInner {
    /// Unique identifier for this effect.
    id: u64,

    /// Notification handle registered with the cells this effect reads.
    /// The cells own it; the effect only keeps a weak reference.
    subscriber: RefCell<Option<WeakSubscriber>>,

    /// The effect function.
    run: RefCell<RunFn>,

    /// Teardown returned by the previous run.
    cleanup: RefCell<Option<Cleanup>>,

    /// Cells read during the latest run.
    dependencies: RefCell<Dependencies>,

    disposed: Cell<bool>,
    running: Cell<bool>,
    rerun: Cell<bool>,

    /// Number of times the effect has run.
    run_count: Cell<usize>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish dependencies.
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut() + 'static,
    {
        effect(f)
    }

    /// Create a new effect without running it.
    ///
    /// It starts tracking on the first [`Effect::execute`].
    pub fn new_lazy<F>(mut f: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self::lazy_from_run(Box::new(move || {
            f();
            None
        }))
    }

    fn from_run(run: RunFn) -> Self {
        let effect = Self::lazy_from_run(run);
        effect.execute();
        effect
    }

    fn lazy_from_run(run: RunFn) -> Self {
        Self {
            inner: Rc::new(EffectInner {
                id: next_effect_id(),
                subscriber: RefCell::new(None),
                run: RefCell::new(run),
                cleanup: RefCell::new(None),
                dependencies: RefCell::new(Dependencies::new()),
                disposed: Cell::new(false),
                running: Cell::new(false),
                rerun: Cell::new(false),
                run_count: Cell::new(0),
            }),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the subscriber ID used for dependency tracking, once it has run.
    pub fn subscriber_id(&self) -> Option<SubscriberId> {
        self.inner
            .subscriber
            .borrow()
            .as_ref()
            .map(WeakSubscriber::id)
    }

    /// Run the effect now. Does nothing after disposal.
    pub fn execute(&self) {
        EffectInner::execute(&self.inner);
    }

    /// Stop the effect.
    ///
    /// Runs the pending teardown and unsubscribes from every cell. Later
    /// calls do nothing.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of cells read during the latest run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }
}

impl EffectInner {
    fn execute(this: &Rc<Self>) {
        if this.disposed.get() {
            return;
        }
        if this.running.get() {
            this.rerun.set(true);
            return;
        }

        let subscriber = Self::subscriber(this);
        this.running.set(true);
        loop {
            this.rerun.set(false);
            this.run_once(&subscriber);
            if !this.rerun.get() || this.disposed.get() {
                break;
            }
        }
        this.running.set(false);
    }

    /// The live subscriber, or a fresh one if no cell holds the old one.
    fn subscriber(this: &Rc<Self>) -> Subscriber {
        let live = this
            .subscriber
            .borrow()
            .as_ref()
            .and_then(WeakSubscriber::upgrade);
        if let Some(subscriber) = live {
            return subscriber;
        }
        let target = this.clone();
        let subscriber = Subscriber::new(move || EffectInner::execute(&target));
        *this.subscriber.borrow_mut() = Some(subscriber.downgrade());
        subscriber
    }

    fn run_once(&self, subscriber: &Subscriber) {
        let previous = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = previous {
            self.guarded("cleanup", cleanup);
        }

        let ctx = ReactiveContext::enter(subscriber.clone());
        let outcome = {
            let mut run = self.run.borrow_mut();
            panic::catch_unwind(AssertUnwindSafe(|| (*run)()))
        };
        let dependencies = ctx.take_dependencies();
        drop(ctx);

        match outcome {
            Ok(cleanup) => *self.cleanup.borrow_mut() = cleanup,
            Err(payload) => error!(
                effect = self.id,
                panic = panic_message(payload.as_ref()),
                "effect error"
            ),
        }

        self.replace_dependencies(dependencies, subscriber.id());
        self.run_count.set(self.run_count.get() + 1);

        // Disposed from inside its own body.
        if self.disposed.get() {
            let cleanup = self.cleanup.borrow_mut().take();
            if let Some(cleanup) = cleanup {
                self.guarded("cleanup", cleanup);
            }
        }
    }

    /// Swap in the new read-set and unsubscribe from cells that dropped out.
    fn replace_dependencies(&self, next: Dependencies, subscriber: SubscriberId) {
        let stale: SmallVec<[_; 4]> = {
            let mut current = self.dependencies.borrow_mut();
            let previous = mem::replace(&mut *current, next);
            if self.disposed.get() {
                mem::take(&mut *current)
                    .into_values()
                    .chain(previous.into_values())
                    .collect()
            } else {
                previous
                    .into_iter()
                    .filter(|(id, _)| !current.contains_key(id))
                    .map(|(_, source)| source)
                    .collect()
            }
        };

        for source in stale {
            if let Some(source) = source.upgrade() {
                source.unsubscribe(subscriber);
            }
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }

        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            self.guarded("cleanup", cleanup);
        }

        let subscriber = self.subscriber.borrow().as_ref().map(WeakSubscriber::id);
        let dependencies = mem::take(&mut *self.dependencies.borrow_mut());
        if let Some(subscriber) = subscriber {
            for source in dependencies.into_values() {
                if let Some(source) = source.upgrade() {
                    source.unsubscribe(subscriber);
                }
            }
        }
    }

    fn guarded(&self, phase: &'static str, f: Cleanup) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            error!(
                effect = self.id,
                phase,
                panic = panic_message(payload.as_ref()),
                "effect error"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
