//! Reactive Runtime
//!
//! The runtime is the update scheduler that sits between a state cell's
//! `set` and its subscribers.
//!
//! # How It Works
//!
//! 1. Outside a batch, a notification runs its subscriber synchronously.
//!
//! 2. Inside a [`batch`], notifications are collected into a pending set,
//!    deduplicated by subscriber identity and ordered by first insertion.
//!
//! 3. When the outermost batch exits, the pending set is swapped out and then
//!    flushed, so subscribers that write to cells during the flush schedule
//!    into a fresh set (or run immediately) instead of the one being drained.
//!    A batch closure that panics still flushes before the panic resumes.
//!
//! 4. A cell notification remembers which cells scheduled it. At flush time a
//!    subscriber whose subscriptions to all of those cells were disposed in
//!    the meantime is skipped.
//!
//! # Frame Guard
//!
//! [`safe_schedule_update`] counts updates per animation frame and drops
//! those past [`RuntimeConfig::max_updates_per_frame`], which stops runaway
//! cycles such as an effect that rewrites a cell it also reads. The counter
//! resets from an animation-frame callback. With
//! [`RuntimeConfig::frame_guard`] on, every cell notification goes through
//! the guard.
//!
//! [`RuntimeConfig::max_updates_per_frame`]: crate::config::RuntimeConfig::max_updates_per_frame
//! [`RuntimeConfig::frame_guard`]: crate::config::RuntimeConfig::frame_guard

use std::cell::RefCell;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Weak;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::context::Source;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config::config;
use crate::dom::Document;

/// A deferred notification and the cells that asked for it.
struct PendingUpdate {
    subscriber: Subscriber,
    /// Set by a direct [`schedule_update`] call with no cell behind it.
    direct: bool,
    sources: SmallVec<[Weak<dyn Source>; 2]>,
}

impl PendingUpdate {
    fn new(subscriber: &Subscriber) -> Self {
        Self {
            subscriber: subscriber.clone(),
            direct: false,
            sources: SmallVec::new(),
        }
    }

    fn add_origin(&mut self, source: Option<&Weak<dyn Source>>) {
        match source {
            Some(source) => {
                if !self.sources.iter().any(|known| Weak::ptr_eq(known, source)) {
                    self.sources.push(source.clone());
                }
            }
            None => self.direct = true,
        }
    }

    /// Live if any scheduling cell still holds the subscription. A dropped
    /// cell counts as holding it.
    fn is_live(&self) -> bool {
        let id = self.subscriber.id();
        self.direct
            || self
                .sources
                .iter()
                .any(|source| source.upgrade().map_or(true, |cell| cell.is_subscribed(id)))
    }
}

#[derive(Default)]
struct RuntimeState {
    batch_depth: usize,
    pending: IndexMap<SubscriberId, PendingUpdate>,
    frame_updates: usize,
    frame_dropped: usize,
    frame_reset_requested: bool,
}

thread_local! {
    static RUNTIME: RefCell<RuntimeState> = RefCell::new(RuntimeState::default());
}

/// The per-thread update scheduler.
///
/// All state lives in thread-local storage; the type only namespaces the
/// operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runtime;

impl Runtime {
    /// Route a cell notification, honouring the configured frame guard.
    pub fn schedule(subscriber: &Subscriber) {
        route(subscriber, None);
    }

    /// [`Runtime::schedule`] for a notification raised by `source`.
    pub(crate) fn schedule_from(source: &Weak<dyn Source>, subscriber: &Subscriber) {
        route(subscriber, Some(source));
    }

    /// Current batch nesting depth.
    pub fn batch_depth() -> usize {
        RUNTIME.with(|rt| rt.borrow().batch_depth)
    }

    /// Number of subscribers waiting for the outermost batch to exit.
    pub fn pending_count() -> usize {
        RUNTIME.with(|rt| rt.borrow().pending.len())
    }

    /// Updates counted by the frame guard since the last frame boundary.
    pub fn updates_this_frame() -> usize {
        RUNTIME.with(|rt| rt.borrow().frame_updates)
    }
}

/// Run `f` with notifications deferred and coalesced until it returns.
///
/// Batches nest; only the outermost one flushes. Each distinct subscriber is
/// notified once, however many of its cells changed. If `f` panics, the
/// batch is closed and flushed and the panic then resumes.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    RUNTIME.with(|rt| rt.borrow_mut().batch_depth += 1);
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    end_batch();
    match result {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Check if a batch is open.
pub fn is_batching() -> bool {
    Runtime::batch_depth() > 0
}

/// Notify now, or defer into the open batch.
pub fn schedule_update(subscriber: &Subscriber) {
    enqueue(subscriber, None);
}

/// [`schedule_update`] behind the per-frame cap.
pub fn safe_schedule_update(subscriber: &Subscriber) {
    guarded(subscriber, None);
}

fn route(subscriber: &Subscriber, source: Option<&Weak<dyn Source>>) {
    if config().frame_guard {
        guarded(subscriber, source);
    } else {
        enqueue(subscriber, source);
    }
}

fn enqueue(subscriber: &Subscriber, source: Option<&Weak<dyn Source>>) {
    let deferred = RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if rt.batch_depth > 0 {
            rt.pending
                .entry(subscriber.id())
                .or_insert_with(|| PendingUpdate::new(subscriber))
                .add_origin(source);
            true
        } else {
            false
        }
    });
    if !deferred {
        subscriber.notify();
    }
}

fn guarded(subscriber: &Subscriber, source: Option<&Weak<dyn Source>>) {
    let settings = config();
    let (allowed, request_reset, first_drop) = RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        rt.frame_updates += 1;
        let request_reset = !rt.frame_reset_requested;
        rt.frame_reset_requested = true;

        let allowed = rt.frame_updates <= settings.max_updates_per_frame;
        if !allowed {
            rt.frame_dropped += 1;
        }
        (allowed, request_reset, rt.frame_dropped == 1 && !allowed)
    });

    if request_reset {
        Document::request_animation_frame(reset_frame_budget);
    }

    if !allowed {
        if settings.dev_mode && first_drop {
            warn!(
                limit = settings.max_updates_per_frame,
                subscriber = %subscriber.id(),
                "possible infinite update loop; dropping updates until the next frame"
            );
        }
        return;
    }
    enqueue(subscriber, source);
}

fn reset_frame_budget() {
    let dropped = RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        rt.frame_updates = 0;
        rt.frame_reset_requested = false;
        mem::take(&mut rt.frame_dropped)
    });
    if dropped > 0 {
        debug!(dropped, "frame budget reset");
    }
}

/// Close a batch level, flushing when it was the outermost.
fn end_batch() {
    let pending = RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        rt.batch_depth -= 1;
        if rt.batch_depth == 0 {
            mem::take(&mut rt.pending)
        } else {
            IndexMap::new()
        }
    });
    if pending.is_empty() {
        return;
    }

    debug!(count = pending.len(), "flushing batch");
    for update in pending.into_values() {
        if update.is_live() {
            update.subscriber.notify();
        }
    }
}
