//! The Live Document
//!
//! A per-thread headless document. Its body is the root of the live tree;
//! anything reachable from it is "connected".
//!
//! # Event Loop
//!
//! The document also plays the part of the host event loop:
//!
//! 1. Child-list mutations on connected nodes are queued as
//!    [`MutationRecord`]s. They are never delivered synchronously.
//!
//! 2. [`Document::run_until_idle`] is the end-of-task checkpoint. It drains the
//!    microtask queue and delivers queued records to observers, repeating until
//!    both are empty (observers and microtasks may enqueue more work).
//!
//! 3. [`Document::advance_frame`] runs the animation-frame callbacks requested
//!    since the previous frame, then reaches the checkpoint.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::mem;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::debug;

use super::node::Node;
use super::view::View;
use crate::error::{Error, Result};

/// A batch of child-list changes on one target node.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// The node whose children changed.
    pub target: Node,
    /// Nodes inserted under `target`.
    pub added: SmallVec<[Node; 1]>,
    /// Nodes removed from `target`.
    pub removed: SmallVec<[Node; 1]>,
}

/// Handle returned by [`Document::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type MutationCallback = Rc<dyn Fn(&[MutationRecord])>;
type Task = Box<dyn FnOnce()>;

struct DocumentState {
    body: Node,
    records: Vec<MutationRecord>,
    observers: Vec<(ObserverId, MutationCallback)>,
    next_observer: u64,
    microtasks: VecDeque<Task>,
    frame_callbacks: Vec<Task>,
    frame: u64,
}

impl DocumentState {
    fn new() -> Self {
        Self {
            body: Node::root("body"),
            records: Vec::new(),
            observers: Vec::new(),
            next_observer: 0,
            microtasks: VecDeque::new(),
            frame_callbacks: Vec::new(),
            frame: 0,
        }
    }
}

thread_local! {
    static DOCUMENT: RefCell<DocumentState> = RefCell::new(DocumentState::new());
}

pub(crate) fn enqueue_record(record: MutationRecord) {
    DOCUMENT.with(|doc| doc.borrow_mut().records.push(record));
}

/// The live document of the current thread.
///
/// All state lives in thread-local storage; the type only namespaces the
/// operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Document;

impl Document {
    /// The root of the live tree.
    pub fn body() -> Node {
        DOCUMENT.with(|doc| doc.borrow().body.clone())
    }

    /// Register a structural-mutation observer on the whole document.
    pub fn observe<F>(callback: F) -> ObserverId
    where
        F: Fn(&[MutationRecord]) + 'static,
    {
        DOCUMENT.with(|doc| {
            let mut doc = doc.borrow_mut();
            let id = ObserverId(doc.next_observer);
            doc.next_observer += 1;
            doc.observers.push((id, Rc::new(callback)));
            id
        })
    }

    /// Stop delivering records to an observer.
    pub fn disconnect(id: ObserverId) {
        DOCUMENT.with(|doc| doc.borrow_mut().observers.retain(|(other, _)| *other != id));
    }

    /// Queue a task to run at the next checkpoint, before mutation delivery.
    pub fn queue_microtask<F>(task: F)
    where
        F: FnOnce() + 'static,
    {
        DOCUMENT.with(|doc| doc.borrow_mut().microtasks.push_back(Box::new(task)));
    }

    /// Queue a callback for the next [`Document::advance_frame`].
    pub fn request_animation_frame<F>(callback: F)
    where
        F: FnOnce() + 'static,
    {
        DOCUMENT.with(|doc| doc.borrow_mut().frame_callbacks.push(Box::new(callback)));
    }

    /// Number of mutation records waiting for delivery.
    pub fn pending_records() -> usize {
        DOCUMENT.with(|doc| doc.borrow().records.len())
    }

    /// Number of frames advanced so far.
    pub fn frame() -> u64 {
        DOCUMENT.with(|doc| doc.borrow().frame)
    }

    /// Drain microtasks and deliver mutation records until nothing is left.
    pub fn run_until_idle() {
        loop {
            let task = DOCUMENT.with(|doc| doc.borrow_mut().microtasks.pop_front());
            if let Some(task) = task {
                task();
                continue;
            }

            let records = DOCUMENT.with(|doc| mem::take(&mut doc.borrow_mut().records));
            if records.is_empty() {
                break;
            }

            // Snapshot so observers may register or disconnect while running.
            let observers: Vec<MutationCallback> = DOCUMENT.with(|doc| {
                doc.borrow()
                    .observers
                    .iter()
                    .map(|(_, callback)| Rc::clone(callback))
                    .collect()
            });
            debug!(records = records.len(), observers = observers.len(), "delivering mutations");
            for observer in observers {
                observer(&records);
            }
        }
    }

    /// Run this frame's animation callbacks, then reach the checkpoint.
    pub fn advance_frame() {
        let callbacks = DOCUMENT.with(|doc| {
            let mut doc = doc.borrow_mut();
            doc.frame += 1;
            mem::take(&mut doc.frame_callbacks)
        });
        for callback in callbacks {
            callback();
        }
        Self::run_until_idle();
    }

    /// Depth-first search of the live tree for an element with this `id`
    /// attribute.
    pub fn get_element_by_id(id: &str) -> Option<Node> {
        let mut stack = vec![Self::body()];
        while let Some(node) = stack.pop() {
            if node.attribute("id").as_deref() == Some(id) {
                return Some(node);
            }
            stack.extend(node.children().into_iter().rev());
        }
        None
    }
}

/// Append a view into `target`.
pub fn mount(view: impl Into<View>, target: &Node) -> Result<()> {
    view.into().append_to(target)
}

/// Append a view into the live element whose `id` attribute matches.
pub fn mount_by_id(view: impl Into<View>, id: &str) -> Result<()> {
    let target =
        Document::get_element_by_id(id).ok_or_else(|| Error::MountTargetNotFound(id.to_owned()))?;
    mount(view, &target)
}
