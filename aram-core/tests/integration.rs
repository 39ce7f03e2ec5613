//! Integration Tests for the Reactive Runtime
//!
//! These tests verify that state, computed values, effects, lifecycle and
//! control flow work together against the live document.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use aram_core::config::{configure, RuntimeConfig};
use aram_core::context::{create_context, use_context};
use aram_core::control::{for_each, show, watch, when_else};
use aram_core::dom::{mount, mount_by_id, Document, Node, View};
use aram_core::lifecycle::{on_cleanup, on_mount, with_current_node};
use aram_core::reactive::{
    batch, cleanup, computed, create_effect, effect, state, Subscriber,
};
use aram_core::Error;

fn counter() -> (Rc<Cell<usize>>, impl Fn() + Clone + 'static) {
    let calls = Rc::new(Cell::new(0));
    let calls_clone = calls.clone();
    (calls, move || calls_clone.set(calls_clone.get() + 1))
}

fn region(view: View) -> Node {
    match view {
        View::Node(node) => node,
        other => panic!("expected a reactive region, got {other:?}"),
    }
}

fn texts(node: &Node) -> Vec<String> {
    node.children().iter().map(Node::text_content).collect()
}

/// The counter scenario: functional and value sets, then an equal set.
#[test]
fn counter_scenario() {
    let c = state(0);
    c.update(|n| n + 1);
    assert_eq!(c.get(), 1);

    c.set(5);
    assert_eq!(c.get(), 5);

    let (calls, notify) = counter();
    let _d = c.subscribe(notify);
    c.set(5);
    assert_eq!(calls.get(), 0);
}

/// A computed value follows its base cell.
#[test]
fn computed_chain_scenario() {
    let base = state(2);
    let b = base.clone();
    let doubled = computed(move || b.get() * 2).unwrap();
    assert_eq!(doubled.get(), 4);

    base.set(3);
    assert_eq!(doubled.get(), 6);

    assert!(matches!(doubled.set(10), Err(Error::ComputedWrite)));
}

/// An effect stops hearing about a cell once it no longer reads it.
#[test]
fn dependency_re_establishment() {
    let use_a = state(true);
    let a = state(0);
    let runs = Rc::new(Cell::new(0));

    let (flag, cell, r) = (use_a.clone(), a.clone(), runs.clone());
    let _effect = effect(move || {
        r.set(r.get() + 1);
        if flag.get() {
            cell.get();
        }
    });

    a.set(1);
    assert_eq!(runs.get(), 2);

    use_a.set(false);
    assert_eq!(runs.get(), 3);

    a.set(2);
    a.set(3);
    assert_eq!(runs.get(), 3);
}

/// A subscriber on two cells runs once for a batch that writes both.
#[test]
fn batch_coalescing() {
    let a = state(0);
    let b = state(0);
    let (calls, notify) = counter();
    let subscriber = Subscriber::new(notify);
    let _da = a.subscribe_with(subscriber.clone());
    let _db = b.subscribe_with(subscriber);

    batch(|| {
        a.set(1);
        b.set(2);
    });
    assert_eq!(calls.get(), 1);
}

/// A write made by a subscriber during a flush is not lost.
#[test]
fn writes_during_flush_are_scheduled_afresh() {
    let source = state(0);
    let mirror = state(0);

    let (s, m) = (source.clone(), mirror.clone());
    let _d = source.subscribe(move || m.set(s.get_untracked() * 10));

    batch(|| source.set(2));
    assert_eq!(mirror.get(), 20);
}

/// Calling a disposer twice is the same as calling it once.
#[test]
fn disposal_idempotence() {
    let cell = state(0);
    let (calls, notify) = counter();
    let keep = cell.subscribe(notify.clone());
    let drop_me = cell.subscribe(notify);

    drop_me.dispose();
    drop_me.dispose();
    cell.set(1);

    assert_eq!(calls.get(), 1);
    assert_eq!(cell.subscriber_count(), 1);
    keep.dispose();
}

/// A mount teardown runs exactly once, and only after attachment.
#[test]
fn lifecycle_symmetry() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let node = Node::element("div");

    let e = events.clone();
    with_current_node(&node, || {
        on_mount(move || {
            e.borrow_mut().push("mount");
            let e = e.clone();
            cleanup(move || e.borrow_mut().push("teardown"))
        })
    });

    Document::run_until_idle();
    assert!(events.borrow().is_empty());

    mount(node.clone(), &Document::body()).unwrap();
    Document::run_until_idle();
    Document::body().remove_child(&node).unwrap();
    Document::run_until_idle();
    Document::body().append_child(&node).unwrap();
    Document::run_until_idle();
    Document::body().remove_child(&node).unwrap();
    Document::run_until_idle();

    assert_eq!(*events.borrow(), vec!["mount", "teardown"]);
}

/// The If scenario: one child at a time, the old one detached.
#[test]
fn if_toggling_scenario() {
    let flag = state(false);
    let node_a = Node::text("A");
    let node_b = Node::text("B");

    let (a, b) = (node_a.clone(), node_b.clone());
    let frag = region(when_else(&flag, move || Some(a.clone()), move || Some(b.clone())));
    mount(frag.clone(), &Document::body()).unwrap();
    assert_eq!(frag.children(), vec![node_b.clone()]);

    flag.set(true);
    assert_eq!(frag.children(), vec![node_a]);
    assert!(!node_b.is_connected());
}

/// The For scenario: the list is rebuilt, not patched.
#[test]
fn for_full_rebuild_scenario() {
    let list = state(vec![1, 2, 3]);
    let frag = region(for_each(&list, |n, _| Node::text(n.to_string())));
    assert_eq!(texts(&frag), vec!["1", "2", "3"]);
    let first_render = frag.children();

    list.set(vec![3, 1]);
    assert_eq!(texts(&frag), vec!["3", "1"]);
    assert!(frag
        .children()
        .iter()
        .all(|node| !first_render.contains(node)));
}

/// Cleanup registered by a nested renderer runs when its row is rebuilt away.
#[test]
fn nested_regions_dispose_with_their_rows() {
    let rows = state(vec![1]);
    let label = state("x".to_string());

    let l = label.clone();
    let frag = region(for_each(&rows, move |_, _| watch(&l, |s| Node::text(s))));
    mount(frag.clone(), &Document::body()).unwrap();
    Document::run_until_idle();
    assert_eq!(label.subscriber_count(), 1);

    rows.set(vec![1, 2]);
    Document::run_until_idle();
    assert_eq!(label.subscriber_count(), 2);

    rows.set(Vec::new());
    Document::run_until_idle();
    assert_eq!(label.subscriber_count(), 0);
}

/// Cleanup effects tear down with their widget.
#[test]
fn effect_disposed_by_on_cleanup() {
    let count = state(0);
    let seen = Rc::new(Cell::new(0));
    let widget = Node::element("section");

    let (c, s) = (count.clone(), seen.clone());
    with_current_node(&widget, || {
        let running = create_effect(move || s.set(c.get()));
        on_cleanup(move || running.dispose());
    });

    mount(widget.clone(), &Document::body()).unwrap();
    Document::run_until_idle();
    count.set(1);
    assert_eq!(seen.get(), 1);

    Document::body().remove_child(&widget).unwrap();
    Document::run_until_idle();
    count.set(2);
    assert_eq!(seen.get(), 1);
    assert_eq!(count.subscriber_count(), 0);
}

/// Context flows from a provider to a node rendered inside a region.
#[test]
fn context_through_a_region() {
    let theme = create_context("light");
    let visible = state(true);
    let button = Node::element("button");

    let panel = region(show(&visible, button.clone()));
    let provider = theme.provider("dark", panel).unwrap();
    mount(provider, &Document::body()).unwrap();

    assert_eq!(use_context(&theme, Some(&button)), "dark");
    assert_eq!(use_context(&theme, None), "light");
}

/// `mount_by_id` resolves targets in the live tree only.
#[test]
fn mount_by_id_targets() {
    let app = Node::element("main");
    app.set_attribute("id", "app");

    assert!(matches!(
        mount_by_id(Node::text("early"), "app"),
        Err(Error::MountTargetNotFound(_))
    ));

    mount(app.clone(), &Document::body()).unwrap();
    mount_by_id(Node::text("hello"), "app").unwrap();
    assert_eq!(app.text_content(), "hello");
}

/// With the frame guard on, a runaway effect is cut off at the cap and
/// resumes after the next frame.
#[test]
fn frame_guard_stops_a_runaway_effect() {
    configure(RuntimeConfig {
        max_updates_per_frame: 10,
        frame_guard: true,
        ..RuntimeConfig::default()
    });

    let ticks = state(0);
    let t = ticks.clone();
    let runaway = effect(move || {
        let n = t.get();
        t.set(n + 1);
    });

    assert_eq!(ticks.get(), 11);
    assert_eq!(runaway.run_count(), 11);

    Document::advance_frame();
    ticks.set(100);
    assert_eq!(runaway.run_count(), 21);
}
