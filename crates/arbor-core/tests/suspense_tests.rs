#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arbor_core::{Awaitable, Child, Component, Element, Lanes, RenderInterrupt, Resolver};
use common::{new_reconciler, render_sync};

fn reader(awaitable: &Awaitable<String>) -> Component {
    let awaitable = awaitable.clone();
    Component::new("Reader", move |_, hooks| {
        let value = hooks.use_awaitable(&awaitable)?;
        Ok::<Child, RenderInterrupt>(Child::text(value))
    })
}

#[test]
fn test_pending_awaitable_parks_lane_until_resolved() {
    let (awaitable, resolver) = Awaitable::<String>::pending();
    let component = reader(&awaitable);
    let mut reconciler = new_reconciler();

    render_sync(&mut reconciler, Element::host("div").child(Element::component(&component)));

    assert!(reconciler.commit_log().is_empty());
    assert_eq!(reconciler.root().suspended_lanes(), Lanes::SYNC);
    assert_eq!(reconciler.host().to_markup(), "");

    resolver.resolve("loaded".to_string());
    reconciler.flush_sync_work();

    assert_eq!(reconciler.commit_log().len(), 1);
    assert_eq!(reconciler.host().to_markup(), "<div>loaded</div>");
    assert!(reconciler.root().suspended_lanes().is_empty());
}

#[test]
fn test_source_runs_once_across_retries() {
    let slot: Rc<RefCell<Option<Resolver<String>>>> = Rc::default();
    let started = Rc::new(Cell::new(0));
    let awaitable = {
        let slot = slot.clone();
        let started = started.clone();
        Awaitable::new(move |resolver| {
            started.set(started.get() + 1);
            *slot.borrow_mut() = Some(resolver);
        })
    };
    let component = reader(&awaitable);
    let mut reconciler = new_reconciler();

    render_sync(&mut reconciler, Element::component(&component));
    // Another update while parked does not restart the source.
    render_sync(&mut reconciler, Element::component(&component));
    assert_eq!(started.get(), 1);
    assert!(reconciler.commit_log().is_empty());

    slot.borrow().as_ref().unwrap().resolve("ready".to_string());
    reconciler.flush_sync_work();

    assert_eq!(reconciler.host().text_content(), "ready");
    assert_eq!(awaitable.invocations(), 1);
    assert_eq!(started.get(), 1);
}

#[test]
fn test_resolved_value_is_cached_for_later_renders() {
    let awaitable = Awaitable::resolved("cached".to_string());
    let component = reader(&awaitable);
    let mut reconciler = new_reconciler();

    render_sync(&mut reconciler, Element::component(&component));
    render_sync(&mut reconciler, Element::host("main").child(Element::component(&component)));

    assert_eq!(reconciler.commit_log().len(), 2);
    assert_eq!(reconciler.host().to_markup(), "<main>cached</main>");
}

#[test]
fn test_synchronous_source_does_not_suspend() {
    let awaitable = Awaitable::new(|resolver: Resolver<String>| resolver.resolve("now".to_string()));
    let component = reader(&awaitable);
    let mut reconciler = new_reconciler();

    render_sync(&mut reconciler, Element::component(&component));

    assert_eq!(reconciler.commit_log().len(), 1);
    assert_eq!(reconciler.host().text_content(), "now");
}

#[test]
fn test_rejected_awaitable_discards_attempt() {
    let (awaitable, resolver) = Awaitable::<String>::pending();
    let component = reader(&awaitable);
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, Child::text("before"));

    render_sync(&mut reconciler, Element::component(&component));
    resolver.reject("network down");
    reconciler.flush_sync_work();

    assert_eq!(reconciler.commit_log().len(), 1);
    assert_eq!(reconciler.host().text_content(), "before");
    assert!(reconciler.diagnostics().has_code("ERR_AWAITABLE_REJECTED"));
    assert!(reconciler.root().pending_lanes().is_empty());
}

#[test]
fn test_other_lanes_proceed_while_one_is_suspended() {
    let (awaitable, resolver) = Awaitable::<String>::pending();
    let component = reader(&awaitable);
    let mut reconciler = new_reconciler();

    reconciler.render_with_lane(Element::component(&component), Lanes::TRANSITION);
    reconciler.run_until_idle();
    assert_eq!(reconciler.root().suspended_lanes(), Lanes::TRANSITION);

    render_sync(&mut reconciler, Child::text("shell"));
    assert_eq!(reconciler.host().text_content(), "shell");

    resolver.resolve("content".to_string());
    reconciler.run_until_idle();
    // Updates apply in enqueue order, so the later sync description wins.
    assert_eq!(reconciler.host().text_content(), "shell");
    assert!(reconciler.root().pending_lanes().is_empty());
}

#[test]
fn test_new_update_retries_suspended_lane() {
    let (awaitable, _resolver) = Awaitable::<String>::pending();
    let component = reader(&awaitable);
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, Child::text("before"));

    render_sync(&mut reconciler, Element::component(&component));
    assert_eq!(reconciler.root().suspended_lanes(), Lanes::SYNC);

    render_sync(&mut reconciler, Child::text("after"));
    reconciler.run_until_idle();

    assert_eq!(reconciler.commit_log().len(), 2);
    assert_eq!(reconciler.host().text_content(), "after");
    assert!(reconciler.root().suspended_lanes().is_empty());
    assert!(reconciler.root().pending_lanes().is_empty());
}

#[test]
fn test_update_that_still_suspends_parks_again() {
    let (awaitable, resolver) = Awaitable::<String>::pending();
    let component = reader(&awaitable);
    let mut reconciler = new_reconciler();

    render_sync(&mut reconciler, Element::component(&component));
    render_sync(&mut reconciler, Element::host("section").child(Element::component(&component)));
    assert!(reconciler.commit_log().is_empty());
    assert_eq!(reconciler.root().suspended_lanes(), Lanes::SYNC);

    resolver.resolve("late".to_string());
    reconciler.flush_sync_work();
    assert_eq!(reconciler.commit_log().len(), 1);
    assert_eq!(reconciler.host().to_markup(), "<section>late</section>");
}
