#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use arbor_core::{Child, Component, Element, Lanes, PriorityLevel, RenderInterrupt};
use common::{counter_component, counters, keyed_list, new_reconciler, render_sync};

#[test]
fn test_updates_in_one_tick_commit_once() {
    let mut reconciler = new_reconciler();
    let (counter, setters) = counter_component();
    render_sync(&mut reconciler, counters(&counter, &["a", "b"]));
    let commits_before = reconciler.commit_log().len();

    {
        let setters = setters.borrow();
        setters["a"].update(|count| count + 1);
        setters["a"].update(|count| count + 1);
        setters["b"].set(7);
    }
    reconciler.flush_sync_work();

    assert_eq!(reconciler.commit_log().len(), commits_before + 1);
    assert_eq!(reconciler.host().text_content(), "a:2b:7");
}

#[test]
fn test_sync_renders_request_one_microtask_per_batch() {
    let mut reconciler = new_reconciler();

    reconciler.render(Child::text("one"));
    reconciler.render(Child::text("two"));
    assert_eq!(reconciler.host().microtask_requests(), 1);

    reconciler.flush_sync_work();
    assert_eq!(reconciler.commit_log().len(), 1);
    assert_eq!(reconciler.host().text_content(), "two");

    reconciler.render(Child::text("three"));
    assert_eq!(reconciler.host().microtask_requests(), 2);
}

#[test]
fn test_default_lane_runs_as_scheduler_task() {
    let mut reconciler = new_reconciler();

    reconciler.render_with_lane(keyed_list(&["a"]), Lanes::DEFAULT);
    reconciler.flush_sync_work();
    assert!(reconciler.commit_log().is_empty());
    assert_eq!(reconciler.scheduler().pending_priorities(), vec![PriorityLevel::Normal]);

    reconciler.run_until_idle();
    assert_eq!(reconciler.commit_log().len(), 1);
    assert_eq!(reconciler.commit_log()[0].lanes, Lanes::DEFAULT.bits());
    assert!(!reconciler.has_pending_work());
}

#[test]
fn test_concurrent_render_resumes_across_slices() {
    let mut reconciler = new_reconciler();
    let keys: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();

    reconciler.render_with_lane(keyed_list(&keys), Lanes::TRANSITION);
    let mut slices = 0;
    while reconciler.commit_log().is_empty() {
        assert!(reconciler.run_next_task());
        slices += 1;
    }

    // 22 units of work at 4 per slice.
    assert_eq!(slices, 6);
    assert_eq!(reconciler.host().text_content(), "0123456789");
}

#[test]
fn test_expired_task_renders_without_yielding() {
    let mut reconciler = new_reconciler();
    let keys: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();

    reconciler.render_with_lane(keyed_list(&keys), Lanes::DEFAULT);
    reconciler.scheduler_mut().advance(10_000);
    assert!(reconciler.run_next_task());

    assert_eq!(reconciler.commit_log().len(), 1);
}

#[test]
fn test_sync_update_discards_in_progress_default_render() {
    let renders: Rc<RefCell<Vec<String>>> = Rc::default();
    let effects: Rc<RefCell<Vec<String>>> = Rc::default();
    let (render_log, effect_log) = (renders.clone(), effects.clone());
    let with_effect = Component::new("WithEffect", move |_, hooks| {
        render_log.borrow_mut().push("render".to_string());
        let effect_log = effect_log.clone();
        hooks.use_effect(
            move || {
                effect_log.borrow_mut().push("create".to_string());
                None
            },
            None,
        )?;
        Ok::<Child, RenderInterrupt>(Child::text("effect"))
    });

    let mut reconciler = new_reconciler();
    reconciler.render_with_lane(
        Element::host("div")
            .child(Element::component(&with_effect))
            .child(keyed_list(&["a", "b", "c", "d"])),
        Lanes::DEFAULT,
    );
    assert!(reconciler.run_next_task());
    assert!(reconciler.is_rendering());
    assert_eq!(*renders.borrow(), vec!["render"]);

    render_sync(&mut reconciler, Element::host("p").child("urgent"));

    let sync_commit = reconciler.last_commit().unwrap();
    assert_eq!(sync_commit.lanes, Lanes::SYNC.bits());
    assert_eq!(sync_commit.placements, 1);
    assert_eq!(reconciler.host().to_markup(), "<p>urgent</p>");

    // The default update is rendered again underneath the later sync one.
    reconciler.run_until_idle();
    assert_eq!(reconciler.commit_log().len(), 2);
    assert_eq!(reconciler.last_commit().unwrap().lanes, Lanes::DEFAULT.bits());
    assert_eq!(reconciler.host().to_markup(), "<p>urgent</p>");

    // Effects queued by the discarded attempt never reach a commit.
    assert!(effects.borrow().is_empty());
}

#[test]
fn test_discarded_attempt_releases_its_host_nodes() {
    let mut reconciler = new_reconciler();
    reconciler.render_with_lane(keyed_list(&["a", "b", "c", "d"]), Lanes::DEFAULT);
    assert!(reconciler.run_next_task());
    assert!(reconciler.is_rendering());
    let built = reconciler.host().node_count();
    assert!(built > 0);

    render_sync(&mut reconciler, Element::host("p").child("urgent"));
    assert_eq!(reconciler.host().node_count(), 2);

    reconciler.run_until_idle();
    assert_eq!(reconciler.host().to_markup(), "<p>urgent</p>");
    assert_eq!(reconciler.host().node_count(), 2);
}

#[test]
fn test_higher_priority_lane_commits_first() {
    let mut reconciler = new_reconciler();
    let (counter, setters) = counter_component();
    render_sync(&mut reconciler, counters(&counter, &["a"]));

    {
        let setters = setters.borrow();
        setters["a"].update_with_lane(|count| count + 10, Lanes::IDLE);
        setters["a"].update_with_lane(|count| count + 1, Lanes::INPUT_CONTINUOUS);
    }
    reconciler.flush_sync_work();
    assert!(reconciler.run_next_task());

    let first = reconciler.last_commit().unwrap();
    assert_eq!(first.lanes, Lanes::INPUT_CONTINUOUS.bits());
    assert_eq!(reconciler.host().text_content(), "a:1");

    reconciler.run_until_idle();
    assert_eq!(reconciler.last_commit().unwrap().lanes, Lanes::IDLE.bits());
    assert_eq!(reconciler.host().text_content(), "a:11");
}

#[test]
fn test_suspended_and_pending_lanes_clear_after_commit() {
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, Child::text("done"));

    assert!(reconciler.root().pending_lanes().is_empty());
    assert!(reconciler.root().suspended_lanes().is_empty());
    assert!(reconciler.root().callback_priority().is_empty());
}
