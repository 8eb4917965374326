//! Reconciler Demonstration
//!
//! This example walks through the main paths of the reconciler on the
//! in-memory host.
#![allow(clippy::unwrap_used, clippy::expect_used)]
//!
//! Key concepts illustrated:
//! 1. Mounting and keyed reordering
//! 2. Component state surviving a reorder
//! 3. Sync batching versus time-sliced default-lane work
//! 4. The host operation log and commit reports

use std::cell::RefCell;
use std::rc::Rc;

use arbor_core::{
    Child, Component, Element, Lanes, MemoryHost, Reconciler, ReconcilerConfig, RenderInterrupt,
    StateSetter,
};

fn list(keys: &[&str]) -> Element {
    Element::host("ul").children(keys.iter().map(|key| Element::host("li").key(*key).child(*key)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Arbor Reconciler Demo ===\n");

    // ===== Part 1: Mount and reorder =====
    println!("## Part 1: Keyed reorder\n");

    let mut reconciler = Reconciler::new(MemoryHost::new(), ReconcilerConfig::with_budget(3))?;
    reconciler.render(list(&["a", "b", "c"]));
    reconciler.flush_sync_work();
    println!("mounted:   {}", reconciler.host().to_markup());

    reconciler.host_mut().clear_ops();
    reconciler.render(list(&["b", "a", "c"]));
    reconciler.flush_sync_work();
    let report = reconciler.last_commit().unwrap();
    println!("reordered: {}", reconciler.host().to_markup());
    println!(
        "  moves={} placements={} deletions={} host ops={}",
        report.moves,
        report.placements,
        report.deletions,
        reconciler.host().ops().len()
    );

    // ===== Part 2: State survives a reorder =====
    println!("\n## Part 2: Component state\n");

    let setter: Rc<RefCell<Option<StateSetter<i64>>>> = Rc::new(RefCell::new(None));
    let captured = setter.clone();
    let counter = Component::new("Counter", move |_, hooks| {
        let (count, set_count) = hooks.use_state(|| 0i64)?;
        *captured.borrow_mut() = Some(set_count);
        Ok::<Child, RenderInterrupt>(Child::text(format!("count={}", count)))
    });

    let tree = |order: &[&str]| {
        Element::host("div").children(order.iter().map(|key| {
            if *key == "counter" {
                Element::component(&counter).key("counter")
            } else {
                Element::host("hr").key(*key)
            }
        }))
    };

    reconciler.render(tree(&["counter", "rule"]));
    reconciler.flush_sync_work();

    let set_count = setter.borrow().clone().unwrap();
    set_count.update(|n| n + 1);
    set_count.update(|n| n + 1);
    reconciler.flush_sync_work();
    println!("after two batched updates: {}", reconciler.host().to_markup());

    reconciler.render(tree(&["rule", "counter"]));
    reconciler.flush_sync_work();
    println!("after reorder:             {}", reconciler.host().to_markup());

    // ===== Part 3: Time-sliced work =====
    println!("\n## Part 3: Default lane\n");

    reconciler.render_with_lane(list(&["x", "y", "z"]), Lanes::DEFAULT);
    reconciler.flush_sync_work();
    let mut slices = 0;
    while reconciler.run_next_task() {
        slices += 1;
    }
    println!("rendered in {} scheduler tasks: {}", slices, reconciler.host().to_markup());

    // ===== Part 4: Commit log =====
    println!("\n## Part 4: Commit log\n");
    for report in reconciler.commit_log() {
        println!("{}", serde_json::to_string(report)?);
    }

    Ok(())
}
