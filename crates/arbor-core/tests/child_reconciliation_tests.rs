#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use arbor_core::{Child, Element, HostOp, HostParent};
use common::{counter_component, counters, keyed_list, new_reconciler, render_sync};

#[test]
fn test_mount_builds_host_tree() {
    let mut reconciler = new_reconciler();

    render_sync(&mut reconciler, keyed_list(&["a", "b", "c"]));

    assert_eq!(
        reconciler.host().to_markup(),
        "<ul><li>a</li><li>b</li><li>c</li></ul>"
    );
    let report = reconciler.last_commit().unwrap();
    // The list is placed once as a whole; its children were attached while detached.
    assert_eq!(report.placements, 1);
    assert_eq!(report.host_nodes_created, 7);
}

#[test]
fn test_swap_first_two_is_one_move_without_creation() {
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, keyed_list(&["a", "b", "c"]));
    reconciler.host_mut().clear_ops();

    render_sync(&mut reconciler, keyed_list(&["b", "a", "c"]));

    let report = reconciler.last_commit().unwrap();
    assert_eq!(report.moves, 1);
    assert_eq!(report.deletions, 0);
    assert_eq!(report.placements, 0);
    assert_eq!(report.host_nodes_created, 0);
    assert_eq!(
        reconciler.host().to_markup(),
        "<ul><li>b</li><li>a</li><li>c</li></ul>"
    );
    assert_eq!(reconciler.host().ops().iter().filter(|op| op.is_mutation()).count(), 1);
}

#[test]
fn test_middle_swap_moves_only_the_displaced_item() {
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, keyed_list(&["A", "B", "C", "D"]));

    render_sync(&mut reconciler, keyed_list(&["A", "C", "B", "D"]));

    let report = reconciler.last_commit().unwrap();
    assert_eq!(report.moves, 1);
    assert_eq!(report.deletions, 0);
    assert_eq!(reconciler.host().text_content(), "ACBD");
}

#[test]
fn test_removed_key_is_deleted_exactly_once() {
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, keyed_list(&["a", "b", "c"]));

    render_sync(&mut reconciler, keyed_list(&["a", "c"]));
    assert_eq!(reconciler.last_commit().unwrap().deletions, 1);
    assert_eq!(reconciler.host().to_markup(), "<ul><li>a</li><li>c</li></ul>");

    render_sync(&mut reconciler, keyed_list(&["a", "c"]));
    assert_eq!(reconciler.last_commit().unwrap().deletions, 0);

    let removals = reconciler
        .host()
        .ops()
        .iter()
        .filter(|op| matches!(op, HostOp::RemoveChild { .. }))
        .count();
    assert_eq!(removals, 1);
}

#[test]
fn test_type_change_replaces_subtree() {
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, Element::host("div").child("x"));

    render_sync(&mut reconciler, Element::host("span").child("x"));

    let report = reconciler.last_commit().unwrap();
    assert_eq!(report.deletions, 1);
    assert_eq!(report.placements, 1);
    assert_eq!(reconciler.host().to_markup(), "<span>x</span>");
    assert_eq!(reconciler.host().children(HostParent::Container).len(), 1);
}

#[test]
fn test_attribute_and_text_updates() {
    let mut reconciler = new_reconciler();
    render_sync(
        &mut reconciler,
        Element::host("p").attr("class", "old").child("before"),
    );

    render_sync(
        &mut reconciler,
        Element::host("p").attr("class", "new").child("after"),
    );

    let report = reconciler.last_commit().unwrap();
    assert_eq!(report.updates, 2);
    assert_eq!(report.host_nodes_created, 0);
    assert_eq!(reconciler.host().to_markup(), "<p class=\"new\">after</p>");
}

#[test]
fn test_unkeyed_fragment_children_flatten_into_parent() {
    let mut reconciler = new_reconciler();

    render_sync(
        &mut reconciler,
        Element::host("div").child(
            Element::fragment()
                .child(Element::host("b").child("1"))
                .child(Element::host("i").child("2")),
        ),
    );

    assert_eq!(reconciler.host().to_markup(), "<div><b>1</b><i>2</i></div>");
}

#[test]
fn test_nested_list_keeps_position() {
    let mut reconciler = new_reconciler();
    let nested = |items: &[&str]| {
        Element::host("div")
            .child(Element::host("h1").child("title"))
            .child(Child::list(items.iter().map(|item| Element::host("p").key(*item).child(*item))))
            .child(Element::host("footer"))
    };

    render_sync(&mut reconciler, nested(&["x", "y"]));
    render_sync(&mut reconciler, nested(&["y", "x", "z"]));

    assert_eq!(
        reconciler.host().to_markup(),
        "<div><h1>title</h1><p>y</p><p>x</p><p>z</p><footer/></div>"
    );
}

#[test]
fn test_keyed_component_state_survives_reorder() {
    let mut reconciler = new_reconciler();
    let (counter, setters) = counter_component();
    render_sync(&mut reconciler, counters(&counter, &["a", "b", "c"]));

    setters.borrow()["b"].set(5);
    reconciler.flush_sync_work();
    assert_eq!(reconciler.host().text_content(), "a:0b:5c:0");

    render_sync(&mut reconciler, counters(&counter, &["c", "b", "a"]));

    assert_eq!(reconciler.host().text_content(), "c:0b:5a:0");
    let report = reconciler.last_commit().unwrap();
    assert_eq!(report.deletions, 0);
    assert_eq!(report.host_nodes_created, 0);
}

#[test]
fn test_duplicate_keys_leave_no_stale_nodes() {
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, keyed_list(&["a", "a", "b"]));
    assert_eq!(
        reconciler.host().to_markup(),
        "<ul><li>a</li><li>a</li><li>b</li></ul>"
    );

    render_sync(&mut reconciler, keyed_list(&["a"]));
    assert_eq!(reconciler.host().to_markup(), "<ul><li>a</li></ul>");
    assert_eq!(reconciler.last_commit().unwrap().deletions, 2);
    assert!(reconciler.diagnostics().has_code("ERR_DUPLICATE_KEY"));
}
