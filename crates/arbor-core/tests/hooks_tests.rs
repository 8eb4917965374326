#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use arbor_core::{
    Child, Component, Context, DiagnosticsMode, Element, MemoryHost, Reconciler,
    ReconcilerConfig, ReconcileError, RenderInterrupt,
};
use common::{counter_component, counters, new_reconciler, render_sync};
use serde_json::{json, Value};

fn theme_reader(theme: &Context) -> Component {
    let theme = theme.clone();
    Component::new("ThemeReader", move |_, hooks| {
        let value = hooks.use_context(&theme)?;
        Ok::<Child, RenderInterrupt>(Child::text(value.as_str().unwrap_or("?").to_string()))
    })
}

#[test]
fn test_context_reads_default_without_provider() {
    let theme = Context::new(json!("light"));
    let reader = theme_reader(&theme);
    let mut reconciler = new_reconciler();

    render_sync(&mut reconciler, Element::component(&reader));

    assert_eq!(reconciler.host().text_content(), "light");
}

#[test]
fn test_nearest_provider_wins() {
    let theme = Context::new(json!("light"));
    let reader = theme_reader(&theme);
    let mut reconciler = new_reconciler();

    render_sync(
        &mut reconciler,
        Element::host("div").children([
            Element::provider(&theme, json!("dark")).child(
                Element::host("section")
                    .child(Element::component(&reader))
                    .child(Element::provider(&theme, json!("blue")).child(Element::component(&reader))),
            ),
            Element::component(&reader),
        ]),
    );

    assert_eq!(reconciler.host().text_content(), "darkbluelight");
}

#[test]
fn test_provider_value_change_rerenders_consumers() {
    let theme = Context::new(Value::Null);
    let reader = theme_reader(&theme);
    let mut reconciler = new_reconciler();
    let tree = |value: &str| Element::provider(&theme, json!(value)).child(Element::component(&reader));

    render_sync(&mut reconciler, tree("dark"));
    render_sync(&mut reconciler, tree("light"));

    assert_eq!(reconciler.host().text_content(), "light");
    assert_eq!(reconciler.last_commit().unwrap().updates, 1);
}

#[test]
fn test_hook_order_change_discards_render() {
    let component = Component::new("Conditional", |element, hooks| {
        let (first, _) = hooks.use_state(|| 1i64)?;
        let mut total = first;
        if element.attr_value("extra").is_some() {
            let (second, _) = hooks.use_state(|| 10i64)?;
            total += second;
        }
        Ok::<Child, RenderInterrupt>(Child::text(total.to_string()))
    });
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, Element::component(&component));

    render_sync(&mut reconciler, Element::component(&component).attr("extra", true));

    assert_eq!(reconciler.commit_log().len(), 1);
    assert_eq!(reconciler.host().text_content(), "1");
    assert!(reconciler.diagnostics().has_code("ERR_HOOK_ORDER_MISMATCH"));
}

#[test]
fn test_component_failure_keeps_committed_tree() {
    let component = Component::new("Fragile", |element, _| {
        if element.attr_value("fail").is_some() {
            return Err(ReconcileError::component_failed("Fragile", "bad input").into());
        }
        Ok(Child::text("ok"))
    });
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, Element::component(&component));

    render_sync(&mut reconciler, Element::component(&component).attr("fail", true));

    assert_eq!(reconciler.host().text_content(), "ok");
    assert!(reconciler.diagnostics().has_code("ERR_COMPONENT_FAILED"));
    assert!(reconciler.root().pending_lanes().is_empty());
    let diagnostic = reconciler
        .diagnostics()
        .entries()
        .find(|d| d.code == "ERR_COMPONENT_FAILED")
        .unwrap();
    assert_eq!(diagnostic.fiber.as_deref(), Some("Fragile"));
    assert_eq!(diagnostic.lanes, Some(1));

    // A later render of the same lane recovers.
    render_sync(&mut reconciler, Element::component(&component).attr("label", "fine"));
    assert_eq!(reconciler.commit_log().len(), 2);
}

#[test]
fn test_setter_after_unmount_is_reported() {
    let (counter, setters) = counter_component();
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, counters(&counter, &["a"]));
    let stale = setters.borrow()["a"].clone();

    render_sync(&mut reconciler, Element::host("div"));
    stale.set(3);
    reconciler.flush_sync_work();

    assert!(reconciler.diagnostics().has_code("ERR_STALE_HANDLE"));
    assert_eq!(reconciler.commit_log().len(), 2);
    assert!(reconciler.root().pending_lanes().is_empty());
}

#[test]
fn test_stale_handle_not_retained_in_production() {
    let config = ReconcilerConfig {
        diagnostics: DiagnosticsMode::Production,
        ..ReconcilerConfig::with_budget(4)
    };
    let mut reconciler = Reconciler::new(MemoryHost::new(), config).unwrap();
    let (counter, setters) = counter_component();
    render_sync(&mut reconciler, counters(&counter, &["a"]));
    let stale = setters.borrow()["a"].clone();

    render_sync(&mut reconciler, Element::host("div"));
    stale.set(3);
    reconciler.flush_sync_work();

    assert!(reconciler.diagnostics().is_empty());
}

#[test]
fn test_unsupported_description_is_reported_and_skipped() {
    let mut reconciler = new_reconciler();
    let description = Child::from_json(&json!({
        "type": "ul",
        "props": { "children": [ { "type": "li", "props": { "children": "ok" } }, { "weird": true } ] }
    }));

    render_sync(&mut reconciler, description);

    assert_eq!(reconciler.host().to_markup(), "<ul><li>ok</li></ul>");
    assert!(reconciler.diagnostics().has_code("ERR_UNSUPPORTED_DESCRIPTION"));
}
