use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use arbor_core::{
    Child, Component, Element, MemoryHost, Reconciler, ReconcilerConfig, RenderInterrupt,
    StateSetter,
};
use serde_json::Value;

/// Reconciler over an in-memory host with a small deterministic work budget
#[allow(dead_code)]
pub fn new_reconciler() -> Reconciler<MemoryHost> {
    Reconciler::new(MemoryHost::new(), ReconcilerConfig::with_budget(4)).unwrap()
}

/// Render on the sync lane and flush it
#[allow(dead_code)]
pub fn render_sync(reconciler: &mut Reconciler<MemoryHost>, description: impl Into<Child>) {
    reconciler.render(description);
    reconciler.flush_sync_work();
}

/// `<ul>` with one keyed `<li>` per key, each holding its key as text
#[allow(dead_code)]
pub fn keyed_list(keys: &[&str]) -> Element {
    Element::host("ul").children(
        keys.iter()
            .map(|key| Element::host("li").key(*key).child(*key)),
    )
}

/// Label attribute of a component element
#[allow(dead_code)]
pub fn label_of(element: &Element) -> String {
    element
        .attr_value("label")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Setters captured by components, by label
pub type SetterRegistry = Rc<RefCell<HashMap<String, StateSetter<i64>>>>;

/// Component rendering `label:count` with a `use_state` counter. Every
/// render publishes its setter into the returned registry.
#[allow(dead_code)]
pub fn counter_component() -> (Component, SetterRegistry) {
    let registry: SetterRegistry = Rc::new(RefCell::new(HashMap::new()));
    let setters = registry.clone();
    let component = Component::new("Counter", move |element, hooks| {
        let label = label_of(element);
        let (count, set_count) = hooks.use_state(|| 0i64)?;
        setters.borrow_mut().insert(label.clone(), set_count);
        Ok::<Child, RenderInterrupt>(Child::text(format!("{}:{}", label, count)))
    });
    (component, registry)
}

/// One keyed counter per label, in order, under a `<div>`
#[allow(dead_code)]
pub fn counters(component: &Component, labels: &[&str]) -> Element {
    Element::host("div").children(labels.iter().map(|label| {
        Element::component(component)
            .key(*label)
            .attr("label", *label)
    }))
}
