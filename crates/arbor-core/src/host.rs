//! Host adapter interface
//!
//! The reconciler creates and mutates host nodes only through [`HostConfig`].
//! Instances are created detached during render (complete phase) and attached
//! during commit. Host operations are infallible: a host that can fail must
//! handle it internally.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Host-assigned identifier of a created node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostNodeId(pub u64);

/// Where a child is attached: the root container or a host node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostParent {
    Container,
    Node(HostNodeId),
}

/// One attribute change; `value: None` removes the attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrChange {
    pub name: String,
    pub value: Option<Value>,
}

/// Attribute diff computed during render and applied at commit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdatePayload {
    pub changes: Vec<AttrChange>,
}

impl UpdatePayload {
    /// Diff two attribute maps. Returns `None` when they are equal.
    pub fn diff(old: &Map<String, Value>, new: &Map<String, Value>) -> Option<Self> {
        let mut changes = Vec::new();
        for (name, value) in new {
            if old.get(name) != Some(value) {
                changes.push(AttrChange {
                    name: name.clone(),
                    value: Some(value.clone()),
                });
            }
        }
        for name in old.keys() {
            if !new.contains_key(name) {
                changes.push(AttrChange {
                    name: name.clone(),
                    value: None,
                });
            }
        }
        if changes.is_empty() {
            None
        } else {
            Some(Self { changes })
        }
    }

    /// Apply the changes to an attribute map
    pub fn apply_to(&self, attrs: &mut Map<String, Value>) {
        for change in &self.changes {
            match &change.value {
                Some(value) => {
                    attrs.insert(change.name.clone(), value.clone());
                }
                None => {
                    attrs.remove(&change.name);
                }
            }
        }
    }
}

/// Per-primitive host mutations
pub trait HostConfig {
    fn create_instance(&mut self, tag: &str, attrs: &Map<String, Value>) -> HostNodeId;

    fn create_text_instance(&mut self, text: &str) -> HostNodeId;

    /// Attach a child to a detached parent that is still being built
    fn append_initial_child(&mut self, parent: HostNodeId, child: HostNodeId);

    /// Append, moving the child if it is already attached under `parent`
    fn append_child(&mut self, parent: HostParent, child: HostNodeId);

    /// Insert before `before`, moving the child if it is already attached
    fn insert_before(&mut self, parent: HostParent, child: HostNodeId, before: HostNodeId);

    fn remove_child(&mut self, parent: HostParent, child: HostNodeId);

    fn commit_update(&mut self, node: HostNodeId, payload: &UpdatePayload);

    fn commit_text_update(&mut self, node: HostNodeId, text: &str);

    /// Drop a node built by a render attempt that was discarded before commit
    ///
    /// The node was never attached to the container. Every orphan of the
    /// attempt is passed, including nodes already appended under another
    /// orphan with `append_initial_child`.
    fn release_instance(&mut self, _node: HostNodeId) {}

    /// Request that the driver call `flush_sync_work` before yielding to
    /// other host work
    fn schedule_microtask(&mut self) {}
}
