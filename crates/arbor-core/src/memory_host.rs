//! In-memory host
//!
//! Keeps a node table and an operation log. Used by the CLI and by tests to
//! observe exactly which host mutations a commit performed.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::host::{AttrChange, HostConfig, HostNodeId, HostParent, UpdatePayload};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryNodeKind {
    Element {
        tag: String,
        attrs: Map<String, Value>,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryNode {
    pub id: HostNodeId,
    pub kind: MemoryNodeKind,
    pub children: Vec<HostNodeId>,
    pub parent: Option<HostParent>,
}

/// A recorded host mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    CreateInstance {
        id: HostNodeId,
        tag: String,
    },
    CreateText {
        id: HostNodeId,
        text: String,
    },
    AppendInitialChild {
        parent: HostNodeId,
        child: HostNodeId,
    },
    AppendChild {
        parent: HostParent,
        child: HostNodeId,
    },
    InsertBefore {
        parent: HostParent,
        child: HostNodeId,
        before: HostNodeId,
    },
    RemoveChild {
        parent: HostParent,
        child: HostNodeId,
    },
    CommitUpdate {
        id: HostNodeId,
        changes: Vec<AttrChange>,
    },
    CommitTextUpdate {
        id: HostNodeId,
        text: String,
    },
}

impl HostOp {
    /// Whether this operation touched the attached tree
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            HostOp::CreateInstance { .. } | HostOp::CreateText { .. } | HostOp::AppendInitialChild { .. }
        )
    }
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: HashMap<HostNodeId, MemoryNode>,
    container: Vec<HostNodeId>,
    ops: Vec<HostOp>,
    next_id: u64,
    microtask_requests: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: HostNodeId) -> Option<&MemoryNode> {
        self.nodes.get(&id)
    }

    pub fn children(&self, parent: HostParent) -> &[HostNodeId] {
        match parent {
            HostParent::Container => &self.container,
            HostParent::Node(id) => self
                .nodes
                .get(&id)
                .map(|node| node.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// Number of nodes currently held (attached or detached)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn microtask_requests(&self) -> usize {
        self.microtask_requests
    }

    /// Serialize the attached tree as markup, e.g. `<ul><li>a</li></ul>`
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for id in &self.container {
            self.write_markup(*id, &mut out);
        }
        out
    }

    /// Concatenated text of the attached tree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for id in &self.container {
            self.write_text(*id, &mut out);
        }
        out
    }

    fn write_markup(&self, id: HostNodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.kind {
            MemoryNodeKind::Text { text } => out.push_str(&escape(text)),
            MemoryNodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let rendered = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let _ = write!(out, " {}=\"{}\"", name, escape(&rendered));
                }
                if node.children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in &node.children {
                    self.write_markup(*child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }

    fn write_text(&self, id: HostNodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if let MemoryNodeKind::Text { text } = &node.kind {
            out.push_str(text);
        }
        for child in &node.children {
            self.write_text(*child, out);
        }
    }

    fn alloc(&mut self, kind: MemoryNodeKind) -> HostNodeId {
        self.next_id += 1;
        let id = HostNodeId(self.next_id);
        self.nodes.insert(
            id,
            MemoryNode {
                id,
                kind,
                children: Vec::new(),
                parent: None,
            },
        );
        id
    }

    fn child_list_mut(&mut self, parent: HostParent) -> Option<&mut Vec<HostNodeId>> {
        match parent {
            HostParent::Container => Some(&mut self.container),
            HostParent::Node(id) => self.nodes.get_mut(&id).map(|node| &mut node.children),
        }
    }

    fn detach(&mut self, child: HostNodeId) {
        let parent = self.nodes.get(&child).and_then(|node| node.parent);
        if let Some(parent) = parent {
            if let Some(children) = self.child_list_mut(parent) {
                children.retain(|id| *id != child);
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
    }

    fn attach(&mut self, parent: HostParent, child: HostNodeId, before: Option<HostNodeId>) {
        self.detach(child);
        if let Some(children) = self.child_list_mut(parent) {
            let position = before
                .and_then(|before| children.iter().position(|id| *id == before))
                .unwrap_or(children.len());
            children.insert(position, child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    fn drop_subtree(&mut self, id: HostNodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.drop_subtree(child);
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl HostConfig for MemoryHost {
    fn create_instance(&mut self, tag: &str, attrs: &Map<String, Value>) -> HostNodeId {
        let id = self.alloc(MemoryNodeKind::Element {
            tag: tag.to_string(),
            attrs: attrs.clone(),
        });
        self.ops.push(HostOp::CreateInstance {
            id,
            tag: tag.to_string(),
        });
        id
    }

    fn create_text_instance(&mut self, text: &str) -> HostNodeId {
        let id = self.alloc(MemoryNodeKind::Text {
            text: text.to_string(),
        });
        self.ops.push(HostOp::CreateText {
            id,
            text: text.to_string(),
        });
        id
    }

    fn append_initial_child(&mut self, parent: HostNodeId, child: HostNodeId) {
        self.attach(HostParent::Node(parent), child, None);
        self.ops.push(HostOp::AppendInitialChild { parent, child });
    }

    fn append_child(&mut self, parent: HostParent, child: HostNodeId) {
        self.attach(parent, child, None);
        self.ops.push(HostOp::AppendChild { parent, child });
    }

    fn insert_before(&mut self, parent: HostParent, child: HostNodeId, before: HostNodeId) {
        self.attach(parent, child, Some(before));
        self.ops.push(HostOp::InsertBefore {
            parent,
            child,
            before,
        });
    }

    fn remove_child(&mut self, parent: HostParent, child: HostNodeId) {
        self.detach(child);
        self.drop_subtree(child);
        self.ops.push(HostOp::RemoveChild { parent, child });
    }

    fn commit_update(&mut self, node: HostNodeId, payload: &UpdatePayload) {
        if let Some(MemoryNode {
            kind: MemoryNodeKind::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(&node)
        {
            payload.apply_to(attrs);
        }
        self.ops.push(HostOp::CommitUpdate {
            id: node,
            changes: payload.changes.clone(),
        });
    }

    fn commit_text_update(&mut self, node: HostNodeId, text: &str) {
        if let Some(MemoryNode {
            kind: MemoryNodeKind::Text { text: current },
            ..
        }) = self.nodes.get_mut(&node)
        {
            *current = text.to_string();
        }
        self.ops.push(HostOp::CommitTextUpdate {
            id: node,
            text: text.to_string(),
        });
    }

    fn release_instance(&mut self, node: HostNodeId) {
        // Children of a released orphan go with it.
        let detached = self.nodes.get(&node).is_some_and(|n| n.parent.is_none());
        if detached {
            self.drop_subtree(node);
        }
    }

    fn schedule_microtask(&mut self) {
        self.microtask_requests += 1;
    }
}
