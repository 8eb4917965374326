//! Commit phase
//!
//! Applies a finished work-in-progress tree to the host. The walk visits
//! only subtrees whose `subtree_flags` carry commit work, children before
//! parents, and per fiber runs deletions, then placement, then update.
//! Passive effects found on the way are collected for a later flush; they
//! never run inside the commit itself.

use std::rc::Rc;

use arbor_core_types::CommitId;
use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::errors::ReconcileError;
use crate::fiber::{FiberArena, FiberId, FiberState, Flags, UpdateQueue, WorkTag};
use crate::hooks::{Effect, Hook};
use crate::host::{HostConfig, HostNodeId, HostParent};

/// Summary of one commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub commit_id: CommitId,
    /// Raw bits of the lanes this commit finished
    pub lanes: u32,
    /// New fibers inserted into the host tree
    pub placements: usize,
    /// Reused fibers moved within their host parent
    pub moves: usize,
    /// Subtrees removed
    pub deletions: usize,
    /// Attribute or text updates applied
    pub updates: usize,
    /// Host instances created by the render that produced this commit
    pub host_nodes_created: usize,
    pub passive_effects_scheduled: bool,
}

impl CommitReport {
    pub fn new(lanes: u32) -> Self {
        Self {
            commit_id: CommitId::new(),
            lanes,
            placements: 0,
            moves: 0,
            deletions: 0,
            updates: 0,
            host_nodes_created: 0,
            passive_effects_scheduled: false,
        }
    }
}

/// Effect lists waiting for the passive flush
#[derive(Default)]
pub struct PendingPassiveEffects {
    /// Effects of unmounted components; only their destroys run
    pub unmount: Vec<Rc<Effect>>,
    /// Effects of committed components; those with changed deps re-run
    pub update: Vec<Rc<Effect>>,
}

impl PendingPassiveEffects {
    pub fn is_empty(&self) -> bool {
        self.unmount.is_empty() && self.update.is_empty()
    }

    /// Run all unmount destroys, then update destroys, then update creates
    pub fn run(self) -> usize {
        let mut ran = 0;
        for effect in &self.unmount {
            effect.run_destroy();
            ran += 1;
        }
        for effect in self.update.iter().filter(|effect| effect.has_effect()) {
            effect.run_destroy();
        }
        for effect in self.update.iter().filter(|effect| effect.has_effect()) {
            effect.run_create();
            ran += 1;
        }
        ran
    }
}

pub(crate) struct MutationPass<'a, H: HostConfig> {
    arena: &'a mut FiberArena,
    host: &'a mut H,
    diagnostics: &'a mut Diagnostics,
    passive: &'a mut PendingPassiveEffects,
    report: &'a mut CommitReport,
}

impl<'a, H: HostConfig> MutationPass<'a, H> {
    pub(crate) fn new(
        arena: &'a mut FiberArena,
        host: &'a mut H,
        diagnostics: &'a mut Diagnostics,
        passive: &'a mut PendingPassiveEffects,
        report: &'a mut CommitReport,
    ) -> Self {
        Self {
            arena,
            host,
            diagnostics,
            passive,
            report,
        }
    }

    /// Walk the finished tree rooted at `finished_work`
    pub(crate) fn commit_mutation_effects(&mut self, finished_work: FiberId) {
        let mut next = Some(finished_work);
        'walk: while let Some(fiber) = next {
            let (child, subtree_flags) = {
                let f = &self.arena[fiber];
                (f.child, f.subtree_flags)
            };
            if subtree_flags.intersects(Flags::COMMIT_MASK) {
                if let Some(child) = child {
                    next = Some(child);
                    continue;
                }
            }

            let mut node = fiber;
            loop {
                self.commit_mutation_effects_on_fiber(node);
                if node == finished_work {
                    break 'walk;
                }
                if let Some(sibling) = self.arena[node].sibling {
                    next = Some(sibling);
                    continue 'walk;
                }
                match self.arena[node].return_ {
                    Some(parent) => node = parent,
                    None => break 'walk,
                }
            }
        }
    }

    fn commit_mutation_effects_on_fiber(&mut self, fiber: FiberId) {
        let flags = self.arena[fiber].flags;

        if flags.contains(Flags::CHILD_DELETION) {
            let deletions = std::mem::take(&mut self.arena[fiber].deletions);
            for child in deletions {
                self.commit_deletion(child);
            }
            self.arena[fiber].flags.remove(Flags::CHILD_DELETION);
        }

        if flags.contains(Flags::PLACEMENT) {
            self.commit_placement(fiber);
            self.arena[fiber].flags.remove(Flags::PLACEMENT);
            if self.arena[fiber].alternate.is_some() {
                self.report.moves += 1;
            } else {
                self.report.placements += 1;
            }
        }

        if flags.contains(Flags::UPDATE) {
            self.commit_update(fiber);
            self.arena[fiber].flags.remove(Flags::UPDATE);
            self.report.updates += 1;
        }

        if flags.contains(Flags::PASSIVE_EFFECT) {
            let effects = self.arena[fiber].effects().to_vec();
            self.passive.update.extend(effects);
            self.arena[fiber].flags.remove(Flags::PASSIVE_EFFECT);
        }

        if flags.contains(Flags::CONSUMED_UPDATES) {
            commit_consumed_updates(&*self.arena, fiber);
            self.arena[fiber].flags.remove(Flags::CONSUMED_UPDATES);
        }
    }

    /// Collect unmount bookkeeping for the subtree and detach its top-level
    /// host nodes.
    fn commit_deletion(&mut self, child_to_delete: FiberId) {
        let mut host_roots: Vec<HostNodeId> = Vec::new();
        let mut stack = vec![(child_to_delete, false)];

        while let Some((id, inside_host)) = stack.pop() {
            let fiber = &self.arena[id];
            match fiber.tag {
                WorkTag::FunctionComponent => {
                    self.passive.unmount.extend(fiber.effects().iter().cloned());
                }
                WorkTag::HostComponent | WorkTag::HostText if !inside_host => {
                    host_roots.extend(fiber.state_node);
                }
                _ => {}
            }

            let below_host = inside_host || fiber.tag.is_host();
            let mut children = Vec::new();
            let mut child = fiber.child;
            while let Some(c) = child {
                children.push(c);
                child = self.arena[c].sibling;
            }
            stack.extend(children.into_iter().rev().map(|c| (c, below_host)));
        }

        if !host_roots.is_empty() {
            match self.get_host_parent(child_to_delete) {
                Some(parent) => {
                    for node in host_roots {
                        self.host.remove_child(parent, node);
                    }
                }
                None => self.report_missing_parent(child_to_delete),
            }
        }
        self.report.deletions += 1;
    }

    fn commit_placement(&mut self, fiber: FiberId) {
        let Some(parent) = self.get_host_parent(fiber) else {
            self.report_missing_parent(fiber);
            return;
        };
        let before = self.get_host_sibling(fiber);
        self.insert_or_append_placement_node(fiber, before, parent);
    }

    fn insert_or_append_placement_node(
        &mut self,
        fiber: FiberId,
        before: Option<HostNodeId>,
        parent: HostParent,
    ) {
        let (is_host, state_node, mut child) = {
            let f = &self.arena[fiber];
            (f.tag.is_host(), f.state_node, f.child)
        };
        if is_host {
            if let Some(node) = state_node {
                match before {
                    Some(before) => self.host.insert_before(parent, node, before),
                    None => self.host.append_child(parent, node),
                }
            }
            return;
        }
        while let Some(c) = child {
            self.insert_or_append_placement_node(c, before, parent);
            child = self.arena[c].sibling;
        }
    }

    fn commit_update(&mut self, fiber: FiberId) {
        let f = &mut self.arena[fiber];
        let Some(node) = f.state_node else {
            return;
        };
        match f.tag {
            WorkTag::HostComponent => {
                if let Some(payload) = f.update_payload.take() {
                    self.host.commit_update(node, &payload);
                }
            }
            WorkTag::HostText => {
                if let Some(text) = f.memoized_props.text() {
                    self.host.commit_text_update(node, text);
                }
            }
            _ => {}
        }
    }

    fn get_host_parent(&self, fiber: FiberId) -> Option<HostParent> {
        let mut parent = self.arena[fiber].return_;
        while let Some(id) = parent {
            let f = &self.arena[id];
            match f.tag {
                WorkTag::HostComponent => return f.state_node.map(HostParent::Node),
                WorkTag::HostRoot => return Some(HostParent::Container),
                _ => parent = f.return_,
            }
        }
        None
    }

    /// The nearest following host node that is already in place, used as the
    /// insertion point. Siblings that are themselves being placed are skipped.
    fn get_host_sibling(&self, fiber: FiberId) -> Option<HostNodeId> {
        let mut node = fiber;
        'siblings: loop {
            while self.arena[node].sibling.is_none() {
                let parent = self.arena[node].return_?;
                if matches!(self.arena[parent].tag, WorkTag::HostComponent | WorkTag::HostRoot) {
                    return None;
                }
                node = parent;
            }
            node = self.arena[node].sibling?;

            while !self.arena[node].tag.is_host() {
                if self.arena[node].flags.contains(Flags::PLACEMENT) {
                    continue 'siblings;
                }
                match self.arena[node].child {
                    Some(child) => node = child,
                    None => continue 'siblings,
                }
            }

            if !self.arena[node].flags.contains(Flags::PLACEMENT) {
                return self.arena[node].state_node;
            }
        }
    }

    fn report_missing_parent(&mut self, fiber: FiberId) {
        self.diagnostics.report(
            "commit_mutation_effects",
            ReconcileError::InvariantViolation {
                message: format!("{} has no host parent", fiber),
            },
        );
    }
}

/// Fold what this fiber's render took from its queues back into them
fn commit_consumed_updates(arena: &FiberArena, fiber: FiberId) {
    let f = &arena[fiber];
    if let UpdateQueue::Root {
        shared,
        rebase: Some(rebase),
    } = &f.update_queue
    {
        shared.borrow_mut().commit(rebase);
    }
    if let FiberState::Hooks(hooks) = &f.memoized_state {
        for hook in hooks {
            if let Hook::State { queue, rebase, .. } = hook {
                if !rebase.is_empty() {
                    queue.borrow_mut().commit(rebase);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_passive_effects_empty() {
        let pending = PendingPassiveEffects::default();
        assert!(pending.is_empty());
        assert_eq!(pending.run(), 0);
    }

    #[test]
    fn test_report_starts_empty() {
        let report = CommitReport::new(0b1);
        assert_eq!(report.lanes, 1);
        assert_eq!(report.placements + report.moves + report.deletions + report.updates, 0);
        let other = CommitReport::new(0b1);
        assert_ne!(report.commit_id, other.commit_id);
    }
}
