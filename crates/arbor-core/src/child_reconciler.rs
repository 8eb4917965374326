//! Child reconciliation
//!
//! Turns a parent's committed child list plus a new description into the
//! parent's work-in-progress child list, marking placement and deletion
//! effects. Matching is by key (or position for unkeyed children) and type.
//!
//! The reconciler runs in one of two modes. When tracking, every structural
//! change is recorded as an effect for commit. When not tracking (the parent
//! itself is new), nothing is recorded: the whole subtree is inserted at once
//! by its nearest placed ancestor.

use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::Diagnostics;
use crate::element::{Child, Element, ElementType};
use crate::errors::ReconcileError;
use crate::fiber::{
    fiber_from_element, fiber_from_fragment, fiber_from_text, FiberArena, FiberId, FiberProps,
    Flags, WorkTag,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ChildKey {
    Key(String),
    Index(usize),
}

pub struct ChildReconciler<'a> {
    arena: &'a mut FiberArena,
    diagnostics: &'a mut Diagnostics,
    track_effects: bool,
}

impl<'a> ChildReconciler<'a> {
    pub fn new(arena: &'a mut FiberArena, diagnostics: &'a mut Diagnostics, track_effects: bool) -> Self {
        Self {
            arena,
            diagnostics,
            track_effects,
        }
    }

    /// Reconcile `new_child` against the committed children starting at
    /// `current_first_child`. Returns the first work-in-progress child.
    pub fn reconcile_child_fibers(
        &mut self,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        new_child: &Child,
    ) -> Option<FiberId> {
        if let Child::Element(element) = new_child {
            if element.is_fragment() && element.key.is_none() {
                let contents = element.children_as_child();
                return self.reconcile_child_fibers(return_fiber, current_first_child, &contents);
            }
        }

        match new_child {
            Child::Element(element) => {
                let fiber = self.reconcile_single_element(return_fiber, current_first_child, element);
                Some(self.place_single_child(fiber))
            }
            Child::Text(text) => {
                let fiber = self.reconcile_single_text(return_fiber, current_first_child, text);
                Some(self.place_single_child(fiber))
            }
            Child::List(items) => self.reconcile_children_array(return_fiber, current_first_child, items),
            Child::Empty => {
                self.delete_remaining_children(return_fiber, current_first_child);
                None
            }
            Child::Unsupported(shape) => {
                self.diagnostics.report(
                    "reconcile_child_fibers",
                    ReconcileError::UnsupportedDescription {
                        shape: shape.clone(),
                    },
                );
                self.delete_remaining_children(return_fiber, current_first_child);
                None
            }
        }
    }

    fn delete_child(&mut self, return_fiber: FiberId, child: FiberId) {
        if !self.track_effects {
            return;
        }
        let parent = &mut self.arena[return_fiber];
        parent.deletions.push(child);
        parent.flags |= Flags::CHILD_DELETION;
    }

    fn delete_remaining_children(&mut self, return_fiber: FiberId, first: Option<FiberId>) {
        if !self.track_effects {
            return;
        }
        let mut child = first;
        while let Some(id) = child {
            self.delete_child(return_fiber, id);
            child = self.arena[id].sibling;
        }
    }

    /// Clone a committed fiber for reuse at a new position
    fn use_fiber(&mut self, fiber: FiberId, props: FiberProps) -> FiberId {
        let clone = self.arena.create_work_in_progress(fiber, props);
        let wip = &mut self.arena[clone];
        wip.index = 0;
        wip.sibling = None;
        clone
    }

    fn create_from_element(&mut self, return_fiber: FiberId, element: &Rc<Element>) -> FiberId {
        let id = self.arena.alloc(fiber_from_element(element));
        self.arena[id].return_ = Some(return_fiber);
        id
    }

    fn place_single_child(&mut self, fiber: FiberId) -> FiberId {
        if self.track_effects && self.arena[fiber].alternate.is_none() {
            self.arena[fiber].flags |= Flags::PLACEMENT;
        }
        fiber
    }

    fn same_type(&self, fiber: FiberId, element: &Element) -> bool {
        let existing = &self.arena[fiber];
        match &element.element_type {
            ElementType::Fragment => existing.tag == WorkTag::Fragment,
            element_type => existing.element_type.as_ref() == Some(element_type),
        }
    }

    fn element_props(element: &Rc<Element>) -> FiberProps {
        if element.is_fragment() {
            FiberProps::Children(element.children_as_child())
        } else {
            FiberProps::Element(element.clone())
        }
    }

    fn reconcile_single_element(
        &mut self,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        element: &Rc<Element>,
    ) -> FiberId {
        let mut child = current_first_child;
        while let Some(current) = child {
            let sibling = self.arena[current].sibling;
            if self.arena[current].key == element.key {
                if self.same_type(current, element) {
                    let existing = self.use_fiber(current, Self::element_props(element));
                    self.arena[existing].return_ = Some(return_fiber);
                    self.delete_remaining_children(return_fiber, sibling);
                    return existing;
                }
                // Same key, different type: nothing below can match either.
                self.delete_remaining_children(return_fiber, Some(current));
                break;
            }
            self.delete_child(return_fiber, current);
            child = sibling;
        }

        self.create_from_element(return_fiber, element)
    }

    fn reconcile_single_text(
        &mut self,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        text: &str,
    ) -> FiberId {
        let mut child = current_first_child;
        while let Some(current) = child {
            let sibling = self.arena[current].sibling;
            if self.arena[current].tag == WorkTag::HostText {
                let existing = self.use_fiber(current, FiberProps::Text(text.to_string()));
                self.arena[existing].return_ = Some(return_fiber);
                self.delete_remaining_children(return_fiber, sibling);
                return existing;
            }
            self.delete_child(return_fiber, current);
            child = sibling;
        }

        let id = self.arena.alloc(fiber_from_text(text));
        self.arena[id].return_ = Some(return_fiber);
        id
    }

    fn reconcile_children_array(
        &mut self,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        items: &[Child],
    ) -> Option<FiberId> {
        let mut existing: HashMap<ChildKey, FiberId> = HashMap::new();
        let mut old_order = Vec::new();
        let mut current = current_first_child;
        while let Some(id) = current {
            let fiber = &self.arena[id];
            let key = match &fiber.key {
                Some(key) => ChildKey::Key(key.clone()),
                None => ChildKey::Index(fiber.index),
            };
            current = fiber.sibling;
            if existing.contains_key(&key) {
                // The first holder of a key stays matchable; later ones are removed.
                self.report_duplicate(return_fiber, &key);
                self.delete_child(return_fiber, id);
                continue;
            }
            existing.insert(key.clone(), id);
            old_order.push(key);
        }

        let mut last_placed_index = 0;
        let mut first_new: Option<FiberId> = None;
        let mut last_new: Option<FiberId> = None;

        for (index, item) in items.iter().enumerate() {
            let Some(new_fiber) = self.update_from_map(return_fiber, &mut existing, index, item) else {
                continue;
            };

            {
                let fiber = &mut self.arena[new_fiber];
                fiber.index = index;
                fiber.return_ = Some(return_fiber);
            }
            match last_new {
                Some(previous) => self.arena[previous].sibling = Some(new_fiber),
                None => first_new = Some(new_fiber),
            }
            last_new = Some(new_fiber);

            if !self.track_effects {
                continue;
            }
            match self.arena[new_fiber].alternate {
                Some(current) => {
                    let old_index = self.arena[current].index;
                    if old_index < last_placed_index {
                        self.arena[new_fiber].flags |= Flags::PLACEMENT;
                    } else {
                        last_placed_index = old_index;
                    }
                }
                None => self.arena[new_fiber].flags |= Flags::PLACEMENT,
            }
        }

        for key in old_order {
            if let Some(leftover) = existing.remove(&key) {
                self.delete_child(return_fiber, leftover);
            }
        }

        first_new
    }

    fn report_duplicate(&mut self, return_fiber: FiberId, key: &ChildKey) {
        let key = match key {
            ChildKey::Key(key) => key.clone(),
            ChildKey::Index(index) => index.to_string(),
        };
        self.diagnostics.report(
            "reconcile_children_array",
            ReconcileError::DuplicateKey {
                key,
                parent: self.arena[return_fiber].describe(),
            },
        );
    }

    fn update_from_map(
        &mut self,
        return_fiber: FiberId,
        existing: &mut HashMap<ChildKey, FiberId>,
        index: usize,
        item: &Child,
    ) -> Option<FiberId> {
        match item {
            Child::Text(text) => {
                let key = ChildKey::Index(index);
                if let Some(&before) = existing.get(&key) {
                    if self.arena[before].tag == WorkTag::HostText {
                        existing.remove(&key);
                        return Some(self.use_fiber(before, FiberProps::Text(text.clone())));
                    }
                }
                Some(self.arena.alloc(fiber_from_text(text)))
            }
            Child::Element(element) => {
                let key = match &element.key {
                    Some(key) => ChildKey::Key(key.clone()),
                    None => ChildKey::Index(index),
                };
                if let Some(&before) = existing.get(&key) {
                    if self.same_type(before, element) {
                        existing.remove(&key);
                        return Some(self.use_fiber(before, Self::element_props(element)));
                    }
                }
                Some(self.create_from_element(return_fiber, element))
            }
            Child::List(nested) => {
                let key = ChildKey::Index(index);
                let contents = Child::List(nested.clone());
                if let Some(&before) = existing.get(&key) {
                    if self.arena[before].tag == WorkTag::Fragment {
                        existing.remove(&key);
                        return Some(self.use_fiber(before, FiberProps::Children(contents)));
                    }
                }
                Some(self.arena.alloc(fiber_from_fragment(contents, None)))
            }
            Child::Empty => None,
            Child::Unsupported(shape) => {
                self.diagnostics.report(
                    "reconcile_children_array",
                    ReconcileError::UnsupportedDescription {
                        shape: shape.clone(),
                    },
                );
                None
            }
        }
    }
}
