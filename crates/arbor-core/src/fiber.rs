//! Fiber tree
//!
//! Every logical node of the rendered tree is a [`Fiber`] living in a
//! [`FiberArena`]. Links between fibers (`return_`, `child`, `sibling`,
//! `alternate`) are generational [`FiberId`] handles, never references, so a
//! handle to a reclaimed slot is detected instead of aliasing a new fiber.
//!
//! Each mounted position has up to two fibers: the one attached to the
//! committed tree and its work-in-progress twin. The twins point at each other
//! through `alternate`, and a render pass clones into the twin instead of
//! allocating.

use std::collections::HashSet;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use bitflags::bitflags;

use crate::element::{Child, Element, ElementType};
use crate::hooks::{Effect, Hook};
use crate::host::{HostNodeId, UpdatePayload};
use crate::update_queue::{Rebase, RootQueue};

/// Outcome of [`FiberArena::retain_reachable`]
#[derive(Debug, Default)]
pub struct Reclaimed {
    pub fibers: usize,
    /// Host nodes no surviving fiber refers to, in slot order
    pub orphaned_host_nodes: Vec<HostNodeId>,
}

/// Generational handle to a fiber slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId {
    index: u32,
    generation: u32,
}

impl FiberId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fiber#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkTag {
    FunctionComponent,
    HostComponent,
    HostText,
    Fragment,
    HostRoot,
    ContextProvider,
}

impl WorkTag {
    pub fn is_host(self) -> bool {
        matches!(self, WorkTag::HostComponent | WorkTag::HostText)
    }
}

bitflags! {
    /// Effect markers set during render and consumed by commit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        const PLACEMENT = 0b0_0001;
        const UPDATE = 0b0_0010;
        const CHILD_DELETION = 0b0_0100;
        const PASSIVE_EFFECT = 0b0_1000;
        /// The fiber applied queued state or root updates that commit must prune
        const CONSUMED_UPDATES = 0b1_0000;
    }
}

impl Flags {
    /// Flags that require host mutation during commit
    pub const MUTATION_MASK: Flags = Flags::PLACEMENT
        .union(Flags::UPDATE)
        .union(Flags::CHILD_DELETION);
    /// Flags that require a passive effect flush after commit
    pub const PASSIVE_MASK: Flags = Flags::PASSIVE_EFFECT.union(Flags::CHILD_DELETION);
    /// Everything the commit walk has to visit
    pub const COMMIT_MASK: Flags = Flags::MUTATION_MASK
        .union(Flags::PASSIVE_MASK)
        .union(Flags::CONSUMED_UPDATES);
}

/// The description a fiber is rendered from
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FiberProps {
    #[default]
    None,
    Element(Rc<Element>),
    Text(String),
    /// Children of a fragment (explicit or implicit)
    Children(Child),
}

impl FiberProps {
    pub fn element(&self) -> Option<&Rc<Element>> {
        match self {
            FiberProps::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            FiberProps::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Memoized internal state
#[derive(Clone, Default)]
pub enum FiberState {
    #[default]
    None,
    /// The description last rendered into the root
    Root(Child),
    Hooks(Vec<Hook>),
}

/// Pending work attached to a fiber
#[derive(Clone, Default)]
pub enum UpdateQueue {
    #[default]
    None,
    /// The root's shared update queue plus what this render took from it
    Root {
        shared: Rc<std::cell::RefCell<RootQueue>>,
        rebase: Option<Rebase<Child>>,
    },
    /// Effect list produced by the last render of a function component
    Effects(Vec<Rc<Effect>>),
}

pub struct Fiber {
    pub tag: WorkTag,
    pub key: Option<String>,
    pub element_type: Option<ElementType>,
    pub pending_props: FiberProps,
    pub memoized_props: FiberProps,
    pub memoized_state: FiberState,
    pub update_queue: UpdateQueue,
    pub flags: Flags,
    pub subtree_flags: Flags,
    pub index: usize,
    pub deletions: Vec<FiberId>,
    pub return_: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    pub alternate: Option<FiberId>,
    pub state_node: Option<HostNodeId>,
    pub update_payload: Option<UpdatePayload>,
}

impl Fiber {
    pub fn new(tag: WorkTag, pending_props: FiberProps, key: Option<String>) -> Self {
        Self {
            tag,
            key,
            element_type: None,
            pending_props,
            memoized_props: FiberProps::None,
            memoized_state: FiberState::None,
            update_queue: UpdateQueue::None,
            flags: Flags::empty(),
            subtree_flags: Flags::empty(),
            index: 0,
            deletions: Vec::new(),
            return_: None,
            child: None,
            sibling: None,
            alternate: None,
            state_node: None,
            update_payload: None,
        }
    }

    /// Name used in logs and diagnostics
    pub fn describe(&self) -> String {
        match (&self.element_type, self.tag) {
            (Some(element_type), _) => element_type.describe(),
            (None, WorkTag::HostText) => "#text".to_string(),
            (None, WorkTag::HostRoot) => "#root".to_string(),
            (None, _) => "#fragment".to_string(),
        }
    }

    pub fn effects(&self) -> &[Rc<Effect>] {
        match &self.update_queue {
            UpdateQueue::Effects(effects) => effects,
            _ => &[],
        }
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("tag", &self.tag)
            .field("key", &self.key)
            .field("type", &self.describe())
            .field("flags", &self.flags)
            .field("subtree_flags", &self.subtree_flags)
            .field("index", &self.index)
            .field("return", &self.return_)
            .field("child", &self.child)
            .field("sibling", &self.sibling)
            .field("alternate", &self.alternate)
            .field("state_node", &self.state_node)
            .finish()
    }
}

/// Create a fiber for an element description
pub fn fiber_from_element(element: &Rc<Element>) -> Fiber {
    let key = element.key.clone();
    let mut fiber = match &element.element_type {
        ElementType::Host(_) => {
            Fiber::new(WorkTag::HostComponent, FiberProps::Element(element.clone()), key)
        }
        ElementType::Function(_) => Fiber::new(
            WorkTag::FunctionComponent,
            FiberProps::Element(element.clone()),
            key,
        ),
        ElementType::Provider(_) => Fiber::new(
            WorkTag::ContextProvider,
            FiberProps::Element(element.clone()),
            key,
        ),
        ElementType::Fragment => Fiber::new(
            WorkTag::Fragment,
            FiberProps::Children(element.children_as_child()),
            key,
        ),
    };
    fiber.element_type = Some(element.element_type.clone());
    fiber
}

/// Create an implicit fragment fiber for a nested list of children
pub fn fiber_from_fragment(children: Child, key: Option<String>) -> Fiber {
    Fiber::new(WorkTag::Fragment, FiberProps::Children(children), key)
}

pub fn fiber_from_text(text: &str) -> Fiber {
    Fiber::new(WorkTag::HostText, FiberProps::Text(text.to_string()), None)
}

struct Slot {
    generation: u32,
    fiber: Option<Fiber>,
}

/// Slot storage for fibers addressed by [`FiberId`]
///
/// Freed slots are recycled with a bumped generation.
#[derive(Default)]
pub struct FiberArena {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, fiber: Fiber) -> FiberId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.fiber = Some(fiber);
            return FiberId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            fiber: Some(fiber),
        });
        FiberId {
            index,
            generation: 0,
        }
    }

    /// Release a slot. Returns the fiber if the handle was live.
    pub fn free(&mut self, id: FiberId) -> Option<Fiber> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let fiber = slot.fiber.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.live -= 1;
        Some(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.fiber.as_ref())
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.fiber.as_mut())
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live fibers
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Free every fiber not reachable from `roots`
    ///
    /// Reachability follows `child` and `sibling` links. The alternate of a
    /// reachable fiber is kept as well, but its own links are stale and are
    /// not followed. Host nodes owned only by reclaimed fibers are reported as
    /// orphans.
    pub fn retain_reachable(&mut self, roots: &[FiberId]) -> Reclaimed {
        let mut marked = vec![false; self.slots.len()];
        let mut twins = vec![false; self.slots.len()];
        let mut stack: Vec<FiberId> = roots.to_vec();

        while let Some(id) = stack.pop() {
            let Some(fiber) = self.get(id) else {
                continue;
            };
            let index = id.index as usize;
            if marked[index] {
                continue;
            }
            marked[index] = true;
            stack.extend(fiber.child);
            stack.extend(fiber.sibling);
            if let Some(alternate) = fiber.alternate.filter(|alt| self.contains(*alt)) {
                twins[alternate.index as usize] = true;
            }
        }

        let mut reclaimed = Reclaimed::default();
        let mut live_nodes = HashSet::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(state_node) = slot.fiber.as_ref().map(|fiber| fiber.state_node) else {
                continue;
            };
            if marked[index] || twins[index] {
                live_nodes.extend(state_node);
                continue;
            }
            reclaimed.orphaned_host_nodes.extend(state_node);
            slot.fiber = None;
            slot.generation = slot.generation.wrapping_add(1);
            // Index fits: slots are only ever pushed while below u32::MAX.
            self.free_list.push(index as u32);
            reclaimed.fibers += 1;
        }
        reclaimed
            .orphaned_host_nodes
            .retain(|node| !live_nodes.contains(node));
        self.live -= reclaimed.fibers;
        reclaimed
    }

    /// Clone `current` into its work-in-progress twin for a new render pass
    ///
    /// Reuses the existing alternate slot if there is one; otherwise allocates
    /// it and links the pair. Identity fields and the committed child, props,
    /// state and queue are copied; effect flags, subtree flags, deletions and
    /// update payload start empty.
    pub fn create_work_in_progress(&mut self, current: FiberId, pending_props: FiberProps) -> FiberId {
        let source = &self[current];
        let child = source.child;
        let memoized_props = source.memoized_props.clone();
        let memoized_state = source.memoized_state.clone();
        let update_queue = source.update_queue.clone();
        let existing = source.alternate;

        let wip = match existing.filter(|alt| self.contains(*alt)) {
            Some(alternate) => {
                let fiber = &mut self[alternate];
                fiber.pending_props = pending_props;
                fiber.flags = Flags::empty();
                fiber.subtree_flags = Flags::empty();
                fiber.deletions.clear();
                fiber.update_payload = None;
                alternate
            }
            None => {
                let source = &self[current];
                let mut fiber = Fiber::new(source.tag, pending_props, source.key.clone());
                fiber.element_type = source.element_type.clone();
                fiber.state_node = source.state_node;
                fiber.alternate = Some(current);
                let wip = self.alloc(fiber);
                self[current].alternate = Some(wip);
                wip
            }
        };

        let fiber = &mut self[wip];
        fiber.child = child;
        fiber.memoized_props = memoized_props;
        fiber.memoized_state = memoized_state;
        fiber.update_queue = update_queue;
        wip
    }
}

impl Index<FiberId> for FiberArena {
    type Output = Fiber;

    /// # Panics
    ///
    /// Panics on a stale handle. Tree links are kept live by the reachability
    /// sweep, so this only fires on a broken tree.
    fn index(&self, id: FiberId) -> &Fiber {
        match self.get(id) {
            Some(fiber) => fiber,
            None => panic!("stale fiber handle {}", id),
        }
    }
}

impl IndexMut<FiberId> for FiberArena {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber {
        match self.get_mut(id) {
            Some(fiber) => fiber,
            None => panic!("stale fiber handle {}", id),
        }
    }
}
