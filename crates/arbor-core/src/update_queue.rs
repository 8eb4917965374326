//! Update queues
//!
//! A [`LaneQueue`] holds a base state and the lane-tagged updates queued on
//! top of it, in enqueue order. A render folds the updates whose lane is part
//! of its render lanes over the base and skips the rest; the queue itself is
//! only changed when that render commits:
//!
//! - the base advances to the state just before the first skipped update
//!   (or to the rendered state when nothing was skipped),
//! - applied updates before the first skip are removed,
//! - applied updates after it stay queued with an empty lane, so every later
//!   render re-applies them in their original order.
//!
//! [`UpdateInbox`] is the hand-off between code running outside the
//! reconciler (state setters, awaitable settlement) and the reconciler's
//! scheduling entry points.

use std::any::Any;
use std::rc::Rc;

use crate::element::Child;
use crate::fiber::FiberId;
use crate::lane::{Lane, Lanes, NO_LANES};

#[derive(Clone)]
pub struct QueuedUpdate<A> {
    pub seq: u64,
    pub lane: Lane,
    pub action: A,
}

/// What a render took from a queue; handed back to the queue at commit
#[derive(Clone)]
pub struct Rebase<S> {
    pub base: S,
    pub consumed: Vec<u64>,
    pub first_skipped: Option<u64>,
}

impl<S> Rebase<S> {
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

pub struct LaneQueue<S, A> {
    base: S,
    updates: Vec<QueuedUpdate<A>>,
    next_seq: u64,
}

impl<S: Clone, A> LaneQueue<S, A> {
    pub fn new(base: S) -> Self {
        Self {
            base,
            updates: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn enqueue(&mut self, lane: Lane, action: A) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.updates.push(QueuedUpdate { seq, lane, action });
        seq
    }

    /// Compute the state seen by a render of `render_lanes`
    pub fn process<F>(&self, render_lanes: Lanes, apply: F) -> (S, Rebase<S>)
    where
        F: Fn(&S, &A) -> S,
    {
        let mut state = self.base.clone();
        let mut rebase = Rebase {
            base: self.base.clone(),
            consumed: Vec::new(),
            first_skipped: None,
        };

        for update in &self.updates {
            if update.lane.is_subset_of(render_lanes) {
                state = apply(&state, &update.action);
                rebase.consumed.push(update.seq);
                if rebase.first_skipped.is_none() {
                    rebase.base = state.clone();
                }
            } else if rebase.first_skipped.is_none() {
                rebase.first_skipped = Some(update.seq);
            }
        }
        (state, rebase)
    }

    /// Fold a committed render's [`Rebase`] into the queue
    pub fn commit(&mut self, rebase: &Rebase<S>) {
        self.base = rebase.base.clone();
        let first_skipped = rebase.first_skipped;
        self.updates.retain_mut(|update| {
            if !rebase.consumed.contains(&update.seq) {
                return true;
            }
            match first_skipped {
                Some(skipped) if update.seq > skipped => {
                    update.lane = NO_LANES;
                    true
                }
                _ => false,
            }
        });
    }

    pub fn base(&self) -> &S {
        &self.base
    }

    pub fn pending_lanes(&self) -> Lanes {
        self.updates
            .iter()
            .fold(NO_LANES, |lanes, update| lanes.merge(update.lane))
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Root updates replace the rendered description
pub type RootQueue = LaneQueue<Child, Child>;

impl RootQueue {
    pub fn process_root(&self, render_lanes: Lanes) -> (Child, Rebase<Child>) {
        self.process(render_lanes, |_, element| element.clone())
    }
}

/// Type-erased state transition queued by a state setter
pub type StateAction = Rc<dyn Fn(&Rc<dyn Any>) -> Rc<dyn Any>>;

/// Queue shared by one state hook across both fiber twins and its setters
pub type StateQueue = LaneQueue<Rc<dyn Any>, StateAction>;

impl StateQueue {
    pub fn process_state(&self, render_lanes: Lanes) -> (Rc<dyn Any>, Rebase<Rc<dyn Any>>) {
        self.process(render_lanes, |state, action| action(state))
    }
}

/// Something the reconciler must react to at its next entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxEntry {
    /// A state update was queued for `fiber` on `lane`
    Update { fiber: FiberId, lane: Lane },
    /// An awaitable that parked `lanes` settled
    Ping { lanes: Lanes },
}

#[derive(Debug, Default)]
pub struct UpdateInbox {
    entries: Vec<InboxEntry>,
}

impl UpdateInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: InboxEntry) {
        self.entries.push(entry);
    }

    pub fn drain(&mut self) -> Vec<InboxEntry> {
        std::mem::take(&mut self.entries)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
