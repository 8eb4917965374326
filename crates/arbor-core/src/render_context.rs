//! Render-attempt scoped state
//!
//! Everything here belongs to one render attempt and is reset when a fresh
//! stack is prepared: the work-in-progress cursor, the lanes being rendered,
//! the awaitable the attempt suspended on, and the context provider stack.

use std::cell::RefCell;
use std::rc::Rc;

use arbor_core_types::AttemptId;
use serde_json::Value;

use crate::awaitable::Wakeable;
use crate::element::Context;
use crate::fiber::FiberId;
use crate::lane::{Lanes, NO_LANES};
use crate::update_queue::UpdateInbox;

/// How a render attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum RootExitStatus {
    /// Yielded with work remaining
    Incomplete,
    /// The work-in-progress tree is ready to commit
    Completed,
    /// Parked on an unresolved awaitable
    Suspended,
    /// Aborted by a failure; the attempt and its lanes are discarded
    Errored(crate::errors::ReconcileError),
}

impl RootExitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootExitStatus::Incomplete => "incomplete",
            RootExitStatus::Completed => "completed",
            RootExitStatus::Suspended => "suspended",
            RootExitStatus::Errored(_) => "errored",
        }
    }
}

pub struct RenderContext {
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) wip: Option<FiberId>,
    pub(crate) render_lanes: Lanes,
    pub(crate) needs_fresh_stack: bool,
    pub(crate) attempt_id: Option<AttemptId>,
    pub(crate) host_nodes_created: usize,
    suspended: Option<Rc<dyn Wakeable>>,
    providers: Vec<(u64, Value)>,
    inbox: Rc<RefCell<UpdateInbox>>,
}

impl RenderContext {
    pub fn new(inbox: Rc<RefCell<UpdateInbox>>) -> Self {
        Self {
            wip_root: None,
            wip: None,
            render_lanes: NO_LANES,
            needs_fresh_stack: false,
            attempt_id: None,
            host_nodes_created: 0,
            suspended: None,
            providers: Vec::new(),
            inbox,
        }
    }

    /// Start a new attempt rooted at `wip_root`
    pub fn prepare(&mut self, wip_root: FiberId, lanes: Lanes) -> AttemptId {
        let attempt_id = AttemptId::new();
        self.wip_root = Some(wip_root);
        self.wip = Some(wip_root);
        self.render_lanes = lanes;
        self.needs_fresh_stack = false;
        self.attempt_id = Some(attempt_id.clone());
        self.host_nodes_created = 0;
        self.suspended = None;
        self.providers.clear();
        attempt_id
    }

    /// Drop the attempt entirely
    pub fn reset(&mut self) {
        self.wip_root = None;
        self.wip = None;
        self.render_lanes = NO_LANES;
        self.needs_fresh_stack = false;
        self.attempt_id = None;
        self.host_nodes_created = 0;
        self.suspended = None;
        self.providers.clear();
    }

    pub fn render_lanes(&self) -> Lanes {
        self.render_lanes
    }

    pub fn attempt_id(&self) -> Option<&AttemptId> {
        self.attempt_id.as_ref()
    }

    pub fn is_rendering(&self) -> bool {
        self.wip_root.is_some()
    }

    pub fn inbox(&self) -> &Rc<RefCell<UpdateInbox>> {
        &self.inbox
    }

    /// Record the awaitable this attempt is waiting on. The first one wins;
    /// the same awaitable read twice is recorded once.
    pub fn record_suspended(&mut self, wakeable: Rc<dyn Wakeable>) {
        match &self.suspended {
            Some(existing) if existing.id() == wakeable.id() => {}
            Some(_) => {
                tracing::trace!(awaitable = wakeable.id(), "Additional awaitable ignored");
            }
            None => self.suspended = Some(wakeable),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.is_some()
    }

    pub fn take_suspended(&mut self) -> Option<Rc<dyn Wakeable>> {
        self.suspended.take()
    }

    pub fn push_provider(&mut self, context: &Context, value: Value) {
        self.providers.push((context.id(), value));
    }

    pub fn pop_provider(&mut self) {
        self.providers.pop();
    }

    /// The innermost provided value for `context`, or its default
    pub fn read_context(&self, context: &Context) -> Value {
        self.providers
            .iter()
            .rev()
            .find(|(id, _)| *id == context.id())
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| context.default_value().clone())
    }
}
