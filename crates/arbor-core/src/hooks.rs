//! Hook storage for function components
//!
//! A component receives a [`Hooks`] handle while it renders. Hooks are
//! matched to the previous render's hooks by call order; a component that
//! calls them in a different order fails the render attempt.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use serde_json::Value;

use crate::awaitable::{AwaitState, Awaitable};
use crate::element::Context;
use crate::errors::ReconcileError;
use crate::fiber::FiberId;
use crate::lane::{Lane, Lanes};
use crate::render_context::RenderContext;
use crate::update_queue::{InboxEntry, Rebase, StateAction, StateQueue, UpdateInbox};

/// Why a component stopped rendering without producing children
#[derive(Debug, Clone, PartialEq)]
pub enum RenderInterrupt {
    /// Waiting on an unresolved awaitable recorded in the render context
    Suspended,
    /// The render failed; the attempt is discarded
    Failed(ReconcileError),
}

impl From<ReconcileError> for RenderInterrupt {
    fn from(error: ReconcileError) -> Self {
        RenderInterrupt::Failed(error)
    }
}

impl fmt::Display for RenderInterrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderInterrupt::Suspended => write!(f, "suspended"),
            RenderInterrupt::Failed(error) => write!(f, "{}", error),
        }
    }
}

/// Cleanup returned by an effect
pub type Destroy = Box<dyn FnOnce()>;

type Create = Box<dyn FnOnce() -> Option<Destroy>>;

/// Destroy slot shared by every render's copy of one effect hook
#[derive(Default)]
pub struct EffectInstance {
    destroy: RefCell<Option<Destroy>>,
}

/// One passive effect produced by a render
pub struct Effect {
    has_effect: bool,
    create: RefCell<Option<Create>>,
    inst: Rc<EffectInstance>,
    deps: Option<Vec<Value>>,
}

impl Effect {
    /// Whether this render changed the effect's deps (or mounted it)
    pub fn has_effect(&self) -> bool {
        self.has_effect
    }

    pub fn deps(&self) -> Option<&[Value]> {
        self.deps.as_deref()
    }

    pub(crate) fn run_destroy(&self) {
        let destroy = self.inst.destroy.borrow_mut().take();
        if let Some(destroy) = destroy {
            destroy();
        }
    }

    pub(crate) fn run_create(&self) {
        let create = self.create.borrow_mut().take();
        if let Some(create) = create {
            let destroy = create();
            *self.inst.destroy.borrow_mut() = destroy;
        }
    }
}

#[derive(Clone)]
pub enum Hook {
    State {
        value: Rc<dyn Any>,
        queue: Rc<RefCell<StateQueue>>,
        rebase: Rebase<Rc<dyn Any>>,
    },
    Effect(Rc<Effect>),
    Context(u64),
}

impl Hook {
    fn kind(&self) -> &'static str {
        match self {
            Hook::State { .. } => "state",
            Hook::Effect(_) => "effect",
            Hook::Context(_) => "context",
        }
    }
}

/// What one component render left behind
pub(crate) struct HooksOutcome {
    pub hooks: Vec<Hook>,
    pub effects: Vec<Rc<Effect>>,
    pub has_passive: bool,
    pub consumed_updates: bool,
}

/// Hook dispatcher for one component render
pub struct Hooks<'a> {
    fiber: FiberId,
    component: &'a str,
    previous: Option<Vec<Hook>>,
    next: Vec<Hook>,
    effects: Vec<Rc<Effect>>,
    has_passive: bool,
    consumed_updates: bool,
    ctx: &'a mut RenderContext,
}

impl<'a> Hooks<'a> {
    /// `previous` is `None` on mount, otherwise the committed render's hooks
    pub(crate) fn new(
        fiber: FiberId,
        component: &'a str,
        previous: Option<Vec<Hook>>,
        ctx: &'a mut RenderContext,
    ) -> Self {
        Self {
            fiber,
            component,
            previous,
            next: Vec::new(),
            effects: Vec::new(),
            has_passive: false,
            consumed_updates: false,
            ctx,
        }
    }

    pub fn render_lanes(&self) -> Lanes {
        self.ctx.render_lanes()
    }

    pub fn is_mount(&self) -> bool {
        self.previous.is_none()
    }

    fn mismatch(&self, expected: &str, found: &str) -> ReconcileError {
        ReconcileError::HookOrderMismatch {
            component: self.component.to_string(),
            index: self.next.len(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    fn previous_hook(&self, kind: &str) -> Result<Option<Hook>, ReconcileError> {
        let Some(previous) = &self.previous else {
            return Ok(None);
        };
        match previous.get(self.next.len()) {
            Some(hook) if hook.kind() == kind => Ok(Some(hook.clone())),
            Some(hook) => Err(self.mismatch(hook.kind(), kind)),
            None => Err(self.mismatch("none", kind)),
        }
    }

    /// Local state. Updates queued through the setter are applied on the next
    /// render whose lanes include them.
    pub fn use_state<T, F>(&mut self, initial: F) -> Result<(T, StateSetter<T>), RenderInterrupt>
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        let queue = match self.previous_hook("state")? {
            Some(Hook::State { queue, .. }) => queue,
            _ => {
                let initial: Rc<dyn Any> = Rc::new(initial());
                Rc::new(RefCell::new(StateQueue::new(initial)))
            }
        };
        let (value, rebase) = queue.borrow().process_state(self.ctx.render_lanes());

        let Some(current) = value.downcast_ref::<T>().cloned() else {
            return Err(self.mismatch("state of another type", type_name::<T>()).into());
        };
        if !rebase.is_empty() {
            self.consumed_updates = true;
        }

        let setter = StateSetter {
            queue: queue.clone(),
            inbox: self.ctx.inbox().clone(),
            fiber: self.fiber,
            _marker: PhantomData,
        };
        self.next.push(Hook::State {
            value,
            queue,
            rebase,
        });
        Ok((current, setter))
    }

    /// Passive effect, run after commit
    ///
    /// With `deps: None` the effect runs after every commit of this component;
    /// otherwise only when `deps` differ by value from the previous render's.
    /// The previous run's cleanup always runs before the next create.
    pub fn use_effect<F>(&mut self, create: F, deps: Option<Vec<Value>>) -> Result<(), RenderInterrupt>
    where
        F: FnOnce() -> Option<Destroy> + 'static,
    {
        let (inst, has_effect) = match self.previous_hook("effect")? {
            Some(Hook::Effect(previous)) => {
                let unchanged = matches!((&previous.deps, &deps), (Some(old), Some(new)) if old == new);
                (previous.inst.clone(), !unchanged)
            }
            _ => (Rc::new(EffectInstance::default()), true),
        };

        let effect = Rc::new(Effect {
            has_effect,
            create: RefCell::new(Some(Box::new(create))),
            inst,
            deps,
        });
        self.has_passive |= has_effect;
        self.effects.push(effect.clone());
        self.next.push(Hook::Effect(effect));
        Ok(())
    }

    /// Value of the nearest provider of `context` above this component
    pub fn use_context(&mut self, context: &Context) -> Result<Value, RenderInterrupt> {
        self.previous_hook("context")?;
        self.next.push(Hook::Context(context.id()));
        Ok(self.ctx.read_context(context))
    }

    /// Read an awaitable, suspending the render attempt while it is unresolved
    ///
    /// Not order-sensitive: may be called conditionally.
    pub fn use_awaitable<T: Clone + 'static>(
        &mut self,
        awaitable: &Awaitable<T>,
    ) -> Result<T, RenderInterrupt> {
        match awaitable.track() {
            AwaitState::Fulfilled(value) => Ok(value),
            AwaitState::Rejected(reason) => {
                Err(ReconcileError::AwaitableRejected { reason }.into())
            }
            AwaitState::Pending | AwaitState::Untracked => {
                self.ctx.record_suspended(awaitable.as_wakeable());
                Err(RenderInterrupt::Suspended)
            }
        }
    }

    pub(crate) fn finish(self) -> Result<HooksOutcome, RenderInterrupt> {
        if let Some(previous) = &self.previous {
            if let Some(missing) = previous.get(self.next.len()) {
                return Err(self.mismatch(missing.kind(), "end of render").into());
            }
        }
        Ok(HooksOutcome {
            hooks: self.next,
            effects: self.effects,
            has_passive: self.has_passive,
            consumed_updates: self.consumed_updates,
        })
    }
}

/// Enqueues state updates for one `use_state` hook
pub struct StateSetter<T> {
    queue: Rc<RefCell<StateQueue>>,
    inbox: Rc<RefCell<UpdateInbox>>,
    fiber: FiberId,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            inbox: self.inbox.clone(),
            fiber: self.fiber,
            _marker: PhantomData,
        }
    }
}

impl<T: Clone + 'static> StateSetter<T> {
    /// Replace the state on the sync lane
    pub fn set(&self, value: T) {
        self.set_with_lane(value, Lanes::SYNC);
    }

    pub fn set_with_lane(&self, value: T, lane: Lane) {
        let action: StateAction = Rc::new(move |_: &Rc<dyn Any>| -> Rc<dyn Any> { Rc::new(value.clone()) });
        self.dispatch(lane, action);
    }

    /// Derive the next state from the previous one on the sync lane
    pub fn update<F>(&self, f: F)
    where
        F: Fn(&T) -> T + 'static,
    {
        self.update_with_lane(f, Lanes::SYNC);
    }

    pub fn update_with_lane<F>(&self, f: F, lane: Lane)
    where
        F: Fn(&T) -> T + 'static,
    {
        let action: StateAction = Rc::new(move |previous: &Rc<dyn Any>| -> Rc<dyn Any> {
            match previous.downcast_ref::<T>() {
                Some(value) => Rc::new(f(value)),
                None => previous.clone(),
            }
        });
        self.dispatch(lane, action);
    }

    /// The fiber this setter schedules updates on
    pub fn fiber(&self) -> FiberId {
        self.fiber
    }

    fn dispatch(&self, lane: Lane, action: StateAction) {
        self.queue.borrow_mut().enqueue(lane, action);
        self.inbox.borrow_mut().push(InboxEntry::Update {
            fiber: self.fiber,
            lane,
        });
    }
}
