//! Work loop
//!
//! [`Reconciler`] owns one root and drives it through render and commit:
//!
//! - updates mark lanes pending on the root and make sure exactly one
//!   callback is scheduled for the most urgent of them,
//! - sync lanes run from the sync callback queue, everything else runs as a
//!   scheduler task that may yield between units of work and resume later,
//! - a completed render is committed in one step, and passive effects are
//!   flushed afterwards from their own task.
//!
//! Nothing here runs on its own. The host drives the reconciler by calling
//! [`Reconciler::flush_sync_work`] (when asked through
//! [`HostConfig::schedule_microtask`]) and [`Reconciler::run_next_task`] or
//! [`Reconciler::run_until_idle`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

use bitflags::bitflags;

use crate::begin_work::begin_work;
use crate::commit::{CommitReport, MutationPass, PendingPassiveEffects};
use crate::complete_work::complete_work;
use crate::config::ReconcilerConfig;
use crate::diagnostics::Diagnostics;
use crate::element::Child;
use crate::errors::{ExError, ReconcileError, Result};
use crate::fiber::{Fiber, FiberArena, FiberId, FiberProps, FiberState, Flags, UpdateQueue, WorkTag};
use crate::hooks::RenderInterrupt;
use crate::host::HostConfig;
use crate::lane::{Lane, Lanes, NO_LANES};
use crate::render_context::{RenderContext, RootExitStatus};
use crate::scheduler::{CallbackHandle, CooperativeScheduler, PriorityLevel, TaskKind, TaskScheduler};
use crate::sync_queue::{SyncCallback, SyncCallbackQueue};
use crate::update_queue::{InboxEntry, RootQueue, UpdateInbox};
use crate::{log_op_end, log_op_error, log_op_start};

bitflags! {
    /// What the reconciler is currently doing
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExecutionContext: u8 {
        const RENDER = 0b01;
        const COMMIT = 0b10;
    }
}

/// Scheduling state of the single root a [`Reconciler`] owns
pub struct FiberRoot {
    current: FiberId,
    queue: Rc<RefCell<RootQueue>>,
    pending_lanes: Lanes,
    suspended_lanes: Lanes,
    entanglements: Vec<Lanes>,
    callback_handle: Option<CallbackHandle>,
    callback_priority: Lane,
    finished_work: Option<FiberId>,
    finished_lanes: Lanes,
    pending_passive: PendingPassiveEffects,
    passive_callback: Option<CallbackHandle>,
    ping_cache: HashSet<(u64, u32)>,
}

impl FiberRoot {
    fn new(current: FiberId, queue: Rc<RefCell<RootQueue>>) -> Self {
        Self {
            current,
            queue,
            pending_lanes: NO_LANES,
            suspended_lanes: NO_LANES,
            entanglements: Vec::new(),
            callback_handle: None,
            callback_priority: NO_LANES,
            finished_work: None,
            finished_lanes: NO_LANES,
            pending_passive: PendingPassiveEffects::default(),
            passive_callback: None,
            ping_cache: HashSet::new(),
        }
    }

    /// The committed HostRoot fiber
    pub fn current(&self) -> FiberId {
        self.current
    }

    pub fn pending_lanes(&self) -> Lanes {
        self.pending_lanes
    }

    /// Lanes parked on an unresolved awaitable
    pub fn suspended_lanes(&self) -> Lanes {
        self.suspended_lanes
    }

    /// Lane of the callback currently scheduled for this root
    pub fn callback_priority(&self) -> Lane {
        self.callback_priority
    }

    pub fn has_pending_passive_effects(&self) -> bool {
        !self.pending_passive.is_empty()
    }

    /// Lanes to render next: the most urgent available lane plus any pending
    /// lanes entangled with it
    fn next_lanes(&self) -> Lanes {
        let available = self.pending_lanes.remove_lanes(self.suspended_lanes);
        let mut lanes = available.highest_priority();
        if lanes.is_empty() {
            return lanes;
        }
        for group in &self.entanglements {
            if group.intersects(lanes) {
                lanes |= *group & available;
            }
        }
        lanes
    }

    fn mark_finished(&mut self, lanes: Lanes) {
        self.pending_lanes = self.pending_lanes.remove_lanes(lanes);
        self.suspended_lanes = self.suspended_lanes.remove_lanes(lanes);
        self.entanglements.retain(|group| !group.intersects(lanes));
    }
}

/// Incremental tree reconciler for one root
pub struct Reconciler<H: HostConfig, S: TaskScheduler = CooperativeScheduler> {
    arena: FiberArena,
    root: FiberRoot,
    host: H,
    scheduler: S,
    sync_queue: SyncCallbackQueue,
    inbox: Rc<RefCell<UpdateInbox>>,
    ctx: RenderContext,
    diagnostics: Diagnostics,
    config: ReconcilerConfig,
    execution: ExecutionContext,
    commit_log: Vec<CommitReport>,
}

impl<H: HostConfig> Reconciler<H, CooperativeScheduler> {
    /// Reconciler with the in-process scheduler configured from `config`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails validation.
    pub fn new(host: H, config: ReconcilerConfig) -> Result<Self> {
        let scheduler = CooperativeScheduler::new(config.yield_policy);
        Self::with_scheduler(host, scheduler, config)
    }
}

impl<H: HostConfig, S: TaskScheduler> Reconciler<H, S> {
    /// Reconciler driven by a caller-supplied scheduler
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails validation.
    pub fn with_scheduler(host: H, scheduler: S, config: ReconcilerConfig) -> Result<Self> {
        config.validate()?;

        let mut arena = FiberArena::new();
        let queue = Rc::new(RefCell::new(RootQueue::new(Child::Empty)));
        let mut host_root = Fiber::new(WorkTag::HostRoot, FiberProps::None, None);
        host_root.memoized_state = FiberState::Root(Child::Empty);
        host_root.update_queue = UpdateQueue::Root {
            shared: queue.clone(),
            rebase: None,
        };
        let current = arena.alloc(host_root);

        let inbox = Rc::new(RefCell::new(UpdateInbox::new()));
        let diagnostics = Diagnostics::new(config.diagnostics, config.diagnostics_capacity);
        tracing::debug!(
            yield_policy = ?config.yield_policy,
            diagnostics = ?config.diagnostics,
            "Reconciler created"
        );

        Ok(Self {
            arena,
            root: FiberRoot::new(current, queue),
            host,
            scheduler,
            sync_queue: SyncCallbackQueue::new(),
            ctx: RenderContext::new(inbox.clone()),
            inbox,
            diagnostics,
            config,
            execution: ExecutionContext::empty(),
            commit_log: Vec::new(),
        })
    }

    // ----- accessors -----

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn root(&self) -> &FiberRoot {
        &self.root
    }

    pub fn arena(&self) -> &FiberArena {
        &self.arena
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Reports of every commit so far, oldest first
    pub fn commit_log(&self) -> &[CommitReport] {
        &self.commit_log
    }

    pub fn last_commit(&self) -> Option<&CommitReport> {
        self.commit_log.last()
    }

    /// Whether a render attempt is in progress (possibly yielded)
    pub fn is_rendering(&self) -> bool {
        self.ctx.is_rendering()
    }

    /// Whether anything is left to do: pending lanes, sync callbacks,
    /// scheduler tasks or undrained updates
    pub fn has_pending_work(&self) -> bool {
        !self.root.next_lanes().is_empty()
            || !self.sync_queue.is_empty()
            || !self.scheduler.is_empty()
            || !self.inbox.borrow().is_empty()
    }

    // ----- update entry points -----

    /// Render `description` into the root on the sync lane
    ///
    /// Only schedules the work; it runs on the next [`Self::flush_sync_work`].
    pub fn render(&mut self, description: impl Into<Child>) {
        self.render_with_lane(description, Lanes::SYNC);
    }

    /// Render `description` into the root on `lane`
    pub fn render_with_lane(&mut self, description: impl Into<Child>, lane: Lane) {
        let lane = if lane.is_empty() {
            Lanes::DEFAULT
        } else {
            lane.highest_priority()
        };
        self.root.queue.borrow_mut().enqueue(lane, description.into());
        let current = self.root.current;
        self.schedule_update_on_fiber(current, lane);
    }

    /// Mark `lane` pending on the root that owns `fiber` and make sure work
    /// is scheduled for it
    ///
    /// A stale fiber (one that has been unmounted and reclaimed) is reported
    /// as a diagnostic and otherwise ignored.
    pub fn schedule_update_on_fiber(&mut self, fiber: FiberId, lane: Lane) {
        let owns_root = self
            .root_of(fiber)
            .is_some_and(|root| root == self.root.current || self.arena[self.root.current].alternate == Some(root));
        if !owns_root {
            self.diagnostics.report(
                "schedule_update_on_fiber",
                ReconcileError::StaleFiber {
                    fiber: fiber.to_string(),
                },
            );
            return;
        }

        self.root.pending_lanes |= lane;
        // An update un-parks its lane: the new state may no longer suspend.
        self.root.suspended_lanes = self.root.suspended_lanes.remove_lanes(lane);
        if self.ctx.is_rendering() && self.ctx.render_lanes().intersects(lane) {
            // The running attempt already read its queues; restart it.
            self.ctx.needs_fresh_stack = true;
        }
        tracing::debug!(fiber = %fiber, lanes = lane.bits(), "Update scheduled");
        self.ensure_root_is_scheduled();
    }

    /// Render `lanes` together whenever any of them is rendered
    pub fn entangle_lanes(&mut self, lanes: Lanes) {
        if lanes.bits().count_ones() < 2 {
            return;
        }
        let mut group = lanes;
        self.root.entanglements.retain(|existing| {
            if existing.intersects(group) {
                group |= *existing;
                false
            } else {
                true
            }
        });
        self.root.entanglements.push(group);
    }

    fn root_of(&self, fiber: FiberId) -> Option<FiberId> {
        let mut node = fiber;
        let mut current = self.arena.get(node)?;
        while let Some(parent) = current.return_ {
            node = parent;
            current = self.arena.get(parent)?;
        }
        (current.tag == WorkTag::HostRoot).then_some(node)
    }

    // ----- driver entry points -----

    /// Apply queued updates and run every pending sync callback
    pub fn flush_sync_work(&mut self) {
        self.drain_inbox();
        self.flush_sync_callbacks();
    }

    /// Run the most urgent scheduler task, if any, as one time slice
    ///
    /// Returns `false` when there was nothing to run.
    pub fn run_next_task(&mut self) -> bool {
        self.flush_sync_work();
        let Some(task) = self.scheduler.pop_task() else {
            return false;
        };
        self.scheduler.begin_slice();
        tracing::trace!(
            task = task.handle.id(),
            priority = task.priority.as_str(),
            did_timeout = task.did_timeout,
            "Running task"
        );

        match task.kind {
            TaskKind::FlushPassiveEffects => {
                if self.root.passive_callback == Some(task.handle) {
                    self.root.passive_callback = None;
                }
                self.flush_passive_effects();
            }
            TaskKind::PerformConcurrentWork => {
                if self.root.callback_handle == Some(task.handle) {
                    if self.perform_concurrent_work_on_root(task.did_timeout) {
                        self.scheduler.requeue(task);
                    }
                } else {
                    tracing::trace!(task = task.handle.id(), "Stale task skipped");
                }
            }
        }

        self.flush_sync_work();
        true
    }

    /// Keep flushing sync work and running tasks until nothing is left
    pub fn run_until_idle(&mut self) {
        loop {
            self.flush_sync_work();
            if !self.run_next_task() {
                break;
            }
        }
    }

    /// Run pending passive effects now
    ///
    /// Returns `true` if there were any. Updates they schedule are drained
    /// and sync work is flushed before returning.
    pub fn flush_passive_effects(&mut self) -> bool {
        if let Some(handle) = self.root.passive_callback.take() {
            self.scheduler.cancel_callback(handle);
        }
        if self.root.pending_passive.is_empty() {
            return false;
        }
        if !self.execution.is_empty() {
            self.report_reentrant("flush_passive_effects");
            return false;
        }

        let op = "flush_passive_effects";
        log_op_start!(op);
        let start = Instant::now();
        let pending = std::mem::take(&mut self.root.pending_passive);
        let effects = pending.run();
        log_op_end!(op, duration_ms = start.elapsed().as_millis() as u64, effects = effects);

        self.drain_inbox();
        self.flush_sync_callbacks();
        true
    }

    // ----- scheduling -----

    fn drain_inbox(&mut self) {
        loop {
            let entries = self.inbox.borrow_mut().drain();
            if entries.is_empty() {
                break;
            }
            for entry in entries {
                match entry {
                    InboxEntry::Update { fiber, lane } => self.schedule_update_on_fiber(fiber, lane),
                    InboxEntry::Ping { lanes } => self.ping_root(lanes),
                }
            }
        }
    }

    fn ping_root(&mut self, lanes: Lanes) {
        tracing::debug!(lanes = lanes.bits(), "Suspended lanes pinged");
        self.root.suspended_lanes = self.root.suspended_lanes.remove_lanes(lanes);
        self.root.ping_cache.retain(|(_, bits)| *bits != lanes.bits());
        self.ensure_root_is_scheduled();
    }

    /// Keep exactly one callback scheduled, for the most urgent next lane
    fn ensure_root_is_scheduled(&mut self) {
        let next_lanes = self.root.next_lanes();
        if next_lanes.is_empty() {
            if let Some(handle) = self.root.callback_handle.take() {
                self.scheduler.cancel_callback(handle);
            }
            self.root.callback_priority = NO_LANES;
            return;
        }

        let priority = next_lanes.highest_priority();
        if priority == self.root.callback_priority {
            return;
        }
        if let Some(handle) = self.root.callback_handle.take() {
            self.scheduler.cancel_callback(handle);
        }

        if priority == Lanes::SYNC {
            self.sync_queue.push(SyncCallback::PerformSyncWorkOnRoot);
            if self.sync_queue.request_microtask() {
                self.host.schedule_microtask();
            }
        } else {
            let handle = self
                .scheduler
                .schedule_callback(priority.to_scheduler_priority(), TaskKind::PerformConcurrentWork);
            self.root.callback_handle = Some(handle);
        }
        self.root.callback_priority = priority;
        tracing::trace!(lanes = next_lanes.bits(), "Root scheduled");
    }

    fn flush_sync_callbacks(&mut self) {
        if !self.sync_queue.begin_flush() {
            return;
        }
        while let Some(callback) = self.sync_queue.pop() {
            match callback {
                SyncCallback::PerformSyncWorkOnRoot => self.perform_sync_work_on_root(),
            }
        }
        self.sync_queue.end_flush();
    }

    // ----- render -----

    fn perform_sync_work_on_root(&mut self) {
        if self.root.callback_priority == Lanes::SYNC {
            self.root.callback_priority = NO_LANES;
        }
        self.flush_passive_effects();

        let lanes = self.root.next_lanes();
        if !lanes.contains(Lanes::SYNC) {
            self.ensure_root_is_scheduled();
            return;
        }

        let op = "perform_sync_work_on_root";
        log_op_start!(op, lanes = lanes.bits());
        let start = Instant::now();
        let status = self.render_root(lanes, false);
        self.finish_render_attempt(op, lanes, status, start);
        self.ensure_root_is_scheduled();
    }

    /// Returns `true` when the task should be continued in a later slice
    fn perform_concurrent_work_on_root(&mut self, did_timeout: bool) -> bool {
        let original = self.root.callback_handle;
        if self.flush_passive_effects() && self.root.callback_handle != original {
            // Effects scheduled more urgent work; this task is superseded.
            return false;
        }

        let lanes = self.root.next_lanes();
        if lanes.is_empty() {
            return false;
        }

        let op = "perform_concurrent_work_on_root";
        log_op_start!(op, lanes = lanes.bits(), did_timeout = did_timeout);
        let start = Instant::now();
        let time_slice = !lanes.intersects(Lanes::SYNC) && !did_timeout;
        let status = self.render_root(lanes, time_slice);
        self.finish_render_attempt(op, lanes, status, start);
        self.ensure_root_is_scheduled();

        original.is_some() && self.root.callback_handle == original
    }

    fn finish_render_attempt(&mut self, op: &str, lanes: Lanes, status: RootExitStatus, start: Instant) {
        let exit_status = status.as_str();
        match status {
            RootExitStatus::Incomplete => {}
            RootExitStatus::Completed => {
                self.root.finished_work = self.ctx.wip_root;
                self.root.finished_lanes = lanes;
                self.commit_root();
            }
            RootExitStatus::Suspended => self.handle_suspended(lanes),
            RootExitStatus::Errored(err) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                log_op_error!(op, err.clone(), duration_ms = duration_ms, lanes = lanes.bits());
                let mut error = ExError::from(err).with_lanes(lanes.bits());
                if let Some(attempt_id) = self.ctx.attempt_id() {
                    error = error.with_attempt_id(attempt_id.clone());
                }
                self.diagnostics.record(error);
                self.discard_lanes(lanes);
                return;
            }
        }
        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            lanes = lanes.bits(),
            exit_status = exit_status
        );
    }

    fn render_root(&mut self, lanes: Lanes, time_slice: bool) -> RootExitStatus {
        if !self.execution.is_empty() {
            return RootExitStatus::Errored(ReconcileError::ReentrantWork {
                op: "render_root".to_string(),
                active: format!("{:?}", self.execution),
            });
        }
        if self.ctx.wip_root.is_none() || self.ctx.render_lanes() != lanes || self.ctx.needs_fresh_stack {
            self.prepare_fresh_stack(lanes);
        }

        self.execution |= ExecutionContext::RENDER;
        let outcome = if time_slice {
            self.work_loop_concurrent()
        } else {
            self.work_loop_sync()
        };
        self.execution.remove(ExecutionContext::RENDER);

        match outcome {
            Ok(()) if self.ctx.wip.is_some() => RootExitStatus::Incomplete,
            Ok(()) => RootExitStatus::Completed,
            Err(RenderInterrupt::Suspended) if self.ctx.is_suspended() => RootExitStatus::Suspended,
            Err(RenderInterrupt::Suspended) => RootExitStatus::Errored(ReconcileError::MissingAwaitable),
            Err(RenderInterrupt::Failed(err)) => RootExitStatus::Errored(err),
        }
    }

    fn prepare_fresh_stack(&mut self, lanes: Lanes) {
        self.root.finished_work = None;
        self.root.finished_lanes = NO_LANES;
        let current = self.root.current;
        let wip_root = self.arena.create_work_in_progress(current, FiberProps::None);
        let attempt_id = self.ctx.prepare(wip_root, lanes);
        let reclaimed = self.arena.retain_reachable(&[current, wip_root]);
        for node in &reclaimed.orphaned_host_nodes {
            self.host.release_instance(*node);
        }
        tracing::debug!(
            attempt_id = %attempt_id,
            lanes = lanes.bits(),
            freed = reclaimed.fibers,
            released = reclaimed.orphaned_host_nodes.len(),
            "Prepared fresh stack"
        );
    }

    fn work_loop_sync(&mut self) -> std::result::Result<(), RenderInterrupt> {
        while let Some(unit) = self.ctx.wip {
            self.perform_unit_of_work(unit)?;
        }
        Ok(())
    }

    fn work_loop_concurrent(&mut self) -> std::result::Result<(), RenderInterrupt> {
        while let Some(unit) = self.ctx.wip {
            if self.scheduler.should_yield() {
                tracing::trace!(fiber = %unit, "Yielding");
                break;
            }
            self.perform_unit_of_work(unit)?;
        }
        Ok(())
    }

    fn perform_unit_of_work(&mut self, unit: FiberId) -> std::result::Result<(), RenderInterrupt> {
        let next = begin_work(&mut self.arena, &mut self.ctx, &mut self.diagnostics, unit)?;
        let fiber = &mut self.arena[unit];
        fiber.memoized_props = fiber.pending_props.clone();
        match next {
            Some(child) => self.ctx.wip = Some(child),
            None => self.complete_unit_of_work(unit),
        }
        Ok(())
    }

    fn complete_unit_of_work(&mut self, unit: FiberId) {
        let mut node = unit;
        loop {
            complete_work(&mut self.arena, &mut self.ctx, &mut self.host, node);
            if let Some(sibling) = self.arena[node].sibling {
                self.ctx.wip = Some(sibling);
                return;
            }
            match self.arena[node].return_ {
                Some(parent) if Some(node) != self.ctx.wip_root => node = parent,
                _ => {
                    self.ctx.wip = None;
                    return;
                }
            }
        }
    }

    fn handle_suspended(&mut self, lanes: Lanes) {
        let Some(wakeable) = self.ctx.take_suspended() else {
            self.diagnostics.report("render_root", ReconcileError::MissingAwaitable);
            self.discard_lanes(lanes);
            return;
        };
        self.ctx.reset();
        self.root.suspended_lanes |= lanes;
        tracing::debug!(awaitable = wakeable.id(), lanes = lanes.bits(), "Render suspended");

        if self.root.ping_cache.insert((wakeable.id(), lanes.bits())) {
            let inbox = self.inbox.clone();
            wakeable.subscribe(Box::new(move || {
                inbox.borrow_mut().push(InboxEntry::Ping { lanes });
            }));
        }
    }

    /// Give up on `lanes` after a failed attempt. Their queued updates stay
    /// queued and are picked up by the next render that includes the lane.
    fn discard_lanes(&mut self, lanes: Lanes) {
        self.root.pending_lanes = self.root.pending_lanes.remove_lanes(lanes);
        self.root.suspended_lanes = self.root.suspended_lanes.remove_lanes(lanes);
        self.root.finished_work = None;
        self.ctx.reset();
        tracing::debug!(lanes = lanes.bits(), "Render attempt discarded");
    }

    // ----- commit -----

    fn commit_root(&mut self) {
        let op = "commit_root";
        if !self.execution.is_empty() {
            self.report_reentrant(op);
            return;
        }
        let Some(finished) = self.root.finished_work.take() else {
            self.diagnostics.report(op, ReconcileError::MissingFinishedWork);
            return;
        };
        let lanes = std::mem::replace(&mut self.root.finished_lanes, NO_LANES);
        if lanes.is_empty() {
            self.diagnostics.report(op, ReconcileError::EmptyFinishedLanes);
        }

        log_op_start!(op, lanes = lanes.bits());
        let start = Instant::now();
        let mut report = CommitReport::new(lanes.bits());
        report.host_nodes_created = self.ctx.host_nodes_created;
        self.ctx.reset();

        self.root.mark_finished(lanes);
        if let Some(handle) = self.root.callback_handle.take() {
            self.scheduler.cancel_callback(handle);
        }
        self.root.callback_priority = NO_LANES;

        let flags = self.arena[finished].flags | self.arena[finished].subtree_flags;
        if flags.intersects(Flags::PASSIVE_MASK) {
            if self.root.passive_callback.is_none() {
                let handle = self
                    .scheduler
                    .schedule_callback(PriorityLevel::Normal, TaskKind::FlushPassiveEffects);
                self.root.passive_callback = Some(handle);
            }
            report.passive_effects_scheduled = true;
        }

        self.execution |= ExecutionContext::COMMIT;
        if flags.intersects(Flags::COMMIT_MASK) {
            MutationPass::new(
                &mut self.arena,
                &mut self.host,
                &mut self.diagnostics,
                &mut self.root.pending_passive,
                &mut report,
            )
            .commit_mutation_effects(finished);
        }
        self.root.current = finished;
        self.execution.remove(ExecutionContext::COMMIT);

        // Deleted subtrees were already removed from the host by the mutation pass.
        let freed = self.arena.retain_reachable(&[finished]).fibers;
        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            lanes = lanes.bits(),
            commit_id = %report.commit_id,
            placements = report.placements,
            moves = report.moves,
            deletions = report.deletions,
            updates = report.updates,
            freed = freed
        );
        self.commit_log.push(report);
        self.ensure_root_is_scheduled();
    }

    fn report_reentrant(&mut self, op: &str) {
        self.diagnostics.report(
            op,
            ReconcileError::ReentrantWork {
                op: op.to_string(),
                active: format!("{:?}", self.execution),
            },
        );
    }
}
