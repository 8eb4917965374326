//! Host task scheduling
//!
//! The reconciler never blocks and never spawns threads. Concurrent renders and
//! passive effect flushes are handed to a [`TaskScheduler`] as prioritized
//! tasks; the host drains that queue and tells the reconciler which task to
//! run next. [`CooperativeScheduler`] is the in-process implementation used by
//! default: tasks are ordered by expiration time (start time plus the
//! starvation timeout of their priority), and a slice yields according to the
//! configured [`YieldPolicy`].

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::config::YieldPolicy;

/// Host task priority, derived from the lane being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityLevel {
    Immediate,
    UserBlocking,
    Normal,
    Low,
    Idle,
}

impl PriorityLevel {
    /// Starvation timeout in scheduler clock units. `None` never expires.
    pub fn timeout(self) -> Option<u64> {
        match self {
            PriorityLevel::Immediate => Some(0),
            PriorityLevel::UserBlocking => Some(250),
            PriorityLevel::Normal => Some(5_000),
            PriorityLevel::Low => Some(10_000),
            PriorityLevel::Idle => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityLevel::Immediate => "immediate",
            PriorityLevel::UserBlocking => "user_blocking",
            PriorityLevel::Normal => "normal",
            PriorityLevel::Low => "low",
            PriorityLevel::Idle => "idle",
        }
    }
}

/// Opaque handle to a scheduled task; used for cancellation and for checking
/// whether a continuation is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackHandle(u64);

impl CallbackHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// What a scheduled task asks the reconciler to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Render (and possibly commit) the root's next lanes, time-sliced
    PerformConcurrentWork,
    /// Run pending passive effect destroys and creates
    FlushPassiveEffects,
}

/// A task popped from the scheduler, ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub handle: CallbackHandle,
    pub priority: PriorityLevel,
    pub kind: TaskKind,
    /// Clock value at which this task starves; `u64::MAX` never expires
    pub expiration: u64,
    /// Set when the task was popped at or past its expiration
    pub did_timeout: bool,
}

/// Host task-scheduling collaborator
pub trait TaskScheduler {
    /// Queue a task and return a handle that can cancel it
    fn schedule_callback(&mut self, priority: PriorityLevel, kind: TaskKind) -> CallbackHandle;

    /// Drop a queued task. Unknown or already-run handles are ignored.
    fn cancel_callback(&mut self, handle: CallbackHandle);

    /// Whether the running slice should hand control back to the host.
    /// Checked between units of work, never within one.
    fn should_yield(&mut self) -> bool;

    /// Start a new time slice
    fn begin_slice(&mut self);

    /// Remove and return the most urgent task
    fn pop_task(&mut self) -> Option<ScheduledTask>;

    /// Put a yielded task back under its original handle and expiration
    fn requeue(&mut self, task: ScheduledTask);

    /// Current clock value
    fn now(&self) -> u64;

    fn is_empty(&self) -> bool;
}

/// Default in-process [`TaskScheduler`]
///
/// With a budget policy the clock is logical: it advances one tick per unit of
/// work checked through [`TaskScheduler::should_yield`], which makes yields and
/// starvation deterministic. With a deadline policy the clock is wall-clock
/// milliseconds since construction.
#[derive(Debug)]
pub struct CooperativeScheduler {
    policy: YieldPolicy,
    queue: BTreeMap<(u64, u64), ScheduledTask>,
    index: HashMap<CallbackHandle, (u64, u64)>,
    next_id: u64,
    next_seq: u64,
    ticks: u64,
    offset_ms: u64,
    origin: Instant,
    slice_units: u32,
    slice_start: u64,
}

impl CooperativeScheduler {
    pub fn new(policy: YieldPolicy) -> Self {
        Self {
            policy,
            queue: BTreeMap::new(),
            index: HashMap::new(),
            next_id: 1,
            next_seq: 0,
            ticks: 0,
            offset_ms: 0,
            origin: Instant::now(),
            slice_units: 0,
            slice_start: 0,
        }
    }

    pub fn policy(&self) -> YieldPolicy {
        self.policy
    }

    /// Move the clock forward without doing work
    pub fn advance(&mut self, ticks: u64) {
        match self.policy {
            YieldPolicy::Budget { .. } => self.ticks = self.ticks.saturating_add(ticks),
            YieldPolicy::Deadline { .. } => self.offset_ms = self.offset_ms.saturating_add(ticks),
        }
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Priorities of the queued tasks, most urgent first
    pub fn pending_priorities(&self) -> Vec<PriorityLevel> {
        self.queue.values().map(|task| task.priority).collect()
    }

    fn insert(&mut self, task: ScheduledTask) {
        let key = (task.expiration, self.next_seq);
        self.next_seq += 1;
        self.index.insert(task.handle, key);
        self.queue.insert(key, task);
    }
}

impl Default for CooperativeScheduler {
    fn default() -> Self {
        Self::new(YieldPolicy::default())
    }
}

impl TaskScheduler for CooperativeScheduler {
    fn schedule_callback(&mut self, priority: PriorityLevel, kind: TaskKind) -> CallbackHandle {
        let handle = CallbackHandle(self.next_id);
        self.next_id += 1;

        let expiration = match priority.timeout() {
            Some(timeout) => self.now().saturating_add(timeout),
            None => u64::MAX,
        };
        tracing::trace!(
            handle = handle.id(),
            priority = priority.as_str(),
            expiration,
            "Task scheduled"
        );
        self.insert(ScheduledTask {
            handle,
            priority,
            kind,
            expiration,
            did_timeout: false,
        });
        handle
    }

    fn cancel_callback(&mut self, handle: CallbackHandle) {
        if let Some(key) = self.index.remove(&handle) {
            self.queue.remove(&key);
            tracing::trace!(handle = handle.id(), "Task cancelled");
        }
    }

    fn should_yield(&mut self) -> bool {
        match self.policy {
            YieldPolicy::Budget { units } => {
                if self.slice_units >= units {
                    return true;
                }
                self.slice_units += 1;
                self.ticks += 1;
                false
            }
            YieldPolicy::Deadline { slice_ms } => {
                self.now().saturating_sub(self.slice_start) >= slice_ms
            }
        }
    }

    fn begin_slice(&mut self) {
        self.slice_units = 0;
        self.slice_start = self.now();
    }

    fn pop_task(&mut self) -> Option<ScheduledTask> {
        let now = self.now();
        let key = *self.queue.keys().next()?;
        let mut task = self.queue.remove(&key)?;
        self.index.remove(&task.handle);
        task.did_timeout = now >= task.expiration;
        Some(task)
    }

    fn requeue(&mut self, mut task: ScheduledTask) {
        task.did_timeout = false;
        self.insert(task);
    }

    fn now(&self) -> u64 {
        match self.policy {
            YieldPolicy::Budget { .. } => self.ticks,
            YieldPolicy::Deadline { .. } => {
                let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
                elapsed.saturating_add(self.offset_ms)
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(units: u32) -> CooperativeScheduler {
        CooperativeScheduler::new(YieldPolicy::Budget { units })
    }

    #[test]
    fn test_tasks_pop_in_expiration_order() {
        let mut scheduler = budget(4);
        scheduler.schedule_callback(PriorityLevel::Idle, TaskKind::PerformConcurrentWork);
        scheduler.schedule_callback(PriorityLevel::Normal, TaskKind::FlushPassiveEffects);
        scheduler.schedule_callback(PriorityLevel::UserBlocking, TaskKind::PerformConcurrentWork);

        let order: Vec<PriorityLevel> = std::iter::from_fn(|| scheduler.pop_task())
            .map(|task| task.priority)
            .collect();
        assert_eq!(
            order,
            vec![
                PriorityLevel::UserBlocking,
                PriorityLevel::Normal,
                PriorityLevel::Idle
            ]
        );
    }

    #[test]
    fn test_equal_priority_is_fifo() {
        let mut scheduler = budget(4);
        let first = scheduler.schedule_callback(PriorityLevel::Normal, TaskKind::FlushPassiveEffects);
        let second =
            scheduler.schedule_callback(PriorityLevel::Normal, TaskKind::PerformConcurrentWork);

        assert_eq!(scheduler.pop_task().map(|t| t.handle), Some(first));
        assert_eq!(scheduler.pop_task().map(|t| t.handle), Some(second));
    }

    #[test]
    fn test_cancel_removes_task() {
        let mut scheduler = budget(4);
        let handle = scheduler.schedule_callback(PriorityLevel::Normal, TaskKind::PerformConcurrentWork);
        scheduler.cancel_callback(handle);
        scheduler.cancel_callback(handle);

        assert!(scheduler.is_empty());
        assert!(scheduler.pop_task().is_none());
    }

    #[test]
    fn test_budget_yields_after_units() {
        let mut scheduler = budget(3);
        scheduler.begin_slice();

        let checks: Vec<bool> = (0..5).map(|_| scheduler.should_yield()).collect();
        assert_eq!(checks, vec![false, false, false, true, true]);
        assert_eq!(scheduler.now(), 3);

        scheduler.begin_slice();
        assert!(!scheduler.should_yield());
    }

    #[test]
    fn test_starved_task_reports_timeout() {
        let mut scheduler = budget(1);
        scheduler.schedule_callback(PriorityLevel::UserBlocking, TaskKind::PerformConcurrentWork);
        scheduler.advance(250);

        let task = scheduler.pop_task().unwrap();
        assert!(task.did_timeout);
    }

    #[test]
    fn test_requeue_keeps_handle_and_expiration() {
        let mut scheduler = budget(1);
        let handle = scheduler.schedule_callback(PriorityLevel::Normal, TaskKind::PerformConcurrentWork);

        let task = scheduler.pop_task().unwrap();
        assert!(!task.did_timeout);
        let expiration = task.expiration;
        scheduler.requeue(task);

        let again = scheduler.pop_task().unwrap();
        assert_eq!(again.handle, handle);
        assert_eq!(again.expiration, expiration);
    }

    #[test]
    fn test_idle_never_expires() {
        let mut scheduler = budget(1);
        scheduler.schedule_callback(PriorityLevel::Idle, TaskKind::PerformConcurrentWork);
        scheduler.advance(1_000_000);
        assert!(!scheduler.pop_task().unwrap().did_timeout);
    }
}
