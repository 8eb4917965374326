//! Synchronous callback queue
//!
//! Sync-lane work is not handed to the task scheduler. It is queued here and
//! flushed once per surrounding synchronous context (the host's microtask),
//! so several sync updates in a row coalesce into a single render.

use std::collections::VecDeque;

/// Work that must run before control returns to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCallback {
    PerformSyncWorkOnRoot,
}

#[derive(Debug, Default)]
pub struct SyncCallbackQueue {
    callbacks: VecDeque<SyncCallback>,
    is_flushing: bool,
    microtask_pending: bool,
}

impl SyncCallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, callback: SyncCallback) {
        self.callbacks.push_back(callback);
    }

    /// Mark that a flush has been requested from the host.
    ///
    /// Returns `true` the first time in a window, meaning the caller should
    /// ask the host for a microtask; later calls return `false` until the
    /// queue is flushed.
    pub fn request_microtask(&mut self) -> bool {
        if self.microtask_pending {
            return false;
        }
        self.microtask_pending = true;
        true
    }

    /// Enter a flush. Returns `false` if a flush is already running.
    pub fn begin_flush(&mut self) -> bool {
        if self.is_flushing {
            return false;
        }
        self.is_flushing = true;
        self.microtask_pending = false;
        true
    }

    pub fn end_flush(&mut self) {
        self.is_flushing = false;
    }

    pub fn pop(&mut self) -> Option<SyncCallback> {
        self.callbacks.pop_front()
    }

    pub fn is_flushing(&self) -> bool {
        self.is_flushing
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}
