//! Diagnostics channel
//!
//! Failures that never reach the caller as an `Err` (discarded render
//! attempts, unsupported descriptions, broken invariants) are recorded here
//! and logged. In production mode invariant violations are logged at debug
//! level only and not retained.

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::DiagnosticsMode;
use crate::errors::{ExError, ExErrorKind, ReconcileError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(skip)]
    pub kind: ExErrorKind,
    pub code: &'static str,
    pub op: Option<String>,
    pub fiber: Option<String>,
    pub lanes: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(error: &ExError) -> Self {
        Self {
            kind: error.kind(),
            code: error.code(),
            op: error.op().map(str::to_string),
            fiber: error.fiber().map(str::to_string),
            lanes: error.lanes(),
            message: error.message().to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Diagnostics {
    mode: DiagnosticsMode,
    capacity: usize,
    entries: VecDeque<Diagnostic>,
}

impl Diagnostics {
    pub fn new(mode: DiagnosticsMode, capacity: usize) -> Self {
        Self {
            mode,
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn mode(&self) -> DiagnosticsMode {
        self.mode
    }

    /// Record an error raised by `op`
    pub fn report(&mut self, op: &str, error: ReconcileError) {
        let ex: ExError = error.into();
        self.record(ex.with_op(op));
    }

    /// Record an already classified error
    pub fn record(&mut self, error: ExError) {
        let invariant = error.kind().is_invariant();
        if invariant && self.mode == DiagnosticsMode::Production {
            tracing::debug!(
                err_code = error.code(),
                op = error.op().unwrap_or_default(),
                "Invariant violation ignored: {}",
                error
            );
            return;
        }

        if invariant {
            tracing::error!(
                err_code = error.code(),
                op = error.op().unwrap_or_default(),
                "Invariant violation: {}",
                error
            );
        } else {
            tracing::warn!(
                err_code = error.code(),
                op = error.op().unwrap_or_default(),
                "{}",
                error
            );
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Diagnostic::from_error(&error));
    }

    pub fn entries(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.entries.iter().any(|entry| entry.code == code)
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_records_code_and_op() {
        let mut diagnostics = Diagnostics::new(DiagnosticsMode::Development, 8);
        diagnostics.report("commit_root", ReconcileError::EmptyFinishedLanes);

        let entry = diagnostics.entries().next().unwrap();
        assert_eq!(entry.code, "ERR_EMPTY_FINISHED_LANES");
        assert_eq!(entry.op.as_deref(), Some("commit_root"));
        assert!(diagnostics.has_code("ERR_EMPTY_FINISHED_LANES"));
    }

    #[test]
    fn test_production_drops_invariants_only() {
        let mut diagnostics = Diagnostics::new(DiagnosticsMode::Production, 8);
        diagnostics.report("commit_root", ReconcileError::MissingFinishedWork);
        assert!(diagnostics.is_empty());

        diagnostics.report(
            "begin_work",
            ReconcileError::component_failed("Counter", "boom"),
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut diagnostics = Diagnostics::new(DiagnosticsMode::Development, 2);
        diagnostics.report("a", ReconcileError::MissingAwaitable);
        diagnostics.report("b", ReconcileError::EmptyFinishedLanes);
        diagnostics.report("c", ReconcileError::MissingFinishedWork);

        let ops: Vec<_> = diagnostics.take().into_iter().filter_map(|d| d.op).collect();
        assert_eq!(ops, vec!["b".to_string(), "c".to_string()]);
        assert!(diagnostics.is_empty());
    }
}
