use arbor_core_types::AttemptId;
use thiserror::Error;

/// Result type alias using ReconcileError
pub type Result<T> = std::result::Result<T, ReconcileError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Stable classification of every failure and diagnostic the reconciler can
/// produce. Each kind maps to a stable error code usable for programmatic
/// handling, tests, and log assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Description
    UnsupportedDescription,
    DuplicateKey,

    // Render attempt
    HookOrderMismatch,
    ComponentFailed,
    AwaitableRejected,

    // Structural invariants
    StaleHandle,
    MissingAwaitable,
    EmptyFinishedLanes,
    MissingFinishedWork,
    ReentrantWork,
    InvariantViolation,

    // Configuration/IO
    InvalidConfig,
    Serialization,
    Io,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::UnsupportedDescription => "ERR_UNSUPPORTED_DESCRIPTION",
            ExErrorKind::DuplicateKey => "ERR_DUPLICATE_KEY",
            ExErrorKind::HookOrderMismatch => "ERR_HOOK_ORDER_MISMATCH",
            ExErrorKind::ComponentFailed => "ERR_COMPONENT_FAILED",
            ExErrorKind::AwaitableRejected => "ERR_AWAITABLE_REJECTED",
            ExErrorKind::StaleHandle => "ERR_STALE_HANDLE",
            ExErrorKind::MissingAwaitable => "ERR_MISSING_AWAITABLE",
            ExErrorKind::EmptyFinishedLanes => "ERR_EMPTY_FINISHED_LANES",
            ExErrorKind::MissingFinishedWork => "ERR_MISSING_FINISHED_WORK",
            ExErrorKind::ReentrantWork => "ERR_REENTRANT_WORK",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
        }
    }

    /// Whether this kind reports a broken structural invariant (a programming bug)
    /// rather than a failure of user-supplied render logic.
    pub fn is_invariant(&self) -> bool {
        matches!(
            self,
            ExErrorKind::StaleHandle
                | ExErrorKind::MissingAwaitable
                | ExErrorKind::EmptyFinishedLanes
                | ExErrorKind::MissingFinishedWork
                | ExErrorKind::ReentrantWork
                | ExErrorKind::InvariantViolation
        )
    }
}

/// Canonical structured error type
///
/// Classification fields for programmatic handling plus rich context for
/// debugging. Diagnostics and error log lines are built from this type.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    fiber: Option<String>,
    lanes: Option<u32>,
    attempt_id: Option<AttemptId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            fiber: None,
            lanes: None,
            attempt_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add fiber context
    pub fn with_fiber(mut self, fiber: impl Into<String>) -> Self {
        self.fiber = Some(fiber.into());
        self
    }

    /// Add lane context (raw lane bits)
    pub fn with_lanes(mut self, lanes: u32) -> Self {
        self.lanes = Some(lanes);
        self
    }

    /// Add render attempt context
    pub fn with_attempt_id(mut self, attempt_id: AttemptId) -> Self {
        self.attempt_id = Some(attempt_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the fiber context, if any
    pub fn fiber(&self) -> Option<&str> {
        self.fiber.as_deref()
    }

    /// Get the lane context, if any
    pub fn lanes(&self) -> Option<u32> {
        self.lanes
    }

    /// Get the render attempt context, if any
    pub fn attempt_id(&self) -> Option<&AttemptId> {
        self.attempt_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(fiber) = &self.fiber {
            write!(f, " (fiber: {})", fiber)?;
        }
        if let Some(lanes) = self.lanes {
            write!(f, " (lanes: {:#b})", lanes)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for reconciliation and scheduling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    // ===== Render Errors =====
    /// A component called its hooks in a different order than on the previous render
    #[error("Hook order changed in {component}: slot {index} was {expected}, now {found}")]
    HookOrderMismatch {
        component: String,
        index: usize,
        expected: String,
        found: String,
    },

    /// A component's render logic reported a failure
    #[error("Component {component} failed to render: {message}")]
    ComponentFailed { component: String, message: String },

    /// A component read an awaitable that settled with a rejection
    #[error("Awaitable rejected: {reason}")]
    AwaitableRejected { reason: String },

    /// A description shape the child reconciler cannot diff
    #[error("Unsupported description: {shape}")]
    UnsupportedDescription { shape: String },

    /// Two siblings carried the same key; the later one is dropped
    #[error("Duplicate key {key:?} under {parent}")]
    DuplicateKey { key: String, parent: String },

    // ===== Structural Invariant Errors =====
    /// A fiber handle refers to a slot that was reclaimed
    #[error("Stale fiber handle: {fiber}")]
    StaleFiber { fiber: String },

    /// The render loop observed a suspension but no awaitable was recorded
    #[error("Suspended without a recorded awaitable")]
    MissingAwaitable,

    /// Commit was entered with no finished lanes
    #[error("Commit started with empty finished lanes")]
    EmptyFinishedLanes,

    /// Commit was entered with no finished work-in-progress tree
    #[error("Commit started without finished work")]
    MissingFinishedWork,

    /// Render or commit was entered while another phase was running
    #[error("Re-entrant {op} while {active} is in progress")]
    ReentrantWork { op: String, active: String },

    /// Any other broken structural invariant
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    // ===== Configuration Errors =====
    /// Configuration value rejected by validation
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Serialization error (JSON/TOML encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Filesystem error while loading inputs
    #[error("IO error: {message}")]
    Io { message: String },
}

impl ReconcileError {
    /// Convenience constructor for component-reported failures
    pub fn component_failed(component: impl Into<String>, message: impl Into<String>) -> Self {
        ReconcileError::ComponentFailed {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Conversion from ReconcileError to ExError
impl From<ReconcileError> for ExError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::HookOrderMismatch {
                component,
                index,
                expected,
                found,
            } => ExError::new(ExErrorKind::HookOrderMismatch)
                .with_op("render_with_hooks")
                .with_fiber(component)
                .with_message(format!(
                    "slot {} was {} on the previous render, now {}",
                    index, expected, found
                )),

            ReconcileError::ComponentFailed { component, message } => {
                ExError::new(ExErrorKind::ComponentFailed)
                    .with_op("begin_work")
                    .with_fiber(component)
                    .with_message(message)
            }

            ReconcileError::AwaitableRejected { reason } => {
                ExError::new(ExErrorKind::AwaitableRejected)
                    .with_op("use_awaitable")
                    .with_message(reason)
            }

            ReconcileError::UnsupportedDescription { shape } => {
                ExError::new(ExErrorKind::UnsupportedDescription)
                    .with_op("reconcile_child_fibers")
                    .with_message(format!("cannot reconcile {}", shape))
            }

            ReconcileError::DuplicateKey { key, parent } => {
                ExError::new(ExErrorKind::DuplicateKey)
                    .with_op("reconcile_children_array")
                    .with_fiber(parent)
                    .with_message(format!("key {:?} appears more than once", key))
            }

            ReconcileError::StaleFiber { fiber } => ExError::new(ExErrorKind::StaleHandle)
                .with_fiber(fiber)
                .with_message("Fiber handle refers to a reclaimed slot"),

            ReconcileError::MissingAwaitable => ExError::new(ExErrorKind::MissingAwaitable)
                .with_op("render_root")
                .with_message("Suspended unit of work left no awaitable in the slot"),

            ReconcileError::EmptyFinishedLanes => ExError::new(ExErrorKind::EmptyFinishedLanes)
                .with_op("commit_root")
                .with_message("Finished lanes must not be empty at commit"),

            ReconcileError::MissingFinishedWork => {
                ExError::new(ExErrorKind::MissingFinishedWork)
                    .with_op("commit_root")
                    .with_message("No finished work to commit")
            }

            ReconcileError::ReentrantWork { op, active } => {
                ExError::new(ExErrorKind::ReentrantWork)
                    .with_op(op)
                    .with_message(format!("{} is already in progress", active))
            }

            ReconcileError::InvariantViolation { message } => {
                ExError::new(ExErrorKind::InvariantViolation).with_message(message)
            }

            ReconcileError::InvalidConfig { reason } => ExError::new(ExErrorKind::InvalidConfig)
                .with_op("load_config")
                .with_message(reason),

            ReconcileError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            ReconcileError::Io { message } => ExError::new(ExErrorKind::Io).with_message(message),
        }
    }
}

/// Conversion from serde_json::Error to ReconcileError
impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from toml::de::Error to ReconcileError
impl From<toml::de::Error> for ReconcileError {
    fn from(err: toml::de::Error) -> Self {
        ReconcileError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ReconcileError {
    fn from(err: std::io::Error) -> Self {
        ReconcileError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::HookOrderMismatch, "ERR_HOOK_ORDER_MISMATCH"),
            (ExErrorKind::MissingAwaitable, "ERR_MISSING_AWAITABLE"),
            (ExErrorKind::EmptyFinishedLanes, "ERR_EMPTY_FINISHED_LANES"),
            (
                ExErrorKind::UnsupportedDescription,
                "ERR_UNSUPPORTED_DESCRIPTION",
            ),
            (ExErrorKind::StaleHandle, "ERR_STALE_HANDLE"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_invariant_classification() {
        assert!(ExErrorKind::MissingFinishedWork.is_invariant());
        assert!(ExErrorKind::ReentrantWork.is_invariant());
        assert!(!ExErrorKind::ComponentFailed.is_invariant());
        assert!(!ExErrorKind::UnsupportedDescription.is_invariant());
    }

    #[test]
    fn test_conversion_keeps_context() {
        let err: ExError = ReconcileError::component_failed("Profile", "boom").into();
        assert_eq!(err.kind(), ExErrorKind::ComponentFailed);
        assert_eq!(err.fiber(), Some("Profile"));
        assert_eq!(err.message(), "boom");
        assert!(err.to_string().starts_with("[ERR_COMPONENT_FAILED]"));
    }

    #[test]
    fn test_every_kind_has_a_producer() {
        let produced: std::collections::HashSet<ExErrorKind> = [
            ReconcileError::HookOrderMismatch {
                component: "C".to_string(),
                index: 0,
                expected: "state".to_string(),
                found: "effect".to_string(),
            },
            ReconcileError::component_failed("C", "boom"),
            ReconcileError::AwaitableRejected { reason: "r".to_string() },
            ReconcileError::UnsupportedDescription { shape: "s".to_string() },
            ReconcileError::DuplicateKey {
                key: "k".to_string(),
                parent: "ul".to_string(),
            },
            ReconcileError::StaleFiber { fiber: "fiber#0v1".to_string() },
            ReconcileError::MissingAwaitable,
            ReconcileError::EmptyFinishedLanes,
            ReconcileError::MissingFinishedWork,
            ReconcileError::ReentrantWork {
                op: "commit_root".to_string(),
                active: "RENDER".to_string(),
            },
            ReconcileError::InvariantViolation { message: "m".to_string() },
            ReconcileError::InvalidConfig { reason: "r".to_string() },
            ReconcileError::Serialization { message: "m".to_string() },
            ReconcileError::Io { message: "m".to_string() },
        ]
        .into_iter()
        .map(|err| ExError::from(err).kind())
        .collect();
        assert_eq!(produced.len(), 14);
    }

    #[test]
    fn test_display_includes_lanes() {
        let err = ExError::new(ExErrorKind::EmptyFinishedLanes)
            .with_op("commit_root")
            .with_lanes(0b100);
        let rendered = err.to_string();
        assert!(rendered.contains("commit_root"));
        assert!(rendered.contains("0b100"));
    }
}
