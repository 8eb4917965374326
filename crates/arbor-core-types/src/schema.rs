//! Canonical schema constants for structured logging and diagnostics
//!
//! The logging macros and the test-capture layer read field names from here;
//! tracing field identifiers in the macros must spell the same names.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_COMMIT_ID: &str = "commit_id";
pub const FIELD_LANES: &str = "lanes";
pub const FIELD_PLACEMENTS: &str = "placements";

// Error fields, as emitted by `log_op_error!`
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
