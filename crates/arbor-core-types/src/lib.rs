//! Core types shared across Arbor facilities
//!
//! This crate provides foundational types used by both error handling
//! and logging facilities:
//!
//! - **Correlation types**: AttemptId, CommitId for tying render and commit logs together
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{AttemptId, CommitId};
