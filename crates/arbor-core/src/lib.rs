//! Arbor Core - incremental tree reconciliation engine
//!
//! This crate turns successive tree descriptions into the minimal set of
//! host mutations, including:
//! - A double-buffered fiber tree with generational handles
//! - Priority lanes and a cooperative, yielding task scheduler
//! - Keyed child reconciliation with move detection
//! - Function components with state, effect, context and awaitable hooks
//! - Root-level suspension and retry when an awaitable settles
//! - A host abstraction plus an in-memory host for tests and tooling
//!
//! Drive a [`Reconciler`] by rendering into it and then flushing:
//!
//! ```
//! use arbor_core::{Element, MemoryHost, Reconciler, ReconcilerConfig};
//!
//! let mut reconciler = Reconciler::new(MemoryHost::new(), ReconcilerConfig::default())?;
//! reconciler.render(Element::host("p").child("hello"));
//! reconciler.flush_sync_work();
//! assert_eq!(reconciler.host().to_markup(), "<p>hello</p>");
//! # Ok::<(), arbor_core::ReconcileError>(())
//! ```

pub mod awaitable;
mod begin_work;
pub mod child_reconciler;
pub mod commit;
mod complete_work;
pub mod config;
pub mod diagnostics;
pub mod element;
pub mod errors;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod lane;
pub mod logging_facility;
pub mod memory_host;
pub mod render_context;
pub mod scheduler;
pub mod sync_queue;
pub mod update_queue;
pub mod work_loop;

// Re-export commonly used types
pub use awaitable::{AwaitState, Awaitable, Resolver};
pub use commit::CommitReport;
pub use config::{DiagnosticsMode, ReconcilerConfig, YieldPolicy};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use element::{Child, Component, Context, Element, ElementType};
pub use errors::{ExError, ExErrorKind, ReconcileError, Result};
pub use fiber::FiberId;
pub use hooks::{Destroy, Hooks, RenderInterrupt, StateSetter};
pub use host::{HostConfig, HostNodeId, HostParent, UpdatePayload};
pub use lane::{Lane, Lanes, NO_LANES};
pub use memory_host::{HostOp, MemoryHost};
pub use scheduler::{CooperativeScheduler, PriorityLevel, TaskScheduler};
pub use work_loop::Reconciler;
