//! Execution lifecycle tracking.
//!
//! # Overview
//!
//! - **ExecutionId**: Unique identifier (UUID v4) minted once per unit of work
//! - **ExecutionRegistry**: Thread-safe map from id to `ExecutionResources`
//! - **ExecutionResources**: Registered temporaries, completion time, output lock
//! - **context**: Per-thread / per-task "current execution" binding

pub mod context;
mod id;
mod registry;
mod state;

pub use context::ExecutionGuard;
pub use id::ExecutionId;
pub use registry::ExecutionRegistry;
pub use state::{ExecutionInfo, ExecutionResources, ExecutionState, OutputLock};
