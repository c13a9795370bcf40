//! Jobscope Shared - code shared between the manager and out-of-process tools
//!
//! This crate contains the error taxonomy and the on-disk store layout so that
//! the runtime, the CLI and external store implementations agree on both.

pub mod errors;
pub mod layout;

pub use errors::{JobscopeError, JobscopeResult};
pub use layout::{ExecutionLayout, StoreLayout};
