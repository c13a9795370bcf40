//! Execution-scoped resource lifecycle management.
//!
//! A [`ResourceManager`] mints execution ids, tracks the temporaries each
//! execution registers, stores its request, response and output artifacts,
//! and deletes what is left behind: immediately for synchronous executions,
//! on an explicit completion signal for asynchronous ones, and through a
//! store-wide sweep for anything orphaned by a crash.
//!
//! ```no_run
//! use jobscope::{ManagerOptions, ResourceManager};
//!
//! let manager = ResourceManager::new(ManagerOptions::with_home("/srv/jobscope"))?;
//!
//! let id = manager.begin_execution(true)?;
//! let scratch = manager.open_temporary_artifact("gml")?;
//! scratch.write(b"<gml:FeatureCollection/>")?;
//! let output = manager.open_output_artifact(Some(id), "result.tif")?;
//! output.write(b"...")?;
//!
//! // Deletes `scratch`, keeps `output`.
//! manager.unit_of_work_finished();
//! # Ok::<(), jobscope::JobscopeError>(())
//! ```

pub mod cleanup;
pub mod document;
pub mod execution;
pub mod metrics;
pub mod resource;
pub mod runtime;
pub mod status;
pub mod store;
mod util;

pub use cleanup::{CleanupReport, SweepReport, SweeperHandle};
pub use document::{Document, JsonDocument, RawDocument};
pub use execution::{ExecutionGuard, ExecutionId, ExecutionInfo, ExecutionState, OutputLock};
pub use jobscope_shared::errors::{JobscopeError, JobscopeResult};
pub use metrics::ManagerMetrics;
pub use resource::{FileResource, ResourceHandle};
pub use runtime::{ManagerOptions, ResourceManager};
pub use status::{NoTracker, RunState, RunningSet, StatusTracker};
pub use store::{ArtifactHandle, ArtifactKey, ArtifactKind, ArtifactStore, FilesystemStore};
pub use util::init_logging_for;
