//! Dependency-ordered cleanup of leftover remote objects.
//!
//! Each resource type registers a sweeper in a [`SweeperRegistry`]: a listing
//! function that yields one [`SweepTask`] per live object, plus the names of
//! sweepers that must finish first. [`run`] plans the registry into waves and
//! deletes everything it can, collecting failures instead of stopping at the
//! first one.

pub mod errors;
pub mod handler;
pub mod plan;
pub mod registry;
pub mod task;
pub mod types;

pub use errors::SweepError;
pub use handler::run;
pub use plan::{DependencyGraph, ExecutionPlan};
pub use registry::{SweeperNode, SweeperRegistry};
pub use task::SweepTask;
pub use types::{FailureStage, RunOptions, SweepFailure, SweepReport, SweeperSummary};
