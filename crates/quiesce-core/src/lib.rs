//! quiesce-core: convergence waits and dependency-ordered cleanup for
//! eventually-consistent remote control planes.
//!
//! # Main Entry Points
//!
//! - [`wait`] - Poll a remote object until it reaches a target status
//! - [`retry`] - Re-invoke a fallible call while its errors are transient
//! - [`classify`] - Sort collaborator errors into retryable, not found and fatal
//! - [`sweep`] - Register sweepers and delete their objects in dependency order
//! - [`config`] - Configuration management

pub mod classify;
pub mod config;
pub mod errors;
pub mod logging;
pub mod retry;
pub mod sweep;
pub mod wait;

// Re-export commonly used types at crate root for convenience
pub use classify::{Classifier, ErrorClass, RemoteFault};
pub use config::QuiesceConfig;
pub use errors::{BoxError, ErrorKind, QuiesceError};
pub use retry::{RetryPolicy, retry_when};
pub use sweep::{
    ExecutionPlan, RunOptions, SweepError, SweepReport, SweepTask, SweeperRegistry,
};
pub use wait::{PollOutcome, WaitError, WaitSpec};

// Re-export handler modules as the primary API
pub use sweep::handler as sweep_ops;
pub use wait::handler as wait_ops;

// Re-export logging initialization
pub use logging::init_logging;
