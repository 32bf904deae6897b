use crate::errors::{ErrorKind, QuiesceError};
use crate::sweep::types::SweepReport;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Sweeper '{name}' is already registered")]
    DuplicateSweeper { name: String },

    #[error("Sweeper '{sweeper}' depends on unknown sweeper '{dependency}'")]
    UnknownDependency { sweeper: String, dependency: String },

    #[error("No sweeper named '{name}'")]
    UnknownSweeper { name: String },

    #[error("Dependency cycle among sweepers: {}", .sweepers.join(", "))]
    DependencyCycle { sweepers: Vec<String> },

    #[error(
        "Sweep finished with {} failure(s); first: {}",
        .report.failures.len(),
        .report.failures.first().map(ToString::to_string).unwrap_or_default()
    )]
    TasksFailed { report: SweepReport },

    #[error("Sweep cancelled after deleting {} object(s)", .report.deleted())]
    Cancelled { report: SweepReport },
}

impl SweepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SweepError::DependencyCycle { .. } => ErrorKind::DependencyCycle,
            SweepError::TasksFailed { .. } => ErrorKind::TaskFailure,
            SweepError::Cancelled { .. } => ErrorKind::Cancelled,
            SweepError::DuplicateSweeper { .. }
            | SweepError::UnknownDependency { .. }
            | SweepError::UnknownSweeper { .. } => ErrorKind::Fatal,
        }
    }

    /// Partial report for runs that started executing.
    pub fn report(&self) -> Option<&SweepReport> {
        match self {
            SweepError::TasksFailed { report } | SweepError::Cancelled { report } => Some(report),
            _ => None,
        }
    }
}

impl QuiesceError for SweepError {
    fn error_code(&self) -> &'static str {
        match self {
            SweepError::DuplicateSweeper { .. } => "SWEEP_DUPLICATE_SWEEPER",
            SweepError::UnknownDependency { .. } => "SWEEP_UNKNOWN_DEPENDENCY",
            SweepError::UnknownSweeper { .. } => "SWEEP_UNKNOWN_SWEEPER",
            SweepError::DependencyCycle { .. } => "SWEEP_DEPENDENCY_CYCLE",
            SweepError::TasksFailed { .. } => "SWEEP_TASKS_FAILED",
            SweepError::Cancelled { .. } => "SWEEP_CANCELLED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            SweepError::UnknownDependency { .. }
                | SweepError::UnknownSweeper { .. }
                | SweepError::DependencyCycle { .. }
        )
    }
}
