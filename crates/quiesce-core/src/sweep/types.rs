use std::fmt;

use crate::config::types::SweepConfig;
use crate::config::defaults::{DEFAULT_MAX_PARALLEL_DELETIONS, DEFAULT_MAX_PARALLEL_SWEEPERS};
use crate::errors::BoxError;

/// Where in a sweeper's lifecycle a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The listing function failed; no tasks were produced.
    List,
    /// A single task's deletion failed.
    Delete,
}

/// One failed unit of sweep work.
#[derive(Debug)]
pub struct SweepFailure {
    pub resource_type: String,
    /// The object's identity; `None` when listing failed.
    pub identity: Option<String>,
    pub stage: FailureStage,
    pub error: BoxError,
}

impl fmt::Display for SweepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.stage, &self.identity) {
            (FailureStage::List, _) => {
                write!(f, "failed to list {}: {}", self.resource_type, self.error)
            }
            (FailureStage::Delete, Some(identity)) => write!(
                f,
                "failed to delete {} '{}': {}",
                self.resource_type, identity, self.error
            ),
            (FailureStage::Delete, None) => {
                write!(f, "failed to delete {}: {}", self.resource_type, self.error)
            }
        }
    }
}

/// What happened to one sweeper during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweeperSummary {
    pub name: String,
    pub wave: usize,
    pub listed: usize,
    pub deleted: usize,
    /// Deletions that reported "not found": someone else got there first.
    pub already_gone: usize,
    pub failed: usize,
    /// Listed tasks never attempted because the run was cancelled.
    pub abandoned: usize,
    /// Listing failed with an error the registry's skip predicate matched.
    pub skipped: bool,
}

/// Aggregate result of a sweep run.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub sweepers: Vec<SweeperSummary>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn deleted(&self) -> usize {
        self.sweepers.iter().map(|s| s.deleted + s.already_gone).sum()
    }

    pub fn task_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.stage == FailureStage::Delete)
            .count()
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.sweepers
            .iter()
            .filter(|s| s.skipped)
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn summary(&self, name: &str) -> Option<&SweeperSummary> {
        self.sweepers.iter().find(|s| s.name == name)
    }
}

/// Options for one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Restrict the run to these sweepers and everything they depend on.
    pub only: Option<Vec<String>>,
    pub max_parallel_sweepers: usize,
    pub max_parallel_deletions: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            only: None,
            max_parallel_sweepers: DEFAULT_MAX_PARALLEL_SWEEPERS,
            max_parallel_deletions: DEFAULT_MAX_PARALLEL_DELETIONS,
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            only: config.run.clone(),
            max_parallel_sweepers: config.max_parallel_sweepers(),
            max_parallel_deletions: config.max_parallel_deletions(),
        }
    }

    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(names.into_iter().map(Into::into).collect());
        self
    }
}
