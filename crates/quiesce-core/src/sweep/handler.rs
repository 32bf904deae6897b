use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::{FutureExt, StreamExt, stream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classify::ErrorClass;
use crate::errors::BoxError;
use crate::sweep::errors::SweepError;
use crate::sweep::plan::ExecutionPlan;
use crate::sweep::registry::{SweeperNode, SweeperRegistry};
use crate::sweep::types::{FailureStage, RunOptions, SweepFailure, SweepReport, SweeperSummary};

/// Failures shared by every sweeper of a run.
#[derive(Default)]
struct FailureLog(Mutex<Vec<SweepFailure>>);

impl FailureLog {
    fn record(&self, failure: SweepFailure) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    fn into_inner(self) -> Vec<SweepFailure> {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run every sweeper in `registry` (or the subset selected by
/// `options.only`) in dependency order.
///
/// Waves run one after another; sweepers within a wave run concurrently, as
/// do the deletions of one sweeper. A failed listing or deletion is recorded
/// and the run carries on, including with sweepers that depend on the
/// failed one.
///
/// # Errors
///
/// - Planning errors ([`SweepError::UnknownDependency`],
///   [`SweepError::UnknownSweeper`], [`SweepError::DependencyCycle`]) are
///   returned before anything is listed or deleted.
/// - [`SweepError::Cancelled`] if `cancel` fired; no new work is dispatched
///   after that point.
/// - [`SweepError::TasksFailed`] if any listing or deletion failed.
///
/// Both of the latter carry the full [`SweepReport`].
pub async fn run(
    cancel: &CancellationToken,
    registry: &SweeperRegistry,
    options: &RunOptions,
) -> Result<SweepReport, SweepError> {
    let plan = ExecutionPlan::build_filtered(&registry.dependency_graph(), options.only.as_deref())?;

    info!(
        event = "core.sweep.run_started",
        sweepers = plan.sweepers().count(),
        waves = plan.len(),
        max_parallel_sweepers = options.max_parallel_sweepers,
        max_parallel_deletions = options.max_parallel_deletions
    );

    let failures = FailureLog::default();
    let mut sweepers: Vec<SweeperSummary> = Vec::new();

    for (index, wave) in plan.waves().iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        info!(event = "core.sweep.wave_started", wave = index, sweepers = ?wave);

        let mut done: Vec<SweeperSummary> = stream::iter(wave.iter().filter_map(|name| registry.get(name)))
            .map(|node| run_sweeper(cancel, registry, node, index, options.max_parallel_deletions, &failures))
            .buffer_unordered(options.max_parallel_sweepers.max(1))
            .collect()
            .await;
        done.sort_by(|a, b| a.name.cmp(&b.name));

        info!(
            event = "core.sweep.wave_completed",
            wave = index,
            deleted = done.iter().map(|s| s.deleted + s.already_gone).sum::<usize>(),
            failed = done.iter().map(|s| s.failed).sum::<usize>()
        );
        sweepers.extend(done);
    }

    let report = SweepReport {
        sweepers,
        failures: failures.into_inner(),
    };

    if cancel.is_cancelled() {
        warn!(
            event = "core.sweep.run_cancelled",
            deleted = report.deleted(),
            failures = report.failures.len()
        );
        return Err(SweepError::Cancelled { report });
    }

    if !report.is_success() {
        error!(
            event = "core.sweep.run_failed",
            deleted = report.deleted(),
            failures = report.failures.len(),
            task_failures = report.task_failures()
        );
        return Err(SweepError::TasksFailed { report });
    }

    info!(
        event = "core.sweep.run_completed",
        sweepers = report.sweepers.len(),
        deleted = report.deleted()
    );
    Ok(report)
}

async fn run_sweeper(
    cancel: &CancellationToken,
    registry: &SweeperRegistry,
    node: &SweeperNode,
    wave: usize,
    max_parallel_deletions: usize,
    failures: &FailureLog,
) -> SweeperSummary {
    let mut summary = SweeperSummary {
        name: node.name().to_string(),
        wave,
        ..Default::default()
    };

    if cancel.is_cancelled() {
        return summary;
    }

    let tasks = match node.list(cancel.clone()).await {
        Ok(tasks) => tasks,
        Err(e) if registry.should_skip(e.as_ref()) => {
            warn!(
                event = "core.sweep.sweeper_skipped",
                sweeper = node.name(),
                error = %e
            );
            summary.skipped = true;
            return summary;
        }
        Err(e) => {
            error!(
                event = "core.sweep.list_failed",
                sweeper = node.name(),
                error = %e
            );
            failures.record(SweepFailure {
                resource_type: node.name().to_string(),
                identity: None,
                stage: FailureStage::List,
                error: e,
            });
            return summary;
        }
    };

    summary.listed = tasks.len();
    debug!(
        event = "core.sweep.sweeper_listed",
        sweeper = node.name(),
        tasks = summary.listed
    );

    let semaphore = Arc::new(Semaphore::new(max_parallel_deletions.max(1)));
    let mut deletions = JoinSet::new();
    let mut pending = tasks.into_iter();

    while let Some(task) = pending.next() {
        // A permit is taken before spawning, so nothing new starts once cancelled.
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            summary.abandoned = 1 + pending.by_ref().count();
            warn!(
                event = "core.sweep.deletions_abandoned",
                sweeper = node.name(),
                abandoned = summary.abandoned
            );
            break;
        };

        let cancel = cancel.clone();
        deletions.spawn(async move {
            let _permit = permit;
            let resource_type = task.resource_type().to_string();
            let identity = task.identity().to_string();
            let result = AssertUnwindSafe(task.delete(cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(panic_error(panic)));
            (resource_type, Some(identity), result)
        });
    }

    while let Some(joined) = deletions.join_next().await {
        let (resource_type, identity, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => (node.name().to_string(), None, Err(BoxError::from(e))),
        };
        match result {
            Ok(()) => {
                summary.deleted += 1;
                debug!(
                    event = "core.sweep.task_deleted",
                    sweeper = node.name(),
                    identity = identity.as_deref().unwrap_or_default()
                );
            }
            Err(e) if registry.classifier().classify(e.as_ref()) == ErrorClass::NotFound => {
                summary.already_gone += 1;
                debug!(
                    event = "core.sweep.task_already_gone",
                    sweeper = node.name(),
                    identity = identity.as_deref().unwrap_or_default()
                );
            }
            Err(e) => {
                summary.failed += 1;
                warn!(
                    event = "core.sweep.delete_failed",
                    sweeper = node.name(),
                    identity = identity.as_deref().unwrap_or_default(),
                    error = %e
                );
                failures.record(SweepFailure {
                    resource_type,
                    identity,
                    stage: FailureStage::Delete,
                    error: e,
                });
            }
        }
    }

    info!(
        event = "core.sweep.sweeper_completed",
        sweeper = node.name(),
        listed = summary.listed,
        deleted = summary.deleted,
        already_gone = summary.already_gone,
        failed = summary.failed
    );
    summary
}

fn panic_error(panic: Box<dyn Any + Send>) -> BoxError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("delete panicked: {message}").into()
}
