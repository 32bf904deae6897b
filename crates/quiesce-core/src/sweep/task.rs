use std::fmt;
use std::fmt::Debug;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::errors::BoxError;
use crate::wait::{PollOutcome, WaitSpec, wait};

type DeleteFn = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// One remote object to delete, produced by a sweeper's listing function.
///
/// The delete closure runs at most once; the orchestrator owns the task from
/// listing until the deletion attempt finishes.
pub struct SweepTask {
    resource_type: String,
    identity: String,
    delete: DeleteFn,
}

impl SweepTask {
    pub fn new<F, Fut, E>(resource_type: impl Into<String>, identity: impl Into<String>, delete: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Self {
            resource_type: resource_type.into(),
            identity: identity.into(),
            delete: Box::new(move |cancel| {
                let fut = delete(cancel);
                async move { fut.await.map_err(Into::<BoxError>::into) }.boxed()
            }),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Follow the delete call with a convergence wait, for remote APIs that
    /// accept the delete and finish it asynchronously.
    ///
    /// Use a `WaitSpec` with an empty target so a "not found" poll means gone.
    pub fn wait_until_gone<P, Fut, T, E>(self, spec: WaitSpec, poll: P) -> Self
    where
        P: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<PollOutcome<T>, E>> + Send + 'static,
        T: Debug + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let Self {
            resource_type,
            identity,
            delete,
        } = self;

        Self {
            resource_type,
            identity,
            delete: Box::new(move |cancel: CancellationToken| {
                async move {
                    delete(cancel.clone()).await?;
                    wait(&cancel, &spec, poll).await?;
                    Ok::<(), BoxError>(())
                }
                .boxed()
            }),
        }
    }

    /// Run the deletion. Consumes the task.
    pub async fn delete(self, cancel: CancellationToken) -> Result<(), BoxError> {
        (self.delete)(cancel).await
    }
}

impl fmt::Debug for SweepTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweepTask")
            .field("resource_type", &self.resource_type)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RemoteFault;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_delete_runs_closure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let task = SweepTask::new("iam_role", "role-a", move |_cancel| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), RemoteFault>(())
        });
        assert_eq!(task.resource_type(), "iam_role");
        assert_eq!(task.identity(), "role-a");
        assert!(format!("{:?}", task).contains("role-a"));

        task.delete(CancellationToken::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_error_is_boxed() {
        let task = SweepTask::new("vpc", "vpc-1", |_cancel| async {
            Err(RemoteFault::new("has dependencies").with_code("DependencyViolation"))
        });
        let err = task.delete(CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("DependencyViolation"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_gone_polls_after_delete() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();
        let spec = WaitSpec::builder()
            .pending(["DELETING"])
            .min_poll_interval(Duration::from_millis(100))
            .build()
            .unwrap();

        let task = SweepTask::new("db_cluster", "cluster-1", |_cancel| async {
            Ok::<(), RemoteFault>(())
        })
        .wait_until_gone(spec, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Ok(PollOutcome::new("DELETING", ()))
                } else {
                    Err(RemoteFault::new("gone").with_code("DBClusterNotFound"))
                }
            }
        });

        task.delete(CancellationToken::new()).await.unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }
}
