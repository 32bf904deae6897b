//! Retry a single fallible remote call until it stops failing transiently.
//!
//! This is the waiter applied to an operation rather than a status: each
//! attempt either succeeds ("done"), fails transiently ("retrying"), or fails
//! for good. Typical uses are a create call that races IAM propagation or a
//! read right after a create that is not visible yet.

use std::fmt::Debug;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::classify::{Classifier, ErrorClass};
use crate::errors::BoxError;
use crate::wait::{PollOutcome, WaitError, WaitSpec, wait};

const RETRYING: &str = "retrying";
const DONE: &str = "done";

/// Which error classes trigger another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Retry only errors classified as retryable.
    #[default]
    Retryable,
    /// Also retry "not found", for reads that follow a create.
    NotFoundToo,
}

impl RetryPolicy {
    fn retries(self, class: ErrorClass) -> bool {
        match (self, class) {
            (_, ErrorClass::Retryable) => true,
            (RetryPolicy::NotFoundToo, ErrorClass::NotFound) => true,
            _ => false,
        }
    }
}

/// Re-invoke `op` while its errors are retried by `policy`.
///
/// Timing (timeout, poll interval bounds, backoff) comes from `base`; its
/// classifier decides which errors are transient. Any other error is
/// returned immediately as [`WaitError::Fatal`]. On timeout the last
/// operation error is attached to [`WaitError::Timeout`].
pub async fn retry_when<T, E, F, Fut>(
    cancel: &CancellationToken,
    base: &WaitSpec,
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, WaitError>
where
    T: Debug,
    E: Into<BoxError>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let spec = WaitSpec::builder()
        .label(base.label().unwrap_or("retry"))
        .pending([RETRYING])
        .target([DONE])
        .timeout(base.timeout())
        .min_poll_interval(base.min_poll_interval())
        .max_poll_interval(base.max_poll_interval())
        .backoff(base.backoff())
        .poll_delay(Duration::ZERO)
        // The poll closure already absorbed everything retryable.
        .classifier(Classifier::new().with_override(|_| Some(ErrorClass::Fatal)))
        .build()?;

    let classifier = base.classifier().clone();
    let last_error: Arc<Mutex<Option<BoxError>>> = Arc::new(Mutex::new(None));
    let stash = last_error.clone();

    let poll = move || {
        let attempt = op();
        let classifier = classifier.clone();
        let stash = stash.clone();
        async move {
            match attempt.await {
                Ok(value) => Ok(PollOutcome::new(DONE, Some(value))),
                Err(e) => {
                    let err: BoxError = e.into();
                    let class = classifier.classify(err.as_ref());
                    if policy.retries(class) {
                        debug!(
                            event = "core.retry.attempt_failed",
                            class = %class,
                            error = %err
                        );
                        if let Ok(mut slot) = stash.lock() {
                            *slot = Some(err);
                        }
                        Ok(PollOutcome::new(RETRYING, None))
                    } else {
                        Err(err)
                    }
                }
            }
        }
    };

    match wait(cancel, &spec, poll).await {
        Ok(Some(Some(value))) => Ok(value),
        Ok(_) => Err(WaitError::InvalidSpec {
            message: "retry finished without a value".to_string(),
        }),
        Err(WaitError::Timeout {
            elapsed,
            expected,
            last_status,
            last_payload,
            ..
        }) => Err(WaitError::Timeout {
            elapsed,
            expected,
            last_status,
            last_payload,
            last_error: last_error.lock().ok().and_then(|mut slot| slot.take()),
        }),
        Err(e) => Err(e),
    }
}
