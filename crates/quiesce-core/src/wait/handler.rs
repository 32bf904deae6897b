use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::ErrorClass;
use crate::errors::BoxError;
use crate::wait::errors::WaitError;
use crate::wait::types::{PollOutcome, WaitSpec};

/// Stand-in deadline for timeouts too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Observation category; the backoff attempt counter resets when it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Pending,
    Target,
    Retryable,
    NotFound,
}

enum Step<T> {
    Continue(Category),
    /// Target observed, stability not yet reached.
    Confirming(Option<T>),
    Done(Option<T>),
    Fail(WaitError),
}

/// Per-wait bookkeeping. Lives for exactly one `wait` call.
struct Tracker<'a> {
    spec: &'a WaitSpec,
    target_streak: u32,
    not_found_streak: u32,
    attempt: u32,
    category: Option<Category>,
    polls: u32,
    last_status: Option<String>,
    last_payload: Option<String>,
    last_error: Option<BoxError>,
}

impl<'a> Tracker<'a> {
    fn new(spec: &'a WaitSpec) -> Self {
        Self {
            spec,
            target_streak: 0,
            not_found_streak: 0,
            attempt: 0,
            category: None,
            polls: 0,
            last_status: None,
            last_payload: None,
            last_error: None,
        }
    }

    fn expected(&self) -> Vec<String> {
        self.spec.target().iter().cloned().collect()
    }

    fn observe<T: Debug>(&mut self, result: Result<PollOutcome<T>, BoxError>) -> Step<T> {
        self.polls += 1;
        match result {
            Ok(outcome) => {
                self.not_found_streak = 0;
                self.last_error = None;
                self.last_payload = Some(format!("{:?}", outcome.payload));
                let status = outcome.status;

                if self.spec.target().contains(&status) {
                    self.last_status = Some(status);
                    self.target_streak += 1;
                    if self.target_streak >= self.spec.stability_count() {
                        return Step::Done(Some(outcome.payload));
                    }
                    return Step::Confirming(Some(outcome.payload));
                }

                self.target_streak = 0;
                if self.spec.pending().contains(&status) || self.spec.tolerate_unknown() {
                    self.last_status = Some(status);
                    return Step::Continue(Category::Pending);
                }

                Step::Fail(WaitError::UnexpectedStatus {
                    status,
                    expected: self.expected(),
                    last_payload: self.last_payload.take(),
                })
            }
            Err(err) => match self.spec.classifier().classify(err.as_ref()) {
                ErrorClass::NotFound if self.spec.awaits_absence() => {
                    self.not_found_streak = 0;
                    self.last_error = None;
                    self.target_streak += 1;
                    if self.target_streak >= self.spec.stability_count() {
                        return Step::Done(None);
                    }
                    Step::Confirming(None)
                }
                ErrorClass::NotFound => {
                    self.target_streak = 0;
                    self.not_found_streak += 1;
                    if self.not_found_streak > self.spec.not_found_checks() {
                        return Step::Fail(WaitError::NotFound {
                            checks: self.not_found_streak,
                            last_error: err,
                        });
                    }
                    self.last_error = Some(err);
                    Step::Continue(Category::NotFound)
                }
                ErrorClass::Retryable => {
                    self.target_streak = 0;
                    self.not_found_streak = 0;
                    self.last_error = Some(err);
                    Step::Continue(Category::Retryable)
                }
                ErrorClass::Fatal => Step::Fail(WaitError::Fatal {
                    last_status: self.last_status.clone(),
                    last_payload: self.last_payload.clone(),
                    source: err,
                }),
            },
        }
    }

    fn next_delay(&mut self, category: Category, remaining: Duration) -> Duration {
        if self.category != Some(category) {
            self.category = Some(category);
            self.attempt = 0;
        }
        let delay = self.spec.next_delay(self.attempt, remaining);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    fn cancelled(&self) -> WaitError {
        WaitError::Cancelled {
            last_status: self.last_status.clone(),
        }
    }

    fn timed_out(&mut self, elapsed: Duration) -> WaitError {
        WaitError::Timeout {
            elapsed,
            expected: self.expected(),
            last_status: self.last_status.clone(),
            last_payload: self.last_payload.clone(),
            last_error: self.last_error.take(),
        }
    }
}

/// Poll until the remote object reaches a target status.
///
/// `poll` is invoked repeatedly; a status in `pending` or a retryable error
/// keeps the wait going, a status in `target` observed `stability_count`
/// times in a row ends it. Sleeps between polls follow the `WaitSpec` backoff and
/// never extend past the deadline. The poll that completes at or after the
/// deadline is the final one, and a target status there still counts as
/// success, so a wait lasts at most the timeout plus one poll.
///
/// Cancellation is checked between polls only; an in-flight poll is always
/// awaited to completion.
///
/// Returns the payload of the last poll, or `None` when the wait expected the
/// object to disappear and it did.
pub async fn wait<T, E, F, Fut>(
    cancel: &CancellationToken,
    spec: &WaitSpec,
    mut poll: F,
) -> Result<Option<T>, WaitError>
where
    T: Debug,
    E: Into<BoxError>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, E>>,
{
    let label = spec.label().unwrap_or("unlabeled");
    let started = Instant::now();
    let deadline = started
        .checked_add(spec.timeout())
        .unwrap_or_else(|| started + FAR_FUTURE);
    let mut tracker = Tracker::new(spec);

    info!(
        event = "core.wait.started",
        label,
        pending = ?spec.pending(),
        target = ?spec.target(),
        timeout_ms = spec.timeout().as_millis() as u64,
        stability_count = spec.stability_count()
    );

    if !spec.poll_delay().is_zero() {
        let delay = spec.poll_delay().min(deadline.saturating_duration_since(started));
        if !sleep_or_cancel(cancel, delay).await {
            info!(event = "core.wait.cancelled", label, polls = 0);
            return Err(tracker.cancelled());
        }
    }

    loop {
        if cancel.is_cancelled() {
            info!(event = "core.wait.cancelled", label, polls = tracker.polls);
            return Err(tracker.cancelled());
        }

        let step = tracker.observe(poll().await.map_err(Into::into));
        // A poll that straddles the deadline is the final one.
        let is_final = Instant::now() >= deadline;

        let category = match step {
            Step::Done(payload) => {
                info!(
                    event = "core.wait.succeeded",
                    label,
                    polls = tracker.polls,
                    last_status = ?tracker.last_status,
                    elapsed_ms = started.elapsed().as_millis() as u64
                );
                return Ok(payload);
            }
            Step::Fail(err) => {
                warn!(
                    event = "core.wait.failed",
                    label,
                    polls = tracker.polls,
                    error = %err
                );
                return Err(err);
            }
            Step::Confirming(payload) if is_final => {
                info!(
                    event = "core.wait.succeeded_on_final_poll",
                    label,
                    polls = tracker.polls,
                    target_streak = tracker.target_streak
                );
                return Ok(payload);
            }
            Step::Continue(_) if is_final => {
                let err = tracker.timed_out(started.elapsed());
                warn!(
                    event = "core.wait.timed_out",
                    label,
                    polls = tracker.polls,
                    error = %err
                );
                return Err(err);
            }
            Step::Confirming(_) => Category::Target,
            Step::Continue(category) => category,
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let delay = tracker.next_delay(category, remaining);
        debug!(
            event = "core.wait.poll_completed",
            label,
            poll = tracker.polls,
            category = ?category,
            status = ?tracker.last_status,
            target_streak = tracker.target_streak,
            next_delay_ms = delay.as_millis() as u64
        );
        if !sleep_or_cancel(cancel, delay).await {
            info!(event = "core.wait.cancelled", label, polls = tracker.polls);
            return Err(tracker.cancelled());
        }
    }
}

/// Sleep for `delay`; returns false if cancelled first.
async fn sleep_or_cancel(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RemoteFault;
    use crate::errors::ErrorKind;
    use crate::wait::types::{Backoff, WaitState};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    type Scripted = Result<PollOutcome<u32>, RemoteFault>;

    fn ok(status: &str) -> Scripted {
        Ok(PollOutcome::new(status, 7))
    }

    fn throttled() -> Scripted {
        Err(RemoteFault::new("Rate exceeded").with_code("ThrottlingException"))
    }

    fn not_found() -> Scripted {
        Err(RemoteFault::new("no such cluster").with_code("ResourceNotFoundException"))
    }

    /// Replays `script`, repeating the final entry once exhausted.
    fn scripted(
        script: Vec<Scripted>,
    ) -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<Scripted>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut queue: VecDeque<Scripted> = script.into();
        let poll = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            std::future::ready(next.unwrap_or_else(|| ok("ACTIVE")))
        };
        (calls, poll)
    }

    fn spec(stability: u32) -> WaitSpec {
        WaitSpec::builder()
            .label("test")
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .timeout(Duration::from_secs(60))
            .min_poll_interval(Duration::from_millis(100))
            .max_poll_interval(Duration::from_secs(5))
            .stability_count(stability)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediately_stable_target_polls_exactly_stability_count() {
        let (calls, poll) = scripted(vec![ok("ACTIVE")]);
        let result = wait(&CancellationToken::new(), &spec(3), poll).await;
        assert_eq!(result.unwrap(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_observation_suffices_by_default() {
        let (calls, poll) = scripted(vec![ok("CREATING"), ok("CREATING"), ok("ACTIVE")]);
        let result = wait(&CancellationToken::new(), &spec(1), poll).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stability_counter_resets_on_pending() {
        let (calls, poll) = scripted(vec![ok("ACTIVE"), ok("CREATING"), ok("ACTIVE")]);
        let result = wait(&CancellationToken::new(), &spec(2), poll).await;
        assert!(result.is_ok());
        // target, pending (reset), then two consecutive targets
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_errors_until_deadline_time_out() {
        let (calls, poll) = scripted(vec![throttled()]);
        let started = Instant::now();
        let err = wait(&CancellationToken::new(), &spec(1), poll)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.state(), WaitState::TimedOut);
        assert!(matches!(err, WaitError::Timeout { last_error: Some(_), .. }));
        assert!(started.elapsed() <= Duration::from_secs(60));
        assert!(calls.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_poll_after_deadline_can_succeed() {
        let spec = WaitSpec::builder()
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .timeout(Duration::from_secs(1))
            .min_poll_interval(Duration::from_secs(5))
            .max_poll_interval(Duration::from_secs(5))
            .build()
            .unwrap();
        // First poll pending; the sleep is clamped to the deadline, then the final poll lands.
        let (calls, poll) = scripted(vec![ok("CREATING"), ok("ACTIVE")]);
        let result = wait(&CancellationToken::new(), &spec, poll).await;
        assert_eq!(result.unwrap(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_poll_target_skips_remaining_stability() {
        let spec = WaitSpec::builder()
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .stability_count(3)
            .timeout(Duration::from_secs(1))
            .min_poll_interval(Duration::from_secs(5))
            .max_poll_interval(Duration::from_secs(5))
            .build()
            .unwrap();
        let (calls, poll) = scripted(vec![ok("ACTIVE")]);
        let result = wait(&CancellationToken::new(), &spec, poll).await;
        assert_eq!(result.unwrap(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_is_fatal_by_default() {
        let (_, poll) = scripted(vec![ok("CREATING"), ok("FAILED")]);
        let err = wait(&CancellationToken::new(), &spec(1), poll)
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::UnexpectedStatus { ref status, .. } if status == "FAILED"));
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(err.last_payload(), Some("7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tolerated_unknown_status_keeps_polling() {
        let spec = WaitSpec::builder()
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .tolerate_unknown(true)
            .min_poll_interval(Duration::from_millis(100))
            .build()
            .unwrap();
        let (calls, poll) = scripted(vec![ok("MODIFYING"), ok("ACTIVE")]);
        assert!(wait(&CancellationToken::new(), &spec, poll).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_immediately() {
        let (calls, poll) = scripted(vec![Err(RemoteFault::new("denied")
            .with_code("AccessDenied")
            .with_status(403))]);
        let err = wait(&CancellationToken::new(), &spec(1), poll)
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Fatal { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deletion_wait_succeeds_on_not_found() {
        let spec = WaitSpec::builder()
            .pending(["DELETING"])
            .min_poll_interval(Duration::from_millis(100))
            .build()
            .unwrap();
        let (calls, poll) = scripted(vec![ok("DELETING"), not_found()]);
        let result = wait(&CancellationToken::new(), &spec, poll).await;
        assert_eq!(result.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_creation_wait_tolerates_not_found_then_gives_up() {
        let spec = WaitSpec::builder()
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .not_found_checks(2)
            .min_poll_interval(Duration::from_millis(100))
            .build()
            .unwrap();

        let (_, poll) = scripted(vec![not_found(), not_found(), ok("ACTIVE")]);
        assert!(wait(&CancellationToken::new(), &spec, poll).await.is_ok());

        let (calls, poll) = scripted(vec![not_found()]);
        let err = wait(&CancellationToken::new(), &spec, poll)
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::NotFound { checks: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_between_polls() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poll = move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                trigger.cancel();
            }
            std::future::ready(ok("CREATING"))
        };

        let err = wait(&cancel, &spec(1), poll).await.unwrap_err();
        assert!(matches!(err, WaitError::Cancelled { .. }));
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.last_status(), Some("CREATING"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_does_not_overflow() {
        let spec = WaitSpec::builder()
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .timeout(Duration::MAX)
            .build()
            .unwrap();
        let (calls, poll) = scripted(vec![ok("CREATING"), ok("ACTIVE")]);
        assert_eq!(wait(&CancellationToken::new(), &spec, poll).await.unwrap(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_configured_timeout_is_usable() {
        let config = crate::config::WaitConfig {
            timeout_secs: Some(u64::MAX),
            ..Default::default()
        };
        let spec = WaitSpec::builder()
            .defaults(&config)
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .build()
            .unwrap();
        let (_, poll) = scripted(vec![ok("ACTIVE")]);
        assert!(wait(&CancellationToken::new(), &spec, poll).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_delay_before_first_poll() {
        let spec = WaitSpec::builder()
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .poll_delay(Duration::from_secs(3))
            .build()
            .unwrap();
        let started = Instant::now();
        let first_poll_at: Arc<std::sync::Mutex<Option<Duration>>> = Arc::default();
        let seen = first_poll_at.clone();
        let poll = move || {
            seen.lock().unwrap().get_or_insert(started.elapsed());
            std::future::ready(ok("ACTIVE"))
        };

        wait(&CancellationToken::new(), &spec, poll).await.unwrap();
        let waited = first_poll_at.lock().unwrap().expect("polled once");
        assert!(waited >= Duration::from_secs(3), "first poll after {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_straddling_deadline_is_final() {
        let spec = WaitSpec::builder()
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .timeout(Duration::from_secs(1))
            .min_poll_interval(Duration::from_millis(100))
            .build()
            .unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poll = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(700)).await;
                ok("CREATING")
            }
        };

        let started = Instant::now();
        let err = wait(&CancellationToken::new(), &spec, poll).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        // 0.0-0.7s, sleep 0.1s, 0.8-1.5s ends past the deadline
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() <= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_resets_on_category_change() {
        let spec = WaitSpec::builder()
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .backoff(Backoff::Exponential)
            .min_poll_interval(Duration::from_millis(100))
            .max_poll_interval(Duration::from_secs(10))
            .build()
            .unwrap();
        let mut tracker = Tracker::new(&spec);
        let plenty = Duration::from_secs(60);
        assert_eq!(tracker.next_delay(Category::Pending, plenty), Duration::from_millis(100));
        assert_eq!(tracker.next_delay(Category::Pending, plenty), Duration::from_millis(200));
        assert_eq!(tracker.next_delay(Category::Pending, plenty), Duration::from_millis(400));
        assert_eq!(tracker.next_delay(Category::Retryable, plenty), Duration::from_millis(100));
    }
}
