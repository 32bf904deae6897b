use crate::classify::Classifier;
use crate::config::types::WaitConfig;
use crate::wait::errors::WaitError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// How the delay between polls grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `min_poll_interval * 2^attempt`, capped by `max_poll_interval`.
    /// The attempt counter resets whenever the observation category changes.
    #[default]
    Exponential,
    /// Always `min_poll_interval`.
    Fixed,
}

/// Lifecycle of a single wait, reported with failures for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Start,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

/// One successful poll: the remote status and whatever the caller wants back.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome<T> {
    pub status: String,
    pub payload: T,
}

impl<T> PollOutcome<T> {
    pub fn new(status: impl Into<String>, payload: T) -> Self {
        Self {
            status: status.into(),
            payload,
        }
    }
}

/// Parameters for one convergence wait.
///
/// Built with [`WaitSpec::builder`]; `pending` and `target` are guaranteed
/// disjoint. An empty `target` describes a deletion wait: a "not found"
/// error then counts as the target observation.
#[derive(Debug, Clone)]
pub struct WaitSpec {
    label: Option<String>,
    pending: BTreeSet<String>,
    target: BTreeSet<String>,
    timeout: Duration,
    poll_delay: Duration,
    min_poll_interval: Duration,
    max_poll_interval: Duration,
    stability_count: u32,
    not_found_checks: u32,
    backoff: Backoff,
    tolerate_unknown: bool,
    classifier: Classifier,
}

impl WaitSpec {
    pub fn builder() -> WaitSpecBuilder {
        WaitSpecBuilder::new()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    pub fn target(&self) -> &BTreeSet<String> {
        &self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_delay(&self) -> Duration {
        self.poll_delay
    }

    pub fn min_poll_interval(&self) -> Duration {
        self.min_poll_interval
    }

    pub fn max_poll_interval(&self) -> Duration {
        self.max_poll_interval
    }

    pub fn stability_count(&self) -> u32 {
        self.stability_count
    }

    pub fn not_found_checks(&self) -> u32 {
        self.not_found_checks
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn tolerate_unknown(&self) -> bool {
        self.tolerate_unknown
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// True when the wait expects the object to disappear.
    pub fn awaits_absence(&self) -> bool {
        self.target.is_empty()
    }

    /// Delay before the next poll given the attempt number within the current
    /// observation category and the time left before the deadline.
    pub fn next_delay(&self, attempt: u32, remaining: Duration) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed => self.min_poll_interval,
            Backoff::Exponential => self
                .min_poll_interval
                .saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.max_poll_interval).min(remaining)
    }
}

#[derive(Debug, Clone)]
pub struct WaitSpecBuilder {
    spec: WaitSpec,
}

impl WaitSpecBuilder {
    fn new() -> Self {
        Self {
            spec: WaitSpec {
                label: None,
                pending: BTreeSet::new(),
                target: BTreeSet::new(),
                timeout: Duration::ZERO,
                poll_delay: Duration::ZERO,
                min_poll_interval: Duration::ZERO,
                max_poll_interval: Duration::ZERO,
                stability_count: 0,
                not_found_checks: 0,
                backoff: Backoff::default(),
                tolerate_unknown: false,
                classifier: Classifier::default(),
            },
        }
        .defaults(&WaitConfig::default())
    }

    /// Take timing, stability and backoff settings from a loaded config.
    pub fn defaults(mut self, config: &WaitConfig) -> Self {
        self.spec.timeout = config.timeout();
        self.spec.poll_delay = config.poll_delay();
        self.spec.min_poll_interval = config.min_poll_interval();
        self.spec.max_poll_interval = config.max_poll_interval();
        self.spec.stability_count = config.stability_count();
        self.spec.not_found_checks = config.not_found_checks();
        self.spec.backoff = config.backoff();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.spec.label = Some(label.into());
        self
    }

    pub fn pending<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.pending.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn target<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.target.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.spec.timeout = timeout;
        self
    }

    pub fn poll_delay(mut self, delay: Duration) -> Self {
        self.spec.poll_delay = delay;
        self
    }

    pub fn min_poll_interval(mut self, interval: Duration) -> Self {
        self.spec.min_poll_interval = interval;
        self
    }

    pub fn max_poll_interval(mut self, interval: Duration) -> Self {
        self.spec.max_poll_interval = interval;
        self
    }

    pub fn stability_count(mut self, count: u32) -> Self {
        self.spec.stability_count = count;
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.spec.not_found_checks = checks;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.spec.backoff = backoff;
        self
    }

    /// Treat statuses outside `pending` and `target` as pending instead of failing.
    pub fn tolerate_unknown(mut self, tolerate: bool) -> Self {
        self.spec.tolerate_unknown = tolerate;
        self
    }

    pub fn classifier(mut self, classifier: Classifier) -> Self {
        self.spec.classifier = classifier;
        self
    }

    pub fn build(self) -> Result<WaitSpec, WaitError> {
        let spec = self.spec;

        let overlap: Vec<&String> = spec.pending.intersection(&spec.target).collect();
        if !overlap.is_empty() {
            return Err(WaitError::InvalidSpec {
                message: format!("statuses {:?} are both pending and target", overlap),
            });
        }
        if spec.stability_count == 0 {
            return Err(WaitError::InvalidSpec {
                message: "stability_count must be at least 1".to_string(),
            });
        }
        if spec.min_poll_interval.is_zero() {
            return Err(WaitError::InvalidSpec {
                message: "min_poll_interval must be greater than zero".to_string(),
            });
        }
        if spec.min_poll_interval > spec.max_poll_interval {
            return Err(WaitError::InvalidSpec {
                message: format!(
                    "min_poll_interval {:?} exceeds max_poll_interval {:?}",
                    spec.min_poll_interval, spec.max_poll_interval
                ),
            });
        }

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_uses_config_defaults() {
        let spec = WaitSpec::builder()
            .pending(["CREATING"])
            .target(["ACTIVE"])
            .build()
            .unwrap();
        assert_eq!(spec.timeout(), Duration::from_secs(300));
        assert_eq!(spec.stability_count(), 1);
        assert_eq!(spec.not_found_checks(), 20);
        assert_eq!(spec.backoff(), Backoff::Exponential);
        assert!(!spec.awaits_absence());
    }

    #[test]
    fn test_builder_applies_loaded_config() {
        let config = WaitConfig {
            stability_count: Some(3),
            backoff: Some(Backoff::Fixed),
            ..Default::default()
        };
        let spec = WaitSpec::builder().defaults(&config).build().unwrap();
        assert_eq!(spec.stability_count(), 3);
        assert_eq!(spec.backoff(), Backoff::Fixed);
        assert!(spec.awaits_absence());
    }

    #[test]
    fn test_overlapping_sets_rejected() {
        let err = WaitSpec::builder()
            .pending(["ACTIVE", "CREATING"])
            .target(["ACTIVE"])
            .build()
            .unwrap_err();
        assert!(matches!(err, WaitError::InvalidSpec { .. }));
        assert!(err.to_string().contains("ACTIVE"));
    }

    #[test]
    fn test_zero_stability_rejected() {
        let result = WaitSpec::builder().stability_count(0).build();
        assert!(matches!(result, Err(WaitError::InvalidSpec { .. })));
    }

    #[test]
    fn test_exponential_delay_capped() {
        let spec = WaitSpec::builder()
            .min_poll_interval(Duration::from_millis(500))
            .max_poll_interval(Duration::from_secs(4))
            .build()
            .unwrap();
        let plenty = Duration::from_secs(600);
        assert_eq!(spec.next_delay(0, plenty), Duration::from_millis(500));
        assert_eq!(spec.next_delay(1, plenty), Duration::from_secs(1));
        assert_eq!(spec.next_delay(3, plenty), Duration::from_secs(4));
        assert_eq!(spec.next_delay(40, plenty), Duration::from_secs(4));
        assert_eq!(
            spec.next_delay(3, Duration::from_millis(300)),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_fixed_delay() {
        let spec = WaitSpec::builder()
            .backoff(Backoff::Fixed)
            .min_poll_interval(Duration::from_secs(2))
            .build()
            .unwrap();
        assert_eq!(spec.next_delay(5, Duration::from_secs(60)), Duration::from_secs(2));
    }
}
