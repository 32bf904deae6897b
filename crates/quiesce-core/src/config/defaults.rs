//! Default values for configuration types.
//!
//! Config fields are optional so merging can tell "unset" from "set"; the
//! accessors here resolve an unset field to its built-in default.

use crate::config::types::{SweepConfig, WaitConfig};
use crate::wait::types::Backoff;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_POLL_DELAY_MS: u64 = 0;
pub const DEFAULT_MIN_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_STABILITY_COUNT: u32 = 1;
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;
pub const DEFAULT_MAX_PARALLEL_SWEEPERS: usize = 4;
pub const DEFAULT_MAX_PARALLEL_DELETIONS: usize = 10;

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms.unwrap_or(DEFAULT_POLL_DELAY_MS))
    }

    pub fn min_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.min_poll_interval_ms
                .unwrap_or(DEFAULT_MIN_POLL_INTERVAL_MS),
        )
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.max_poll_interval_ms
                .unwrap_or(DEFAULT_MAX_POLL_INTERVAL_MS),
        )
    }

    pub fn stability_count(&self) -> u32 {
        self.stability_count.unwrap_or(DEFAULT_STABILITY_COUNT)
    }

    pub fn not_found_checks(&self) -> u32 {
        self.not_found_checks.unwrap_or(DEFAULT_NOT_FOUND_CHECKS)
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff.unwrap_or_default()
    }
}

impl SweepConfig {
    pub fn max_parallel_sweepers(&self) -> usize {
        self.max_parallel_sweepers
            .unwrap_or(DEFAULT_MAX_PARALLEL_SWEEPERS)
    }

    pub fn max_parallel_deletions(&self) -> usize {
        self.max_parallel_deletions
            .unwrap_or(DEFAULT_MAX_PARALLEL_DELETIONS)
    }
}
