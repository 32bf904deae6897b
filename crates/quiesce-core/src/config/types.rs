//! Configuration type definitions for quiesce.
//!
//! These types are serialized/deserialized from TOML config files. Every
//! field is optional so that a project config only overrides what it sets;
//! the accessor methods in [`super::defaults`] supply the fallback values.
//!
//! # Example Configuration
//!
//! ```toml
//! [wait]
//! timeout_secs = 600
//! min_poll_interval_ms = 2000
//! stability_count = 3
//! backoff = "fixed"
//!
//! [sweep]
//! max_parallel_deletions = 20
//! run = ["iam_policy", "iam_role"]
//! ```

use crate::wait::types::Backoff;
use serde::{Deserialize, Serialize};

/// Main configuration loaded from TOML config files.
///
/// Loaded from:
/// 1. User config: `~/.quiesce/config.toml`
/// 2. Project config: `./.quiesce/config.toml`
///
/// Project config values override user config values.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct QuiesceConfig {
    /// Defaults applied to every convergence wait built from config
    #[serde(default)]
    pub wait: WaitConfig,

    /// Sweep orchestration settings
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Default convergence-wait parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WaitConfig {
    /// Maximum wall-clock time for one wait. Default: 300 seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Delay before the first poll. Default: 0ms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_delay_ms: Option<u64>,

    /// Lower bound between polls; base of the exponential backoff. Default: 500ms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_poll_interval_ms: Option<u64>,

    /// Upper bound between polls. Default: 10000ms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_poll_interval_ms: Option<u64>,

    /// Consecutive target observations required before success. Default: 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability_count: Option<u32>,

    /// Consecutive "not found" observations tolerated while a target is expected.
    /// Default: 20.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found_checks: Option<u32>,

    /// Backoff mode between polls: "exponential" or "fixed". Default: exponential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff: Option<Backoff>,
}

/// Sweep orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SweepConfig {
    /// Sweepers run concurrently within one dependency wave. Default: 4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel_sweepers: Option<usize>,

    /// Deletions run concurrently within one sweeper. Default: 10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel_deletions: Option<usize>,

    /// Only run these sweepers (plus their dependencies). Unset runs everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiesce_config_serialization() {
        let config = QuiesceConfig {
            wait: WaitConfig {
                stability_count: Some(3),
                backoff: Some(Backoff::Fixed),
                ..Default::default()
            },
            sweep: SweepConfig::default(),
        };
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("stability_count = 3"));
        assert!(toml_str.contains("backoff = \"fixed\""));

        let parsed: QuiesceConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_sweep_config_deserialize() {
        let toml_str = r#"
max_parallel_deletions = 25
run = ["iam_policy", "iam_role"]
"#;
        let sweep: SweepConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(sweep.max_parallel_deletions, Some(25));
        assert_eq!(sweep.max_parallel_sweepers, None);
        assert_eq!(
            sweep.run,
            Some(vec!["iam_policy".to_string(), "iam_role".to_string()])
        );
    }

    #[test]
    fn test_unknown_backoff_rejected() {
        let result: Result<WaitConfig, _> = toml::from_str("backoff = \"linear\"");
        assert!(result.is_err());
    }
}
