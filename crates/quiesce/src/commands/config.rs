use clap::ArgMatches;
use serde::Serialize;
use tracing::{error, info};

use quiesce_core::QuiesceConfig;
use quiesce_core::wait::Backoff;

/// Configuration with every default filled in.
#[derive(Debug, Serialize)]
struct EffectiveConfig {
    wait: EffectiveWait,
    sweep: EffectiveSweep,
}

#[derive(Debug, Serialize)]
struct EffectiveWait {
    timeout_secs: u64,
    poll_delay_ms: u64,
    min_poll_interval_ms: u64,
    max_poll_interval_ms: u64,
    stability_count: u32,
    not_found_checks: u32,
    backoff: Backoff,
}

#[derive(Debug, Serialize)]
struct EffectiveSweep {
    max_parallel_sweepers: usize,
    max_parallel_deletions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<Vec<String>>,
}

impl From<&QuiesceConfig> for EffectiveConfig {
    fn from(config: &QuiesceConfig) -> Self {
        let wait = &config.wait;
        let sweep = &config.sweep;
        Self {
            wait: EffectiveWait {
                timeout_secs: wait.timeout().as_secs(),
                poll_delay_ms: duration_ms(wait.poll_delay()),
                min_poll_interval_ms: duration_ms(wait.min_poll_interval()),
                max_poll_interval_ms: duration_ms(wait.max_poll_interval()),
                stability_count: wait.stability_count(),
                not_found_checks: wait.not_found_checks(),
                backoff: wait.backoff(),
            },
            sweep: EffectiveSweep {
                max_parallel_sweepers: sweep.max_parallel_sweepers(),
                max_parallel_deletions: sweep.max_parallel_deletions(),
                run: sweep.run.clone(),
            },
        }
    }
}

fn duration_ms(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn handle_config_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");

    let config = match QuiesceConfig::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            error!(event = "cli.config_failed", error = %e);
            return Err(e.into());
        }
    };

    let effective = EffectiveConfig::from(&config);
    if json_output {
        println!("{}", serde_json::to_string_pretty(&effective)?);
    } else {
        print!("{}", toml::to_string_pretty(&effective)?);
    }

    info!(event = "cli.config_completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiesce_core::config::{SweepConfig, WaitConfig};

    #[test]
    fn test_effective_config_fills_defaults() {
        let effective = EffectiveConfig::from(&QuiesceConfig::default());
        assert_eq!(effective.wait.timeout_secs, 300);
        assert_eq!(effective.wait.min_poll_interval_ms, 500);
        assert_eq!(effective.wait.not_found_checks, 20);
        assert_eq!(effective.sweep.max_parallel_deletions, 10);
        assert!(effective.sweep.run.is_none());
    }

    #[test]
    fn test_effective_config_keeps_overrides() {
        let config = QuiesceConfig {
            wait: WaitConfig {
                stability_count: Some(3),
                backoff: Some(Backoff::Fixed),
                ..Default::default()
            },
            sweep: SweepConfig {
                run: Some(vec!["vpc".to_string()]),
                ..Default::default()
            },
        };
        let effective = EffectiveConfig::from(&config);
        assert_eq!(effective.wait.stability_count, 3);
        assert_eq!(effective.wait.backoff, Backoff::Fixed);

        let rendered = toml::to_string_pretty(&effective).unwrap();
        assert!(rendered.contains("backoff = \"fixed\""));
        assert!(rendered.contains("\"vpc\""));
    }
}
