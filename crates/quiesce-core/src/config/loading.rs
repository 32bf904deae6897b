//! Configuration loading and merging logic.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.quiesce/config.toml`
//! 3. **Project config** - `./.quiesce/config.toml`
//! 4. **Environment** - `QUIESCE_SWEEP_RUN` (comma-separated sweeper names)
//! 5. **CLI arguments** - Command-line flags (highest priority)

use crate::config::types::{QuiesceConfig, SweepConfig, WaitConfig};
use crate::config::validation::validate_config;
use crate::errors::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_DIR_NAME: &str = ".quiesce";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SWEEP_RUN_ENV: &str = "QUIESCE_SWEEP_RUN";

/// Load configuration from the hierarchy of config files.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be parsed, or if the
/// merged configuration fails validation. Missing config files are not errors.
pub fn load_hierarchy() -> Result<QuiesceConfig, ConfigError> {
    let user_path = user_config_path().ok();
    let project_path = std::env::current_dir()?
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME);

    let config = load_from_paths(user_path.as_deref(), &project_path)?;
    let config = apply_env_overrides(config, std::env::var(SWEEP_RUN_ENV).ok());

    validate_config(&config)?;

    info!(
        event = "core.config.load_completed",
        sweep_filter = ?config.sweep.run
    );

    Ok(config)
}

/// Merge the user and project files at the given paths over the defaults.
pub fn load_from_paths(
    user_path: Option<&Path>,
    project_path: &Path,
) -> Result<QuiesceConfig, ConfigError> {
    let mut config = QuiesceConfig::default();

    if let Some(path) = user_path
        && let Some(user_config) = load_optional(path)?
    {
        config = merge_configs(config, user_config);
    }

    if let Some(project_config) = load_optional(project_path)? {
        config = merge_configs(config, project_config);
    }

    Ok(config)
}

/// Load a config file, treating a missing file as `None`.
fn load_optional(path: &Path) -> Result<Option<QuiesceConfig>, ConfigError> {
    match load_config_file(path) {
        Ok(config) => Ok(Some(config)),
        Err(ConfigError::ConfigNotFound { .. }) => {
            debug!(event = "core.config.file_not_found", path = %path.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Load a configuration file from the given path.
pub fn load_config_file(path: &Path) -> Result<QuiesceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            ConfigError::IoError { source: e }
        }
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Path of the user-level config file, if a home directory exists.
pub fn user_config_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Merge two configurations, with `override_config` taking precedence.
///
/// Override values replace base values only if present.
pub fn merge_configs(base: QuiesceConfig, override_config: QuiesceConfig) -> QuiesceConfig {
    let wait = override_config.wait;
    let sweep = override_config.sweep;

    QuiesceConfig {
        wait: WaitConfig {
            timeout_secs: wait.timeout_secs.or(base.wait.timeout_secs),
            poll_delay_ms: wait.poll_delay_ms.or(base.wait.poll_delay_ms),
            min_poll_interval_ms: wait
                .min_poll_interval_ms
                .or(base.wait.min_poll_interval_ms),
            max_poll_interval_ms: wait
                .max_poll_interval_ms
                .or(base.wait.max_poll_interval_ms),
            stability_count: wait.stability_count.or(base.wait.stability_count),
            not_found_checks: wait.not_found_checks.or(base.wait.not_found_checks),
            backoff: wait.backoff.or(base.wait.backoff),
        },
        sweep: SweepConfig {
            max_parallel_sweepers: sweep
                .max_parallel_sweepers
                .or(base.sweep.max_parallel_sweepers),
            max_parallel_deletions: sweep
                .max_parallel_deletions
                .or(base.sweep.max_parallel_deletions),
            run: sweep.run.or(base.sweep.run),
        },
    }
}

/// Apply `QUIESCE_SWEEP_RUN` to the sweeper filter.
///
/// An empty or whitespace-only value is ignored.
pub fn apply_env_overrides(mut config: QuiesceConfig, sweep_run: Option<String>) -> QuiesceConfig {
    if let Some(value) = sweep_run {
        let names = parse_name_list(&value);
        if !names.is_empty() {
            config.sweep.run = Some(names);
        }
    }
    config
}

/// Split a comma-separated list of sweeper names, dropping blanks.
pub fn parse_name_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
