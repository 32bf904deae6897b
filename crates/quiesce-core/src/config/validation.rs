use crate::config::types::QuiesceConfig;
use crate::errors::ConfigError;

/// Validate a merged configuration.
///
/// Zero values that would stall a wait or a sweep are rejected.
pub fn validate_config(config: &QuiesceConfig) -> Result<(), ConfigError> {
    let wait = &config.wait;
    let sweep = &config.sweep;

    if wait.timeout().is_zero() {
        return Err(invalid("wait.timeout_secs must be greater than 0"));
    }
    if wait.min_poll_interval().is_zero() {
        return Err(invalid("wait.min_poll_interval_ms must be greater than 0"));
    }
    if wait.min_poll_interval() > wait.max_poll_interval() {
        return Err(invalid(format!(
            "wait.min_poll_interval_ms ({}) exceeds wait.max_poll_interval_ms ({})",
            wait.min_poll_interval().as_millis(),
            wait.max_poll_interval().as_millis()
        )));
    }
    if wait.stability_count() == 0 {
        return Err(invalid("wait.stability_count must be at least 1"));
    }
    if sweep.max_parallel_sweepers() == 0 {
        return Err(invalid("sweep.max_parallel_sweepers must be at least 1"));
    }
    if sweep.max_parallel_deletions() == 0 {
        return Err(invalid("sweep.max_parallel_deletions must be at least 1"));
    }
    if let Some(names) = &sweep.run
        && names.iter().any(|n| n.trim().is_empty())
    {
        return Err(invalid("sweep.run must not contain empty sweeper names"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidConfiguration {
        message: message.into(),
    }
}
