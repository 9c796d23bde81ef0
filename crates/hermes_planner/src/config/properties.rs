use std::path::PathBuf;

use jiff::{SignedDuration, SpanRelativeTo};

use crate::error::ConfigLoadError;

pub const SOLVER_CONFIG_DIR_KEY: &str = "APP_SOLVER_CONFIG_DIR";
pub const SOLVER_CONFIG_FILE_KEY: &str = "APP_SOLVER_CONFIG_FILE";
pub const OPTIMIZER_TIMEOUT_KEY: &str = "APP_OPTIMIZER_TIMEOUT";

pub const DEFAULT_SOLVER_CONFIG_DIR: &str = "solver";
pub const DEFAULT_SOLVER_CONFIG_FILE: &str = "vehicle_routing_solver_config.json";
pub const DEFAULT_OPTIMIZER_TIMEOUT: SignedDuration = SignedDuration::from_secs(30);

/// Process level settings for the planner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerProperties {
    /// Directory checked for a user supplied solver configuration.
    pub solver_config_dir: PathBuf,
    /// File name of the configuration inside `solver_config_dir`.
    pub solver_config_file: String,
    /// Safety ceiling of one solve cycle.
    pub optimizer_timeout: SignedDuration,
}

impl Default for PlannerProperties {
    fn default() -> Self {
        Self {
            solver_config_dir: PathBuf::from(DEFAULT_SOLVER_CONFIG_DIR),
            solver_config_file: DEFAULT_SOLVER_CONFIG_FILE.to_owned(),
            optimizer_timeout: DEFAULT_OPTIMIZER_TIMEOUT,
        }
    }
}

impl PlannerProperties {
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut properties = Self::default();

        if let Some(dir) = lookup(SOLVER_CONFIG_DIR_KEY).filter(|value| !value.is_empty()) {
            properties.solver_config_dir = PathBuf::from(dir);
        }

        if let Some(file) = lookup(SOLVER_CONFIG_FILE_KEY).filter(|value| !value.is_empty()) {
            properties.solver_config_file = file;
        }

        if let Some(timeout) = lookup(OPTIMIZER_TIMEOUT_KEY) {
            properties.optimizer_timeout =
                parse_duration(&timeout).map_err(|reason| ConfigLoadError::InvalidProperty {
                    key: OPTIMIZER_TIMEOUT_KEY,
                    value: timeout.clone(),
                    reason,
                })?;
        }

        Ok(properties)
    }
}

/// Accepts "30s", "5m", "PT1H30M" or a bare number of seconds. Negative
/// durations are rejected.
pub fn parse_duration(input: &str) -> Result<SignedDuration, String> {
    let input = input.trim();

    let duration = if let Ok(duration) = input.parse::<SignedDuration>() {
        duration
    } else if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        duration
    } else if let Ok(seconds) = input.parse::<i64>() {
        SignedDuration::from_secs(seconds)
    } else {
        return Err(String::from("Invalid duration"));
    };

    if duration.is_negative() {
        return Err(String::from("Duration must not be negative"));
    }

    Ok(duration)
}
