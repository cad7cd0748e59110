//! Runtime configuration, loaded from environment variables.

use std::time::Duration;

/// Evaluation-core configuration.
///
/// All knobs are process-wide; none are per-alert or per-condition.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment ("production", "sandbox", ...)
    pub environment: String,
    /// Tolerance applied to `equals` comparisons to absorb
    /// floating-point drift
    pub equality_tolerance: f64,
    /// Upper bound on any single collaborator call (indicator
    /// computation, market data fetch, notification dispatch)
    pub collaborator_timeout: Duration,
    /// Maximum number of retained closed-bar indicator memo entries
    pub cache_capacity: usize,
    /// Minimum spacing between per-tick fires for one alert; `None`
    /// means every qualifying tick fires
    pub min_refire_interval: Option<chrono::Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "sandbox".to_string(),
            equality_tolerance: 1e-4,
            collaborator_timeout: Duration::from_secs(5),
            cache_capacity: 256,
            min_refire_interval: None,
        }
    }
}

impl Config {
    /// Load configuration from `ALERTRIX_*` environment variables,
    /// reading `.env` if present. Unset variables fall back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            environment: get_environment(),
            equality_tolerance: optional_env("ALERTRIX_EQUALITY_TOLERANCE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.equality_tolerance),
            collaborator_timeout: optional_env("ALERTRIX_COLLABORATOR_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.collaborator_timeout),
            cache_capacity: optional_env("ALERTRIX_CACHE_CAPACITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_capacity),
            min_refire_interval: optional_env("ALERTRIX_MIN_REFIRE_SECONDS")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|secs| *secs > 0)
                .map(chrono::Duration::seconds),
        }
    }
}

/// Resolve the deployment environment ("sandbox" when unset)
pub fn get_environment() -> String {
    std::env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
