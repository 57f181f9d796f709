//! Configuration for the sync layer.

use hearth_engine::BackoffSchedule;
use std::env;
use std::time::Duration;

/// Tunables for one sync session.
///
/// Defaults are suitable for a mobile/desktop client; environment variables
/// (`HEARTH_SYNC_*`) can override the durations for testing and tuning.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between a local edit and the drain it schedules
    pub debounce: Duration,
    /// Retry delay table for failed queue items
    pub backoff: BackoffSchedule,
    /// Attempts after which an item is reported and no longer auto-retried
    pub max_attempts: u32,
    /// Pause between queue items to bound the remote call rate
    pub throttle: Duration,
    /// Age beyond which a cached query result is reported stale
    pub cache_max_age: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            backoff: BackoffSchedule::default(),
            max_attempts: 5,
            throttle: Duration::from_millis(150),
            cache_max_age: Duration::from_secs(5 * 60),
        }
    }
}

impl SyncConfig {
    /// Load configuration, applying any `HEARTH_SYNC_*` overrides from the
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ms) = read_ms("HEARTH_SYNC_DEBOUNCE_MS")? {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = read_ms("HEARTH_SYNC_THROTTLE_MS")? {
            config.throttle = Duration::from_millis(ms);
        }
        if let Some(ms) = read_ms("HEARTH_SYNC_CACHE_MAX_AGE_MS")? {
            config.cache_max_age = Duration::from_millis(ms);
        }
        if let Ok(value) = env::var("HEARTH_SYNC_MAX_ATTEMPTS") {
            config.max_attempts = value
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HEARTH_SYNC_MAX_ATTEMPTS"))?;
        }

        Ok(config)
    }
}

fn read_ms(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}")]
    InvalidValue(&'static str),
}
