//! Dispatcher configuration

use inkpost_core::{parse_env, AppConfigTrait, ConfigError, ConfigSource};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How often the dispatcher looks for due entries
    pub poll_interval: Duration,
    /// Entries claimed per poll
    pub batch_size: usize,
    /// Handlers running at once
    pub max_concurrency: usize,
    /// Attempts before an entry is dead
    pub max_attempts: i32,
    pub job_timeout: Duration,
    /// How long a claimed entry stays invisible to other dispatchers
    pub lease: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 20,
            max_concurrency: 4,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            job_timeout: Duration::from_secs(30),
            lease: Duration::from_secs(120),
        }
    }
}

impl AppConfigTrait for QueueConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let poll_secs = parse_env(
            "OUTBOX_POLL_INTERVAL_SECS",
            "poll_interval",
            defaults.poll_interval.as_secs(),
            "number of seconds",
        )?;
        let timeout_secs = parse_env(
            "OUTBOX_JOB_TIMEOUT_SECS",
            "job_timeout",
            defaults.job_timeout.as_secs(),
            "number of seconds",
        )?;

        Ok(Self {
            poll_interval: Duration::from_secs(poll_secs),
            batch_size: parse_env(
                "OUTBOX_BATCH_SIZE",
                "batch_size",
                defaults.batch_size,
                "positive integer",
            )?,
            max_attempts: parse_env(
                "OUTBOX_MAX_ATTEMPTS",
                "max_attempts",
                defaults.max_attempts,
                "positive integer",
            )?,
            job_timeout: Duration::from_secs(timeout_secs),
            ..defaults
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::validation_failed(
                "poll_interval",
                "Poll interval must be at least one second",
            ));
        }
        if self.batch_size == 0 || self.max_concurrency == 0 {
            return Err(ConfigError::validation_failed(
                "batch_size",
                "Batch size and concurrency must be positive",
            ));
        }
        if self.max_attempts < 1 {
            return Err(ConfigError::invalid_value(
                "max_attempts",
                self.max_attempts.to_string(),
                "at least 1",
            ));
        }
        if self.lease <= self.job_timeout {
            return Err(ConfigError::validation_failed(
                "lease",
                "Lease must outlast the job timeout",
            ));
        }
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        sources.insert(
            "poll_interval".to_string(),
            ConfigSource::EnvVar("OUTBOX_POLL_INTERVAL_SECS".to_string()),
        );
        sources.insert(
            "batch_size".to_string(),
            ConfigSource::EnvVar("OUTBOX_BATCH_SIZE".to_string()),
        );
        sources.insert(
            "max_attempts".to_string(),
            ConfigSource::EnvVar("OUTBOX_MAX_ATTEMPTS".to_string()),
        );
        sources.insert(
            "job_timeout".to_string(),
            ConfigSource::EnvVar("OUTBOX_JOB_TIMEOUT_SECS".to_string()),
        );
        sources.insert(
            "lease".to_string(),
            ConfigSource::Default("120s".to_string()),
        );
        sources
    }
}
