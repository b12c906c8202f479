//! Configuration for the delivery worker.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, SchedulerError};

/// Default poll period for due reminders.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default delivery attempts before a reminder is abandoned.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default number of reminders drained per poll.
pub const DEFAULT_BATCH_SIZE: u32 = 50;

/// Configuration for [`DeliveryWorker`](crate::DeliveryWorker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// How often the worker looks for due reminders.
    pub poll_interval: Duration,
    /// Attempts per reminder before it is left undelivered.
    pub max_attempts: u32,
    /// Maximum reminders delivered per poll.
    pub batch_size: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `REMINDER_POLL_INTERVAL_SECS` (default: 1)
    /// - `REMINDER_MAX_ATTEMPTS` (default: 3)
    /// - `REMINDER_BATCH_SIZE` (default: 50)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = parse_env::<u64>("REMINDER_POLL_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(SchedulerError::InvalidConfig(
                    "REMINDER_POLL_INTERVAL_SECS must be at least 1".to_string(),
                ));
            }
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_env::<u32>("REMINDER_MAX_ATTEMPTS")? {
            config.max_attempts = attempts.max(1);
        }
        if let Some(batch) = parse_env::<u32>("REMINDER_BATCH_SIZE")? {
            config.batch_size = batch.max(1);
        }

        Ok(config)
    }

    /// Builder method to set the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Builder method to set the attempt limit.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        SchedulerError::InvalidConfig(format!(
            "{key} must be a valid {} value, got {raw:?}",
            std::any::type_name::<T>()
        ))
    })
}
