//! Error types for reminder scheduling and delivery.

use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while queueing or delivering reminders.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Reminder storage failed.
    #[error("reminder storage failed: {0}")]
    Database(#[from] DatabaseError),

    /// The delivery channel refused or failed to send.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Invalid worker configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
