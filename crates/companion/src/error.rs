//! Error types for companion operations.

use database::DatabaseError;
use reminder_scheduler::SchedulerError;
use thiserror::Error;

/// Errors that can occur in the companion engine.
#[derive(Debug, Error)]
pub enum CompanionError {
    /// Unrecognised companion level.
    #[error("companion_level must be off|light|standard, got {0:?}")]
    InvalidLevel(String),

    /// Unrecognised nudge frequency.
    #[error("nudge frequency must be off|weekly|standard, got {0:?}")]
    InvalidFrequency(String),

    /// Time of day not in `HH:MM` 24h form.
    #[error("time must be HH:MM in 24h format, got {0:?}")]
    InvalidTime(String),

    /// Settings or metrics storage failed.
    #[error("storage error: {0}")]
    Database(#[from] DatabaseError),

    /// Delivery queue hand-off failed.
    #[error("queue error: {0}")]
    Queue(#[from] SchedulerError),

    /// Template bank file could not be read.
    #[error("failed to read companion cards: {0}")]
    CardsIo(#[from] std::io::Error),

    /// Template bank file is not valid JSON.
    #[error("failed to parse companion cards: {0}")]
    CardsParse(#[from] serde_json::Error),
}

/// Result type for companion operations.
pub type Result<T> = std::result::Result<T, CompanionError>;
