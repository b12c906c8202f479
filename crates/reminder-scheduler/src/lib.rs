//! Deferred message delivery for the companion assistant.
//!
//! Reminders and companion nudges share one durable queue:
//!
//! - [`DeliveryQueue`] - the hand-off trait used by callers
//! - [`ReminderQueue`] - SQLite-backed implementation
//! - [`DeliveryWorker`] - polls due rows and sends them through a [`MessageSender`]
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use reminder_scheduler::{DeliveryQueue, DeliveryWorker, LoggingSender, ReminderQueue, WorkerConfig};
//!
//! let queue = ReminderQueue::new(db.clone());
//! queue.enqueue("cli_local", "Stretch!", chrono::Utc::now() + chrono::Duration::minutes(5)).await?;
//!
//! let mut worker = DeliveryWorker::new(db, Arc::new(LoggingSender), WorkerConfig::from_env()?);
//! worker.start();
//! // ...
//! worker.stop().await;
//! ```

mod config;
mod error;
mod queue;
mod sender;
mod worker;

pub use config::WorkerConfig;
pub use error::{Result, SchedulerError};
pub use queue::{apply_delay_floor, fallback_delay, min_delay, DeliveryQueue, ReminderQueue};
pub use sender::{LoggingSender, MessageSender};
pub use worker::DeliveryWorker;

// Re-export async_trait for implementors
pub use async_trait::async_trait;
