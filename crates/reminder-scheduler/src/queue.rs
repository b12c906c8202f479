//! Deferred delivery queue.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use database::reminder as reminder_store;
use database::Database;
use tracing::{info, warn};

use crate::error::Result;

/// Jobs closer than this are pushed back to [`fallback_delay`].
pub fn min_delay() -> Duration {
    Duration::milliseconds(500)
}

/// Delay applied to jobs that would otherwise fire immediately.
pub fn fallback_delay() -> Duration {
    Duration::seconds(1)
}

/// Accepts messages for delivery at or after a point in time.
///
/// Delivery is at-least-once. Returning `Ok(false)` means the job was
/// rejected and nothing was queued.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Queue `message` for `recipient` to fire at `fire_at`.
    async fn enqueue(&self, recipient: &str, message: &str, fire_at: DateTime<Utc>) -> Result<bool>;
}

/// Clamp a requested fire time so it never lands before the enqueue returns.
pub fn apply_delay_floor(now: DateTime<Utc>, fire_at: DateTime<Utc>) -> DateTime<Utc> {
    let delay = fire_at - now;
    if delay < min_delay() {
        warn!(
            "Reminder scheduled for past/immediate time (delay: {:.2}s), adding {}s buffer",
            delay.num_milliseconds() as f64 / 1000.0,
            fallback_delay().num_seconds()
        );
        return now + fallback_delay();
    }
    fire_at
}

/// SQLite-backed queue; jobs are drained by a [`DeliveryWorker`](crate::DeliveryWorker).
#[derive(Debug, Clone)]
pub struct ReminderQueue {
    database: Database,
}

impl ReminderQueue {
    /// Create a queue on an already migrated database.
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Queue a job using an explicit clock.
    pub async fn enqueue_at(
        &self,
        recipient: &str,
        message: &str,
        fire_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if recipient.trim().is_empty() || message.trim().is_empty() {
            warn!("Rejecting reminder with empty recipient or message");
            return Ok(false);
        }

        let fire_at = apply_delay_floor(now, fire_at);
        let id = reminder_store::insert_reminder(self.database.pool(), recipient, message, fire_at)
            .await?;

        let delay = fire_at - now;
        info!(
            "Scheduled reminder {} for {} (in {:.2}s)",
            id,
            fire_at,
            delay.num_milliseconds() as f64 / 1000.0
        );
        Ok(true)
    }
}

#[async_trait]
impl DeliveryQueue for ReminderQueue {
    async fn enqueue(&self, recipient: &str, message: &str, fire_at: DateTime<Utc>) -> Result<bool> {
        self.enqueue_at(recipient, message, fire_at, Utc::now()).await
    }
}
