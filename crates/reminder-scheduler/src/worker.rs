//! Background worker that delivers due reminders.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use database::reminder as reminder_store;
use database::{Database, Reminder};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::Result;
use crate::sender::MessageSender;

struct WorkerInner {
    database: Database,
    sender: Arc<dyn MessageSender>,
    config: WorkerConfig,
}

impl WorkerInner {
    async fn deliver_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = reminder_store::list_due(
            self.database.pool(),
            now,
            i64::from(self.config.max_attempts),
            i64::from(self.config.batch_size),
        )
        .await?;

        if !due.is_empty() {
            debug!("Found {} due reminders", due.len());
        }

        let mut delivered = 0;
        for reminder in due {
            if self.deliver(&reminder).await? {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    async fn deliver(&self, reminder: &Reminder) -> Result<bool> {
        info!(
            "Processing reminder {} for chat {}: {}",
            reminder.id, reminder.chat_id, reminder.message
        );

        match self
            .sender
            .send_message(&reminder.chat_id, &reminder.message)
            .await
        {
            Ok(()) => {
                reminder_store::mark_delivered(self.database.pool(), reminder.id, Utc::now())
                    .await?;
                info!("Reminder {} delivered", reminder.id);
                Ok(true)
            }
            Err(err) => {
                let attempts =
                    reminder_store::record_failed_attempt(self.database.pool(), reminder.id)
                        .await?;
                if attempts >= i64::from(self.config.max_attempts) {
                    error!(
                        "Giving up on reminder {} after {} attempts: {}",
                        reminder.id, attempts, err
                    );
                } else {
                    warn!(
                        "Failed to deliver reminder {} (attempt {}): {}",
                        reminder.id, attempts, err
                    );
                }
                Ok(false)
            }
        }
    }
}

/// Polls the reminder table and hands due jobs to a [`MessageSender`].
///
/// The worker owns its task; call [`start`](Self::start) at process start and
/// [`stop`](Self::stop) before shutdown. Undelivered rows from a previous run
/// are picked up on the first poll.
pub struct DeliveryWorker {
    inner: Arc<WorkerInner>,
    handle: Option<JoinHandle<()>>,
    stop: Option<watch::Sender<bool>>,
}

impl DeliveryWorker {
    /// Create a stopped worker.
    pub fn new(database: Database, sender: Arc<dyn MessageSender>, config: WorkerConfig) -> Self {
        Self {
            inner: Arc::new(WorkerInner {
                database,
                sender,
                config,
            }),
            handle: None,
            stop: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop.is_some()
    }

    /// Spawn the polling loop. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if self.stop.is_some() {
            return;
        }
        let (tx, mut rx) = watch::channel(false);
        self.stop = Some(tx);

        let inner = Arc::clone(&self.inner);
        let mut tick = tokio::time::interval(inner.config.poll_interval);
        info!(
            "Starting reminder delivery worker (poll every {:?})",
            inner.config.poll_interval
        );

        self.handle = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        if let Err(err) = inner.deliver_due(Utc::now()).await {
                            error!("Reminder poll failed: {}", err);
                        }
                    }
                    changed = rx.changed() => {
                        // A dropped sender means the worker handle is gone.
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Reminder delivery worker stopped");
        }));
    }

    /// Signal the loop to exit and wait for it.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Deliver everything due at `now` once, returning the number delivered.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize> {
        self.inner.deliver_due(now).await
    }
}

impl Drop for DeliveryWorker {
    fn drop(&mut self) {
        if let Some(tx) = self.stop.take() {
            debug!("Delivery worker dropped without stop, signalling loop");
            let _ = tx.send(true);
        }
    }
}
