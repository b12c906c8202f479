//! Message sender trait and implementations.

use async_trait::async_trait;

use crate::error::SchedulerError;

/// Trait for delivering a text message to a chat.
///
/// Abstracted to support different transports (Signal, Telegram, tests, etc.)
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message.
    ///
    /// # Arguments
    /// * `recipient` - Chat identifier
    /// * `text` - Message content
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), SchedulerError>;
}

/// A logging message sender that writes every delivery to the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl MessageSender for LoggingSender {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), SchedulerError> {
        tracing::info!("Delivering to {}: {}", recipient, text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_sender() {
        let sender = LoggingSender;

        // Should not error
        sender.send_message("cli_local", "test").await.unwrap();
    }
}
