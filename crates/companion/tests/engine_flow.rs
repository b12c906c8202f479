//! End-to-end flows over SQLite: reflections, stored settings and spark delivery.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use companion::{
    CompanionConfig, CompanionService, ConversationTurn, SequenceRandom, TemplateBank,
};
use database::{conversation, Database};
use reminder_scheduler::{DeliveryWorker, MessageSender, SchedulerError, WorkerConfig};
use tokio::sync::Mutex;

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), SchedulerError> {
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

async fn test_db() -> Database {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    db
}

fn service(db: &Database, random: Vec<usize>) -> CompanionService {
    CompanionService::with_database(db.clone(), Arc::new(TemplateBank::defaults()))
        .with_random(Arc::new(SequenceRandom::new(random)))
}

#[tokio::test]
async fn test_reflection_with_stored_history() {
    let db = test_db().await;
    let service = service(&db, vec![0]);

    conversation::store_exchange(db.pool(), "chat-1", "budget review tonight please", "Sure.")
        .await
        .unwrap();
    let recent: Vec<ConversationTurn> = conversation::recent_exchanges(db.pool(), "chat-1", 5)
        .await
        .unwrap()
        .into_iter()
        .map(ConversationTurn::from)
        .collect();

    // Same text as the last stored user message: suppressed.
    let reply = service
        .wrap_reply("chat-1", "Budget review tonight please", "On it.", &recent)
        .await;
    assert_eq!(reply, "On it.");

    let reply = service
        .wrap_reply("chat-1", "now I want to cut my monthly spend", "Here are ideas.", &recent)
        .await;
    assert_eq!(reply, "Here are ideas.\nWhat would move finance forward today?");

    let settings = service.settings("chat-1").await.unwrap();
    assert_eq!(settings.last_template_id.as_deref(), Some("focus"));
    let metrics = service.recent_metrics("chat-1", 10).await.unwrap();
    assert_eq!(metrics.len(), 1);
}

#[tokio::test]
async fn test_spark_is_delivered_once_due() {
    let db = test_db().await;
    let service = service(&db, vec![3, 2]);
    let now = Utc::now();

    let fire_at = service
        .schedule_next_at("chat-1", now)
        .await
        .unwrap()
        .expect("nudge scheduled");
    assert!(fire_at > now + Duration::days(6));
    assert_eq!(service.schedule_next_at("chat-1", now).await.unwrap(), Some(fire_at));

    let sender = Arc::new(RecordingSender::default());
    let worker = DeliveryWorker::new(db.clone(), sender.clone(), WorkerConfig::default());

    assert_eq!(worker.run_once(now).await.unwrap(), 0);
    assert_eq!(worker.run_once(fire_at).await.unwrap(), 1);
    assert_eq!(worker.run_once(fire_at).await.unwrap(), 0);

    let sent = sender.sent.lock().await;
    assert_eq!(
        sent.as_slice(),
        &[(
            "chat-1".to_string(),
            "Spark: Write a sentence on how you want next month's money to feel. Reply stop to mute."
                .to_string()
        )]
    );
}

#[tokio::test]
async fn test_disabled_configuration() {
    let db = test_db().await;
    let config = CompanionConfig::default().with_enabled(false);
    let service = CompanionService::from_config(db.clone(), &config);

    assert!(!service.is_enabled());
    let reply = service
        .wrap_reply("chat-1", "I need to plan my gym routine for next week", "Plan.", &[])
        .await;
    assert_eq!(reply, "Plan.");
    assert_eq!(service.schedule_next("chat-1").await.unwrap(), None);
}
