//! Settings and metrics storage seams.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::companion_metric as metric_store;
use database::user_settings as settings_store;
use database::Database;

use crate::error::Result;
use crate::settings::CompanionSettings;

/// One shown reflection, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionMetric {
    pub chat_id: String,
    pub template_id: Option<String>,
    pub shown_at: DateTime<Utc>,
    pub muted: bool,
    pub line_count: u32,
}

/// Durable per-chat settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored settings, or defaults if the chat has none yet.
    async fn get(&self, chat_id: &str) -> Result<CompanionSettings>;

    /// Insert or replace the settings row.
    async fn upsert(&self, settings: &CompanionSettings) -> Result<()>;
}

/// Append-only reflection log.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn append(&self, metric: &CompanionMetric) -> Result<i64>;

    /// Most recent first.
    async fn list_recent(&self, chat_id: &str, limit: usize) -> Result<Vec<CompanionMetric>>;
}

/// SQLite implementation of both stores.
#[derive(Debug, Clone)]
pub struct SqliteCompanionStore {
    database: Database,
}

impl SqliteCompanionStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl SettingsStore for SqliteCompanionStore {
    async fn get(&self, chat_id: &str) -> Result<CompanionSettings> {
        let record = settings_store::get_user_settings(self.database.pool(), chat_id).await?;
        Ok(record
            .map(CompanionSettings::from_record)
            .unwrap_or_else(|| CompanionSettings::new(chat_id)))
    }

    async fn upsert(&self, settings: &CompanionSettings) -> Result<()> {
        settings_store::upsert_user_settings(self.database.pool(), &settings.to_record()).await?;
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for SqliteCompanionStore {
    async fn append(&self, metric: &CompanionMetric) -> Result<i64> {
        let id = metric_store::insert_metric(
            self.database.pool(),
            &metric.chat_id,
            metric.template_id.as_deref(),
            metric.shown_at,
            metric.muted,
            i64::from(metric.line_count),
        )
        .await?;
        Ok(id)
    }

    async fn list_recent(&self, chat_id: &str, limit: usize) -> Result<Vec<CompanionMetric>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = metric_store::list_recent_metrics(self.database.pool(), chat_id, limit).await?;
        Ok(rows
            .into_iter()
            .map(|row| CompanionMetric {
                chat_id: row.chat_id,
                template_id: row.template_id,
                shown_at: row.shown_at,
                muted: row.muted,
                line_count: u32::try_from(row.line_count.max(0)).unwrap_or(u32::MAX),
            })
            .collect())
    }
}
