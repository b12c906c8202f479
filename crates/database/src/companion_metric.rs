//! Reflection telemetry, append-only.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::CompanionMetric;
use crate::Result;

/// Insert a metric row and return its id.
pub async fn insert_metric(
    pool: &SqlitePool,
    chat_id: &str,
    template_id: Option<&str>,
    shown_at: DateTime<Utc>,
    muted: bool,
    line_count: i64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO companion_metrics (chat_id, template_id, shown_at, muted, line_count)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(chat_id)
    .bind(template_id)
    .bind(shown_at)
    .bind(muted)
    .bind(line_count)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get the most recent metrics for a chat, newest first.
pub async fn list_recent_metrics(
    pool: &SqlitePool,
    chat_id: &str,
    limit: i64,
) -> Result<Vec<CompanionMetric>> {
    let rows = sqlx::query_as::<_, CompanionMetric>(
        r#"
        SELECT id, chat_id, template_id, shown_at, muted, line_count
        FROM companion_metrics
        WHERE chat_id = ?
        ORDER BY shown_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(chat_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
