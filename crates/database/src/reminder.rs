//! Deferred message storage backing the delivery queue.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::Reminder;
use crate::{DatabaseError, Result};

/// Insert a pending reminder and return its id.
pub async fn insert_reminder(
    pool: &SqlitePool,
    chat_id: &str,
    message: &str,
    fire_at: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reminders (chat_id, message, fire_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(chat_id)
    .bind(message)
    .bind(fire_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get a reminder by id.
pub async fn get_reminder(pool: &SqlitePool, id: i64) -> Result<Reminder> {
    sqlx::query_as::<_, Reminder>(
        r#"
        SELECT id, chat_id, message, fire_at, delivered, attempts, delivered_at, created_at
        FROM reminders
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "reminder",
        id: id.to_string(),
    })
}

/// Get undelivered reminders that are due at `now`, oldest first.
///
/// Rows that already used up `max_attempts` are skipped.
pub async fn list_due(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    max_attempts: i64,
    limit: i64,
) -> Result<Vec<Reminder>> {
    let rows = sqlx::query_as::<_, Reminder>(
        r#"
        SELECT id, chat_id, message, fire_at, delivered, attempts, delivered_at, created_at
        FROM reminders
        WHERE delivered = 0
          AND attempts < ?
          AND fire_at <= ?
        ORDER BY fire_at ASC, id ASC
        LIMIT ?
        "#,
    )
    .bind(max_attempts)
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Get undelivered reminders for a chat, soonest first.
pub async fn list_pending(pool: &SqlitePool, chat_id: &str) -> Result<Vec<Reminder>> {
    let rows = sqlx::query_as::<_, Reminder>(
        r#"
        SELECT id, chat_id, message, fire_at, delivered, attempts, delivered_at, created_at
        FROM reminders
        WHERE chat_id = ? AND delivered = 0
        ORDER BY fire_at ASC, id ASC
        "#,
    )
    .bind(chat_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Mark a reminder as delivered.
pub async fn mark_delivered(pool: &SqlitePool, id: i64, delivered_at: DateTime<Utc>) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE reminders
        SET delivered = 1, delivered_at = ?, attempts = attempts + 1
        WHERE id = ?
        "#,
    )
    .bind(delivered_at)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "reminder",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Record a failed delivery attempt and return the new attempt count.
pub async fn record_failed_attempt(pool: &SqlitePool, id: i64) -> Result<i64> {
    let attempts = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE reminders
        SET attempts = attempts + 1
        WHERE id = ?
        RETURNING attempts
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "reminder",
        id: id.to_string(),
    })?;

    Ok(attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::{Duration, TimeZone};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_due_and_delivered() {
        let db = test_db().await;
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        let past = insert_reminder(db.pool(), "chat-1", "drink water", now - Duration::minutes(5))
            .await
            .unwrap();
        insert_reminder(db.pool(), "chat-1", "later", now + Duration::hours(1))
            .await
            .unwrap();

        let due = list_due(db.pool(), now, 3, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, past);
        assert_eq!(due[0].message, "drink water");

        mark_delivered(db.pool(), past, now).await.unwrap();
        assert!(list_due(db.pool(), now, 3, 10).await.unwrap().is_empty());

        let stored = get_reminder(db.pool(), past).await.unwrap();
        assert!(stored.delivered);
        assert_eq!(stored.delivered_at, Some(now));

        let pending = list_pending(db.pool(), "chat-1").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message, "later");
    }

    #[tokio::test]
    async fn test_attempts_exhausted() {
        let db = test_db().await;
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let id = insert_reminder(db.pool(), "chat-1", "ping", now).await.unwrap();

        assert_eq!(record_failed_attempt(db.pool(), id).await.unwrap(), 1);
        assert_eq!(record_failed_attempt(db.pool(), id).await.unwrap(), 2);

        assert_eq!(list_due(db.pool(), now, 3, 10).await.unwrap().len(), 1);
        assert!(list_due(db.pool(), now, 2, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reminder() {
        let db = test_db().await;
        let result = get_reminder(db.pool(), 42).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
        let result = record_failed_attempt(db.pool(), 42).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
