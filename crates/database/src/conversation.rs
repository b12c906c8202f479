//! Conversation history persistence.

use sqlx::SqlitePool;

use crate::models::ConversationExchange;
use crate::Result;

/// Store one user/assistant exchange.
pub async fn store_exchange(
    pool: &SqlitePool,
    chat_id: &str,
    user_message: &str,
    agent_response: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversations (chat_id, user_message, agent_response)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(chat_id)
    .bind(user_message)
    .bind(agent_response)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get the latest exchanges for a chat in chronological order.
pub async fn recent_exchanges(
    pool: &SqlitePool,
    chat_id: &str,
    limit: i64,
) -> Result<Vec<ConversationExchange>> {
    let mut rows = sqlx::query_as::<_, ConversationExchange>(
        r#"
        SELECT id, chat_id, user_message, agent_response, created_at
        FROM conversations
        WHERE chat_id = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(chat_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.reverse();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_recent_exchanges_chronological() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();

        for n in 1..=4 {
            store_exchange(db.pool(), "chat-1", &format!("q{n}"), &format!("a{n}"))
                .await
                .unwrap();
        }
        store_exchange(db.pool(), "chat-2", "other", "reply")
            .await
            .unwrap();

        let rows = recent_exchanges(db.pool(), "chat-1", 3).await.unwrap();
        let users: Vec<&str> = rows.iter().map(|row| row.user_message.as_str()).collect();
        assert_eq!(users, vec!["q2", "q3", "q4"]);
        assert_eq!(rows[2].agent_response, "a4");
    }
}
