//! Companion settings storage, one row per chat.

use sqlx::SqlitePool;

use crate::models::UserSettings;
use crate::Result;

/// Get the stored settings for a chat, if any.
pub async fn get_user_settings(pool: &SqlitePool, chat_id: &str) -> Result<Option<UserSettings>> {
    let record = sqlx::query_as::<_, UserSettings>(
        r#"
        SELECT chat_id, companion_level, nudge_frequency, quiet_hours_start, quiet_hours_end,
               last_reflection_at, short_reply_streak, reflections_paused_until,
               last_template_id, last_nudge_at
        FROM user_settings
        WHERE chat_id = ?
        "#,
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Insert or replace the settings for a chat.
///
/// `created_at` is written once and kept across later updates.
pub async fn upsert_user_settings(pool: &SqlitePool, settings: &UserSettings) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_settings (
            chat_id, companion_level, nudge_frequency, quiet_hours_start, quiet_hours_end,
            last_reflection_at, short_reply_streak, reflections_paused_until,
            last_template_id, last_nudge_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(chat_id) DO UPDATE SET
            companion_level = excluded.companion_level,
            nudge_frequency = excluded.nudge_frequency,
            quiet_hours_start = excluded.quiet_hours_start,
            quiet_hours_end = excluded.quiet_hours_end,
            last_reflection_at = excluded.last_reflection_at,
            short_reply_streak = excluded.short_reply_streak,
            reflections_paused_until = excluded.reflections_paused_until,
            last_template_id = excluded.last_template_id,
            last_nudge_at = excluded.last_nudge_at,
            updated_at = datetime('now')
        "#,
    )
    .bind(&settings.chat_id)
    .bind(&settings.companion_level)
    .bind(&settings.nudge_frequency)
    .bind(&settings.quiet_hours_start)
    .bind(&settings.quiet_hours_end)
    .bind(settings.last_reflection_at)
    .bind(settings.short_reply_streak)
    .bind(settings.reflections_paused_until)
    .bind(&settings.last_template_id)
    .bind(settings.last_nudge_at)
    .execute(pool)
    .await?;

    Ok(())
}
