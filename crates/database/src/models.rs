//! Database models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored companion settings for a chat.
///
/// Level and frequency are kept as their textual form; parsing into typed
/// values happens in the companion crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSettings {
    /// Chat identifier (Signal UUID, Telegram chat id, `cli_local`, ...).
    pub chat_id: String,
    /// Companion intensity (`off`, `light`, `standard`).
    pub companion_level: String,
    /// Proactive outreach cadence (`off`, `weekly`, `standard`).
    pub nudge_frequency: String,
    /// Quiet window start, `HH:MM`.
    pub quiet_hours_start: String,
    /// Quiet window end, `HH:MM`.
    pub quiet_hours_end: String,
    /// When the last reflection was shown.
    pub last_reflection_at: Option<DateTime<Utc>>,
    /// Consecutive short user messages.
    pub short_reply_streak: i64,
    /// Reflections are suppressed until this time.
    pub reflections_paused_until: Option<DateTime<Utc>>,
    /// Template used by the last reflection.
    pub last_template_id: Option<String>,
    /// Fire time of the most recently scheduled nudge.
    pub last_nudge_at: Option<DateTime<Utc>>,
}

/// One shown reflection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CompanionMetric {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Chat the reflection was shown in.
    pub chat_id: String,
    /// Template the line was rendered from.
    pub template_id: Option<String>,
    /// When the reflection was shown.
    pub shown_at: DateTime<Utc>,
    /// Whether the user muted the companion in response.
    pub muted: bool,
    /// Number of reflective lines appended.
    pub line_count: i64,
}

/// A stored user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConversationExchange {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Chat identifier.
    pub chat_id: String,
    /// What the user wrote.
    pub user_message: String,
    /// What the assistant answered.
    pub agent_response: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// A deferred outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Recipient chat identifier.
    pub chat_id: String,
    /// Message text to deliver.
    pub message: String,
    /// Earliest delivery time.
    pub fire_at: DateTime<Utc>,
    /// Whether delivery succeeded.
    pub delivered: bool,
    /// Delivery attempts made so far.
    pub attempts: i64,
    /// When delivery succeeded.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: String,
}
