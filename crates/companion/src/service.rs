//! Companion service: reflections, nudges and the user-facing setters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use database::Database;
use reminder_scheduler::{DeliveryQueue, ReminderQueue};
use tracing::{debug, info, warn};

use crate::config::CompanionConfig;
use crate::error::Result;
use crate::nudge::{next_nudge_time, nudge_interval, render_spark_message};
use crate::random::{RandomSource, ThreadRandom};
use crate::reflection::{self, merge_reply, ConversationTurn, Decision, Suppression};
use crate::settings::{parse_hhmm, CompanionLevel, CompanionSettings, NudgeFrequency};
use crate::store::{CompanionMetric, MetricsStore, SettingsStore, SqliteCompanionStore};
use crate::templates::TemplateBank;

/// Decides when to add a reflective line and when to queue a spark.
///
/// All collaborators are injected; the service itself holds no per-chat
/// state. Concurrent calls for the same chat are last-writer-wins on the
/// settings row.
pub struct CompanionService {
    settings: Arc<dyn SettingsStore>,
    metrics: Arc<dyn MetricsStore>,
    queue: Arc<dyn DeliveryQueue>,
    bank: Arc<TemplateBank>,
    random: Arc<dyn RandomSource>,
    enabled: bool,
}

impl CompanionService {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        metrics: Arc<dyn MetricsStore>,
        queue: Arc<dyn DeliveryQueue>,
        bank: Arc<TemplateBank>,
    ) -> Self {
        Self {
            settings,
            metrics,
            queue,
            bank,
            random: Arc::new(ThreadRandom),
            enabled: true,
        }
    }

    /// Wire the service to SQLite-backed stores and the reminder queue.
    pub fn with_database(database: Database, bank: Arc<TemplateBank>) -> Self {
        let store = Arc::new(SqliteCompanionStore::new(database.clone()));
        let queue = Arc::new(ReminderQueue::new(database));
        Self::new(store.clone(), store, queue, bank)
    }

    /// Build from configuration, loading the template bank once.
    pub fn from_config(database: Database, config: &CompanionConfig) -> Self {
        let bank = if config.enabled {
            TemplateBank::load(&config.cards_path)
        } else {
            info!("Companion mode disabled via configuration");
            TemplateBank::defaults()
        };
        Self::with_database(database, Arc::new(bank)).with_enabled(config.enabled)
    }

    /// Builder method to replace the random source.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Builder method to set the process-wide switch.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current settings for a chat (defaults if none are stored).
    pub async fn settings(&self, chat_id: &str) -> Result<CompanionSettings> {
        self.settings.get(chat_id).await
    }

    /// Return `base_reply`, possibly with one reflective line appended.
    pub async fn consider(
        &self,
        chat_id: &str,
        user_message: &str,
        base_reply: &str,
        recent: &[ConversationTurn],
    ) -> Result<String> {
        self.consider_at(chat_id, user_message, base_reply, recent, Utc::now())
            .await
    }

    /// [`consider`](Self::consider) with an explicit clock.
    pub async fn consider_at(
        &self,
        chat_id: &str,
        user_message: &str,
        base_reply: &str,
        recent: &[ConversationTurn],
        now: DateTime<Utc>,
    ) -> Result<String> {
        if !self.enabled {
            return Ok(base_reply.to_string());
        }

        let mut settings = self.settings.get(chat_id).await?;
        if !settings.companion_level.is_enabled() {
            return Ok(base_reply.to_string());
        }

        if let Decision::Suppress(reason) =
            reflection::evaluate(&mut settings, user_message, recent, now)
        {
            return self.suppress(&settings, base_reply, reason).await;
        }

        let Some(line) =
            reflection::build_reflection(&self.bank, &settings, user_message, self.random.as_ref())
        else {
            return self
                .suppress(&settings, base_reply, Suppression::NoCandidates)
                .await;
        };

        let composed = merge_reply(base_reply, &line.text);
        // The streak is left alone here; resetting it on every shown line
        // would keep three short replies in a row from ever pausing.
        settings.last_reflection_at = Some(now);
        settings.last_template_id = Some(line.template_id.clone());
        settings.reflections_paused_until = None;
        self.settings.upsert(&settings).await?;

        let metric = CompanionMetric {
            chat_id: chat_id.to_string(),
            template_id: Some(line.template_id),
            shown_at: now,
            muted: false,
            line_count: line.line_count,
        };
        if let Err(err) = self.metrics.append(&metric).await {
            warn!("Failed to record companion metric: {}", err);
        }

        Ok(composed)
    }

    async fn suppress(
        &self,
        settings: &CompanionSettings,
        base_reply: &str,
        reason: Suppression,
    ) -> Result<String> {
        debug!("Companion skip for {}: {:?}", settings.chat_id, reason);
        self.settings.upsert(settings).await?;
        Ok(base_reply.to_string())
    }

    /// Like [`consider`](Self::consider), but any failure yields `base_reply`.
    pub async fn wrap_reply(
        &self,
        chat_id: &str,
        user_message: &str,
        base_reply: &str,
        recent: &[ConversationTurn],
    ) -> String {
        match self.consider(chat_id, user_message, base_reply, recent).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("Companion reflection failed for {}: {}", chat_id, err);
                base_reply.to_string()
            }
        }
    }

    /// Queue the next spark for a chat and return its fire time.
    pub async fn schedule_next(&self, chat_id: &str) -> Result<Option<DateTime<Utc>>> {
        self.schedule_next_at(chat_id, Utc::now()).await
    }

    /// [`schedule_next`](Self::schedule_next) with an explicit clock.
    ///
    /// A nudge already queued for the future is returned as is.
    pub async fn schedule_next_at(
        &self,
        chat_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        if !self.enabled {
            return Ok(None);
        }

        let mut settings = self.settings.get(chat_id).await?;
        if !settings.companion_level.is_enabled() {
            return Ok(None);
        }
        let Some(interval) = nudge_interval(settings.nudge_frequency) else {
            return Ok(None);
        };

        if let Some(pending) = settings.last_nudge_at.filter(|at| *at > now) {
            debug!("Nudge for {} already queued for {}", chat_id, pending);
            return Ok(Some(pending));
        }

        let quiet = settings.quiet_hours()?;
        let fire_at = next_nudge_time(interval, &quiet, now);

        let Some(spark) = self.bank.pick_spark(self.random.as_ref()) else {
            warn!("No sparks configured, skipping nudge for {}", chat_id);
            return Ok(None);
        };
        let message = render_spark_message(spark);

        if !self.queue.enqueue(chat_id, &message, fire_at).await? {
            warn!("Delivery queue rejected nudge for {}", chat_id);
            return Ok(None);
        }

        settings.last_nudge_at = Some(fire_at);
        self.settings.upsert(&settings).await?;
        info!("Next spark for {} queued for {}", chat_id, fire_at);

        Ok(Some(fire_at))
    }

    /// Set the companion level (`off|light|standard`).
    pub async fn set_companion_level(&self, chat_id: &str, level: &str) -> Result<CompanionSettings> {
        let level: CompanionLevel = level.parse()?;
        let mut settings = self.settings.get(chat_id).await?;
        settings.companion_level = level;
        self.settings.upsert(&settings).await?;
        Ok(settings)
    }

    /// Set the quiet window; both bounds must be `HH:MM`.
    pub async fn set_quiet_hours(
        &self,
        chat_id: &str,
        start: &str,
        end: &str,
    ) -> Result<CompanionSettings> {
        parse_hhmm(start)?;
        parse_hhmm(end)?;
        let mut settings = self.settings.get(chat_id).await?;
        settings.quiet_hours_start = start.to_string();
        settings.quiet_hours_end = end.to_string();
        self.settings.upsert(&settings).await?;
        Ok(settings)
    }

    /// Set the nudge cadence (`off|weekly|standard`, `on` means weekly).
    pub async fn set_nudge_frequency(
        &self,
        chat_id: &str,
        frequency: &str,
    ) -> Result<CompanionSettings> {
        let frequency = NudgeFrequency::from_user_input(frequency)?;
        let mut settings = self.settings.get(chat_id).await?;
        settings.nudge_frequency = frequency;
        self.settings.upsert(&settings).await?;
        Ok(settings)
    }

    /// Most recent reflections shown to a chat.
    pub async fn recent_metrics(&self, chat_id: &str, limit: usize) -> Result<Vec<CompanionMetric>> {
        self.metrics.list_recent(chat_id, limit).await
    }

    /// A random blind-spot question for `topic`.
    pub fn blindspot(&self, topic: &str) -> Option<&str> {
        self.bank.blindspot(topic, self.random.as_ref())
    }
}
