//! Companion engagement engine.
//!
//! Adds at most one short reflective line to an assistant reply and queues
//! occasional proactive "sparks", both throttled by per-chat settings:
//!
//! - [`CompanionService`] - the entry point for replies, nudges and setters
//! - [`CompanionSettings`] - per-chat levels, quiet hours and throttle state
//! - [`TemplateBank`] - reflection templates, sparks and blind-spot questions
//! - [`SettingsStore`] / [`MetricsStore`] - persistence seams, with SQLite impls
//!
//! ```text
//! user message + base reply
//!         │
//!         ▼
//!   evaluate (guardrails, streak) ──► suppressed: base reply
//!         │
//!   build_reflection (rotation, topic, focus)
//!         │
//!   persist settings, record metric ──► base reply + "\n" + line
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use companion::{CompanionService, TemplateBank};
//!
//! let service = CompanionService::with_database(db, Arc::new(TemplateBank::defaults()));
//! let reply = service
//!     .wrap_reply("cli_local", "I need to plan my gym routine", "Here's a plan.", &[])
//!     .await;
//! let next = service.schedule_next("cli_local").await?;
//! ```

mod config;
mod error;
pub mod nudge;
mod random;
pub mod reflection;
mod service;
mod settings;
mod store;
pub mod templates;

pub use config::{CompanionConfig, DEFAULT_CARDS_PATH};
pub use error::{CompanionError, Result};
pub use random::{choose, RandomSource, SequenceRandom, ThreadRandom};
pub use reflection::{ConversationTurn, Decision, Reflection, Suppression};
pub use service::CompanionService;
pub use settings::{
    parse_hhmm, CompanionLevel, CompanionSettings, NudgeFrequency, QuietHours,
    DEFAULT_QUIET_HOURS_END, DEFAULT_QUIET_HOURS_START,
};
pub use store::{CompanionMetric, MetricsStore, SettingsStore, SqliteCompanionStore};
pub use templates::{ReflectionTemplate, TemplateBank, TopicCards};
