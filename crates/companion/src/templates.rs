//! Template bank: reflection templates, sparks and blind-spot questions.
//!
//! The bank is loaded once from an optional JSON file:
//!
//! ```json
//! {
//!   "templates": [{"id": "focus", "summary": "...", "question": "...", "stretch": "..."}],
//!   "sparks": {"work": ["..."]},
//!   "blindspots": {"work": ["..."]}
//! }
//! ```
//!
//! Each top-level key falls back to the built-in set on its own when it is
//! missing, empty or malformed.

use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::random::{choose, RandomSource};

/// Topic name to an ordered list of strings.
pub type TopicCards = IndexMap<String, Vec<String>>;

/// A reflection template. Lines may use `{topic}` and `{focus}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionTemplate {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub stretch: String,
}

impl ReflectionTemplate {
    fn builtin(id: &str, summary: &str, question: &str, stretch: &str) -> Self {
        Self {
            id: id.to_string(),
            summary: summary.to_string(),
            question: question.to_string(),
            stretch: stretch.to_string(),
        }
    }
}

/// Built-in reflection templates, in rotation order.
pub fn default_templates() -> Vec<ReflectionTemplate> {
    vec![
        ReflectionTemplate::builtin(
            "focus",
            "You're homing in on {focus}.",
            "What would move {topic} forward today?",
            "Try writing the smallest next step for {topic}.",
        ),
        ReflectionTemplate::builtin(
            "tension",
            "I hear tension around {focus}.",
            "What constraint is shaping this for you?",
            "Explore one assumption you could test fast.",
        ),
        ReflectionTemplate::builtin(
            "momentum",
            "Momentum shows up in how you describe {focus}.",
            "Where do you already have leverage here?",
            "Name a quick win worth locking in this week.",
        ),
    ]
}

fn cards(entries: &[(&str, &[&str])]) -> TopicCards {
    entries
        .iter()
        .map(|(topic, lines)| {
            (
                topic.to_string(),
                lines.iter().map(|line| line.to_string()).collect(),
            )
        })
        .collect()
}

/// Built-in sparks by topic.
pub fn default_sparks() -> TopicCards {
    cards(&[
        (
            "life",
            &[
                "Write a two-sentence win log at night; patterns emerge fast.",
                "Call the person you've been meaning to thank for months.",
                "List the three conversations that energized you last week.",
            ],
        ),
        (
            "work",
            &[
                "Block 90 minutes for deep work before noon and guard it.",
                "Draft a one-page brief for your toughest project; clarity beats speed.",
                "Pick the decision that is stuck and list two facts you still need.",
            ],
        ),
        (
            "health",
            &[
                "Walk while taking your next call to freshen the loop.",
                "Drink water before coffee tomorrow and note if anything shifts.",
                "Stretch your back for 90 seconds between sessions today.",
            ],
        ),
        (
            "finance",
            &[
                "Review the last three discretionary purchases for glow vs. meh.",
                "Check fees on one recurring subscription and renegotiate or cut.",
                "Write a sentence on how you want next month's money to feel.",
            ],
        ),
    ])
}

/// Built-in blind-spot questions by topic.
pub fn default_blindspots() -> TopicCards {
    cards(&[
        (
            "life",
            &[
                "What would you postpone if focus dropped tomorrow?",
                "Which relationship do you want to steward more actively?",
            ],
        ),
        (
            "work",
            &[
                "Where are decisions waiting for you to choose?",
                "What does success look like for stakeholders this month?",
            ],
        ),
        (
            "health",
            &[
                "Did sleep or movement drive yesterday's energy?",
                "What recovery practice is missing this week?",
            ],
        ),
        (
            "finance",
            &[
                "How would a surprise expense hit your cash flow?",
                "What's the plan if income dips 15% for a quarter?",
            ],
        ),
    ])
}

/// Immutable set of companion cards, shared read-only for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBank {
    templates: Vec<ReflectionTemplate>,
    sparks: TopicCards,
    blindspots: TopicCards,
}

impl Default for TemplateBank {
    fn default() -> Self {
        Self::defaults()
    }
}

impl TemplateBank {
    /// The built-in bank.
    pub fn defaults() -> Self {
        Self {
            templates: default_templates(),
            sparks: default_sparks(),
            blindspots: default_blindspots(),
        }
    }

    /// Build a bank, replacing any empty collection with its default.
    pub fn new(templates: Vec<ReflectionTemplate>, sparks: TopicCards, blindspots: TopicCards) -> Self {
        Self {
            templates: if templates.is_empty() { default_templates() } else { templates },
            sparks: if sparks.is_empty() { default_sparks() } else { sparks },
            blindspots: if blindspots.is_empty() { default_blindspots() } else { blindspots },
        }
    }

    /// Load the bank from a cards file, falling back to defaults on any problem.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!(
                "Companion cards file missing at {}, using defaults",
                path.display()
            );
            return Self::defaults();
        }

        match Self::try_load(path) {
            Ok(bank) => bank,
            Err(err) => {
                error!("Failed to load companion cards: {}", err);
                Self::defaults()
            }
        }
    }

    /// Read and parse a cards file.
    ///
    /// Unreadable files and invalid JSON are errors; malformed sections are
    /// logged and replaced by defaults.
    pub fn try_load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)?;
        let bank = Self::from_value(&value);
        info!(
            "Companion cards loaded: {} templates, {} spark topics",
            bank.templates.len(),
            bank.sparks.len()
        );
        Ok(bank)
    }

    /// Parse cards from JSON text, falling back to defaults on invalid JSON.
    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                error!("Failed to parse companion cards: {}", err);
                Self::defaults()
            }
        }
    }

    fn from_value(value: &Value) -> Self {
        Self::new(
            section(value, "templates").unwrap_or_default(),
            section(value, "sparks").unwrap_or_default(),
            section(value, "blindspots").unwrap_or_default(),
        )
    }

    pub fn templates(&self) -> &[ReflectionTemplate] {
        &self.templates
    }

    pub fn sparks(&self) -> &TopicCards {
        &self.sparks
    }

    pub fn blindspots(&self) -> &TopicCards {
        &self.blindspots
    }

    /// Template that follows `last_template_id` in rotation order.
    ///
    /// Starts from the first template when the id is absent or unknown.
    pub fn next_template(&self, last_template_id: Option<&str>) -> Option<&ReflectionTemplate> {
        let first = self.templates.first()?;
        let Some(last) = last_template_id.filter(|id| !id.is_empty()) else {
            return Some(first);
        };

        match self.templates.iter().position(|template| template.id == last) {
            Some(index) => self.templates.get((index + 1) % self.templates.len()),
            None => Some(first),
        }
    }

    /// A random spark from a random topic.
    pub fn pick_spark(&self, random: &dyn RandomSource) -> Option<&str> {
        pick_card(&self.sparks, random)
    }

    /// A random blind-spot question for `topic`.
    pub fn blindspot(&self, topic: &str, random: &dyn RandomSource) -> Option<&str> {
        let questions = self.blindspots.get(topic)?;
        choose(random, questions).map(String::as_str)
    }
}

fn pick_card<'a>(cards: &'a TopicCards, random: &dyn RandomSource) -> Option<&'a str> {
    if cards.is_empty() {
        return None;
    }
    let (_, lines) = cards.get_index(random.pick_index(cards.len()))?;
    choose(random, lines).map(String::as_str)
}

fn section<T: DeserializeOwned>(value: &Value, key: &str) -> Option<T> {
    let raw = value.get(key)?;
    match serde_json::from_value(raw.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            error!("Malformed {} section in companion cards, using defaults: {}", key, err);
            None
        }
    }
}
