//! Reflection decision logic.
//!
//! Everything here is pure: the service reads settings, calls
//! [`evaluate`] and [`build_reflection`], then persists the result.

use chrono::{DateTime, Duration, Utc};
use database::ConversationExchange;

use crate::random::{choose, RandomSource};
use crate::settings::CompanionSettings;
use crate::templates::TemplateBank;

/// Tokens that silence the companion for the current message.
pub const STOP_WORDS: [&str; 3] = ["stop", "mute", "quiet"];

/// Messages with fewer tokens than this count as short.
pub const SHORT_REPLY_TOKENS: usize = 5;

/// Consecutive short messages that trigger the fatigue pause.
pub const SHORT_REPLY_STREAK_LIMIT: u32 = 3;

/// Longest focus string, ellipsis included.
pub const FOCUS_MAX_CHARS: usize = 64;

/// Word cap for a rendered line.
pub const LINE_MAX_WORDS: usize = 30;

/// Topic used when no keyword matches.
pub const DEFAULT_TOPIC: &str = "life";

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "health",
        &["sleep", "run", "gym", "diet", "protein", "fast", "steps", "walk"],
    ),
    (
        "finance",
        &["budget", "money", "cash", "invest", "spend", "savings", "debt", "tax"],
    ),
    (
        "work",
        &["deploy", "client", "meeting", "deadline", "project", "team", "code", "launch"],
    ),
];

const TOKEN_PUNCTUATION: &[char] = &[',', '.', '?', '!'];

/// How long reflections stay off after the streak limit is hit.
pub fn fatigue_pause() -> Duration {
    Duration::hours(24)
}

/// One earlier user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub user_message: String,
    pub assistant_reply: String,
}

impl ConversationTurn {
    pub fn new(user_message: impl Into<String>, assistant_reply: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            assistant_reply: assistant_reply.into(),
        }
    }
}

impl From<ConversationExchange> for ConversationTurn {
    fn from(exchange: ConversationExchange) -> Self {
        Self {
            user_message: exchange.user_message,
            assistant_reply: exchange.agent_response,
        }
    }
}

/// Why a message got no reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    EmptyMessage,
    StopWord,
    Paused(DateTime<Utc>),
    RepeatedMessage,
    /// The streak limit was reached on this message.
    FatiguePause(DateTime<Utc>),
    NoCandidates,
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Reflect,
    Suppress(Suppression),
}

/// A rendered reflective line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reflection {
    pub text: String,
    pub template_id: String,
    pub line_count: u32,
}

/// Apply the guardrails and the engagement throttle to `settings`.
///
/// Only the streak path mutates: stop words, pauses and repeats leave the
/// settings untouched.
pub fn evaluate(
    settings: &mut CompanionSettings,
    user_message: &str,
    recent: &[ConversationTurn],
    now: DateTime<Utc>,
) -> Decision {
    let normalized = user_message.trim().to_lowercase();
    if normalized.is_empty() {
        return Decision::Suppress(Suppression::EmptyMessage);
    }

    if contains_stop_word(&normalized) {
        return Decision::Suppress(Suppression::StopWord);
    }

    if let Some(until) = settings.paused_until(now) {
        return Decision::Suppress(Suppression::Paused(until));
    }

    if let Some(previous) = recent.last() {
        let previous = previous.user_message.trim().to_lowercase();
        if !previous.is_empty() && previous == normalized {
            return Decision::Suppress(Suppression::RepeatedMessage);
        }
    }

    if is_short(&normalized) {
        settings.short_reply_streak = settings.short_reply_streak.saturating_add(1);
    } else {
        settings.short_reply_streak = 0;
    }

    if settings.short_reply_streak >= SHORT_REPLY_STREAK_LIMIT {
        let until = now + fatigue_pause();
        settings.reflections_paused_until = Some(until);
        settings.short_reply_streak = 0;
        return Decision::Suppress(Suppression::FatiguePause(until));
    }

    Decision::Reflect
}

/// Render the next template for `user_message` and pick one line.
pub fn build_reflection(
    bank: &TemplateBank,
    settings: &CompanionSettings,
    user_message: &str,
    random: &dyn RandomSource,
) -> Option<Reflection> {
    let template = bank.next_template(settings.last_template_id.as_deref())?;
    let topic = infer_topic(user_message);
    let focus = focus(user_message);

    let candidates: Vec<String> = [&template.question, &template.stretch]
        .into_iter()
        .map(|line| format_line(line, topic, &focus))
        .filter(|line| !line.trim().is_empty())
        .collect();

    let text = choose(random, &candidates)?.clone();
    Some(Reflection {
        text,
        template_id: template.id.clone(),
        line_count: 1,
    })
}

/// Whether any token, stripped of `,.?!`, is a stop word.
pub fn contains_stop_word(normalized: &str) -> bool {
    normalized
        .split_whitespace()
        .map(|token| token.trim_matches(TOKEN_PUNCTUATION))
        .any(|token| STOP_WORDS.contains(&token))
}

pub fn is_short(message: &str) -> bool {
    message.split_whitespace().count() < SHORT_REPLY_TOKENS
}

/// First topic whose keyword appears in the message.
pub fn infer_topic(user_message: &str) -> &'static str {
    let text = user_message.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(topic, _)| *topic)
        .unwrap_or(DEFAULT_TOPIC)
}

/// The message collapsed to single spaces and cut to [`FOCUS_MAX_CHARS`].
pub fn focus(user_message: &str) -> String {
    let clean = user_message.split_whitespace().collect::<Vec<_>>().join(" ");
    if clean.chars().count() <= FOCUS_MAX_CHARS {
        return clean;
    }
    let mut cut: String = clean.chars().take(FOCUS_MAX_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

/// Substitute placeholders and cap the line length.
pub fn format_line(template: &str, topic: &str, focus: &str) -> String {
    if template.is_empty() {
        return String::new();
    }
    let text = template.replace("{topic}", topic).replace("{focus}", focus);
    trim_line(&text)
}

/// Keep at most [`LINE_MAX_WORDS`] words.
pub fn trim_line(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= LINE_MAX_WORDS {
        return text.to_string();
    }
    words[..LINE_MAX_WORDS].join(" ")
}

/// Append the reflection below the assistant's reply.
pub fn merge_reply(base_reply: &str, line: &str) -> String {
    let base = base_reply.trim_end();
    if base.is_empty() {
        return line.to_string();
    }
    format!("{}\n{}", base, line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_stop_words() {
        assert!(contains_stop_word("stop"));
        assert!(contains_stop_word("please stop!"));
        assert!(contains_stop_word("ok, quiet."));
        assert!(contains_stop_word("...mute?"));
        assert!(!contains_stop_word("unstoppable momentum"));
        assert!(!contains_stop_word("stopwatch"));
    }

    #[test]
    fn test_short_messages() {
        assert!(is_short("ok thanks"));
        assert!(is_short("one two three four"));
        assert!(!is_short("one two three four five"));
    }

    #[test]
    fn test_infer_topic() {
        assert_eq!(infer_topic("Heading to the GYM later"), "health");
        assert_eq!(infer_topic("my budget is tight"), "finance");
        assert_eq!(infer_topic("client meeting at 3"), "work");
        assert_eq!(infer_topic("thinking about my weekend"), "life");
        // Table order decides ties.
        assert_eq!(infer_topic("walk to the client"), "health");
    }

    #[test]
    fn test_focus_truncation() {
        assert_eq!(focus("  plan   my\tweek \n"), "plan my week");

        let long = "word ".repeat(30);
        let cut = focus(&long);
        assert_eq!(cut.chars().count(), FOCUS_MAX_CHARS);
        assert!(cut.ends_with("..."));

        let exact = "a".repeat(FOCUS_MAX_CHARS);
        assert_eq!(focus(&exact), exact);
    }

    #[test]
    fn test_focus_counts_characters() {
        let long = "é".repeat(70);
        let cut = focus(&long);
        assert_eq!(cut.chars().count(), FOCUS_MAX_CHARS);
    }

    #[test]
    fn test_format_and_trim_line() {
        assert_eq!(
            format_line("What would move {topic} forward for {focus}?", "work", "the launch"),
            "What would move work forward for the launch?"
        );
        assert_eq!(format_line("", "work", "x"), "");

        let long = "w ".repeat(40);
        let trimmed = format_line(&long, "life", "");
        assert_eq!(trimmed.split_whitespace().count(), LINE_MAX_WORDS);
        assert!(!trimmed.ends_with("..."));
    }

    #[test]
    fn test_merge_reply() {
        assert_eq!(merge_reply("Sure thing.  \n", "Why?"), "Sure thing.\nWhy?");
        assert_eq!(merge_reply("   ", "Why?"), "Why?");
        assert_eq!(merge_reply("", "Why?"), "Why?");
    }

    #[test]
    fn test_evaluate_suppressions_keep_streak() {
        let mut settings = CompanionSettings::new("chat-1");
        settings.short_reply_streak = 2;

        assert_eq!(
            evaluate(&mut settings, "   ", &[], now()),
            Decision::Suppress(Suppression::EmptyMessage)
        );
        assert_eq!(
            evaluate(&mut settings, "Stop!", &[], now()),
            Decision::Suppress(Suppression::StopWord)
        );
        let recent = vec![ConversationTurn::new("Same Words Here", "reply")];
        assert_eq!(
            evaluate(&mut settings, "same words here ", &recent, now()),
            Decision::Suppress(Suppression::RepeatedMessage)
        );
        assert_eq!(settings.short_reply_streak, 2);
        assert!(settings.reflections_paused_until.is_none());
    }

    #[test]
    fn test_evaluate_streak_pause() {
        let mut settings = CompanionSettings::new("chat-1");

        assert_eq!(evaluate(&mut settings, "ok", &[], now()), Decision::Reflect);
        assert_eq!(settings.short_reply_streak, 1);
        assert_eq!(evaluate(&mut settings, "sure", &[], now()), Decision::Reflect);
        assert_eq!(settings.short_reply_streak, 2);

        let until = now() + Duration::hours(24);
        assert_eq!(
            evaluate(&mut settings, "fine", &[], now()),
            Decision::Suppress(Suppression::FatiguePause(until))
        );
        assert_eq!(settings.reflections_paused_until, Some(until));

        let later = now() + Duration::hours(1);
        assert_eq!(
            evaluate(&mut settings, "a much longer message about my day", &[], later),
            Decision::Suppress(Suppression::Paused(until))
        );
    }

    #[test]
    fn test_evaluate_long_message_resets_streak() {
        let mut settings = CompanionSettings::new("chat-1");
        settings.short_reply_streak = 2;
        assert_eq!(
            evaluate(&mut settings, "this message has plenty of words", &[], now()),
            Decision::Reflect
        );
        assert_eq!(settings.short_reply_streak, 0);
    }

    #[test]
    fn test_build_reflection_picks_one_line() {
        let bank = TemplateBank::defaults();
        let settings = CompanionSettings::new("chat-1");

        let question = build_reflection(&bank, &settings, "gym plans", &SequenceRandom::new(vec![0]))
            .unwrap();
        assert_eq!(question.text, "What would move health forward today?");
        assert_eq!(question.template_id, "focus");
        assert_eq!(question.line_count, 1);

        let stretch = build_reflection(&bank, &settings, "gym plans", &SequenceRandom::new(vec![1]))
            .unwrap();
        assert_eq!(stretch.text, "Try writing the smallest next step for health.");
    }

    #[test]
    fn test_build_reflection_without_lines() {
        let template = crate::templates::ReflectionTemplate {
            id: "empty".to_string(),
            summary: "Only a summary".to_string(),
            question: String::new(),
            stretch: "   ".to_string(),
        };
        let bank = TemplateBank::new(
            vec![template],
            crate::templates::default_sparks(),
            crate::templates::default_blindspots(),
        );
        let settings = CompanionSettings::new("chat-1");
        assert!(build_reflection(&bank, &settings, "hello", &SequenceRandom::new(vec![0])).is_none());
    }
}
