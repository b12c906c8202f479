//! Per-chat companion settings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};
use database::UserSettings;
use tracing::warn;

use crate::error::{CompanionError, Result};

/// Quiet window start for new chats.
pub const DEFAULT_QUIET_HOURS_START: &str = "22:00";
/// Quiet window end for new chats.
pub const DEFAULT_QUIET_HOURS_END: &str = "07:00";

/// Master switch and intensity for reflections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompanionLevel {
    /// No reflections, no nudges.
    Off,
    #[default]
    Light,
    Standard,
}

impl CompanionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Light => "light",
            Self::Standard => "standard",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

impl FromStr for CompanionLevel {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "light" => Ok(Self::Light),
            "standard" => Ok(Self::Standard),
            _ => Err(CompanionError::InvalidLevel(s.to_string())),
        }
    }
}

impl fmt::Display for CompanionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cadence for proactive sparks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NudgeFrequency {
    Off,
    /// One spark every seven days.
    #[default]
    Weekly,
    /// One spark every three days.
    Standard,
}

impl NudgeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Weekly => "weekly",
            Self::Standard => "standard",
        }
    }

    /// Parse user input, accepting `on` as an alias for `weekly`.
    pub fn from_user_input(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("on") {
            return Ok(Self::Weekly);
        }
        s.parse()
    }
}

impl FromStr for NudgeFrequency {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "weekly" => Ok(Self::Weekly),
            "standard" => Ok(Self::Standard),
            _ => Err(CompanionError::InvalidFrequency(s.to_string())),
        }
    }
}

impl fmt::Display for NudgeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse an `HH:MM` 24-hour time of day.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| CompanionError::InvalidTime(value.to_string()))
}

/// Daily window in which no proactive message may fire.
///
/// `start >= end` means the window wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            start: parse_hhmm(start)?,
            end: parse_hhmm(end)?,
        })
    }

    /// Whether `time` falls inside the window. The end bound is exclusive.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// Companion configuration and engagement history for one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionSettings {
    pub chat_id: String,
    pub companion_level: CompanionLevel,
    pub nudge_frequency: NudgeFrequency,
    /// `HH:MM`, kept exactly as the user entered it.
    pub quiet_hours_start: String,
    pub quiet_hours_end: String,
    pub last_reflection_at: Option<DateTime<Utc>>,
    pub short_reply_streak: u32,
    pub reflections_paused_until: Option<DateTime<Utc>>,
    pub last_template_id: Option<String>,
    pub last_nudge_at: Option<DateTime<Utc>>,
}

impl CompanionSettings {
    /// Settings a chat starts with before anything is stored.
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            companion_level: CompanionLevel::default(),
            nudge_frequency: NudgeFrequency::default(),
            quiet_hours_start: DEFAULT_QUIET_HOURS_START.to_string(),
            quiet_hours_end: DEFAULT_QUIET_HOURS_END.to_string(),
            last_reflection_at: None,
            short_reply_streak: 0,
            reflections_paused_until: None,
            last_template_id: None,
            last_nudge_at: None,
        }
    }

    pub fn quiet_hours(&self) -> Result<QuietHours> {
        QuietHours::parse(&self.quiet_hours_start, &self.quiet_hours_end)
    }

    /// End of the fatigue pause, if it is still running at `now`.
    pub fn paused_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.reflections_paused_until.filter(|until| *until > now)
    }

    /// Convert a stored row, falling back to defaults for unknown enum values.
    pub fn from_record(record: UserSettings) -> Self {
        let companion_level = record.companion_level.parse().unwrap_or_else(|_| {
            warn!(
                "Unknown companion level {:?} for {}, using default",
                record.companion_level, record.chat_id
            );
            CompanionLevel::default()
        });
        let nudge_frequency = record.nudge_frequency.parse().unwrap_or_else(|_| {
            warn!(
                "Unknown nudge frequency {:?} for {}, using default",
                record.nudge_frequency, record.chat_id
            );
            NudgeFrequency::default()
        });

        Self {
            chat_id: record.chat_id,
            companion_level,
            nudge_frequency,
            quiet_hours_start: record.quiet_hours_start,
            quiet_hours_end: record.quiet_hours_end,
            last_reflection_at: record.last_reflection_at,
            short_reply_streak: u32::try_from(record.short_reply_streak.max(0)).unwrap_or(u32::MAX),
            reflections_paused_until: record.reflections_paused_until,
            last_template_id: record.last_template_id,
            last_nudge_at: record.last_nudge_at,
        }
    }

    pub fn to_record(&self) -> UserSettings {
        UserSettings {
            chat_id: self.chat_id.clone(),
            companion_level: self.companion_level.as_str().to_string(),
            nudge_frequency: self.nudge_frequency.as_str().to_string(),
            quiet_hours_start: self.quiet_hours_start.clone(),
            quiet_hours_end: self.quiet_hours_end.clone(),
            last_reflection_at: self.last_reflection_at,
            short_reply_streak: i64::from(self.short_reply_streak),
            reflections_paused_until: self.reflections_paused_until,
            last_template_id: self.last_template_id.clone(),
            last_nudge_at: self.last_nudge_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("OFF".parse::<CompanionLevel>().unwrap(), CompanionLevel::Off);
        assert_eq!("light".parse::<CompanionLevel>().unwrap(), CompanionLevel::Light);
        assert_eq!(" Standard ".parse::<CompanionLevel>().unwrap(), CompanionLevel::Standard);
        assert!(matches!(
            "loud".parse::<CompanionLevel>(),
            Err(CompanionError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_frequency_on_alias() {
        assert_eq!(NudgeFrequency::from_user_input("on").unwrap(), NudgeFrequency::Weekly);
        assert_eq!(NudgeFrequency::from_user_input("ON").unwrap(), NudgeFrequency::Weekly);
        assert_eq!(NudgeFrequency::from_user_input("standard").unwrap(), NudgeFrequency::Standard);
        assert!("on".parse::<NudgeFrequency>().is_err());
        assert!(matches!(
            NudgeFrequency::from_user_input("daily"),
            Err(CompanionError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("09:15").unwrap(), hm(9, 15));
        assert_eq!(parse_hhmm("23:59").unwrap(), hm(23, 59));
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("7pm").is_err());
        assert!(parse_hhmm("").is_err());
    }

    #[test]
    fn test_quiet_hours_wraparound() {
        let quiet = QuietHours::parse("22:00", "07:00").unwrap();
        assert!(quiet.contains(hm(23, 30)));
        assert!(quiet.contains(hm(22, 0)));
        assert!(quiet.contains(hm(3, 0)));
        assert!(!quiet.contains(hm(7, 0)));
        assert!(!quiet.contains(hm(8, 0)));
        assert!(!quiet.contains(hm(21, 59)));
    }

    #[test]
    fn test_quiet_hours_same_day() {
        let quiet = QuietHours::parse("13:00", "14:30").unwrap();
        assert!(quiet.contains(hm(13, 0)));
        assert!(quiet.contains(hm(14, 29)));
        assert!(!quiet.contains(hm(14, 30)));
        assert!(!quiet.contains(hm(8, 0)));
    }

    #[test]
    fn test_defaults() {
        let settings = CompanionSettings::new("chat-1");
        assert_eq!(settings.companion_level, CompanionLevel::Light);
        assert_eq!(settings.nudge_frequency, NudgeFrequency::Weekly);
        assert_eq!(settings.quiet_hours_start, "22:00");
        assert_eq!(settings.quiet_hours_end, "07:00");
        assert_eq!(settings.short_reply_streak, 0);
    }

    #[test]
    fn test_paused_until() {
        use chrono::{Duration, TimeZone};

        let now = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let mut settings = CompanionSettings::new("chat-1");
        assert_eq!(settings.paused_until(now), None);

        settings.reflections_paused_until = Some(now + Duration::hours(1));
        assert_eq!(settings.paused_until(now), Some(now + Duration::hours(1)));
        assert_eq!(settings.paused_until(now + Duration::hours(1)), None);
    }

    #[test]
    fn test_record_unknown_values_fall_back() {
        let mut record = CompanionSettings::new("chat-1").to_record();
        record.companion_level = "turbo".to_string();
        record.nudge_frequency = "hourly".to_string();
        record.short_reply_streak = 2;

        let settings = CompanionSettings::from_record(record);
        assert_eq!(settings.companion_level, CompanionLevel::Light);
        assert_eq!(settings.nudge_frequency, NudgeFrequency::Weekly);
        assert_eq!(settings.short_reply_streak, 2);
    }
}
