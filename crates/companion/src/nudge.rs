//! Nudge timing: cadence, quiet hours and the spark message.

use chrono::{DateTime, Duration, Utc};

use crate::settings::{NudgeFrequency, QuietHours};

/// Instruction appended to every spark.
pub const MUTE_INSTRUCTION: &str = "Reply stop to mute.";

/// Base interval between sparks, `None` when nudges are off.
pub fn nudge_interval(frequency: NudgeFrequency) -> Option<Duration> {
    match frequency {
        NudgeFrequency::Off => None,
        NudgeFrequency::Weekly => Some(Duration::days(7)),
        NudgeFrequency::Standard => Some(Duration::days(3)),
    }
}

/// Offset after the end of quiet hours that nudges aim for.
pub fn anchor_offset() -> Duration {
    Duration::minutes(60)
}

/// A nudge must fire later than now plus this lead.
pub fn minimum_lead() -> Duration {
    Duration::minutes(1)
}

/// Most the hourly adjustment may push a candidate past its anchor.
pub fn adjustment_limit() -> Duration {
    Duration::days(2)
}

/// Compute when the next nudge should fire.
///
/// The candidate lands `interval` from now at quiet-hours end plus an hour,
/// then steps forward hourly until it is outside the quiet window and after
/// `now + 1 min`. Stepping stops once it would move the candidate more than
/// [`adjustment_limit`] past the anchor.
pub fn next_nudge_time(interval: Duration, quiet: &QuietHours, now: DateTime<Utc>) -> DateTime<Utc> {
    let anchored = (now + interval).date_naive().and_time(quiet.end).and_utc() + anchor_offset();
    let limit = anchored + adjustment_limit();

    let mut candidate = anchored;
    while !is_after_now(candidate, now) || quiet.contains(candidate.time()) {
        let next = candidate + Duration::hours(1);
        if next > limit {
            break;
        }
        candidate = next;
    }
    candidate
}

fn is_after_now(candidate: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    candidate > now + minimum_lead()
}

/// Outbound text for a spark.
pub fn render_spark_message(spark: &str) -> String {
    format!("Spark: {} {}", spark.trim(), MUTE_INSTRUCTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Timelike};

    fn quiet(start: &str, end: &str) -> QuietHours {
        QuietHours::parse(start, end).unwrap()
    }

    #[test]
    fn test_intervals() {
        assert_eq!(nudge_interval(NudgeFrequency::Off), None);
        assert_eq!(nudge_interval(NudgeFrequency::Weekly), Some(Duration::days(7)));
        assert_eq!(nudge_interval(NudgeFrequency::Standard), Some(Duration::days(3)));
    }

    #[test]
    fn test_weekly_lands_after_quiet_hours() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 15, 42, 17).unwrap();
        let at = next_nudge_time(Duration::days(7), &quiet("22:00", "07:00"), now);
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 6, 9, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_standard_cadence() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 23, 59, 59).unwrap();
        let at = next_nudge_time(Duration::days(3), &quiet("23:00", "06:30"), now);
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 6, 5, 7, 30, 0).unwrap());
        assert_eq!(at.second(), 0);
    }

    #[test]
    fn test_anchor_inside_quiet_window_steps_forward() {
        // Window 08:00-07:30 leaves only 07:30-08:00 free.
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let window = quiet("08:00", "07:30");
        let at = next_nudge_time(Duration::days(7), &window, now);
        assert!(!window.contains(at.time()));
        assert_eq!(at.time(), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 6, 10, 7, 30, 0).unwrap());
    }

    #[test]
    fn test_all_day_window_is_bounded() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let window = quiet("07:00", "07:00");
        let at = next_nudge_time(Duration::days(7), &window, now);
        let anchored = Utc.with_ymd_and_hms(2025, 6, 9, 8, 0, 0).unwrap();
        assert_eq!(at, anchored + Duration::days(2));
    }

    #[test]
    fn test_candidate_always_in_future() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let at = next_nudge_time(Duration::zero(), &quiet("01:00", "02:00"), now);
        assert!(at > now + Duration::minutes(1));
        assert!(!quiet("01:00", "02:00").contains(at.time()));
    }

    #[test]
    fn test_render_spark_message() {
        assert_eq!(
            render_spark_message("Stretch your back."),
            "Spark: Stretch your back. Reply stop to mute."
        );
    }
}
