//! Simplified cron evaluation.
//!
//! Schedules use the familiar five-field cron shape
//! (`minute hour day-of-month month day-of-week`), but only the minute and
//! hour fields are interpreted. The remaining three are accepted and
//! ignored, so every schedule effectively fires once per day at HH:MM. A
//! cron string targeting "only Mondays" will silently run every day;
//! callers must not rely on day/month/weekday filtering.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Compute the next future fire time for a cron expression, or `None` if it
/// cannot be parsed.
pub fn next_run_time(expr: &str) -> Option<DateTime<Utc>> {
    next_run_after(expr, Utc::now())
}

/// Like [`next_run_time`], evaluated against an explicit "now".
///
/// Minute and hour are not range-checked: an out-of-range value such as
/// hour 25 rolls over through plain date arithmetic onto the following day
/// instead of being rejected. Values large enough to overflow the date
/// arithmetic yield `None`.
pub(crate) fn next_run_after(expr: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        warn!(
            expr = %expr,
            fields = fields.len(),
            "cron expression must have exactly five fields"
        );
        return None;
    }

    let minute = parse_field(fields[0], "minute", expr)?;
    let hour = parse_field(fields[1], "hour", expr)?;

    // Candidate: today at hour:minute, built from midnight so out-of-range
    // values carry over instead of failing construction.
    let midnight = now.date_naive().and_hms_opt(0, 0, 0)?.and_utc();
    let candidate = midnight
        .checked_add_signed(Duration::try_hours(hour)?)?
        .checked_add_signed(Duration::try_minutes(minute)?)?;

    if candidate <= now {
        // Already passed today; same wall-clock time tomorrow.
        candidate.checked_add_signed(Duration::days(1))
    } else {
        Some(candidate)
    }
}

fn parse_field(raw: &str, name: &str, expr: &str) -> Option<i64> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(expr = %expr, field = name, value = %raw, "cron field is not a number");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn rolls_to_next_day_when_time_already_passed() {
        let now = at("2025-01-01T10:00:00Z");
        let next = next_run_after("0 2 * * *", now).unwrap();
        assert_eq!(next, at("2025-01-02T02:00:00Z"));
    }

    #[test]
    fn fires_later_today_when_time_is_ahead() {
        let now = at("2025-01-01T09:00:00Z");
        let next = next_run_after("05 10 * * *", now).unwrap();
        assert_eq!(next, at("2025-01-01T10:05:00Z"));
    }

    #[test]
    fn exact_current_time_advances_one_day() {
        let now = at("2025-01-01T02:00:00Z");
        let next = next_run_after("0 2 * * *", now).unwrap();
        assert_eq!(next, at("2025-01-02T02:00:00Z"));
    }

    #[test]
    fn wrong_field_count_returns_none() {
        assert!(next_run_after("", Utc::now()).is_none());
        assert!(next_run_after("0 2 *", Utc::now()).is_none());
        assert!(next_run_after("0 2 * * * *", Utc::now()).is_none());
    }

    #[test]
    fn non_numeric_minute_or_hour_returns_none() {
        assert!(next_run_after("a 2 * * *", Utc::now()).is_none());
        assert!(next_run_after("0 noon * * *", Utc::now()).is_none());
        assert!(next_run_after("* * * * *", Utc::now()).is_none());
    }

    #[test]
    fn day_fields_are_ignored() {
        // "Only Mondays" still evaluates to the next daily occurrence.
        let now = at("2025-01-01T00:00:00Z"); // a Wednesday
        let next = next_run_after("30 8 * * MON", now).unwrap();
        assert_eq!(next, at("2025-01-01T08:30:00Z"));
    }

    #[test]
    fn out_of_range_hour_rolls_over() {
        let now = at("2025-06-10T00:00:00Z");
        let next = next_run_after("0 25 * * *", now).unwrap();
        assert_eq!(next, at("2025-06-11T01:00:00Z"));
    }

    #[test]
    fn out_of_range_minute_rolls_over() {
        let now = at("2025-06-10T00:00:00Z");
        let next = next_run_after("99 1 * * *", now).unwrap();
        assert_eq!(next, at("2025-06-10T02:39:00Z"));
    }

    #[test]
    fn absurd_magnitude_returns_none_instead_of_panicking() {
        assert!(next_run_after("0 99999999999999 * * *", Utc::now()).is_none());
    }

    #[test]
    fn valid_expressions_are_strictly_future_and_within_a_day() {
        let now = Utc::now();
        for expr in ["0 0 * * *", "59 23 * * *", "30 12 1 6 SUN"] {
            let next = next_run_time(expr).unwrap();
            assert!(next > now, "{expr} produced a past time");
            assert!(next <= now + Duration::hours(24), "{expr} beyond 24h");
        }
    }

    #[test]
    fn whitespace_is_flexible() {
        let now = at("2025-01-01T09:00:00Z");
        let next = next_run_after("  15   14 * *   *  ", now).unwrap();
        assert_eq!(next, at("2025-01-01T14:15:00Z"));
    }
}
