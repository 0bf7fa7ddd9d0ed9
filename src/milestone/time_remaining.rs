//! Time-remaining resolution: turns a server-supplied `"<minutes>:<seconds>"`
//! token or a raw target timestamp into a display duration plus a signed
//! hours value used for bucketing.
//!
//! Nothing here fails: malformed or missing input resolves to the `/`
//! no-target marker.

#![allow(clippy::cast_precision_loss)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::model::SlaStatus;

const MS_PER_MINUTE: u64 = 60_000;
const MINUTES_PER_DAY: u64 = 1_440;
const MINUTES_PER_HOUR: u64 = 60;

/// A resolved time-remaining value.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRemaining {
    /// `Remaining`, `Overdue`, or `NoTarget`.
    pub status: SlaStatus,
    /// Signed hours until the target; negative when overdue. `None` without a target.
    pub hours: Option<f64>,
}

impl TimeRemaining {
    /// The `/` marker with no numeric distance.
    #[must_use]
    pub const fn no_target() -> Self {
        Self {
            status: SlaStatus::NoTarget,
            hours: None,
        }
    }

    /// Display text (`"2d 3h 4m"`, `"Overdue by 5m"`, `"/"`).
    #[must_use]
    pub fn display(&self) -> String {
        self.status.display()
    }

    fn from_signed_seconds(seconds: i64) -> Self {
        let minutes = seconds.unsigned_abs() / 60;
        let duration = format_duration(minutes);
        let status = if seconds < 0 {
            SlaStatus::Overdue(duration)
        } else {
            SlaStatus::Remaining(duration)
        };
        Self {
            status,
            hours: Some(seconds as f64 / 3_600.0),
        }
    }
}

/// Render whole minutes as `"{d}d {h}h {m}m"`.
///
/// The day segment is omitted when zero; the hour segment is omitted when both
/// days and hours are zero. Minutes are always shown.
#[must_use]
pub fn format_duration(total_minutes: u64) -> String {
    let days = total_minutes / MINUTES_PER_DAY;
    let hours = (total_minutes % MINUTES_PER_DAY) / MINUTES_PER_HOUR;
    let minutes = total_minutes % MINUTES_PER_HOUR;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days}d "));
    }
    if hours > 0 || days > 0 {
        out.push_str(&format!("{hours}h "));
    }
    out.push_str(&format!("{minutes}m"));
    out
}

/// Parse a timestamp in any of the shapes the data source emits.
///
/// Accepts RFC 3339, the `+0000` offset form (`2026-03-01T10:00:00.000+0000`),
/// naive date-times (read as UTC), and bare dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a `"<integer-minutes>:<seconds>"` token into signed seconds.
///
/// A leading `-` applies to the whole token. Any non-numeric part makes the
/// token malformed.
#[must_use]
pub fn parse_token(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (minutes, seconds) = body.split_once(':')?;
    if minutes.is_empty()
        || seconds.is_empty()
        || !minutes.bytes().all(|b| b.is_ascii_digit())
        || !seconds.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let minutes: i64 = minutes.parse().ok()?;
    let seconds: i64 = seconds.parse().ok()?;
    let total = minutes.checked_mul(60)?.checked_add(seconds)?;
    Some(if negative { -total } else { total })
}

/// Time remaining until `target` as seen at `now`.
#[must_use]
pub fn from_target(target: DateTime<Utc>, now: DateTime<Utc>) -> TimeRemaining {
    let diff_ms = target.signed_duration_since(now).num_milliseconds();
    let minutes = diff_ms.unsigned_abs() / MS_PER_MINUTE;
    let duration = format_duration(minutes);
    let status = if diff_ms < 0 {
        SlaStatus::Overdue(duration)
    } else {
        SlaStatus::Remaining(duration)
    };
    TimeRemaining {
        status,
        hours: Some(diff_ms as f64 / 3_600_000.0),
    }
}

/// Resolve the best available representation.
///
/// A well-formed token wins; otherwise the target timestamp is used; otherwise
/// the result is the no-target marker.
#[must_use]
pub fn resolve(token: Option<&str>, target: Option<&str>, now: DateTime<Utc>) -> TimeRemaining {
    if let Some(seconds) = token.and_then(parse_token) {
        return TimeRemaining::from_signed_seconds(seconds);
    }
    match target.and_then(parse_timestamp) {
        Some(target) => from_target(target, now),
        None => TimeRemaining::no_target(),
    }
}
