//! Wall-clock time and calendar helpers.
//!
//! Animation time is a separate, monotonic millisecond clock supplied by the host with every
//! frame and pointer event; this module only deals with the real-world time used for decay,
//! cooldowns and day rollover.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// The system clock in the local offset, or UTC when the offset cannot be determined.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    unix_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            unix_ms: Arc::new(AtomicI64::new(to_unix_ms(start))),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        self.unix_ms.store(to_unix_ms(now), Ordering::Relaxed);
    }

    pub fn advance(&self, by: Duration) {
        self.unix_ms.fetch_add(by.whole_milliseconds() as i64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        from_unix_ms(self.unix_ms.load(Ordering::Relaxed)).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

fn to_unix_ms(time: OffsetDateTime) -> i64 {
    (time.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_unix_ms(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000).ok()
}

/// The local calendar day of `time`, as `YYYY-MM-DD`.
pub fn day_key(time: OffsetDateTime) -> String {
    time.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| format!("{:04}-{:02}-{:02}", time.year(), u8::from(time.month()), time.day()))
}

/// Formats a timestamp for persistence.
pub fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| time.unix_timestamp().to_string())
}

/// Reads a persisted timestamp: an RFC 3339 string or a number of Unix milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(text) => OffsetDateTime::parse(text.trim(), &Rfc3339).ok(),
        Value::Number(number) => number
            .as_f64()
            .filter(|ms| ms.is_finite())
            .and_then(|ms| from_unix_ms(ms.floor() as i64)),
        _ => None,
    }
}

/// Whole minutes from `earlier` to `later`, floored. Negative spans count as zero.
pub fn elapsed_whole_minutes(earlier: OffsetDateTime, later: OffsetDateTime) -> u64 {
    let elapsed = later - earlier;
    if elapsed.is_negative() {
        0
    } else {
        elapsed.whole_minutes() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_day_key_format() {
        assert_eq!(day_key(datetime!(2024-03-09 23:59 +09:00)), "2024-03-09");
    }

    #[test]
    fn test_timestamp_roundtrip_through_value() {
        let now = datetime!(2024-03-09 10:15:30 UTC);
        let value = Value::String(format_timestamp(now));
        assert_eq!(parse_timestamp(&value), Some(now));
    }

    #[test]
    fn test_parse_epoch_millis() {
        let value = serde_json::json!(1_700_000_000_000u64);
        assert_eq!(parse_timestamp(&value).map(|t| t.unix_timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_elapsed_floors_and_ignores_backwards_time() {
        let start = datetime!(2024-01-01 00:00 UTC);
        assert_eq!(elapsed_whole_minutes(start, start + Duration::seconds(119)), 1);
        assert_eq!(elapsed_whole_minutes(start, start - Duration::minutes(5)), 0);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(datetime!(2024-01-01 00:00 UTC));
        let other = clock.clone();
        clock.advance(Duration::minutes(3));
        assert_eq!(other.now(), datetime!(2024-01-01 00:03 UTC));
    }
}
