use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::debug;

use crate::clock::{day_key, parse_timestamp};

/// The persisted reward envelope for the current calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub enabled: bool,
    pub day_key: String,
    pub daily_activity_exp: u32,
    #[serde(rename = "dailyFallbackExp")]
    pub daily_manual_exp: u32,
    pub total_granted_exp: u32,
    #[serde(rename = "lastFallbackAt", with = "time::serde::rfc3339::option")]
    pub last_manual_at: Option<OffsetDateTime>,
}

impl ActivitySnapshot {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            enabled: true,
            day_key: day_key(now),
            daily_activity_exp: 0,
            daily_manual_exp: 0,
            total_granted_exp: 0,
            last_manual_at: None,
        }
    }

    /// Reads a persisted snapshot field by field. Tracking stays enabled unless the record says
    /// `false` explicitly.
    pub fn normalize(raw: Option<&Value>, now: OffsetDateTime) -> Self {
        let mut snapshot = Self::new(now);
        let Some(Value::Object(record)) = raw else {
            return snapshot;
        };

        snapshot.enabled = record.get("enabled") != Some(&Value::Bool(false));
        if let Some(key) = record.get("dayKey").and_then(Value::as_str).filter(|k| !k.is_empty()) {
            snapshot.day_key = key.to_string();
        }
        snapshot.daily_activity_exp = read_count(record, "dailyActivityExp");
        snapshot.daily_manual_exp = read_count(record, "dailyFallbackExp");
        snapshot.total_granted_exp = read_count(record, "totalGrantedExp");
        snapshot.last_manual_at = record.get("lastFallbackAt").and_then(parse_timestamp);
        snapshot
    }

    /// Starts a new day if `now` falls on a different calendar day than the snapshot.
    ///
    /// Daily counters and the manual cooldown reset; the lifetime total and the enabled flag
    /// survive. Returns whether a rollover happened. Calling it twice is harmless.
    pub fn rollover(&mut self, now: OffsetDateTime) -> bool {
        let today = day_key(now);
        if self.day_key == today {
            return false;
        }

        debug!(from = %self.day_key, to = %today, "Activity day rolled over");
        self.day_key = today;
        self.daily_activity_exp = 0;
        self.daily_manual_exp = 0;
        self.last_manual_at = None;
        true
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

fn read_count(record: &Map<String, Value>, key: &str) -> u32 {
    record
        .get(key)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .map(|n| n.floor().clamp(0.0, u32::MAX as f64) as u32)
        .unwrap_or(0)
}
