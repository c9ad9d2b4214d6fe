//! The persisted growth record and its tolerant migration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::clock::parse_timestamp;
use crate::constants::SCHEMA_VERSION;
use crate::growth::stats::{clamp_stat, ActionCounts, Stage, Stats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetSave {
    pub schema_version: u32,
    pub stats: Stats,
    /// Always equal to `Stage::from_exp(exp)`; stored for readers of the raw record only.
    pub stage: Stage,
    pub exp: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen_timestamp: OffsetDateTime,
    pub action_counts: ActionCounts,
}

impl PetSave {
    /// A fresh pet: full gauges, no EXP, last seen `now`.
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            stats: Stats::default(),
            stage: Stage::Egg,
            exp: 0,
            last_seen_timestamp: now,
            action_counts: ActionCounts::default(),
        }
    }

    /// Brings any persisted value up to the current schema.
    ///
    /// Each field is read independently; anything missing or malformed takes its default,
    /// numbers are clamped into range and the stage is re-derived from EXP. Schema 1 records kept
    /// the gauges directly on the record instead of under `stats`, which is also accepted.
    pub fn migrate(raw: Option<&Value>, now: OffsetDateTime) -> Self {
        let record = match raw {
            Some(Value::Object(record)) => record,
            Some(other) => {
                warn!(kind = value_kind(other), "Growth save is not an object, starting fresh");
                return Self::new(now);
            }
            None => return Self::new(now),
        };

        let version = read_number(record, "schemaVersion").map(|v| v.floor().max(1.0) as u32).unwrap_or(1);
        if version < SCHEMA_VERSION {
            debug!(from = version, to = SCHEMA_VERSION, "Migrating growth save");
        }

        let stats_source = match record.get("stats") {
            Some(Value::Object(stats)) => stats,
            _ => record,
        };
        let defaults = Stats::default();
        let stats = Stats {
            hunger: read_stat(stats_source, "hunger", defaults.hunger),
            happiness: read_stat(stats_source, "happiness", defaults.happiness),
            cleanliness: read_stat(stats_source, "cleanliness", defaults.cleanliness),
            health: read_stat(stats_source, "health", defaults.health),
        };

        let exp = read_count(record, "exp");
        let stage = Stage::from_exp(exp);
        let stored_stage = record.get("stage").and_then(Value::as_str).map(Stage::from_str);
        if !matches!(stored_stage, Some(Ok(stored)) if stored == stage) {
            debug!(?stored_stage, derived = %stage, "Stored stage disagrees with EXP, using derived stage");
        }

        let action_counts = match record.get("actionCounts") {
            Some(Value::Object(counts)) => ActionCounts {
                feed: read_count(counts, "feed"),
                clean: read_count(counts, "clean"),
                play: read_count(counts, "play"),
            },
            _ => ActionCounts::default(),
        };

        let last_seen_timestamp = match record.get("lastSeenTimestamp").and_then(parse_timestamp) {
            Some(timestamp) => timestamp,
            None => {
                warn!("Growth save has no readable timestamp, skipping offline decay");
                now
            }
        };

        Self {
            schema_version: SCHEMA_VERSION,
            stats,
            stage,
            exp,
            last_seen_timestamp,
            action_counts,
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

fn read_number(record: &Map<String, Value>, key: &str) -> Option<f64> {
    record.get(key).and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn read_stat(record: &Map<String, Value>, key: &str, default: f64) -> f64 {
    read_number(record, key).map(clamp_stat).unwrap_or(default)
}

fn read_count(record: &Map<String, Value>, key: &str) -> u32 {
    read_number(record, key)
        .map(|n| n.floor().clamp(0.0, u32::MAX as f64) as u32)
        .unwrap_or(0)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_migrate_flat_v1_record() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let raw = json!({
            "schemaVersion": 1,
            "hunger": 40,
            "happiness": "bad",
            "cleanliness": 250,
            "exp": 95.7,
            "stage": "Egg",
        });

        let save = PetSave::migrate(Some(&raw), now);
        assert_eq!(save.schema_version, SCHEMA_VERSION);
        assert_eq!(save.stats.hunger, 40.0);
        assert_eq!(save.stats.happiness, 100.0);
        assert_eq!(save.stats.cleanliness, 100.0);
        assert_eq!(save.exp, 95);
        assert_eq!(save.stage, Stage::Teen);
        assert_eq!(save.last_seen_timestamp, now);
    }

    #[test]
    fn test_migrate_non_object() {
        let now = datetime!(2024-05-01 12:00 UTC);
        assert_eq!(PetSave::migrate(Some(&json!([1, 2, 3])), now), PetSave::new(now));
        assert_eq!(PetSave::migrate(None, now), PetSave::new(now));
    }

    #[test]
    fn test_serialized_shape() {
        let save = PetSave::new(datetime!(2024-05-01 12:00 UTC));
        let value = save.to_value().unwrap();
        assert_eq!(value["schemaVersion"], json!(SCHEMA_VERSION));
        assert_eq!(value["stage"], json!("Egg"));
        assert_eq!(value["actionCounts"]["play"], json!(0));
        assert_eq!(value["lastSeenTimestamp"], json!("2024-05-01T12:00:00Z"));
    }
}
