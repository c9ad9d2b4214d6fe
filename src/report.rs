//! End-of-session summary shown the next time the pet is opened.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::activity::ActivitySnapshot;
use crate::clock::{day_key, format_timestamp};
use crate::growth::PetSave;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub day_key: String,
    pub summary: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    pub viewed: bool,
}

impl DailyReport {
    /// Summarizes the day from the growth record and today's activity rewards.
    pub fn build(save: &PetSave, activity: &ActivitySnapshot, now: OffsetDateTime) -> Self {
        let day = day_key(now);
        let average = save.stats.average();
        let encouragement = if average >= 80.0 {
            "Steady care today. Keep this rhythm going."
        } else if average >= 60.0 {
            "A little more attention and your pet will feel even better."
        } else {
            "Tomorrow, try feeding, cleaning and playing more often to help it recover."
        };
        let summary = format!(
            "[{day}] Stage {stage} · EXP {exp}\nstat average {average} · actions {actions}\nactivity EXP passive {passive}, manual {manual}\n{encouragement}",
            stage = save.stage,
            exp = save.exp,
            average = average.round(),
            actions = save.action_counts.total(),
            passive = activity.daily_activity_exp,
            manual = activity.daily_manual_exp,
        );

        Self {
            day_key: day,
            summary,
            created_at: format_timestamp(now),
            viewed: false,
        }
    }

    /// Reads a stored report. Anything but a complete record is discarded.
    pub fn from_value(raw: Option<&Value>) -> Option<Self> {
        serde_json::from_value(raw?.clone()).ok()
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_summary_lines() {
        let now = datetime!(2024-05-01 21:00 UTC);
        let save = PetSave::new(now);
        let report = DailyReport::build(&save, &ActivitySnapshot::new(now), now);
        assert_eq!(report.day_key, "2024-05-01");
        assert!(report.summary.starts_with("[2024-05-01] Stage Egg · EXP 0\nstat average 100 · actions 0"));
        assert!(report.summary.ends_with("Steady care today. Keep this rhythm going."));
        assert!(!report.viewed);
    }

    #[test]
    fn test_partial_record_is_discarded() {
        assert_eq!(DailyReport::from_value(Some(&json!({"dayKey": "2024-05-01"}))), None);
        assert_eq!(DailyReport::from_value(None), None);
    }
}
