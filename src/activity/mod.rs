//! The activity accountant: two independently capped channels of bonus EXP.
//!
//! The passive channel turns time spent at the computer and input volume into EXP once per
//! sampling interval. The manual channel hands out a fixed amount on request, limited by its
//! own daily cap and a cooldown. Both feed the growth ledger through EXP deltas.

pub mod snapshot;

use serde_json::Value;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter, EnumString};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

pub use snapshot::ActivitySnapshot;

use crate::config::ActivityTuning;

/// Input events that count towards passive activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, EnumCountMacro)]
#[strum(serialize_all = "lowercase")]
pub enum InputKind {
    KeyDown,
    MouseDown,
    MouseMove,
    Wheel,
    TouchStart,
}

/// Per-kind input event counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputTally {
    counts: [u64; InputKind::COUNT],
}

impl InputTally {
    pub fn add(&mut self, kind: InputKind) {
        self.counts[kind as usize] = self.counts[kind as usize].saturating_add(1);
    }

    pub fn get(&self, kind: InputKind) -> u64 {
        self.counts[kind as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().fold(0u64, |sum, n| sum.saturating_add(*n))
    }

    pub fn iter(&self) -> impl Iterator<Item = (InputKind, u64)> + '_ {
        InputKind::iter().map(|kind| (kind, self.get(kind)))
    }
}

/// Raw passive score: active minutes times the weight plus inputs over the divisor, floored.
pub fn compute_activity_exp(active_seconds: u64, input_events: u64, tuning: &ActivityTuning) -> u32 {
    let active_minutes = active_seconds as f64 / 60.0;
    let score = active_minutes * tuning.active_minute_weight + input_events as f64 / tuning.input_divisor;
    score.floor().clamp(0.0, u32::MAX as f64) as u32
}

/// The outcome of a manual check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualGrant {
    Granted { exp: u32 },
    /// Today's manual cap is exhausted.
    CapReached,
    /// The previous check-in was too recent.
    Cooldown { remaining: Duration },
}

impl ManualGrant {
    pub fn exp(&self) -> u32 {
        match self {
            ManualGrant::Granted { exp } => *exp,
            _ => 0,
        }
    }
}

/// The accumulators drained by one passive sample and what they earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleResult {
    pub active_seconds: u64,
    pub input_events: u64,
    /// Score before the daily cap was applied.
    pub raw_exp: u32,
    pub granted: u32,
}

#[derive(Debug, Clone)]
pub struct ActivityAccountant {
    snapshot: ActivitySnapshot,
    tuning: ActivityTuning,
    sample_active_seconds: u64,
    sample_inputs: InputTally,
    daily_active_seconds: u64,
    daily_inputs: InputTally,
}

impl ActivityAccountant {
    pub fn new(snapshot: ActivitySnapshot, tuning: ActivityTuning) -> Self {
        Self {
            snapshot,
            tuning,
            sample_active_seconds: 0,
            sample_inputs: InputTally::default(),
            daily_active_seconds: 0,
            daily_inputs: InputTally::default(),
        }
    }

    pub fn load(raw: Option<&Value>, now: OffsetDateTime, tuning: ActivityTuning) -> Self {
        let mut accountant = Self::new(ActivitySnapshot::normalize(raw, now), tuning);
        accountant.rollover(now);
        accountant
    }

    /// Rolls the day over if needed; every other operation calls this first.
    pub fn rollover(&mut self, now: OffsetDateTime) -> bool {
        let rolled = self.snapshot.rollover(now);
        if rolled {
            self.daily_active_seconds = 0;
            self.daily_inputs = InputTally::default();
        }
        rolled
    }

    /// Counts one heartbeat period of activity while tracking is enabled.
    pub fn heartbeat(&mut self, now: OffsetDateTime) {
        self.rollover(now);
        if !self.snapshot.enabled {
            return;
        }
        self.sample_active_seconds = self.sample_active_seconds.saturating_add(self.tuning.heartbeat_secs);
        self.daily_active_seconds = self.daily_active_seconds.saturating_add(self.tuning.heartbeat_secs);
    }

    pub fn record_input(&mut self, kind: InputKind, now: OffsetDateTime) {
        self.rollover(now);
        if !self.snapshot.enabled {
            return;
        }
        self.sample_inputs.add(kind);
        self.daily_inputs.add(kind);
    }

    /// Grants passive EXP for the given activity, limited by what remains of today's cap.
    pub fn grant_passive(&mut self, active_seconds: u64, input_events: u64, now: OffsetDateTime) -> u32 {
        self.rollover(now);
        if !self.snapshot.enabled {
            return 0;
        }

        let raw = compute_activity_exp(active_seconds, input_events, &self.tuning);
        let remaining = self.tuning.daily_activity_cap.saturating_sub(self.snapshot.daily_activity_exp);
        let granted = raw.min(remaining);
        if granted == 0 {
            return 0;
        }

        self.snapshot.daily_activity_exp += granted;
        self.snapshot.total_granted_exp = self.snapshot.total_granted_exp.saturating_add(granted);
        granted
    }

    /// Drains the sample accumulators into a passive grant. The accumulators always reset,
    /// whether or not they earned anything.
    pub fn take_sample(&mut self, now: OffsetDateTime) -> SampleResult {
        let active_seconds = std::mem::take(&mut self.sample_active_seconds);
        let input_events = std::mem::take(&mut self.sample_inputs).total();
        let raw_exp = compute_activity_exp(active_seconds, input_events, &self.tuning);
        let granted = self.grant_passive(active_seconds, input_events, now);

        debug!(active_seconds, input_events, raw_exp, granted, "Activity sample taken");
        SampleResult {
            active_seconds,
            input_events,
            raw_exp,
            granted,
        }
    }

    /// What the pending sample would earn right now, before the daily cap.
    pub fn preview_sample_exp(&self) -> u32 {
        compute_activity_exp(self.sample_active_seconds, self.sample_inputs.total(), &self.tuning)
    }

    /// Grants the manual check-in reward. The cap is checked before the cooldown.
    pub fn grant_manual(&mut self, now: OffsetDateTime) -> ManualGrant {
        self.rollover(now);
        let remaining_cap = self.tuning.daily_manual_cap.saturating_sub(self.snapshot.daily_manual_exp);
        if remaining_cap == 0 {
            return ManualGrant::CapReached;
        }

        let remaining = self.cooldown_remaining(now);
        if remaining.is_positive() {
            return ManualGrant::Cooldown { remaining };
        }

        let exp = self.tuning.manual_grant.min(remaining_cap);
        self.snapshot.daily_manual_exp += exp;
        self.snapshot.total_granted_exp = self.snapshot.total_granted_exp.saturating_add(exp);
        self.snapshot.last_manual_at = Some(now);
        info!(exp, "Manual check-in granted");
        ManualGrant::Granted { exp }
    }

    /// Time until the next manual check-in is allowed; zero when it already is.
    pub fn cooldown_remaining(&self, now: OffsetDateTime) -> Duration {
        let Some(last) = self.snapshot.last_manual_at else {
            return Duration::ZERO;
        };
        let cooldown = Duration::seconds(self.tuning.manual_cooldown_secs.min(i64::MAX as u64) as i64);
        (cooldown - (now - last)).max(Duration::ZERO)
    }

    /// Enables or disables passive tracking. Disabling drops the pending sample but never takes
    /// back EXP that was already granted.
    pub fn set_enabled(&mut self, enabled: bool, now: OffsetDateTime) {
        self.rollover(now);
        self.snapshot.enabled = enabled;
        if !enabled {
            self.sample_active_seconds = 0;
            self.sample_inputs = InputTally::default();
        }
        info!(enabled, "Activity tracking toggled");
    }

    /// Withdraws everything this accountant ever granted.
    ///
    /// Returns the (non-positive) EXP delta to post to the growth ledger, and zeroes every
    /// counter including the lifetime total.
    pub fn reset_contribution(&mut self, now: OffsetDateTime) -> i64 {
        self.rollover(now);
        let total = self.snapshot.total_granted_exp;
        if total == 0 {
            return 0;
        }

        self.snapshot.total_granted_exp = 0;
        self.snapshot.daily_activity_exp = 0;
        self.snapshot.daily_manual_exp = 0;
        self.snapshot.last_manual_at = None;
        info!(withdrawn = total, "Activity contribution reset");
        -i64::from(total)
    }

    pub fn snapshot(&self) -> &ActivitySnapshot {
        &self.snapshot
    }

    pub fn tuning(&self) -> &ActivityTuning {
        &self.tuning
    }

    pub fn daily_active_seconds(&self) -> u64 {
        self.daily_active_seconds
    }

    pub fn daily_inputs(&self) -> &InputTally {
        &self.daily_inputs
    }
}
