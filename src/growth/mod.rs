//! The growth ledger: well-being gauges, EXP and the stage derived from it.
//!
//! The ledger is pure state; [`crate::simulation::Simulation`] persists it after every mutation.

pub mod save;
pub mod stats;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

pub use save::PetSave;
pub use stats::{Action, ActionCounts, Stage, StageProgress, Stat, Stats, Warnings, STAT_MAX};

use crate::clock::elapsed_whole_minutes;
use crate::config::GrowthTuning;

/// A stage transition caused by an EXP change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageChange {
    pub from: Stage,
    pub to: Stage,
}

impl StageChange {
    fn between(from: Stage, to: Stage) -> Option<Self> {
        (from != to).then_some(Self { from, to })
    }

    pub fn is_growth(&self) -> bool {
        self.to > self.from
    }
}

/// The result of a care action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied {
        exp_gained: u32,
        stage_change: Option<StageChange>,
    },
    /// The targeted stat was already full; nothing changed.
    Ineffective,
}

/// What happened while loading the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Minutes of decay applied for the time spent offline.
    pub offline_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct GrowthLedger {
    save: PetSave,
    tuning: GrowthTuning,
}

impl GrowthLedger {
    pub fn new(save: PetSave, tuning: GrowthTuning) -> Self {
        let mut ledger = Self { save, tuning };
        ledger.rederive_stage();
        ledger
    }

    /// Restores the ledger from a persisted record and catches up on offline decay.
    ///
    /// Elapsed minutes are floored and capped at the offline window. A corrupt timestamp is
    /// treated as "now", so no decay is applied for it.
    pub fn load(raw: Option<&Value>, now: OffsetDateTime, tuning: GrowthTuning) -> (Self, LoadSummary) {
        let save = PetSave::migrate(raw, now);
        let elapsed = elapsed_whole_minutes(save.last_seen_timestamp, now);
        let offline_minutes = elapsed.min(u64::from(tuning.max_offline_minutes)) as u32;

        let mut ledger = Self::new(save, tuning);
        ledger.decay(offline_minutes, now);
        info!(
            offline_minutes,
            stage = %ledger.stage(),
            exp = ledger.exp(),
            "Growth ledger loaded"
        );
        (ledger, LoadSummary { offline_minutes })
    }

    /// Applies one minute of decay.
    pub fn tick(&mut self, now: OffsetDateTime) {
        self.decay(1, now);
    }

    fn decay(&mut self, minutes: u32, now: OffsetDateTime) {
        self.save.stats.decay(minutes, &self.tuning);
        self.save.last_seen_timestamp = now;
        self.rederive_stage();
    }

    /// Whether `action` would improve its target stat.
    pub fn is_action_effective(&self, action: Action) -> bool {
        self.save.stats.get(action.target()) < STAT_MAX
    }

    /// Applies a care action. An action whose target stat is already full changes nothing and
    /// grants no EXP.
    pub fn apply_action(&mut self, action: Action, now: OffsetDateTime) -> ActionOutcome {
        if !self.is_action_effective(action) {
            debug!(%action, "Action ignored, target stat is full");
            return ActionOutcome::Ineffective;
        }

        let effect = *action.effect(&self.tuning);
        let before = self.stage();
        self.save.stats.apply_effect(&effect);
        self.save.exp = self.save.exp.saturating_add(effect.exp);
        self.save.action_counts.increment(action);
        self.save.last_seen_timestamp = now;
        self.rederive_stage();

        debug!(%action, exp = self.save.exp, "Action applied");
        ActionOutcome::Applied {
            exp_gained: effect.exp,
            stage_change: StageChange::between(before, self.stage()),
        }
    }

    /// Adds a signed amount of EXP, never going below zero.
    pub fn apply_exp_delta(&mut self, delta: i64, now: OffsetDateTime) -> Option<StageChange> {
        let before = self.stage();
        let exp = (i64::from(self.save.exp) + delta).clamp(0, i64::from(u32::MAX));
        self.save.exp = exp as u32;
        self.save.last_seen_timestamp = now;
        self.rederive_stage();
        StageChange::between(before, self.stage())
    }

    /// Starts over with a fresh egg.
    pub fn reset(&mut self, now: OffsetDateTime) -> Option<StageChange> {
        let before = self.stage();
        self.save = PetSave::new(now);
        info!("Growth reset");
        StageChange::between(before, self.stage())
    }

    fn rederive_stage(&mut self) {
        self.save.stage = Stage::from_exp(self.save.exp);
    }

    pub fn save(&self) -> &PetSave {
        &self.save
    }

    pub fn stats(&self) -> &Stats {
        &self.save.stats
    }

    pub fn exp(&self) -> u32 {
        self.save.exp
    }

    pub fn stage(&self) -> Stage {
        self.save.stage
    }

    pub fn progress(&self) -> StageProgress {
        StageProgress::for_exp(self.save.exp)
    }

    pub fn warnings(&self) -> Warnings {
        self.save.stats.warnings(self.tuning.danger_threshold)
    }

    pub fn tuning(&self) -> &GrowthTuning {
        &self.tuning
    }
}
