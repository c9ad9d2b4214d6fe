use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::config::{ActionEffect, GrowthTuning};

pub const STAT_MIN: f64 = 0.0;
pub const STAT_MAX: f64 = 100.0;

pub fn clamp_stat(value: f64) -> f64 {
    value.clamp(STAT_MIN, STAT_MAX)
}

/// One of the four well-being gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Stat {
    Hunger,
    Happiness,
    Cleanliness,
    Health,
}

/// The pet's well-being gauges, each kept within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub hunger: f64,
    pub happiness: f64,
    pub cleanliness: f64,
    pub health: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            hunger: STAT_MAX,
            happiness: STAT_MAX,
            cleanliness: STAT_MAX,
            health: STAT_MAX,
        }
    }
}

impl Stats {
    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Hunger => self.hunger,
            Stat::Happiness => self.happiness,
            Stat::Cleanliness => self.cleanliness,
            Stat::Health => self.health,
        }
    }

    pub fn average(&self) -> f64 {
        (self.hunger + self.happiness + self.cleanliness + self.health) / 4.0
    }

    /// Applies `minutes` of idle decay.
    ///
    /// Decay runs one minute at a time so that the health penalty starts on the exact minute a
    /// gauge crosses the danger threshold, whether the minutes arrive one tick at a time or all
    /// at once after being offline.
    pub fn decay(&mut self, minutes: u32, tuning: &GrowthTuning) {
        for _ in 0..minutes {
            self.hunger = clamp_stat(self.hunger - tuning.hunger_decay_per_minute);
            self.happiness = clamp_stat(self.happiness - tuning.happiness_decay_per_minute);
            self.cleanliness = clamp_stat(self.cleanliness - tuning.cleanliness_decay_per_minute);

            if self.hunger <= tuning.danger_threshold || self.cleanliness <= tuning.danger_threshold {
                self.health = clamp_stat(self.health - tuning.health_penalty_per_minute);
            }
        }
    }

    pub(crate) fn apply_effect(&mut self, effect: &ActionEffect) {
        self.hunger = clamp_stat(self.hunger + effect.hunger);
        self.happiness = clamp_stat(self.happiness + effect.happiness);
        self.cleanliness = clamp_stat(self.cleanliness + effect.cleanliness);
        self.health = clamp_stat(self.health + effect.health);
    }

    pub fn warnings(&self, danger_threshold: f64) -> Warnings {
        let mut warnings = Warnings::empty();
        warnings.set(Warnings::HUNGRY, self.hunger <= danger_threshold);
        warnings.set(Warnings::DIRTY, self.cleanliness <= danger_threshold);
        warnings.set(Warnings::UNHAPPY, self.happiness <= danger_threshold);
        warnings.set(Warnings::SICK, self.health <= danger_threshold);
        warnings
    }
}

bitflags! {
    /// Stats currently at or below the danger threshold.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Warnings: u8 {
        const HUNGRY = 1 << 0;
        const DIRTY = 1 << 1;
        const UNHAPPY = 1 << 2;
        const SICK = 1 << 3;
    }
}

impl Warnings {
    pub const NOMINAL_MESSAGE: &'static str = "All stats look healthy";

    /// Advisory strings in display order, or the single nominal message when nothing is wrong.
    pub fn messages(self) -> Vec<&'static str> {
        let messages: Vec<&'static str> = [
            (Warnings::HUNGRY, "Hunger is running low"),
            (Warnings::DIRTY, "Cleanliness is running low"),
            (Warnings::UNHAPPY, "Happiness is running low"),
            (Warnings::SICK, "Health is running low"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, message)| message)
        .collect();

        if messages.is_empty() {
            vec![Self::NOMINAL_MESSAGE]
        } else {
            messages
        }
    }
}

/// Growth tier, derived purely from EXP.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum Stage {
    #[default]
    Egg,
    Baby,
    Teen,
    Adult,
}

impl Stage {
    /// EXP at which this stage begins.
    pub const fn threshold(self) -> u32 {
        match self {
            Stage::Egg => 0,
            Stage::Baby => 30,
            Stage::Teen => 90,
            Stage::Adult => 180,
        }
    }

    /// EXP shown as the goal of this stage's progress bar.
    pub const fn goal(self) -> u32 {
        match self {
            Stage::Egg => 30,
            Stage::Baby => 90,
            Stage::Teen => 180,
            Stage::Adult => 240,
        }
    }

    pub const fn from_exp(exp: u32) -> Stage {
        if exp >= Stage::Adult.threshold() {
            Stage::Adult
        } else if exp >= Stage::Teen.threshold() {
            Stage::Teen
        } else if exp >= Stage::Baby.threshold() {
            Stage::Baby
        } else {
            Stage::Egg
        }
    }

    /// Asset folder holding this stage's sprite variant.
    pub const fn folder(self) -> &'static str {
        match self {
            Stage::Egg => "egg",
            Stage::Baby => "baby",
            Stage::Teen => "teen",
            Stage::Adult => "adult",
        }
    }

    /// Glyph drawn for the main pet when no sprite profile is available.
    pub const fn face(self) -> &'static str {
        match self {
            Stage::Egg => "🐣",
            Stage::Baby => "🐥",
            Stage::Teen => "🐱",
            Stage::Adult => "🐈",
        }
    }

    pub const fn transition_message(self) -> Option<&'static str> {
        match self {
            Stage::Egg => None,
            Stage::Baby => Some("Evolved into a Baby! Small steps into a big world."),
            Stage::Teen => Some("Evolved into a Teen! Growing braver by the day."),
            Stage::Adult => Some("Evolved into an Adult! Fully grown and dependable."),
        }
    }
}

/// Progress through the current stage towards its goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageProgress {
    pub stage: Stage,
    /// EXP earned since the stage began.
    pub current: u32,
    pub goal: u32,
    /// `current` over the stage span, within `[0, 1]`.
    pub ratio: f64,
}

impl StageProgress {
    pub fn for_exp(exp: u32) -> Self {
        let stage = Stage::from_exp(exp);
        let current = exp.saturating_sub(stage.threshold());
        let span = stage.goal().saturating_sub(stage.threshold()).max(1);
        Self {
            stage,
            current,
            goal: stage.goal(),
            ratio: (current as f64 / span as f64).clamp(0.0, 1.0),
        }
    }
}

/// A care action the player can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Feed,
    Clean,
    Play,
}

impl Action {
    /// The stat this action exists to improve.
    pub const fn target(self) -> Stat {
        match self {
            Action::Feed => Stat::Hunger,
            Action::Clean => Stat::Cleanliness,
            Action::Play => Stat::Happiness,
        }
    }

    pub fn effect(self, tuning: &GrowthTuning) -> &ActionEffect {
        match self {
            Action::Feed => &tuning.feed,
            Action::Clean => &tuning.clean,
            Action::Play => &tuning.play,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub feed: u32,
    pub clean: u32,
    pub play: u32,
}

impl ActionCounts {
    pub fn get(&self, action: Action) -> u32 {
        match action {
            Action::Feed => self.feed,
            Action::Clean => self.clean,
            Action::Play => self.play,
        }
    }

    pub fn total(&self) -> u32 {
        self.feed.saturating_add(self.clean).saturating_add(self.play)
    }

    pub(crate) fn increment(&mut self, action: Action) {
        let counter = match action {
            Action::Feed => &mut self.feed,
            Action::Clean => &mut self.clean,
            Action::Play => &mut self.play,
        };
        *counter = counter.saturating_add(1);
    }
}
