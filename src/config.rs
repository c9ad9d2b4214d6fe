//! Host settings and simulation tuning.
//!
//! Settings are layered with figment: built-in defaults, then an optional JSON file, then
//! `DESKTOP_PET_`-prefixed environment variables (nested keys separated by `__`, so
//! `DESKTOP_PET_TUNING__MOTION__GRAVITY=1200` overrides gravity). A configuration that cannot
//! be extracted is reported and replaced by defaults; the pet must always boot.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json};
use figment::Figment;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "DESKTOP_PET_";

/// A randomized delay: `base_ms` plus a uniform draw from `[0, spread_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jitter {
    pub base_ms: f64,
    pub spread_ms: f64,
}

impl Jitter {
    pub const fn new(base_ms: f64, spread_ms: f64) -> Self {
        Self { base_ms, spread_ms }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.base_ms + rng.random::<f64>() * self.spread_ms
    }

    fn sanitized(self) -> Self {
        Self {
            base_ms: finite_or(self.base_ms, 0.0).max(0.0),
            spread_ms: finite_or(self.spread_ms, 0.0).max(0.0),
        }
    }
}

/// The stat and EXP changes of one care action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionEffect {
    pub hunger: f64,
    pub happiness: f64,
    pub cleanliness: f64,
    pub health: f64,
    pub exp: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthTuning {
    pub hunger_decay_per_minute: f64,
    pub happiness_decay_per_minute: f64,
    pub cleanliness_decay_per_minute: f64,
    /// Health lost per minute while hunger or cleanliness sits at or below the danger threshold.
    pub health_penalty_per_minute: f64,
    pub danger_threshold: f64,
    pub max_offline_minutes: u32,
    pub feed: ActionEffect,
    pub clean: ActionEffect,
    pub play: ActionEffect,
}

impl Default for GrowthTuning {
    fn default() -> Self {
        Self {
            hunger_decay_per_minute: 0.22,
            happiness_decay_per_minute: 0.18,
            cleanliness_decay_per_minute: 0.2,
            health_penalty_per_minute: 0.16,
            danger_threshold: 25.0,
            max_offline_minutes: 720,
            feed: ActionEffect {
                hunger: 26.0,
                health: 2.0,
                exp: 2,
                ..ActionEffect::default()
            },
            clean: ActionEffect {
                cleanliness: 24.0,
                health: 2.0,
                exp: 2,
                ..ActionEffect::default()
            },
            play: ActionEffect {
                happiness: 22.0,
                exp: 4,
                ..ActionEffect::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityTuning {
    pub sample_interval_secs: u64,
    pub heartbeat_secs: u64,
    pub daily_activity_cap: u32,
    pub daily_manual_cap: u32,
    pub manual_grant: u32,
    pub manual_cooldown_secs: u64,
    /// EXP per active minute in a passive sample.
    pub active_minute_weight: f64,
    /// Input events needed for one EXP in a passive sample.
    pub input_divisor: f64,
}

impl Default for ActivityTuning {
    fn default() -> Self {
        Self {
            sample_interval_secs: 5 * 60,
            heartbeat_secs: 1,
            daily_activity_cap: 36,
            daily_manual_cap: 12,
            manual_grant: 4,
            manual_cooldown_secs: 60 * 60,
            active_minute_weight: 0.4,
            input_divisor: 140.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTuning {
    /// Downward acceleration in px/s².
    pub gravity: f32,
    pub walk_speed: f32,
    pub jump_velocity: f32,
    /// Per-step multiplier on horizontal velocity while not walking.
    pub inertia_damping: f32,
    pub min_velocity: f32,
    pub landing_ms: f64,
    pub max_air_ms: f64,
    pub drag_threshold: f32,
    /// Multiplier from pointer velocity at release to throw velocity, both in px/s.
    pub throw_damping: f32,
    pub jump_chance: f64,
    pub ground_margin: f32,
    pub first_decision_ms: f64,
    pub throw_decision_ms: f64,
    /// Decision hold after dropping the main pet while its policy is fixed.
    pub fixed_drop_hold_ms: f64,
    pub walk_decision: Jitter,
    pub jump_decision: Jitter,
    pub idle_after_walk: Jitter,
    pub idle_after_landing: Jitter,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            gravity: 1550.0,
            walk_speed: 85.0,
            jump_velocity: -420.0,
            inertia_damping: 0.91,
            min_velocity: 8.0,
            landing_ms: 150.0,
            max_air_ms: 2400.0,
            drag_threshold: 4.0,
            throw_damping: 0.08,
            jump_chance: 0.35,
            ground_margin: 8.0,
            first_decision_ms: 2000.0,
            throw_decision_ms: 1200.0,
            fixed_drop_hold_ms: 20_000.0,
            walk_decision: Jitter::new(1200.0, 1800.0),
            jump_decision: Jitter::new(1100.0, 700.0),
            idle_after_walk: Jitter::new(900.0, 1100.0),
            idle_after_landing: Jitter::new(1000.0, 1500.0),
        }
    }
}

/// Relative weights used when a buddy picks its next idle expression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionWeights {
    pub neutral: u32,
    pub happy: u32,
    pub sleep: u32,
    pub other: u32,
}

impl Default for ExpressionWeights {
    fn default() -> Self {
        Self {
            neutral: 8,
            happy: 3,
            sleep: 2,
            other: 1,
        }
    }
}

impl ExpressionWeights {
    pub fn weight_for(&self, emotion_id: Option<&str>) -> u32 {
        match emotion_id {
            Some("neutral") => self.neutral,
            Some("happy") => self.happy,
            Some("sleep") => self.sleep,
            _ => self.other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionTuning {
    pub dirty_threshold: f64,
    pub tired_threshold: f64,
    pub happy_threshold: f64,
    pub inactivity_ms: f64,
    /// How often the inactive mood re-rolls between sleep and neutral.
    pub inactive_reroll_ms: f64,
    pub sleep_chance: f64,
    pub happy_switch_ms: f64,
    pub default_switch_ms: f64,
    pub first_expression: Jitter,
    pub expression_interval: Jitter,
    pub expression_weights: ExpressionWeights,
    /// Horizontal speed (px/s) that adds one frame per second to the walk cycle.
    pub walk_fps_divisor: f32,
    pub max_walk_fps: f32,
}

impl Default for EmotionTuning {
    fn default() -> Self {
        Self {
            dirty_threshold: 60.0,
            tired_threshold: 60.0,
            happy_threshold: 90.0,
            inactivity_ms: 45_000.0,
            inactive_reroll_ms: 7000.0,
            sleep_chance: 0.5,
            happy_switch_ms: 5000.0,
            default_switch_ms: 7000.0,
            first_expression: Jitter::new(800.0, 1400.0),
            expression_interval: Jitter::new(3000.0, 5000.0),
            expression_weights: ExpressionWeights::default(),
            walk_fps_divisor: 35.0,
            max_walk_fps: 16.0,
        }
    }
}

/// Every tunable value of the simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub growth: GrowthTuning,
    pub activity: ActivityTuning,
    pub motion: MotionTuning,
    pub emotion: EmotionTuning,
}

impl Tuning {
    /// Clamps values that would break an invariant (negative rates, zero divisors, probabilities
    /// outside `[0, 1]`) back into range.
    pub fn sanitized(mut self) -> Self {
        let g = &mut self.growth;
        g.hunger_decay_per_minute = finite_or(g.hunger_decay_per_minute, 0.0).max(0.0);
        g.happiness_decay_per_minute = finite_or(g.happiness_decay_per_minute, 0.0).max(0.0);
        g.cleanliness_decay_per_minute = finite_or(g.cleanliness_decay_per_minute, 0.0).max(0.0);
        g.health_penalty_per_minute = finite_or(g.health_penalty_per_minute, 0.0).max(0.0);
        g.danger_threshold = finite_or(g.danger_threshold, 25.0).clamp(0.0, 100.0);

        let a = &mut self.activity;
        a.sample_interval_secs = a.sample_interval_secs.max(1);
        a.heartbeat_secs = a.heartbeat_secs.max(1);
        a.active_minute_weight = finite_or(a.active_minute_weight, 0.0).max(0.0);
        a.input_divisor = finite_or(a.input_divisor, 1.0).max(1.0);

        let m = &mut self.motion;
        let motion_defaults = MotionTuning::default();
        m.gravity = finite_or(m.gravity, motion_defaults.gravity);
        m.walk_speed = finite_or(m.walk_speed, motion_defaults.walk_speed).abs();
        m.jump_velocity = finite_or(m.jump_velocity, motion_defaults.jump_velocity);
        m.drag_threshold = finite_or(m.drag_threshold, motion_defaults.drag_threshold).max(0.0);
        m.throw_damping = finite_or(m.throw_damping, motion_defaults.throw_damping).max(0.0);
        m.ground_margin = finite_or(m.ground_margin, motion_defaults.ground_margin);
        m.first_decision_ms = finite_or(m.first_decision_ms, motion_defaults.first_decision_ms).max(0.0);
        m.throw_decision_ms = finite_or(m.throw_decision_ms, motion_defaults.throw_decision_ms).max(0.0);
        m.fixed_drop_hold_ms = finite_or(m.fixed_drop_hold_ms, motion_defaults.fixed_drop_hold_ms).max(0.0);
        m.inertia_damping = finite_or(m.inertia_damping, 0.91).clamp(0.0, 1.0);
        m.min_velocity = finite_or(m.min_velocity, 0.0).max(0.0);
        m.jump_chance = finite_or(m.jump_chance, 0.0).clamp(0.0, 1.0);
        m.landing_ms = finite_or(m.landing_ms, 0.0).max(0.0);
        m.max_air_ms = finite_or(m.max_air_ms, 2400.0).max(1.0);
        m.walk_decision = m.walk_decision.sanitized();
        m.jump_decision = m.jump_decision.sanitized();
        m.idle_after_walk = m.idle_after_walk.sanitized();
        m.idle_after_landing = m.idle_after_landing.sanitized();

        let e = &mut self.emotion;
        e.sleep_chance = finite_or(e.sleep_chance, 0.5).clamp(0.0, 1.0);
        e.walk_fps_divisor = finite_or(e.walk_fps_divisor, 35.0).max(1.0);
        e.max_walk_fps = finite_or(e.max_walk_fps, 16.0).max(1.0);
        e.first_expression = e.first_expression.sanitized();
        e.expression_interval = e.expression_interval.sanitized();
        self
    }
}

/// Host settings for the headless runner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawSettings")]
pub struct Settings {
    /// Directory holding persisted records; the platform data directory when unset.
    pub data_dir: Option<PathBuf>,
    /// Sprite descriptor for the main pet; placeholder glyphs are used when unset.
    pub sprite_descriptor: Option<PathBuf>,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub frame_rate: u32,
    /// Stop after this many seconds; run until interrupted when unset.
    pub run_seconds: Option<u64>,
    /// Seed for reproducible motion; drawn from the thread RNG when unset.
    pub seed: Option<u64>,
    pub tuning: Tuning,
}

impl Default for Settings {
    fn default() -> Self {
        RawSettings::default().into()
    }
}

/// Settings exactly as provided by the configuration sources, validated into [`Settings`].
#[derive(Debug, Deserialize)]
struct RawSettings {
    data_dir: Option<PathBuf>,
    sprite_descriptor: Option<PathBuf>,
    #[serde(default = "default_viewport_width")]
    viewport_width: f32,
    #[serde(default = "default_viewport_height")]
    viewport_height: f32,
    #[serde(default = "default_frame_rate")]
    frame_rate: u32,
    run_seconds: Option<u64>,
    seed: Option<u64>,
    #[serde(default)]
    tuning: Tuning,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            sprite_descriptor: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            frame_rate: default_frame_rate(),
            run_seconds: None,
            seed: None,
            tuning: Tuning::default(),
        }
    }
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        Settings {
            data_dir: raw.data_dir,
            sprite_descriptor: raw.sprite_descriptor,
            viewport_width: finite_or(raw.viewport_width, default_viewport_width()).max(1.0),
            viewport_height: finite_or(raw.viewport_height, default_viewport_height()).max(1.0),
            frame_rate: raw.frame_rate.clamp(1, 240),
            run_seconds: raw.run_seconds,
            seed: raw.seed,
            tuning: raw.tuning.sanitized(),
        }
    }
}

fn default_viewport_width() -> f32 {
    1280.0
}

fn default_viewport_height() -> f32 {
    720.0
}

fn default_frame_rate() -> u32 {
    60
}

fn finite_or<T: Into<f64> + Copy>(value: T, fallback: T) -> T {
    if value.into().is_finite() {
        value
    } else {
        fallback
    }
}

/// Builds the figment used to extract [`Settings`].
pub fn figment(file: Option<&Path>) -> Figment {
    let mut figment = Figment::new();
    if let Some(file) = file {
        figment = figment.merge(Json::file(file));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Extracts settings, surfacing extraction failures.
pub fn try_load_settings(file: Option<&Path>) -> Result<Settings, ConfigError> {
    figment(file)
        .extract::<Settings>()
        .map_err(|e| ConfigError::Extract(Box::new(e)))
}

/// Extracts settings, falling back to defaults when the sources are malformed.
pub fn load_settings(file: Option<&Path>) -> Settings {
    match try_load_settings(file) {
        Ok(settings) => settings,
        Err(error) => {
            warn!(%error, "Configuration could not be extracted, using defaults");
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_probabilities() {
        let mut tuning = Tuning::default();
        tuning.motion.jump_chance = 3.0;
        tuning.emotion.sleep_chance = -1.0;
        tuning.activity.input_divisor = 0.0;

        let tuning = tuning.sanitized();
        assert_eq!(tuning.motion.jump_chance, 1.0);
        assert_eq!(tuning.emotion.sleep_chance, 0.0);
        assert_eq!(tuning.activity.input_divisor, 1.0);
    }

    #[test]
    fn test_sanitize_replaces_non_finite() {
        let mut tuning = Tuning::default();
        tuning.growth.danger_threshold = f64::NAN;
        assert_eq!(tuning.sanitized().growth.danger_threshold, 25.0);
    }

    #[test]
    fn test_sanitize_restores_motion_physics() {
        let mut tuning = Tuning::default();
        tuning.motion.gravity = f32::NAN;
        tuning.motion.walk_speed = f32::INFINITY;
        tuning.motion.jump_velocity = f32::NEG_INFINITY;

        let motion = tuning.sanitized().motion;
        assert_eq!(motion.gravity, 1550.0);
        assert_eq!(motion.walk_speed, 85.0);
        assert_eq!(motion.jump_velocity, -420.0);
    }

    #[test]
    fn test_expression_weight_lookup() {
        let weights = ExpressionWeights::default();
        assert_eq!(weights.weight_for(Some("neutral")), 8);
        assert_eq!(weights.weight_for(Some("happy_2")), 1);
        assert_eq!(weights.weight_for(None), 1);
    }
}
