//! Per-instance physics: the idle/walk/jump/fall/drag state machine.
//!
//! Motion records are transient. They are created on demand for each pet instance, never
//! persisted, and advanced once per animation frame by [`step`].

pub mod drag;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};
use tracing::trace;

use crate::config::{EmotionTuning, MotionTuning};

/// The physics state of one instance, doubling as its visual state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter, EnumCount, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum MotionState {
    #[default]
    Idle,
    Walk,
    Jump,
    Fall,
    Drag,
}

impl MotionState {
    pub const ALL: [MotionState; 5] = [
        MotionState::Idle,
        MotionState::Walk,
        MotionState::Jump,
        MotionState::Fall,
        MotionState::Drag,
    ];

    pub const fn is_airborne(self) -> bool {
        matches!(self, MotionState::Jump | MotionState::Fall)
    }
}

/// How an instance moves when nobody is touching it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MotionPolicy {
    /// Wanders, walks and jumps on its own.
    #[default]
    Random,
    /// Sits still on the ground. An instance that is airborne when the policy applies finishes
    /// its fall first.
    Fixed,
    /// Makes no decisions of its own but still obeys physics after being thrown.
    Passive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn from_velocity(vx: f32) -> Self {
        if vx < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// Transient motion bookkeeping for one instance. Times are animation-clock milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Motion {
    pub state: MotionState,
    pub velocity: Vec2,
    pub facing: Facing,
    /// Set while a drag gesture holds this instance; nothing else may move it meanwhile.
    pub dragging: bool,
    /// When a grounded fall turns into idle.
    pub landing_until: Option<f64>,
    pub next_decision_at: f64,
    pub state_started_at: f64,
    /// Idle expression chosen for buddies.
    pub expression_frame: Option<usize>,
    pub next_expression_at: f64,
}

impl Motion {
    pub fn new<R: Rng + ?Sized>(now: f64, motion: &MotionTuning, emotion: &EmotionTuning, rng: &mut R) -> Self {
        Self {
            state: MotionState::Idle,
            velocity: Vec2::ZERO,
            facing: Facing::Right,
            dragging: false,
            landing_until: None,
            next_decision_at: now + motion.first_decision_ms,
            state_started_at: now,
            expression_frame: None,
            next_expression_at: now + emotion.first_expression.sample(rng),
        }
    }

    /// Switches state, restarting the state clock. Re-entering the current state is a no-op.
    pub fn transition(&mut self, next: MotionState, now: f64) {
        if self.state == next {
            return;
        }
        trace!(from = %self.state, to = %next, "Motion state changed");
        self.state = next;
        self.state_started_at = now;
    }

    /// Milliseconds spent in the current state.
    pub fn elapsed_in_state(&self, now: f64) -> f64 {
        (now - self.state_started_at).max(0.0)
    }

    /// Settles into a grounded idle pose with no velocity.
    pub fn rest(&mut self, now: f64) {
        self.transition(MotionState::Idle, now);
        self.velocity = Vec2::ZERO;
        self.landing_until = None;
    }
}

/// Where an instance may be, given the viewport and its rendered size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub max_x: f32,
    pub max_y: f32,
    /// The y coordinate a grounded instance rests at.
    pub ground_y: f32,
}

impl Bounds {
    /// `inset` is the profile's ground inset in pixels, which lets transparent padding at the
    /// bottom of a sprite sink below the ground line.
    pub fn new(viewport: Vec2, size: f32, inset: f32, ground_margin: f32) -> Self {
        Self {
            max_x: (viewport.x - size).max(0.0),
            max_y: (viewport.y - size + inset).max(0.0),
            ground_y: (viewport.y - size - ground_margin + inset).max(0.0),
        }
    }

    pub fn clamp(&self, position: Vec2) -> Vec2 {
        Vec2::new(position.x.clamp(0.0, self.max_x), position.y.clamp(0.0, self.max_y))
    }
}

fn random_walk_velocity<R: Rng + ?Sized>(tuning: &MotionTuning, rng: &mut R) -> f32 {
    if rng.random_bool(0.5) {
        tuning.walk_speed
    } else {
        -tuning.walk_speed
    }
}

/// Advances one instance by `dt` seconds.
///
/// Instances held by a drag are left untouched. Position is always clamped to `bounds`, so `x`
/// never leaves `[0, max_x]`.
#[allow(clippy::too_many_arguments)]
pub fn step<R: Rng + ?Sized>(
    motion: &mut Motion,
    position: &mut Vec2,
    policy: MotionPolicy,
    bounds: &Bounds,
    dt: f32,
    now: f64,
    tuning: &MotionTuning,
    rng: &mut R,
) {
    if motion.dragging {
        return;
    }

    let ground_y = bounds.ground_y;
    if !motion.state.is_airborne() && (position.y - ground_y).abs() > 0.5 {
        position.y = ground_y;
    }

    match policy {
        MotionPolicy::Random => decide(motion, now, tuning, rng),
        MotionPolicy::Fixed if !motion.state.is_airborne() => motion.rest(now),
        MotionPolicy::Fixed | MotionPolicy::Passive => {}
    }

    if motion.velocity.x < -tuning.min_velocity {
        motion.facing = Facing::Left;
    } else if motion.velocity.x > tuning.min_velocity {
        motion.facing = Facing::Right;
    }

    match motion.state {
        MotionState::Walk => position.x += motion.velocity.x * dt,
        MotionState::Jump | MotionState::Fall => {
            motion.velocity.y += tuning.gravity * dt;
            *position += motion.velocity * dt;
            if motion.state == MotionState::Jump && motion.velocity.y > 0.0 {
                motion.transition(MotionState::Fall, now);
            }
        }
        MotionState::Idle | MotionState::Drag => {}
    }

    if motion.state != MotionState::Walk {
        motion.velocity.x *= tuning.inertia_damping;
        if motion.velocity.x.abs() < tuning.min_velocity {
            motion.velocity.x = 0.0;
        }
    }

    *position = bounds.clamp(*position);

    // Safety bound: nothing stays airborne forever, whatever its velocity.
    if motion.state.is_airborne() && motion.elapsed_in_state(now) >= tuning.max_air_ms {
        position.y = ground_y;
        motion.velocity.y = 0.0;
        motion.transition(MotionState::Fall, now);
        motion.landing_until.get_or_insert(now + tuning.landing_ms);
    }

    if motion.state.is_airborne() && position.y >= ground_y {
        position.y = ground_y;
        motion.velocity.y = 0.0;
        motion.transition(MotionState::Fall, now);
        motion.landing_until.get_or_insert(now + tuning.landing_ms);
    }

    if motion.state == MotionState::Fall && motion.landing_until.is_some_and(|at| now >= at) {
        motion.transition(MotionState::Idle, now);
        motion.landing_until = None;
        motion.velocity.x = 0.0;
        motion.next_decision_at = now + tuning.idle_after_landing.sample(rng);
    }

    if motion.state == MotionState::Walk && (position.x <= 0.0 || position.x >= bounds.max_x) {
        motion.velocity.x = if motion.velocity.x == 0.0 {
            if position.x <= 0.0 {
                tuning.walk_speed
            } else {
                -tuning.walk_speed
            }
        } else {
            -motion.velocity.x
        };
        motion.facing = Facing::from_velocity(motion.velocity.x);
        position.x = position.x.clamp(0.0, bounds.max_x);
    }

    if !motion.state.is_airborne() {
        position.y = ground_y;
        motion.velocity.y = 0.0;
        motion.landing_until = None;
    }

    if policy == MotionPolicy::Fixed && !motion.state.is_airborne() {
        motion.rest(now);
    }
}

/// Autonomous decisions of a roaming instance.
fn decide<R: Rng + ?Sized>(motion: &mut Motion, now: f64, tuning: &MotionTuning, rng: &mut R) {
    if now < motion.next_decision_at {
        return;
    }

    match motion.state {
        MotionState::Idle => {
            motion.transition(MotionState::Walk, now);
            motion.velocity.x = random_walk_velocity(tuning, rng);
            motion.next_decision_at = now + tuning.walk_decision.sample(rng);
        }
        MotionState::Walk if rng.random_bool(tuning.jump_chance) => {
            motion.transition(MotionState::Jump, now);
            if motion.velocity.x == 0.0 {
                motion.velocity.x = random_walk_velocity(tuning, rng);
            }
            motion.velocity.y = tuning.jump_velocity;
            motion.landing_until = None;
            motion.next_decision_at = now + tuning.jump_decision.sample(rng);
        }
        MotionState::Walk => {
            motion.transition(MotionState::Idle, now);
            motion.velocity.x = 0.0;
            motion.next_decision_at = now + tuning.idle_after_walk.sample(rng);
        }
        MotionState::Jump | MotionState::Fall | MotionState::Drag => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_bounds_never_negative() {
        let bounds = Bounds::new(Vec2::new(50.0, 40.0), 88.0, 0.0, 8.0);
        assert_eq!(bounds.max_x, 0.0);
        assert_eq!(bounds.max_y, 0.0);
        assert_eq!(bounds.ground_y, 0.0);
    }

    #[test]
    fn test_ground_line_includes_inset() {
        let bounds = Bounds::new(Vec2::new(800.0, 600.0), 88.0, 10.0, 8.0);
        assert_eq!(bounds.ground_y, 600.0 - 88.0 - 8.0 + 10.0);
        assert_eq!(bounds.max_y, 600.0 - 88.0 + 10.0);
    }

    #[test]
    fn test_transition_restarts_clock_only_on_change() {
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let mut motion = Motion::new(0.0, &MotionTuning::default(), &EmotionTuning::default(), &mut rng);
        motion.transition(MotionState::Idle, 500.0);
        assert_eq!(motion.state_started_at, 0.0);
        motion.transition(MotionState::Walk, 500.0);
        assert_eq!(motion.state_started_at, 500.0);
    }
}
