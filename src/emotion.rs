//! Emotion-aware frame selection.
//!
//! The main pet shows frames matching its mood, derived from its stats and how long it has been
//! left alone. Buddies cycle through weighted idle expressions instead.

use rand::seq::IndexedRandom;
use rand::Rng;
use strum_macros::{Display, IntoStaticStr};
use tracing::debug;

use crate::config::EmotionTuning;
use crate::growth::Stats;
use crate::motion::{Motion, MotionState};
use crate::sprite::SpriteProfile;

/// The main pet's mood. Frames whose emotion id starts with the mode's name are preferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum EmotionMode {
    #[default]
    Neutral,
    Happy,
    Tired,
    Sleep,
    Dirty,
}

impl EmotionMode {
    pub fn prefix(self) -> &'static str {
        self.into()
    }
}

/// Tracks user interaction to tell an attended pet from a neglected one.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodClock {
    last_interaction_at: f64,
    inactive_mode: EmotionMode,
    next_reroll_at: f64,
}

impl MoodClock {
    pub fn new(now: f64) -> Self {
        Self {
            last_interaction_at: now,
            inactive_mode: EmotionMode::Neutral,
            next_reroll_at: 0.0,
        }
    }

    pub fn mark_interaction(&mut self, now: f64) {
        self.last_interaction_at = now;
    }

    pub fn last_interaction_at(&self) -> f64 {
        self.last_interaction_at
    }

    /// The current mood. Stat conditions win over inactivity, checked in order dirty, tired,
    /// happy. A neglected pet re-rolls between sleepy and neutral at a fixed cadence.
    pub fn mode<R: Rng + ?Sized>(&mut self, stats: &Stats, now: f64, tuning: &EmotionTuning, rng: &mut R) -> EmotionMode {
        if stats.cleanliness <= tuning.dirty_threshold {
            return EmotionMode::Dirty;
        }
        if stats.health <= tuning.tired_threshold {
            return EmotionMode::Tired;
        }
        if stats.happiness >= tuning.happy_threshold {
            return EmotionMode::Happy;
        }

        if now - self.last_interaction_at >= tuning.inactivity_ms {
            if now >= self.next_reroll_at {
                self.inactive_mode = if rng.random_bool(tuning.sleep_chance) {
                    EmotionMode::Sleep
                } else {
                    EmotionMode::Neutral
                };
                self.next_reroll_at = now + tuning.inactive_reroll_ms;
            }
            return self.inactive_mode;
        }

        self.inactive_mode = EmotionMode::Neutral;
        self.next_reroll_at = 0.0;
        EmotionMode::Neutral
    }
}

/// A frame chosen for a mood, valid until `switch_at`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pick {
    pub mode: EmotionMode,
    pub frame: usize,
    pub switch_at: f64,
}

/// The main pet's frame selection. Because each pick carries the mode it was made for, a mood
/// change always forces a fresh pick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum EmotionState {
    #[default]
    Unset,
    Grounded(Pick),
    /// While jumping or falling the drawn frame is frozen at `locked`.
    Airborne { pick: Pick, locked: usize },
}

impl EmotionState {
    pub fn pick(&self) -> Option<&Pick> {
        match self {
            EmotionState::Unset => None,
            EmotionState::Grounded(pick) | EmotionState::Airborne { pick, .. } => Some(pick),
        }
    }

    /// Resolves the main pet's frame for this animation frame.
    ///
    /// `last_drawn` is the frame shown on the previous animation frame; it becomes the airborne
    /// lock when a jump or fall begins.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve<R: Rng + ?Sized>(
        &mut self,
        profile: &SpriteProfile,
        state: MotionState,
        mode: EmotionMode,
        last_drawn: Option<usize>,
        now: f64,
        tuning: &EmotionTuning,
        rng: &mut R,
    ) -> usize {
        let runtime = &profile.state(state).frames;
        let matched: Vec<usize> = runtime
            .iter()
            .copied()
            .filter(|&frame| profile.emotion_id(frame).is_some_and(|id| id.starts_with(mode.prefix())))
            .collect();
        let pool: &[usize] = if matched.is_empty() { runtime } else { &matched };
        let switch_ms = if mode == EmotionMode::Happy {
            tuning.happy_switch_ms
        } else {
            tuning.default_switch_ms
        };

        let previous = self.pick().copied().filter(|pick| pick.mode == mode);
        let pick = match previous {
            Some(pick) if pool.contains(&pick.frame) && now < pick.switch_at => pick,
            previous => {
                let frame = pick_different(pool, previous.map(|pick| pick.frame), rng);
                if previous.is_none() {
                    debug!(%mode, frame, "Emotion frame picked for new mood");
                }
                Pick {
                    mode,
                    frame,
                    switch_at: now + switch_ms,
                }
            }
        };

        if state.is_airborne() {
            let frame_count = profile.frame_count();
            let locked = match *self {
                EmotionState::Airborne { locked, .. } if locked < frame_count => locked,
                _ => last_drawn.filter(|&frame| frame < frame_count).unwrap_or(pick.frame),
            };
            *self = EmotionState::Airborne { pick, locked };
            return locked;
        }

        *self = EmotionState::Grounded(pick);
        if state == MotionState::Drag {
            return pool.first().copied().unwrap_or(pick.frame);
        }
        pick.frame
    }
}

/// A uniformly random frame from `frames`, avoiding `previous` when there is any alternative.
pub fn pick_different<R: Rng + ?Sized>(frames: &[usize], previous: Option<usize>, rng: &mut R) -> usize {
    if frames.len() <= 1 {
        return frames.first().copied().unwrap_or(0);
    }
    let filtered: Vec<usize> = frames.iter().copied().filter(|&frame| Some(frame) != previous).collect();
    let pool = if filtered.is_empty() { frames } else { &filtered };
    pool.choose(rng).copied().unwrap_or(pool[0])
}

/// Refreshes a buddy's idle expression when its timer runs out.
///
/// Clears the expression whenever the instance is not idle, has no profile, or its idle state has
/// a single frame. The main pet never uses idle expressions; pass `None` for it.
pub fn update_idle_expression<R: Rng + ?Sized>(
    motion: &mut Motion,
    profile: Option<&SpriteProfile>,
    now: f64,
    tuning: &EmotionTuning,
    rng: &mut R,
) {
    let Some(profile) = profile else {
        motion.expression_frame = None;
        return;
    };
    let idle = &profile.state(MotionState::Idle).frames;
    if motion.state != MotionState::Idle || idle.len() <= 1 {
        motion.expression_frame = None;
        return;
    }
    if motion.expression_frame.is_some() && now < motion.next_expression_at {
        return;
    }

    let candidates: Vec<usize> = idle.iter().copied().filter(|&frame| Some(frame) != motion.expression_frame).collect();
    let pool: &[usize] = if candidates.is_empty() { idle } else { &candidates };
    let weights = &tuning.expression_weights;
    let next = pool
        .choose_weighted(rng, |&frame| weights.weight_for(profile.emotion_id(frame)))
        .copied()
        .unwrap_or(idle[0]);

    motion.expression_frame = Some(next);
    motion.next_expression_at = now + tuning.expression_interval.sample(rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_different_avoids_previous() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(pick_different(&[3, 9], Some(3), &mut rng), 9);
        }
    }

    #[test]
    fn test_pick_different_single_frame() {
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(pick_different(&[4], Some(4), &mut rng), 4);
        assert_eq!(pick_different(&[], None, &mut rng), 0);
    }

    #[test]
    fn test_stat_moods_take_priority() {
        let mut rng = SmallRng::seed_from_u64(1);
        let tuning = EmotionTuning::default();
        let mut clock = MoodClock::new(0.0);
        let mut stats = Stats::default();
        stats.cleanliness = 60.0;
        stats.health = 10.0;
        assert_eq!(clock.mode(&stats, 100_000.0, &tuning, &mut rng), EmotionMode::Dirty);
        stats.cleanliness = 80.0;
        assert_eq!(clock.mode(&stats, 100_000.0, &tuning, &mut rng), EmotionMode::Tired);
    }

    #[test]
    fn test_attended_pet_is_neutral() {
        let mut rng = SmallRng::seed_from_u64(1);
        let tuning = EmotionTuning::default();
        let mut clock = MoodClock::new(0.0);
        let mut stats = Stats::default();
        stats.happiness = 80.0;
        assert_eq!(clock.mode(&stats, 44_999.0, &tuning, &mut rng), EmotionMode::Neutral);
    }
}
