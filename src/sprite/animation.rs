//! Time-based frame selection for state animations.

use crate::config::EmotionTuning;
use crate::motion::MotionState;
use crate::sprite::profile::StateFrames;

/// Frames per second for `state`, sped up while walking in proportion to horizontal speed.
pub fn effective_fps(state: MotionState, frames: &StateFrames, vx: f32, tuning: &EmotionTuning) -> f32 {
    if state != MotionState::Walk {
        return frames.fps;
    }
    let boosted = frames.fps + vx.abs() / tuning.walk_fps_divisor;
    boosted.max(frames.fps).min(tuning.max_walk_fps)
}

/// Milliseconds each frame stays on screen. Always positive.
pub fn frame_duration_ms(fps: f32) -> f64 {
    1000.0 / f64::from(fps.max(1.0))
}

/// The frame shown `elapsed_ms` after the state began.
///
/// Looping sequences wrap around; others hold their last frame.
pub fn frame_at(frames: &StateFrames, elapsed_ms: f64, fps: f32) -> usize {
    let Some(&first) = frames.frames.first() else {
        return 0;
    };
    let step = (elapsed_ms.max(0.0) / frame_duration_ms(fps)).floor() as usize;
    let offset = if frames.looping {
        step % frames.frames.len()
    } else {
        step.min(frames.frames.len() - 1)
    };
    frames.frames.get(offset).copied().unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn frames(looping: bool) -> StateFrames {
        StateFrames {
            frames: smallvec![4, 5, 6],
            fps: 10.0,
            looping,
        }
    }

    #[test]
    fn test_looping_wraps() {
        assert_eq!(frame_at(&frames(true), 0.0, 10.0), 4);
        assert_eq!(frame_at(&frames(true), 250.0, 10.0), 6);
        assert_eq!(frame_at(&frames(true), 300.0, 10.0), 4);
    }

    #[test]
    fn test_non_looping_holds_last() {
        assert_eq!(frame_at(&frames(false), 10_000.0, 10.0), 6);
    }

    #[test]
    fn test_negative_elapsed_is_first_frame() {
        assert_eq!(frame_at(&frames(true), -50.0, 10.0), 4);
    }

    #[test]
    fn test_walk_boost_is_capped() {
        let tuning = EmotionTuning::default();
        let walk = StateFrames {
            frames: smallvec![0],
            fps: 8.0,
            looping: true,
        };
        assert_eq!(effective_fps(MotionState::Walk, &walk, 85.0, &tuning), 8.0 + 85.0 / 35.0);
        assert_eq!(effective_fps(MotionState::Walk, &walk, 1000.0, &tuning), 16.0);
        assert_eq!(effective_fps(MotionState::Idle, &walk, 1000.0, &tuning), 8.0);
    }
}
