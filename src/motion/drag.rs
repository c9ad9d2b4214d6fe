//! Pointer drag gestures: pick up, move, and release (tap or throw).

use circular_buffer::CircularBuffer;
use glam::Vec2;

/// Minimum sample spacing used for velocity, in milliseconds.
const MIN_SAMPLE_SPACING_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: Vec2,
    pub at_ms: f64,
}

/// How a finished gesture should be treated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragRelease {
    /// The pointer never travelled past the drag threshold.
    Tap,
    /// The pet was carried; `velocity` is the pointer velocity at release in px/s.
    Throw { velocity: Vec2 },
}

/// One in-progress drag of one pet instance.
#[derive(Debug, Clone)]
pub struct DragGesture {
    pet_id: String,
    start: Vec2,
    origin: Vec2,
    samples: CircularBuffer<2, PointerSample>,
    moved: bool,
    velocity: Vec2,
}

impl DragGesture {
    /// Starts a drag at `pointer`, holding a pet currently at `origin`.
    pub fn begin(pet_id: impl Into<String>, pointer: Vec2, origin: Vec2, now_ms: f64) -> Self {
        let mut samples = CircularBuffer::new();
        samples.push_back(PointerSample {
            position: pointer,
            at_ms: now_ms,
        });
        Self {
            pet_id: pet_id.into(),
            start: pointer,
            origin,
            samples,
            moved: false,
            velocity: Vec2::ZERO,
        }
    }

    pub fn pet_id(&self) -> &str {
        &self.pet_id
    }

    pub fn moved(&self) -> bool {
        self.moved
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Records a pointer move and returns the pet's new, unclamped position.
    ///
    /// Velocity is measured against the previous sample only, so a pause before release
    /// produces a gentle drop.
    pub fn update(&mut self, pointer: Vec2, now_ms: f64, threshold: f32) -> Vec2 {
        if let Some(previous) = self.samples.back().copied() {
            let dt_secs = (now_ms - previous.at_ms).max(MIN_SAMPLE_SPACING_MS) / 1000.0;
            self.velocity = (pointer - previous.position) / dt_secs as f32;
        }
        self.samples.push_back(PointerSample {
            position: pointer,
            at_ms: now_ms,
        });

        let delta = pointer - self.start;
        if delta.x.abs() >= threshold || delta.y.abs() >= threshold {
            self.moved = true;
        }
        self.origin + delta
    }

    pub fn finish(self) -> DragRelease {
        if self.moved {
            DragRelease::Throw {
                velocity: self.velocity,
            }
        } else {
            DragRelease::Tap
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_wiggle_is_a_tap() {
        let mut drag = DragGesture::begin("main", Vec2::new(10.0, 10.0), Vec2::ZERO, 0.0);
        drag.update(Vec2::new(12.0, 11.0), 16.0, 4.0);
        assert_eq!(drag.finish(), DragRelease::Tap);
    }

    #[test]
    fn test_velocity_uses_latest_pair() {
        let mut drag = DragGesture::begin("main", Vec2::ZERO, Vec2::new(100.0, 100.0), 0.0);
        let position = drag.update(Vec2::new(50.0, 0.0), 100.0, 4.0);
        assert_eq!(position, Vec2::new(150.0, 100.0));
        drag.update(Vec2::new(60.0, -10.0), 110.0, 4.0);
        assert_eq!(drag.velocity(), Vec2::new(1000.0, -1000.0));
    }

    #[test]
    fn test_simultaneous_samples_do_not_divide_by_zero() {
        let mut drag = DragGesture::begin("main", Vec2::ZERO, Vec2::ZERO, 5.0);
        drag.update(Vec2::new(2.0, 0.0), 5.0, 4.0);
        assert_eq!(drag.velocity(), Vec2::new(2000.0, 0.0));
    }
}
