//! The two clocks driving the simulation: a fixed-rate wall clock for growth and activity, and
//! a variable-rate frame clock for motion and animation.

use std::time::Duration;

use tracing::{debug, trace};

use crate::config::ActivityTuning;
use crate::constants::{MAX_CLOCK_STEP_SECS, MAX_FRAME_STEP_SECS};

const GROWTH_TICK: Duration = Duration::from_secs(60);

/// Fires every `interval`, carrying partial progress over between firings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTimer {
    timer: Duration,
    interval: Duration,
}

impl IntervalTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            timer: Duration::ZERO,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Adds `elapsed` and returns how many whole intervals completed.
    pub fn tick(&mut self, elapsed: Duration) -> u32 {
        self.timer += elapsed;
        let mut fired = 0;
        while self.timer >= self.interval {
            // Subtract rather than reset so the remainder counts towards the next firing.
            self.timer -= self.interval;
            fired += 1;
        }
        fired
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Progress towards the next firing.
    pub fn pending(&self) -> Duration {
        self.timer
    }
}

/// How many of each fixed-rate event are due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Due {
    pub minutes: u32,
    pub heartbeats: u32,
    pub samples: u32,
}

impl Due {
    pub fn is_empty(&self) -> bool {
        self.minutes == 0 && self.heartbeats == 0 && self.samples == 0
    }
}

/// The fixed-rate clock: a growth tick every minute, an activity heartbeat every second and an
/// activity sample every five minutes by default.
#[derive(Debug, Clone)]
pub struct Scheduler {
    growth: IntervalTimer,
    heartbeat: IntervalTimer,
    sample: IntervalTimer,
}

impl Scheduler {
    pub fn new(tuning: &ActivityTuning) -> Self {
        Self {
            growth: IntervalTimer::new(GROWTH_TICK),
            heartbeat: IntervalTimer::new(Duration::from_secs(tuning.heartbeat_secs)),
            sample: IntervalTimer::new(Duration::from_secs(tuning.sample_interval_secs)),
        }
    }

    /// Adds `elapsed` to every timer. Gaps beyond [`MAX_CLOCK_STEP_SECS`] are clamped, so time
    /// spent suspended is neither counted as activity nor replayed as decay.
    pub fn advance(&mut self, elapsed: Duration) -> Due {
        let max_step = Duration::from_secs(MAX_CLOCK_STEP_SECS);
        let elapsed = if elapsed > max_step {
            debug!(gap_secs = elapsed.as_secs(), "Clock gap treated as a pause");
            max_step
        } else {
            elapsed
        };
        let due = Due {
            minutes: self.growth.tick(elapsed),
            heartbeats: self.heartbeat.tick(elapsed),
            samples: self.sample.tick(elapsed),
        };
        if !due.is_empty() {
            trace!(?due, "Fixed-rate events due");
        }
        due
    }
}

/// Turns host animation timestamps into clamped frame deltas.
///
/// Restarting drops the baseline, so the first frame after a pause advances by zero instead of
/// by the whole pause.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous frame, clamped to `[0, MAX_FRAME_STEP_SECS]`.
    pub fn advance(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms.replace(now_ms) {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_STEP_SECS)
        } else {
            0.0
        }
    }

    pub fn restart(&mut self) {
        debug!("Frame clock restarted");
        self.last_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.last_ms.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_keeps_remainder() {
        let mut timer = IntervalTimer::new(Duration::from_secs(1));
        assert_eq!(timer.tick(Duration::from_millis(1500)), 1);
        assert_eq!(timer.pending(), Duration::from_millis(500));
        assert_eq!(timer.tick(Duration::from_millis(600)), 1);
        assert_eq!(timer.tick(Duration::from_secs(3)), 3);
    }

    #[test]
    fn test_long_gap_is_a_pause() {
        let tuning = ActivityTuning::default();
        let mut scheduler = Scheduler::new(&tuning);
        let due = scheduler.advance(Duration::from_secs(8 * 3600));
        assert_eq!(
            due,
            Due {
                minutes: 0,
                heartbeats: MAX_CLOCK_STEP_SECS as u32,
                samples: 0,
            }
        );
    }

    #[test]
    fn test_frame_clock_clamps_and_restarts() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(1000.0), 0.0);
        assert!((clock.advance(1016.0) - 0.016).abs() < 1e-6);
        assert_eq!(clock.advance(9000.0), MAX_FRAME_STEP_SECS);
        assert_eq!(clock.advance(8000.0), 0.0);
        clock.restart();
        assert_eq!(clock.advance(60_000.0), 0.0);
    }
}
