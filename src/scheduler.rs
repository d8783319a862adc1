//! Per-frame driver for the active theme.
//!
//! The host (the eframe repaint loop, or the simulator's fixed-step loop)
//! calls [`AnimationLoop::tick`] once per frame. Pausing only sets a flag that
//! the next tick checks; nothing is preempted.

use std::time::{Duration, Instant};

use crate::theme::ThemeManager;
use crate::traits::Canvas;

/// Longest frame delta fed to the simulation, so a stalled window does not
/// teleport every particle.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cadence {
    /// Delta measured between host-provided timestamps.
    Host,
    /// Constant delta per tick regardless of wall time.
    Fixed(Duration),
}

#[derive(Debug)]
pub struct AnimationLoop {
    cadence: Cadence,
    last_tick: Option<Instant>,
    paused: bool,
    frames: u64,
}

impl AnimationLoop {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            last_tick: None,
            paused: false,
            frames: 0,
        }
    }

    /// Fixed 60 Hz cadence.
    pub fn fixed_60hz() -> Self {
        Self::new(Cadence::Fixed(Duration::from_micros(16_667)))
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        // Time spent paused is not simulated
        self.last_tick = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of frames that reached the theme.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Seconds to simulate for a tick at `now`.
    pub fn delta(&mut self, now: Instant) -> f32 {
        let delta = match self.cadence {
            Cadence::Fixed(step) => step,
            Cadence::Host => match self.last_tick {
                Some(last) => now.saturating_duration_since(last),
                None => Duration::ZERO,
            },
        };
        self.last_tick = Some(now);
        delta.min(MAX_FRAME_DELTA).as_secs_f32()
    }

    /// Runs one frame. Returns whether the active theme was updated and drawn.
    pub fn tick(&mut self, now: Instant, manager: &ThemeManager, canvas: &mut dyn Canvas) -> bool {
        if self.paused {
            return false;
        }
        let dt = self.delta(now);
        let drawn = manager.frame(dt, canvas);
        if drawn {
            self.frames += 1;
        }
        drawn
    }
}

impl Default for AnimationLoop {
    fn default() -> Self {
        Self::new(Cadence::Host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_delta_is_measured_and_clamped() {
        let mut clock = AnimationLoop::new(Cadence::Host);
        let start = Instant::now();
        assert_eq!(clock.delta(start), 0.0);

        let dt = clock.delta(start + Duration::from_millis(20));
        assert!((dt - 0.020).abs() < 1e-6);

        let dt = clock.delta(start + Duration::from_secs(5));
        assert!((dt - MAX_FRAME_DELTA.as_secs_f32()).abs() < 1e-6);
    }

    #[test]
    fn test_fixed_delta_ignores_wall_time() {
        let mut clock = AnimationLoop::fixed_60hz();
        let now = Instant::now();
        let a = clock.delta(now);
        let b = clock.delta(now);
        assert_eq!(a, b);
        assert!((a - 1.0 / 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_resume_forgets_paused_time() {
        let mut clock = AnimationLoop::new(Cadence::Host);
        let start = Instant::now();
        clock.delta(start);
        clock.pause();
        assert!(clock.is_paused());
        clock.resume();
        assert_eq!(clock.delta(start + Duration::from_secs(30)), 0.0);
    }
}
