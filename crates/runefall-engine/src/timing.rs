//! Frame timing.
//!
//! Provides the fixed-timestep accumulator that splits frame deltas into
//! physics steps, and wall-clock pacing for realtime runs.

use std::time::{Duration, Instant};

/// Most physics steps run for a single frame.
const MAX_STEPS_PER_FRAME: u32 = 10;

/// Fixed timestep accumulator.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    /// Fixed timestep delta (for physics)
    fixed_dt: f32,
    /// Maximum delta time to prevent spiral of death
    max_dt: f32,
    /// Unconsumed time
    accumulator: f32,
    /// Total simulated time
    elapsed: f32,
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(1.0 / 60.0, 0.25)
    }
}

impl FixedStepClock {
    /// Creates a clock with the given step length and frame delta cap.
    #[must_use]
    pub fn new(fixed_dt: f32, max_dt: f32) -> Self {
        let fixed_dt = fixed_dt.max(0.001); // Minimum 1ms
        Self {
            fixed_dt,
            max_dt: max_dt.max(fixed_dt),
            accumulator: 0.0,
            elapsed: 0.0,
        }
    }

    /// Get the fixed timestep value.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Total time fed to the clock, after clamping.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Clamps a raw frame delta.
    #[must_use]
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if dt.is_finite() {
            dt.clamp(0.0, self.max_dt)
        } else {
            0.0
        }
    }

    /// Accumulate time for fixed timestep updates.
    /// Returns the number of fixed updates that should be performed.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        let dt = self.clamp_dt(dt);
        self.elapsed += dt;
        self.accumulator += dt;

        let mut count = 0;
        while self.accumulator >= self.fixed_dt && count < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind: drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Fraction of a step left in the accumulator.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_dt
    }

    /// Reset timing.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.elapsed = 0.0;
    }
}

/// Wall-clock frame pacing.
#[derive(Debug)]
pub struct FramePacer {
    /// Time budget per frame
    frame_budget: Duration,
    /// Time of last frame start
    last_frame: Instant,
}

impl FramePacer {
    /// Create a pacer for the given frame rate.
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        Self {
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1))),
            last_frame: Instant::now(),
        }
    }

    /// Calculate delta time since last frame.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt
    }

    /// Sleep for the remainder of the frame budget.
    pub fn sleep_remainder(&self) {
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
    }
}
