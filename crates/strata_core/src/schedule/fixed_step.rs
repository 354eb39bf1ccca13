//! # Fixed-Step Clock
//!
//! Turns variable frame deltas into a whole number of fixed steps.
//!
//! ## Design
//!
//! - Frame time is added to an accumulator
//! - Each step consumes exactly one `step` of accumulated time
//! - At most `max_steps` run per frame; the excess is dropped so a long
//!   stall cannot snowball into ever-longer frames

/// Fixed-timestep accumulator.
#[derive(Clone, Debug)]
pub struct FixedStep {
    /// Seconds per fixed step.
    step: f32,
    /// Upper bound on steps per frame.
    max_steps: u32,
    /// Time carried over to the next frame.
    accumulator: f32,
    /// Total steps produced.
    step_count: u64,
    /// Catch-up statistics.
    stats: FixedStepStats,
}

/// Catch-up statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FixedStepStats {
    /// Frames that hit the step limit.
    pub clamped_frames: u64,
    /// Seconds discarded because of the step limit.
    pub dropped_time: f64,
}

impl FixedStep {
    /// Creates a clock producing steps of `step` seconds.
    ///
    /// # Panics
    ///
    /// Panics if `step` is not positive or `max_steps` is zero.
    #[must_use]
    pub fn new(step: f32, max_steps: u32) -> Self {
        assert!(step > 0.0, "fixed step must be positive");
        assert!(max_steps > 0, "max_steps must be at least 1");

        Self {
            step,
            max_steps,
            accumulator: 0.0,
            step_count: 0,
            stats: FixedStepStats::default(),
        }
    }

    /// Creates a 60 Hz clock allowing five catch-up steps.
    #[must_use]
    pub fn sixty_hz() -> Self {
        Self::new(1.0 / 60.0, 5)
    }

    /// Adds `frame_dt` seconds and returns how many fixed steps are due.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }

        if self.accumulator >= self.step {
            // Keep the fractional part so interpolation stays smooth.
            let dropped = self.accumulator - self.accumulator % self.step;
            self.accumulator -= dropped;
            self.stats.clamped_frames += 1;
            self.stats.dropped_time += f64::from(dropped);
            tracing::debug!(dropped_seconds = dropped, "fixed-step catch-up clamped");
        }

        self.step_count += u64::from(steps);
        steps
    }

    /// Fraction of a step currently accumulated, in `[0, 1)`.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }

    /// Seconds per step.
    #[must_use]
    pub const fn step(&self) -> f32 {
        self.step
    }

    /// Upper bound on steps per frame.
    #[must_use]
    pub const fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Total steps produced.
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Catch-up statistics.
    #[must_use]
    pub const fn stats(&self) -> &FixedStepStats {
        &self.stats
    }

    /// Drops accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::sixty_hz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_partial_frames() {
        let mut clock = FixedStep::new(0.1, 5);
        assert_eq!(clock.advance(0.05), 0);
        assert_eq!(clock.advance(0.06), 1);
        assert!((clock.alpha() - 0.1).abs() < 1e-3);
        assert_eq!(clock.step_count(), 1);
    }

    #[test]
    fn test_multiple_steps_per_frame() {
        let mut clock = FixedStep::new(0.25, 8);
        assert_eq!(clock.advance(1.0), 4);
    }

    #[test]
    fn test_step_limit_drops_excess() {
        let mut clock = FixedStep::new(0.1, 3);
        assert_eq!(clock.advance(1.05), 3);
        assert!(clock.alpha() < 1.0);
        assert_eq!(clock.stats().clamped_frames, 1);
        assert!(clock.stats().dropped_time > 0.6);

        assert_eq!(clock.advance(0.0), 0);
    }

    #[test]
    fn test_negative_delta_ignored() {
        let mut clock = FixedStep::sixty_hz();
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.alpha(), 0.0);
    }

    #[test]
    #[should_panic(expected = "fixed step must be positive")]
    fn test_zero_step_rejected() {
        let _ = FixedStep::new(0.0, 1);
    }
}
