//! # Fixed Timestep Driver
//!
//! Runs [`Pass::FixedUpdate`](super::Pass::FixedUpdate) at a constant rate
//! regardless of frame rate, then the variable-rate update pass.
//!
//! ## Design
//!
//! Each frame:
//! - Add the frame delta to an accumulator
//! - Run the fixed pass once per whole step in the accumulator, up to
//!   `max_steps`; leftover whole steps are dropped (spiral-of-death guard)
//! - Run the update pass once with the frame delta
//!
//! Draw stays with the caller, who can use [`FixedTimestep::alpha`] to
//! interpolate between fixed states.

use crate::config::TimestepConfig;
use crate::ecs::World;
use crate::error::{EcsError, EcsResult};

/// What one [`FixedTimestep::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Fixed steps run this frame.
    pub fixed_steps: u32,
    /// Whole steps discarded because the cap was reached.
    pub dropped_steps: u32,
}

/// Fixed-timestep accumulator.
#[derive(Clone, Debug)]
pub struct FixedTimestep {
    step: f32,
    max_steps: u32,
    accumulator: f32,
    total_steps: u64,
}

impl FixedTimestep {
    /// Creates a driver from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the step is not a positive
    /// finite number or `max_steps` is zero.
    pub fn new(config: &TimestepConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Creates a driver from the world's configuration, which was validated
    /// when the world was built.
    #[must_use]
    pub fn for_world(world: &World) -> Self {
        Self::from_valid(&world.config().timestep)
    }

    fn from_valid(config: &TimestepConfig) -> Self {
        Self {
            step: config.step_seconds,
            max_steps: config.max_steps,
            accumulator: 0.0,
            total_steps: 0,
        }
    }

    /// Length of one fixed step in seconds.
    #[inline]
    #[must_use]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Fraction of a step left in the accumulator, in `[0, 1)`.
    #[inline]
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }

    /// Fixed steps run since creation.
    #[inline]
    #[must_use]
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Accounts for `frame_delta` without touching a world.
    ///
    /// Negative or non-finite deltas count as zero. Whole steps are counted
    /// by division, so a huge delta costs the same as a small one.
    pub fn advance(&mut self, frame_delta: f32) -> TickReport {
        if frame_delta.is_finite() && frame_delta > 0.0 {
            self.accumulator += frame_delta;
        }

        let remainder = self.accumulator % self.step;
        // Float-to-int `as` saturates.
        let due = ((self.accumulator - remainder) / self.step).round() as u64;
        self.accumulator = remainder;

        let fixed_steps = due.min(u64::from(self.max_steps));
        let report = TickReport {
            fixed_steps: u32::try_from(fixed_steps).unwrap_or(self.max_steps),
            dropped_steps: u32::try_from(due - fixed_steps).unwrap_or(u32::MAX),
        };
        self.total_steps += fixed_steps;

        if report.dropped_steps > 0 {
            tracing::warn!(
                "fixed timestep fell behind: dropped {} steps",
                report.dropped_steps
            );
        }
        report
    }

    /// Runs one frame: the fixed pass as many times as due, then the update
    /// pass with `frame_delta`.
    pub fn tick(&mut self, world: &mut World, frame_delta: f32) -> TickReport {
        let report = self.advance(frame_delta);
        for _ in 0..report.fixed_steps {
            world.fixed_update(self.step);
        }
        world.update(frame_delta);
        report
    }
}
