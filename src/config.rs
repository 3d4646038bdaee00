//! Configuration for motion synthesis.
//!
//! This module provides the [`SynthesisConfig`] struct which centralizes all
//! tunable parameters of the synthesis loop: trajectory window geometry,
//! phase interpolation, control-response rates and ease-out exponents.
//!
//! # Example
//!
//! ```
//! use phase_locomotion::{PhaseInterpolation, SynthesisConfig};
//!
//! let config = SynthesisConfig::default()
//!     .with_frame_rate(30.0)
//!     .with_interpolation(PhaseInterpolation::Linear);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.trajectory_len(), 111);
//! ```

use crate::error::{Result, SynthesisError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How effective network weights are derived from the phase control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PhaseInterpolation {
    /// Nearest lower control point, no blending.
    /// Discontinuous at every control point boundary.
    Constant,
    /// Linear blend between the two bracketing control points.
    Linear,
    /// Catmull-Rom blend over four neighbouring control points.
    /// Continuous in value and first derivative.
    #[default]
    Cubic,
}

/// Configuration for motion synthesis.
///
/// # Window Parameters
///
/// The trajectory holds `past_points + 1 + future_points` raw points, one
/// per frame. Every `sample_stride`-th point is fed to the network, so both
/// `past_points` and `future_points` must be multiples of the stride.
///
/// # Response Parameters
///
/// - `target_gain`: blend rate while the user is steering.
/// - `target_decay`: blend rate while idle (slow settle).
/// - `position_bias`/`direction_bias`/`velocity_bias`: ease-out exponents
///   shaping how strongly future points bend toward the target.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynthesisConfig {
    // Timing
    /// Ticks per second; root motion is expressed per second.
    pub frame_rate: f32,

    // Trajectory window
    /// Number of raw points behind the root.
    pub past_points: usize,

    /// Number of raw points ahead of the root.
    pub future_points: usize,

    /// Spacing between network samples in raw points.
    pub sample_stride: usize,

    // Phase function
    /// Number of phase control points stored in the parameter asset.
    pub control_points: usize,

    /// Interpolation scheme across control points.
    pub interpolation: PhaseInterpolation,

    // Control response
    /// Interpolation rate toward user intent while input is held.
    pub target_gain: f32,

    /// Interpolation rate toward user intent while idle.
    pub target_decay: f32,

    /// Heading change (radians) requested by a full turn input.
    pub max_turn_angle: f32,

    /// Ease-out exponent for future positions.
    pub position_bias: f32,

    /// Ease-out exponent for future directions.
    pub direction_bias: f32,

    /// Ease-out exponent for future velocities.
    pub velocity_bias: f32,

    // Decoding
    /// Weight of the network prediction against the dead-reckoned estimate.
    pub dead_reckoning_blend: f32,

    /// Index of the style that represents standing still.
    pub idle_style: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,

            past_points: 60,
            future_points: 50,
            sample_stride: 10,

            control_points: 50,
            interpolation: PhaseInterpolation::Cubic,

            target_gain: 0.25,
            target_decay: 0.05,
            max_turn_angle: 60f32.to_radians(),
            position_bias: 0.75,
            direction_bias: 1.25,
            velocity_bias: 1.0,

            dead_reckoning_blend: 0.5,
            idle_style: 0,
        }
    }
}

impl SynthesisConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if !(self.frame_rate > 0.0) {
            return Err(SynthesisError::invalid_config("frame_rate must be positive"));
        }
        if self.sample_stride == 0 {
            return Err(SynthesisError::invalid_config(
                "sample_stride must be at least 1",
            ));
        }
        if self.past_points < self.sample_stride || self.past_points % self.sample_stride != 0 {
            return Err(SynthesisError::invalid_config(
                "past_points must be a non-zero multiple of sample_stride",
            ));
        }
        if self.future_points < self.sample_stride || self.future_points % self.sample_stride != 0
        {
            return Err(SynthesisError::invalid_config(
                "future_points must be a non-zero multiple of sample_stride",
            ));
        }
        if self.control_points == 0 {
            return Err(SynthesisError::invalid_config(
                "control_points must be at least 1",
            ));
        }
        for (name, rate) in [
            ("target_gain", self.target_gain),
            ("target_decay", self.target_decay),
        ] {
            if !(rate > 0.0 && rate <= 1.0) {
                return Err(SynthesisError::invalid_config(format!(
                    "{name} must be in (0, 1]"
                )));
            }
        }
        for (name, bias) in [
            ("position_bias", self.position_bias),
            ("direction_bias", self.direction_bias),
            ("velocity_bias", self.velocity_bias),
        ] {
            if !(bias > 0.0) {
                return Err(SynthesisError::invalid_config(format!(
                    "{name} must be positive"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.dead_reckoning_blend) {
            return Err(SynthesisError::invalid_config(
                "dead_reckoning_blend must be in [0, 1]",
            ));
        }
        Ok(())
    }

    /// Total number of raw trajectory points.
    #[must_use]
    pub const fn trajectory_len(&self) -> usize {
        self.past_points + 1 + self.future_points
    }

    /// Index of the root ("now") point.
    #[must_use]
    pub const fn root_index(&self) -> usize {
        self.past_points
    }

    /// Number of trajectory samples fed to the network.
    #[must_use]
    pub const fn sample_count(&self) -> usize {
        (self.past_points + self.future_points) / self.sample_stride + 1
    }

    /// Sample index that coincides with the root point.
    #[must_use]
    pub const fn root_sample(&self) -> usize {
        self.past_points / self.sample_stride
    }

    /// Set the frame rate.
    #[must_use]
    pub const fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Set the trajectory window geometry.
    #[must_use]
    pub const fn with_window(mut self, past: usize, future: usize, stride: usize) -> Self {
        self.past_points = past;
        self.future_points = future;
        self.sample_stride = stride;
        self
    }

    /// Set the number of phase control points.
    #[must_use]
    pub const fn with_control_points(mut self, count: usize) -> Self {
        self.control_points = count;
        self
    }

    /// Set the phase interpolation scheme.
    #[must_use]
    pub const fn with_interpolation(mut self, interpolation: PhaseInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set the active/idle response rates.
    #[must_use]
    pub const fn with_response(mut self, gain: f32, decay: f32) -> Self {
        self.target_gain = gain;
        self.target_decay = decay;
        self
    }

    /// Set the index of the idle style.
    #[must_use]
    pub const fn with_idle_style(mut self, index: usize) -> Self {
        self.idle_style = index;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SynthesisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trajectory_len(), 111);
        assert_eq!(config.root_index(), 60);
        assert_eq!(config.sample_count(), 12);
        assert_eq!(config.root_sample(), 6);
        assert_eq!(config.interpolation, PhaseInterpolation::Cubic);
    }

    #[test]
    fn test_validation() {
        let mut config = SynthesisConfig::default();

        config.frame_rate = 0.0;
        assert!(config.validate().is_err());

        config.frame_rate = 60.0;
        config.past_points = 55;
        assert!(config.validate().is_err());

        config.past_points = 60;
        config.future_points = 0;
        assert!(config.validate().is_err());

        config.future_points = 50;
        config.target_decay = 0.0;
        assert!(config.validate().is_err());

        config.target_decay = 0.05;
        config.direction_bias = -1.0;
        assert!(config.validate().is_err());

        config.direction_bias = 1.25;
        config.dead_reckoning_blend = 1.5;
        assert!(config.validate().is_err());

        config.dead_reckoning_blend = 0.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nan_frame_rate_rejected() {
        let config = SynthesisConfig::default().with_frame_rate(f32::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = SynthesisConfig::default()
            .with_window(4, 4, 2)
            .with_control_points(4)
            .with_response(0.5, 0.1)
            .with_idle_style(1);
        assert!(config.validate().is_ok());
        assert_eq!(config.trajectory_len(), 9);
        assert_eq!(config.sample_count(), 5);
        assert_eq!(config.root_sample(), 2);
        assert_eq!(config.control_points, 4);
        assert_eq!(config.target_gain, 0.5);
        assert_eq!(config.idle_style, 1);
    }
}
