//! Fixed offsets of the network input and output vectors.
//!
//! Input, for `S` styles and `J` joints:
//!
//! ```text
//! [ sample 0 | sample 1 | ... | sample N-1 | joint 0 | ... | joint J-1 ]
//!   sample = pos.x pos.z dir.x dir.z vel.x vel.z speed style[0..S]
//!   joint  = pos.xyz forward.xyz up.xyz vel.xyz
//! ```
//!
//! Output:
//!
//! ```text
//! [ root sample | future samples ... | joint 0 | ... | root motion ]
//!   sample      = pos.x pos.z dir.x dir.z vel.x vel.z
//!   root motion = dx dyaw dz dphase
//! ```

use crate::config::SynthesisConfig;

/// Per-sample input values before the style weights.
pub const SAMPLE_INPUT_DIM: usize = 7;

/// Per-sample output values.
pub const SAMPLE_OUTPUT_DIM: usize = 6;

/// Per-joint values, in and out.
pub const JOINT_DIM: usize = 12;

/// Root motion block: planar translation, yaw rate and phase increment.
pub const ROOT_MOTION_DIM: usize = 4;

/// Offsets into the network's input and output vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureLayout {
    sample_count: usize,
    root_sample: usize,
    sample_stride: usize,
    style_count: usize,
    joint_count: usize,
}

impl FeatureLayout {
    #[must_use]
    pub const fn new(config: &SynthesisConfig, style_count: usize, joint_count: usize) -> Self {
        Self {
            sample_count: config.sample_count(),
            root_sample: config.root_sample(),
            sample_stride: config.sample_stride,
            style_count,
            joint_count,
        }
    }

    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[must_use]
    pub const fn root_sample(&self) -> usize {
        self.root_sample
    }

    #[must_use]
    pub const fn sample_stride(&self) -> usize {
        self.sample_stride
    }

    #[must_use]
    pub const fn style_count(&self) -> usize {
        self.style_count
    }

    #[must_use]
    pub const fn joint_count(&self) -> usize {
        self.joint_count
    }

    /// Input values per trajectory sample, styles included.
    #[must_use]
    pub const fn sample_input_dim(&self) -> usize {
        SAMPLE_INPUT_DIM + self.style_count
    }

    #[must_use]
    pub const fn sample_input_offset(&self, sample: usize) -> usize {
        sample * self.sample_input_dim()
    }

    #[must_use]
    pub const fn joint_input_offset(&self, joint: usize) -> usize {
        self.sample_count * self.sample_input_dim() + joint * JOINT_DIM
    }

    #[must_use]
    pub const fn input_dim(&self) -> usize {
        self.joint_input_offset(self.joint_count)
    }

    /// Samples predicted by the network: the root sample and every later one.
    #[must_use]
    pub const fn predicted_samples(&self) -> usize {
        self.sample_count - self.root_sample
    }

    /// Output offset of sample `sample`, counted from the root sample.
    #[must_use]
    pub const fn sample_output_offset(&self, sample: usize) -> usize {
        sample * SAMPLE_OUTPUT_DIM
    }

    #[must_use]
    pub const fn joint_output_offset(&self, joint: usize) -> usize {
        self.predicted_samples() * SAMPLE_OUTPUT_DIM + joint * JOINT_DIM
    }

    #[must_use]
    pub const fn root_motion_offset(&self) -> usize {
        self.joint_output_offset(self.joint_count)
    }

    #[must_use]
    pub const fn output_dim(&self) -> usize {
        self.root_motion_offset() + ROOT_MOTION_DIM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = FeatureLayout::new(&SynthesisConfig::default(), 2, 31);
        assert_eq!(layout.sample_input_dim(), 9);
        assert_eq!(layout.joint_input_offset(0), 12 * 9);
        assert_eq!(layout.input_dim(), 12 * 9 + 31 * 12);

        assert_eq!(layout.predicted_samples(), 6);
        assert_eq!(layout.joint_output_offset(0), 36);
        assert_eq!(layout.root_motion_offset(), 36 + 31 * 12);
        assert_eq!(layout.output_dim(), 36 + 31 * 12 + 4);
    }

    #[test]
    fn test_small_layout() {
        let config = SynthesisConfig::default().with_window(4, 4, 2);
        let layout = FeatureLayout::new(&config, 1, 0);
        assert_eq!(layout.sample_count(), 5);
        assert_eq!(layout.root_sample(), 2);
        assert_eq!(layout.sample_input_offset(3), 24);
        assert_eq!(layout.input_dim(), 40);
        assert_eq!(layout.predicted_samples(), 3);
        assert_eq!(layout.output_dim(), 18 + 4);
    }
}
