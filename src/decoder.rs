//! Network output decoding.
//!
//! Values are read at the offsets of [`FeatureLayout`] and mapped from
//! root space back to world space. Nothing here blends or smooths; the
//! synthesizer combines decoded values with its own dead-reckoned
//! estimates.
//!
//! ## Units
//!
//! - positions and velocities: world units and units per second
//! - root motion: per second (`dx`, `dz`, yaw in radians), divided by the
//!   frame rate by the caller
//! - phase increment: cycles per tick

use nalgebra::{Isometry3, Vector3};

use crate::error::{Result, SynthesisError};
use crate::layout::FeatureLayout;
use crate::math::tensor::Tensor;
use crate::math::transform::{direction_from_root_space, point_from_root_space};
use crate::skeleton::JointPose;

/// Root displacement predicted for one tick, before frame-rate scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMotion {
    /// Planar translation in root space (`y` is always zero).
    pub translation: Vector3<f32>,
    /// Rotation about the up axis, radians.
    pub yaw: f32,
    /// Gait phase increment, cycles.
    pub phase_delta: f32,
}

/// A decoded trajectory sample in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleState {
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub velocity: Vector3<f32>,
}

fn check_output(output: &Tensor, layout: &FeatureLayout) -> Result<()> {
    if output.shape() == (layout.output_dim(), 1) {
        Ok(())
    } else {
        Err(SynthesisError::dimension_mismatch(
            "decode",
            (layout.output_dim(), 1),
            output.shape(),
        ))
    }
}

/// Read the root motion block.
///
/// # Errors
///
/// Returns an error if `output` is not shaped for `layout`.
pub fn decode_root_motion(output: &Tensor, layout: &FeatureLayout) -> Result<RootMotion> {
    check_output(output, layout)?;
    let y = &output.as_slice()[layout.root_motion_offset()..];
    Ok(RootMotion {
        translation: Vector3::new(y[0], 0.0, y[2]),
        yaw: y[1],
        phase_delta: y[3],
    })
}

/// Read predicted sample `sample` (0 = root sample) relative to `root`.
///
/// The decoded direction is not normalized.
///
/// # Errors
///
/// Returns an error if `output` is not shaped for `layout` or `sample` is
/// not a predicted sample.
pub fn decode_sample(
    output: &Tensor,
    layout: &FeatureLayout,
    sample: usize,
    root: &Isometry3<f32>,
) -> Result<SampleState> {
    check_output(output, layout)?;
    if sample >= layout.predicted_samples() {
        return Err(SynthesisError::invalid_parameter(format!(
            "sample {sample} is not predicted ({} samples)",
            layout.predicted_samples()
        )));
    }
    let y = &output.as_slice()[layout.sample_output_offset(sample)..];
    Ok(SampleState {
        position: point_from_root_space(&Vector3::new(y[0], 0.0, y[1]), root),
        direction: direction_from_root_space(&Vector3::new(y[2], 0.0, y[3]), root),
        velocity: direction_from_root_space(&Vector3::new(y[4], 0.0, y[5]), root),
    })
}

/// Read the pose of joint `joint` relative to `root`.
///
/// # Errors
///
/// Returns an error if `output` is not shaped for `layout` or `joint` is
/// out of range.
pub fn decode_joint(
    output: &Tensor,
    layout: &FeatureLayout,
    joint: usize,
    root: &Isometry3<f32>,
) -> Result<JointPose> {
    check_output(output, layout)?;
    if joint >= layout.joint_count() {
        return Err(SynthesisError::joint_count_mismatch(layout.joint_count(), joint + 1));
    }
    let y = &output.as_slice()[layout.joint_output_offset(joint)..];
    let read = |i: usize| Vector3::new(y[i], y[i + 1], y[i + 2]);
    Ok(JointPose {
        position: point_from_root_space(&read(0), root),
        forward: direction_from_root_space(&read(3), root),
        up: direction_from_root_space(&read(6), root),
        velocity: direction_from_root_space(&read(9), root),
    })
}
