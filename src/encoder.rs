//! Network input encoding.
//!
//! Trajectory samples are expressed relative to the current root and the
//! previous-frame joint poses relative to the previous root (the point one
//! slot behind it). Offsets follow [`FeatureLayout`].

use nalgebra::{Isometry3, Vector3};

use crate::error::{Result, SynthesisError};
use crate::layout::{FeatureLayout, JOINT_DIM};
use crate::math::tensor::Tensor;
use crate::math::transform::{direction_to_root_space, point_to_root_space};
use crate::skeleton::JointPose;
use crate::trajectory::{Trajectory, TrajectoryPoint};

/// Write the network input for the current state into `input`.
///
/// # Arguments
///
/// * `trajectory` - Trajectory whose samples (every `sample_stride` points) are encoded
/// * `joints` - Previous-frame global joint poses
/// * `layout` - Offsets shared with the decoder
/// * `input` - Column tensor of `layout.input_dim()` rows
///
/// # Errors
///
/// Returns an error, leaving `input` untouched, if the tensor shape, the
/// joint count, the style count or the trajectory length disagree with
/// `layout`.
pub fn encode_input(
    trajectory: &Trajectory,
    joints: &[JointPose],
    layout: &FeatureLayout,
    input: &mut Tensor,
) -> Result<()> {
    validate(trajectory, joints, layout, input)?;

    let current_root = trajectory.root().transformation();
    let previous_root = trajectory
        .point(trajectory.root_index().saturating_sub(1))
        .transformation();
    let values = input.as_mut_slice();

    for (s, point) in trajectory
        .samples(layout.sample_stride())
        .take(layout.sample_count())
        .enumerate()
    {
        let offset = layout.sample_input_offset(s);
        encode_sample(point, &current_root, &mut values[offset..offset + layout.sample_input_dim()]);
    }

    for (j, joint) in joints.iter().enumerate() {
        let offset = layout.joint_input_offset(j);
        encode_joint(joint, &previous_root, &mut values[offset..offset + JOINT_DIM]);
    }
    Ok(())
}

fn validate(
    trajectory: &Trajectory,
    joints: &[JointPose],
    layout: &FeatureLayout,
    input: &Tensor,
) -> Result<()> {
    if input.shape() != (layout.input_dim(), 1) {
        return Err(SynthesisError::dimension_mismatch(
            "encode_input",
            (layout.input_dim(), 1),
            input.shape(),
        ));
    }
    if joints.len() != layout.joint_count() {
        return Err(SynthesisError::joint_count_mismatch(
            layout.joint_count(),
            joints.len(),
        ));
    }
    if trajectory.style_count() != layout.style_count() {
        return Err(SynthesisError::style_count_mismatch(
            layout.style_count(),
            trajectory.style_count(),
        ));
    }
    let needed = (layout.sample_count() - 1) * layout.sample_stride() + 1;
    if trajectory.len() < needed {
        return Err(SynthesisError::invalid_parameter(format!(
            "trajectory has {} points, {needed} needed for {} samples",
            trajectory.len(),
            layout.sample_count()
        )));
    }
    Ok(())
}

fn encode_sample(point: &TrajectoryPoint, root: &Isometry3<f32>, out: &mut [f32]) {
    let position = point_to_root_space(&point.position(), root);
    let direction = direction_to_root_space(&point.direction(), root);
    let velocity = direction_to_root_space(&point.velocity(), root);

    out[0] = position.x;
    out[1] = position.z;
    out[2] = direction.x;
    out[3] = direction.z;
    out[4] = velocity.x;
    out[5] = velocity.z;
    out[6] = point.speed();
    out[7..].copy_from_slice(point.styles());
}

fn encode_joint(joint: &JointPose, root: &Isometry3<f32>, out: &mut [f32]) {
    let vectors: [Vector3<f32>; 4] = [
        point_to_root_space(&joint.position, root),
        direction_to_root_space(&joint.forward, root),
        direction_to_root_space(&joint.up, root),
        direction_to_root_space(&joint.velocity, root),
    ];
    for (chunk, v) in out.chunks_exact_mut(3).zip(&vectors) {
        chunk.copy_from_slice(v.as_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisConfig;
    use approx::assert_relative_eq;

    fn setup() -> (Trajectory, FeatureLayout) {
        let config = SynthesisConfig::default().with_window(4, 4, 2);
        let mut trajectory =
            Trajectory::new(4, 4, &[0.25, 0.75], Vector3::new(1.0, 0.0, 2.0), Vector3::x());
        for i in 0..trajectory.len() {
            let p = trajectory.point_mut(i);
            p.set_position(Vector3::new(1.0 + i as f32, 0.0, 2.0));
            p.set_velocity(Vector3::new(3.0, 0.0, 0.0));
            p.set_speed(3.0);
        }
        (trajectory, FeatureLayout::new(&config, 2, 1))
    }

    #[test]
    fn test_samples_relative_to_root() {
        let (trajectory, layout) = setup();
        let joints = [JointPose::at(Vector3::new(5.0, 1.0, 2.0))];
        let mut input = Tensor::zeros("X", layout.input_dim(), 1);
        encode_input(&trajectory, &joints, &layout, &mut input).unwrap();
        let x = input.as_slice();

        // root (index 4) faces +X, so world +X is local +Z
        let root = layout.sample_input_offset(layout.root_sample());
        assert_relative_eq!(x[root], 0.0, epsilon = 1e-6);
        assert_relative_eq!(x[root + 1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(x[root + 3], 1.0, epsilon = 1e-6);
        assert_relative_eq!(x[root + 5], 3.0, epsilon = 1e-6);
        assert_relative_eq!(x[root + 6], 3.0);
        assert_relative_eq!(x[root + 7], 0.25);
        assert_relative_eq!(x[root + 8], 0.75);

        // last sample (index 8) is four units ahead
        let last = layout.sample_input_offset(4);
        assert_relative_eq!(x[last + 1], 4.0, epsilon = 1e-5);
        assert_relative_eq!(x[last], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_joints_relative_to_previous_root() {
        let (trajectory, layout) = setup();
        let joints = [JointPose::at(Vector3::new(5.0, 1.0, 2.0))];
        let mut input = Tensor::zeros("X", layout.input_dim(), 1);
        encode_input(&trajectory, &joints, &layout, &mut input).unwrap();
        let x = &input.as_slice()[layout.joint_input_offset(0)..];

        // previous root sits at x = 4; the joint is one unit ahead and one up
        assert_relative_eq!(x[0], 0.0, epsilon = 1e-5);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-5);
        assert_relative_eq!(x[2], 1.0, epsilon = 1e-5);
        // default forward is world +Z, which is local -X for a root facing +X
        assert_relative_eq!(x[3], -1.0, epsilon = 1e-5);
        assert_relative_eq!(x[7], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_mismatches_rejected() {
        let (trajectory, layout) = setup();
        let mut input = Tensor::from_fn("X", layout.input_dim(), 1, |_, _| 9.0);

        let err = encode_input(&trajectory, &[], &layout, &mut input).unwrap_err();
        assert_eq!(err, SynthesisError::joint_count_mismatch(1, 0));
        assert!(input.as_slice().iter().all(|v| *v == 9.0));

        let mut short = Tensor::zeros("X", 3, 1);
        let joints = [JointPose::default()];
        assert!(encode_input(&trajectory, &joints, &layout, &mut short).is_err());

        let three_styles = FeatureLayout::new(&SynthesisConfig::default().with_window(4, 4, 2), 3, 1);
        let mut input = Tensor::zeros("X", three_styles.input_dim(), 1);
        assert!(matches!(
            encode_input(&trajectory, &joints, &three_styles, &mut input),
            Err(SynthesisError::StyleCountMismatch { expected: 3, actual: 2 })
        ));
    }
}
