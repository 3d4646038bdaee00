//! Rigid-transform and blending utilities.
//!
//! Trajectory samples and joint poses are fed to the network relative to
//! the character root. This module provides the forward and inverse
//! root-space transforms plus the small scalar helpers shared by the
//! encoder, decoder and synthesizer. Y is up throughout.

use nalgebra::{Isometry3, Point3, Unit, UnitQuaternion, Vector3};

/// Below this length a vector is treated as zero.
pub const DIRECTION_EPS: f32 = 1e-6;

/// Express a world-space point relative to `root`.
#[must_use]
#[inline]
pub fn point_to_root_space(point: &Vector3<f32>, root: &Isometry3<f32>) -> Vector3<f32> {
    root.inverse_transform_point(&Point3::from(*point)).coords
}

/// Inverse of [`point_to_root_space`].
#[must_use]
#[inline]
pub fn point_from_root_space(point: &Vector3<f32>, root: &Isometry3<f32>) -> Vector3<f32> {
    root.transform_point(&Point3::from(*point)).coords
}

/// Rotate a world-space direction into `root` space (translation ignored).
#[must_use]
#[inline]
pub fn direction_to_root_space(direction: &Vector3<f32>, root: &Isometry3<f32>) -> Vector3<f32> {
    root.inverse_transform_vector(direction)
}

/// Inverse of [`direction_to_root_space`].
#[must_use]
#[inline]
pub fn direction_from_root_space(
    direction: &Vector3<f32>,
    root: &Isometry3<f32>,
) -> Vector3<f32> {
    root.transform_vector(direction)
}

/// Rotation whose local +Z axis points along `direction`, keeping +Y up.
///
/// Degenerate inputs (zero length or parallel to up) yield the identity.
#[must_use]
pub fn look_rotation(direction: &Vector3<f32>) -> UnitQuaternion<f32> {
    let up = Vector3::y();
    if direction.norm() < DIRECTION_EPS || direction.cross(&up).norm() < DIRECTION_EPS {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::face_towards(direction, &up)
}

/// Rotation of `angle` radians about the up axis.
#[must_use]
#[inline]
pub fn yaw_rotation(angle: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle)
}

/// Rigid transform at `position` facing `direction`.
#[must_use]
pub fn pose_transform(position: &Vector3<f32>, direction: &Vector3<f32>) -> Isometry3<f32> {
    Isometry3::from_parts((*position).into(), look_rotation(direction))
}

/// Unit vector along `v`, or `fallback` when `v` is (near) zero.
#[must_use]
pub fn normalize_or(v: &Vector3<f32>, fallback: &Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(DIRECTION_EPS).unwrap_or(*fallback)
}

/// Unit vector along `v`, or zero when `v` is (near) zero.
#[must_use]
pub fn normalize_or_zero(v: &Vector3<f32>) -> Vector3<f32> {
    normalize_or(v, &Vector3::zeros())
}

/// Signed angle in degrees from `from` to `to`, measured about `axis`.
///
/// Zero-length inputs give zero.
#[must_use]
pub fn signed_angle(from: &Vector3<f32>, to: &Vector3<f32>, axis: &Unit<Vector3<f32>>) -> f32 {
    if from.norm() < DIRECTION_EPS || to.norm() < DIRECTION_EPS {
        return 0.0;
    }
    let sin = axis.dot(&from.cross(to));
    let cos = from.dot(to);
    sin.atan2(cos).to_degrees()
}

/// `(1 - amount) * from + amount * to`.
#[must_use]
#[inline]
pub fn interpolate(from: f32, to: f32, amount: f32) -> f32 {
    (1.0 - amount) * from + amount * to
}

/// Vector form of [`interpolate`].
#[must_use]
#[inline]
pub fn interpolate_vector(from: &Vector3<f32>, to: &Vector3<f32>, amount: f32) -> Vector3<f32> {
    from * (1.0 - amount) + to * amount
}

/// Rescale `weights` to absolute values summing to one.
///
/// An all-zero slice is left untouched.
pub fn normalize_weights(weights: &mut [f32]) {
    let sum: f32 = weights.iter().map(|w| w.abs()).sum();
    if sum != 0.0 {
        for w in weights.iter_mut() {
            *w = w.abs() / sum;
        }
    }
}

/// Wrap a phase value into `[0, 1)`.
#[must_use]
pub fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_root() -> Isometry3<f32> {
        pose_transform(&Vector3::new(3.0, 0.0, -2.0), &Vector3::new(1.0, 0.0, 1.0))
    }

    #[test]
    fn test_root_space_round_trip() {
        let root = sample_root();
        let point = Vector3::new(-1.5, 0.25, 4.0);

        let local = point_to_root_space(&point, &root);
        let recovered = point_from_root_space(&local, &root);
        for i in 0..3 {
            assert_relative_eq!(point[i], recovered[i], epsilon = 1e-5);
        }

        let dir = Vector3::new(0.0, 0.0, 1.0);
        let local_dir = direction_to_root_space(&dir, &root);
        let back = direction_from_root_space(&local_dir, &root);
        assert_relative_eq!(back, dir, epsilon = 1e-6);
    }

    #[test]
    fn test_root_forward_is_local_z() {
        let root = sample_root();
        let ahead = Vector3::new(3.0, 0.0, -2.0) + Vector3::new(1.0, 0.0, 1.0).normalize();
        let local = point_to_root_space(&ahead, &root);
        assert_relative_eq!(local, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_look_rotation_degenerate() {
        assert_eq!(look_rotation(&Vector3::zeros()), UnitQuaternion::identity());
        assert_eq!(look_rotation(&Vector3::y()), UnitQuaternion::identity());
        let q = look_rotation(&Vector3::x());
        assert_relative_eq!(q * Vector3::z(), Vector3::x(), epsilon = 1e-6);
    }

    #[test]
    fn test_yaw_rotation_turns_forward() {
        let q = yaw_rotation(std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(q * Vector3::z(), Vector3::x(), epsilon = 1e-6);
    }

    #[test]
    fn test_signed_angle() {
        let up = Vector3::y_axis();
        let a = signed_angle(&Vector3::z(), &Vector3::x(), &up);
        assert_relative_eq!(a, 90.0, epsilon = 1e-4);
        let b = signed_angle(&Vector3::x(), &Vector3::z(), &up);
        assert_relative_eq!(b, -90.0, epsilon = 1e-4);
        assert_eq!(signed_angle(&Vector3::zeros(), &Vector3::x(), &up), 0.0);
    }

    #[test]
    fn test_normalize_weights() {
        let mut w = [1.0, -1.0, 2.0];
        normalize_weights(&mut w);
        assert_relative_eq!(w[0], 0.25);
        assert_relative_eq!(w[1], 0.25);
        assert_relative_eq!(w[2], 0.5);

        let mut zeros = [0.0, 0.0];
        normalize_weights(&mut zeros);
        assert_eq!(zeros, [0.0, 0.0]);
    }

    #[test]
    fn test_wrap_phase() {
        assert_relative_eq!(wrap_phase(1.25), 0.25);
        assert_relative_eq!(wrap_phase(-0.25), 0.75);
        assert!(wrap_phase(-1e-9) < 1.0);
        assert_eq!(wrap_phase(0.0), 0.0);
    }

    #[test]
    fn test_normalize_or_fallback() {
        let fallback = Vector3::z();
        assert_eq!(normalize_or(&Vector3::zeros(), &fallback), fallback);
        assert_relative_eq!(
            normalize_or(&Vector3::new(3.0, 0.0, 4.0), &fallback),
            Vector3::new(0.6, 0.0, 0.8)
        );
        assert_eq!(normalize_or_zero(&Vector3::zeros()), Vector3::zeros());
    }

    #[test]
    fn test_interpolate() {
        assert_relative_eq!(interpolate(2.0, 4.0, 0.25), 2.5);
        let v = interpolate_vector(&Vector3::zeros(), &Vector3::new(4.0, 0.0, 0.0), 0.5);
        assert_relative_eq!(v, Vector3::new(2.0, 0.0, 0.0));
    }
}
