//! Rolling trajectory window.
//!
//! A [`Trajectory`] is a fixed-length array of [`TrajectoryPoint`]s: the
//! road already walked, the root ("now"), and the road ahead. Once per
//! tick the past is shifted one slot toward the front by
//! [`Trajectory::shift_past`], consuming the oldest point.
//!
//! # Layout
//!
//! ```text
//! index:  0 .......... root_index .......... len - 1
//!         |--- past ---|   root   |--- future ---|
//! ```

use std::ops::Range;

use nalgebra::{Isometry3, Vector3};

use crate::math::transform::{
    normalize_or, normalize_weights, pose_transform, signed_angle, DIRECTION_EPS,
};
use crate::validation::style_weights_valid;

/// One raw point of the trajectory.
///
/// Style weights are kept absolute-normalized: they sum to one or are all zero.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    position: Vector3<f32>,
    direction: Vector3<f32>,
    velocity: Vector3<f32>,
    speed: f32,
    phase: f32,
    slope: f32,
    styles: Vec<f32>,
}

impl TrajectoryPoint {
    fn new(position: Vector3<f32>, direction: Vector3<f32>, styles: &[f32]) -> Self {
        let mut point = Self {
            position,
            direction: Vector3::z(),
            velocity: Vector3::zeros(),
            speed: 0.0,
            phase: 0.0,
            slope: 0.0,
            styles: styles.to_vec(),
        };
        point.set_direction(direction);
        normalize_weights(&mut point.styles);
        point
    }

    #[must_use]
    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    /// Unit facing direction.
    #[must_use]
    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// Set the facing direction. Zero vectors fall back to +Z.
    pub fn set_direction(&mut self, direction: Vector3<f32>) {
        self.direction = normalize_or(&direction, &Vector3::z());
    }

    #[must_use]
    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vector3<f32>) {
        self.velocity = velocity;
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Gait phase in `[0, 1)` at the time this point was "now".
    #[must_use]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase;
    }

    /// Ground slope recorded by [`Trajectory::postprocess`].
    #[must_use]
    pub fn slope(&self) -> f32 {
        self.slope
    }

    #[must_use]
    pub fn styles(&self) -> &[f32] {
        &self.styles
    }

    /// Overwrite all style weights, then renormalize.
    ///
    /// Extra or missing entries are ignored; the style count never changes.
    pub fn set_styles(&mut self, styles: &[f32]) {
        for (dst, src) in self.styles.iter_mut().zip(styles) {
            *dst = *src;
        }
        normalize_weights(&mut self.styles);
    }

    /// Rewrite each weight as `f(index, weight)`, then renormalize.
    pub fn update_styles(&mut self, mut f: impl FnMut(usize, f32) -> f32) {
        for (j, w) in self.styles.iter_mut().enumerate() {
            *w = f(j, *w);
        }
        normalize_weights(&mut self.styles);
    }

    /// Rigid transform at this point's position, facing its direction.
    #[must_use]
    pub fn transformation(&self) -> Isometry3<f32> {
        pose_transform(&self.position, &self.direction)
    }

    /// Take every per-tick value from `other` (the rolling-shift step).
    fn copy_state_from(&mut self, other: &Self) {
        self.position = other.position;
        self.direction = other.direction;
        self.velocity = other.velocity;
        self.speed = other.speed;
        self.phase = other.phase;
        self.slope = other.slope;
        self.styles.copy_from_slice(&other.styles);
    }
}

/// Terrain queried when projecting trajectory points onto the ground.
pub trait Ground {
    /// Ground height below `position`.
    fn height(&self, position: &Vector3<f32>) -> f32;

    /// Ground slope at `position`.
    fn slope(&self, position: &Vector3<f32>) -> f32;
}

/// Infinite horizontal plane at a fixed height.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatGround {
    pub height: f32,
}

impl Ground for FlatGround {
    fn height(&self, _position: &Vector3<f32>) -> f32 {
        self.height
    }

    fn slope(&self, _position: &Vector3<f32>) -> f32 {
        0.0
    }
}

/// Fixed-length window of trajectory points around the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
    root_index: usize,
}

impl Trajectory {
    /// Create a trajectory with every point at `position` facing `direction`.
    ///
    /// # Arguments
    ///
    /// * `past` - Number of points behind the root (becomes `root_index`)
    /// * `future` - Number of points ahead of the root
    /// * `styles` - Initial style weights, copied to every point and normalized
    #[must_use]
    pub fn new(
        past: usize,
        future: usize,
        styles: &[f32],
        position: Vector3<f32>,
        direction: Vector3<f32>,
    ) -> Self {
        let template = TrajectoryPoint::new(position, direction, styles);
        Self {
            points: vec![template; past + 1 + future],
            root_index: past,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub const fn root_index(&self) -> usize {
        self.root_index
    }

    /// Number of points after the root.
    #[must_use]
    pub fn future_len(&self) -> usize {
        self.points.len() - self.root_index - 1
    }

    #[must_use]
    pub fn style_count(&self) -> usize {
        self.points.first().map_or(0, |p| p.styles.len())
    }

    #[must_use]
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn point(&self, index: usize) -> &TrajectoryPoint {
        &self.points[index]
    }

    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn point_mut(&mut self, index: usize) -> &mut TrajectoryPoint {
        &mut self.points[index]
    }

    #[must_use]
    pub fn root(&self) -> &TrajectoryPoint {
        &self.points[self.root_index]
    }

    pub fn root_mut(&mut self) -> &mut TrajectoryPoint {
        &mut self.points[self.root_index]
    }

    /// Every `stride`-th point, starting at index 0.
    pub fn samples(&self, stride: usize) -> impl Iterator<Item = &TrajectoryPoint> {
        self.points.iter().step_by(stride.max(1))
    }

    /// Sum of distances between consecutive points.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| (w[1].position - w[0].position).norm())
            .sum()
    }

    /// Path length from `start` toward `end`, sampled every `step` points.
    ///
    /// `end` is clamped to the trajectory length.
    #[must_use]
    pub fn length_between(&self, start: usize, end: usize, step: usize) -> f32 {
        let step = step.max(1);
        let end = end.min(self.points.len());
        let mut length = 0.0;
        let mut i = start + step;
        while i < end {
            length += (self.points[i].position - self.points[i - step].position).norm();
            i += step;
        }
        length
    }

    /// Normalized turning of the path in `[0, 1]`.
    ///
    /// Accumulates the signed angle (degrees, about +Y) between consecutive
    /// segment vectors sampled every `step` points, then returns
    /// `clamp(|sum| / 180, 0, 1)`.
    #[must_use]
    pub fn curvature(&self, start: usize, end: usize, step: usize) -> f32 {
        let step = step.max(1);
        let end = end.min(self.points.len());
        let up = Vector3::y_axis();
        let mut sum = 0.0f32;
        let mut i = start + step;
        while i + step < end {
            let before = self.points[i].position - self.points[i - step].position;
            let after = self.points[i + step].position - self.points[i].position;
            sum += signed_angle(&before, &after, &up);
            i += step;
        }
        (sum.abs() / 180.0).clamp(0.0, 1.0)
    }

    /// Shift the past one slot toward the front: point `i` takes the values
    /// of point `i + 1` for every `i < root_index`.
    pub fn shift_past(&mut self) {
        for i in 0..self.root_index {
            let (head, tail) = self.points.split_at_mut(i + 1);
            head[i].copy_state_from(&tail[0]);
        }
    }

    /// Project points in `range` onto the ground and record its slope.
    pub fn postprocess(&mut self, range: Range<usize>, ground: &dyn Ground) {
        let end = range.end.min(self.points.len());
        for point in &mut self.points[range.start.min(end)..end] {
            point.position.y = ground.height(&point.position);
            point.slope = ground.slope(&point.position);
        }
    }

    /// Whether every point's style weights sum to one (or are all zero).
    #[must_use]
    pub fn styles_normalized(&self) -> bool {
        self.points.iter().all(|p| style_weights_valid(&p.styles))
    }

    /// Heading of the root point projected onto the ground plane.
    #[must_use]
    pub fn root_heading(&self) -> Vector3<f32> {
        let d = self.root().direction;
        let planar = Vector3::new(d.x, 0.0, d.z);
        if planar.norm() < DIRECTION_EPS {
            Vector3::z()
        } else {
            planar.normalize()
        }
    }
}
