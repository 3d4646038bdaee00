//! Per-tick motion synthesis.
//!
//! [`MotionSynthesizer`] owns the trajectory window, the predictor and all
//! scratch buffers of one animated character. Each tick runs two phases:
//!
//! 1. [`MotionSynthesizer::predict_trajectory`] bends the future part of
//!    the trajectory toward the controller's intent.
//! 2. [`MotionSynthesizer::animate`] encodes the state, runs the network,
//!    advances the window and decodes root motion, the corrected future
//!    trajectory and the new joint poses into a [`PoseUpdate`].
//!
//! A synthesizer built over a predictor without parameters, with
//! dimensions that do not match its layout, or with a phase function other
//! than the configured one, stays idle for its whole lifetime: every tick
//! returns `Ok(None)`.

use nalgebra::{Isometry3, Vector3};

use crate::config::SynthesisConfig;
use crate::controller::Controller;
use crate::decoder::{decode_joint, decode_root_motion, decode_sample, RootMotion};
use crate::encoder::encode_input;
use crate::error::{Result, SynthesisError};
use crate::layout::FeatureLayout;
use crate::math::tensor::Tensor;
use crate::math::transform::{
    direction_from_root_space, interpolate, interpolate_vector, look_rotation, normalize_or,
    normalize_or_zero, point_from_root_space, wrap_phase, yaw_rotation,
};
use crate::predictor::{PhaseFunctionedNetwork, Predictor};
use crate::skeleton::{JointPose, PoseUpdate};
use crate::trajectory::{Ground, Trajectory};

/// Real-time locomotion synthesizer for one character.
///
/// # Example
///
/// ```
/// use nalgebra::Isometry3;
/// use phase_locomotion::{
///     InputController, MotionSynthesizer, PhaseFunctionedNetwork, Style, SynthesisConfig,
///     Trigger,
/// };
///
/// let controller = InputController::new(vec![
///     Style::new("idle").with_key(Trigger::NoInput),
///     Style::new("walk").with_key(Trigger::key("W")),
/// ]);
/// let mut synthesizer = MotionSynthesizer::new(
///     SynthesisConfig::default(),
///     PhaseFunctionedNetwork::unloaded(),
///     Isometry3::identity(),
///     &[1.0, 0.0],
///     0,
/// )?;
///
/// // no parameters: the synthesizer never moves the character
/// assert!(synthesizer.tick(&controller, &[])?.is_none());
/// # Ok::<(), phase_locomotion::SynthesisError>(())
/// ```
pub struct MotionSynthesizer<P: Predictor = PhaseFunctionedNetwork> {
    config: SynthesisConfig,
    layout: FeatureLayout,
    predictor: P,
    trajectory: Trajectory,
    ground: Option<Box<dyn Ground>>,

    // intent
    target_direction: Vector3<f32>,
    target_velocity: Vector3<f32>,
    trajectory_correction: f32,
    phase: f32,

    // scratch
    input: Tensor,
    future_positions: Vec<Vector3<f32>>,
    style_target: Vec<f32>,
    update: PoseUpdate,

    ready: bool,
}

impl<P: Predictor> MotionSynthesizer<P> {
    /// Create a synthesizer with every trajectory point at `root`.
    ///
    /// # Arguments
    ///
    /// * `config` - Window geometry and response tuning
    /// * `predictor` - Network producing pose and root motion
    /// * `root` - Initial character root; its +Z axis is the initial heading
    /// * `styles` - Initial style weights; their count is fixed from here on
    /// * `joint_count` - Number of skeleton joints encoded and decoded
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or its `idle_style` is not one
    /// of `styles`. A predictor that is not ready, does not fit the layout or
    /// whose phase function disagrees with `config` is not an error; the
    /// synthesizer is then permanently idle.
    pub fn new(
        config: SynthesisConfig,
        predictor: P,
        root: Isometry3<f32>,
        styles: &[f32],
        joint_count: usize,
    ) -> Result<Self> {
        config.validate()?;
        if config.idle_style >= styles.len() {
            return Err(SynthesisError::invalid_config(format!(
                "idle_style {} out of range for {} styles",
                config.idle_style,
                styles.len()
            )));
        }

        let layout = FeatureLayout::new(&config, styles.len(), joint_count);
        let heading = root.rotation * Vector3::z();
        let trajectory = Trajectory::new(
            config.past_points,
            config.future_points,
            styles,
            root.translation.vector,
            Vector3::new(heading.x, 0.0, heading.z),
        );

        let ready = if !predictor.is_ready() {
            tracing::info!("predictor has no parameters, synthesis disabled");
            false
        } else if predictor.input_dim() != layout.input_dim()
            || predictor.output_dim() != layout.output_dim()
        {
            tracing::warn!(
                expected_input = layout.input_dim(),
                actual_input = predictor.input_dim(),
                expected_output = layout.output_dim(),
                actual_output = predictor.output_dim(),
                "predictor does not fit feature layout, synthesis disabled"
            );
            false
        } else if let Some((points, interpolation)) = predictor
            .phase_function()
            .filter(|&f| f != (config.control_points, config.interpolation))
        {
            tracing::warn!(
                expected_points = config.control_points,
                actual_points = points,
                expected_interpolation = ?config.interpolation,
                actual_interpolation = ?interpolation,
                "predictor phase function does not match config, synthesis disabled"
            );
            false
        } else {
            true
        };
        if ready {
            tracing::info!(
                points = trajectory.len(),
                styles = styles.len(),
                joints = joint_count,
                input_dim = layout.input_dim(),
                output_dim = layout.output_dim(),
                "motion synthesizer ready"
            );
        }

        let mut update = PoseUpdate::new(joint_count);
        update.root = root;

        Ok(Self {
            target_direction: trajectory.root_heading(),
            target_velocity: Vector3::zeros(),
            trajectory_correction: 0.0,
            phase: 0.0,
            input: Tensor::zeros("X", layout.input_dim(), 1),
            future_positions: vec![Vector3::zeros(); trajectory.len()],
            style_target: vec![0.0; styles.len()],
            update,
            ready,
            config,
            layout,
            predictor,
            trajectory,
            ground: None,
        })
    }

    /// Project future trajectory points onto `ground` after every
    /// [`MotionSynthesizer::predict_trajectory`].
    #[must_use]
    pub fn with_ground(mut self, ground: impl Ground + 'static) -> Self {
        self.ground = Some(Box::new(ground));
        self
    }

    /// Run one full tick.
    ///
    /// `pose` is the previous-frame global pose of every joint. Returns the
    /// update to apply, or `None` when synthesis is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller's style count or the pose's joint
    /// count differ from the ones fixed at construction. Nothing is changed
    /// in that case.
    pub fn tick<C: Controller + ?Sized>(
        &mut self,
        controller: &C,
        pose: &[JointPose],
    ) -> Result<Option<&PoseUpdate>> {
        if !self.ready {
            return Ok(None);
        }
        self.check_joints(pose)?;
        self.predict_trajectory(controller)?;
        self.animate(pose)
    }

    /// Reshape the future trajectory toward the controller's intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller's style count differs from the
    /// trajectory's.
    pub fn predict_trajectory<C: Controller + ?Sized>(&mut self, controller: &C) -> Result<()> {
        if !self.ready {
            return Ok(());
        }
        let style_count = self.trajectory.style_count();
        if controller.styles().len() != style_count {
            return Err(SynthesisError::style_count_mismatch(
                style_count,
                controller.styles().len(),
            ));
        }

        let bias = controller.pool_bias(self.trajectory.root().styles());
        let movement = controller.query_move();
        let turn = controller.query_turn();
        controller.query_style(&mut self.style_target);

        let control = turn != 0.0 || movement.x != 0.0 || movement.y != 0.0;
        let rate = if control {
            self.config.target_gain
        } else {
            self.config.target_decay
        };

        let heading = self.trajectory.root().direction();
        let desired_direction = yaw_rotation(turn * self.config.max_turn_angle) * heading;
        self.target_direction = interpolate_vector(&self.target_direction, &desired_direction, rate);

        let local_move = Vector3::new(movement.x, 0.0, movement.y);
        let desired_velocity =
            normalize_or_zero(&(look_rotation(&self.target_direction) * local_move)) * bias;
        self.target_velocity = interpolate_vector(&self.target_velocity, &desired_velocity, rate);

        let intent = if movement.norm() > 0.0 { 1.0f32 } else { 0.0 };
        self.trajectory_correction =
            interpolate(self.trajectory_correction, intent.max(turn.abs()), rate);

        tracing::trace!(bias, rate, control, "predict trajectory");

        self.reshape_future();
        self.blend_styles(controller, rate);

        if let Some(ground) = self.ground.as_deref() {
            let root = self.trajectory.root_index();
            self.trajectory.postprocess(root + 1..self.trajectory.len(), ground);
        }
        Ok(())
    }

    /// Bend future positions, directions and velocities toward the targets
    /// along three ease-out curves.
    fn reshape_future(&mut self) {
        let root = self.trajectory.root_index();
        let len = self.trajectory.len();
        let future = self.trajectory.future_len() as f32;
        let step_velocity = self.target_velocity / future;

        self.future_positions[root] = self.trajectory.root().position();
        for i in root + 1..len {
            let weight = (i - root) as f32 / future;
            let ease = |bias: f32| 1.0 - (1.0 - weight).powf(bias);
            let scale_position = ease(self.config.position_bias);
            let scale_direction = ease(self.config.direction_bias);
            let scale_velocity = ease(self.config.velocity_bias);

            let previous = self.trajectory.point(i - 1).position();
            let point = self.trajectory.point_mut(i);
            let step = interpolate_vector(&(point.position() - previous), &step_velocity, scale_position);
            self.future_positions[i] = self.future_positions[i - 1] + step;

            point.set_direction(interpolate_vector(
                &point.direction(),
                &self.target_direction,
                scale_direction,
            ));
            point.set_velocity(interpolate_vector(
                &point.velocity(),
                &self.target_velocity,
                scale_velocity,
            ));
        }
        for i in root + 1..len {
            self.trajectory.point_mut(i).set_position(self.future_positions[i]);
        }
    }

    /// Blend style weights of the root and future points toward the
    /// controller's target and move their speeds toward the target speed.
    fn blend_styles<C: Controller + ?Sized>(&mut self, controller: &C, rate: f32) {
        let root = self.trajectory.root_index();
        let future = self.trajectory.future_len() as f32;
        let target_speed = self.target_velocity.norm();
        let styles = controller.styles();
        let target = &self.style_target;

        for i in root..self.trajectory.len() {
            let weight = (i - root) as f32 / future;
            let point = self.trajectory.point_mut(i);
            point.update_styles(|j, w| {
                let transition = styles[j].transition;
                interpolate(w, target[j], transition + weight * (1.0 - transition))
            });
            point.set_speed(interpolate(point.speed(), target_speed, rate));
        }
    }

    /// Run the network and write the results back.
    ///
    /// # Errors
    ///
    /// Returns an error if `pose` has the wrong joint count. Nothing is
    /// changed in that case. Returns the predictor's error if inference is
    /// rejected; the trajectory is then left as before the call.
    pub fn animate(&mut self, pose: &[JointPose]) -> Result<Option<&PoseUpdate>> {
        if !self.ready {
            return Ok(None);
        }
        self.check_joints(pose)?;

        encode_input(&self.trajectory, pose, &self.layout, &mut self.input)?;

        let idle = self.trajectory.root().styles()[self.config.idle_style];
        let rest = (1.0 - idle).max(0.0).powf(0.25);
        let damping = 1.0 - (rest * 0.9 + 0.1);
        let root_index = self.trajectory.root_index();
        let current_root = self.trajectory.root().transformation();
        self.predictor.predict(&self.input, self.phase, damping)?;
        let motion = decode_root_motion(self.predictor.output(), &self.layout)?;

        self.trajectory.shift_past();
        let next_root = self.apply_root_motion(&motion, rest, &current_root);

        let output = self.predictor.output();
        correct_future(
            &mut self.trajectory,
            &self.layout,
            &self.config,
            self.trajectory_correction,
            output,
            &next_root,
        )?;

        for (j, previous) in pose.iter().enumerate() {
            let decoded = decode_joint(output, &self.layout, j, &current_root)?;
            let estimate = previous.position + previous.velocity / self.config.frame_rate;
            self.update.joints[j] = JointPose {
                position: interpolate_vector(
                    &estimate,
                    &decoded.position,
                    self.config.dead_reckoning_blend,
                ),
                forward: normalize_or(&decoded.forward, &previous.forward),
                up: normalize_or(&decoded.up, &previous.up),
                velocity: decoded.velocity,
            };
        }
        self.update.root = next_root;

        self.phase = wrap_phase(self.phase + (1.0 - damping) * motion.phase_delta);
        self.trajectory.point_mut(root_index).set_phase(self.phase);

        tracing::trace!(rest, damping, phase = self.phase, "animate");
        Ok(Some(&self.update))
    }

    /// Move the root by the scaled network root motion and carry the same
    /// offset through the future. Returns the new root transform.
    fn apply_root_motion(
        &mut self,
        motion: &RootMotion,
        rest: f32,
        current_root: &Isometry3<f32>,
    ) -> Isometry3<f32> {
        let frame_rate = self.config.frame_rate;
        let translation = motion.translation * (rest / frame_rate);
        let turn = yaw_rotation(motion.yaw * rest / frame_rate);

        let root = self.trajectory.root_mut();
        root.set_position(point_from_root_space(&translation, current_root));
        root.set_direction(turn * root.direction());
        root.set_velocity(direction_from_root_space(&translation, current_root) * frame_rate);
        let next_root = root.transformation();

        let offset = direction_from_root_space(&translation, &next_root);
        for i in self.trajectory.root_index() + 1..self.trajectory.len() {
            let point = self.trajectory.point_mut(i);
            point.set_position(point.position() + offset);
            point.set_direction(turn * point.direction());
            point.set_velocity(point.velocity() + offset * frame_rate);
        }
        next_root
    }

    fn check_joints(&self, pose: &[JointPose]) -> Result<()> {
        if pose.len() == self.layout.joint_count() {
            Ok(())
        } else {
            Err(SynthesisError::joint_count_mismatch(
                self.layout.joint_count(),
                pose.len(),
            ))
        }
    }

    /// Whether ticks do anything.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub const fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    #[must_use]
    pub const fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    #[must_use]
    pub const fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    #[must_use]
    pub const fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Smoothed heading requested by the controller.
    #[must_use]
    pub const fn target_direction(&self) -> Vector3<f32> {
        self.target_direction
    }

    /// Smoothed velocity requested by the controller.
    #[must_use]
    pub const fn target_velocity(&self) -> Vector3<f32> {
        self.target_velocity
    }

    /// How strongly network predictions override the stored future, in `[0, 1]`.
    #[must_use]
    pub const fn trajectory_correction(&self) -> f32 {
        self.trajectory_correction
    }

    /// Gait phase in `[0, 1)`.
    #[must_use]
    pub const fn phase(&self) -> f32 {
        self.phase
    }

    /// Latest pose update.
    #[must_use]
    pub const fn pose_update(&self) -> &PoseUpdate {
        &self.update
    }
}

/// Pull future points toward the network's predicted samples.
///
/// Each point interpolates between its two bracketing samples, is averaged
/// with its own dead-reckoned estimate, then blended in by `correction`.
fn correct_future(
    trajectory: &mut Trajectory,
    layout: &FeatureLayout,
    config: &SynthesisConfig,
    correction: f32,
    output: &Tensor,
    next_root: &Isometry3<f32>,
) -> Result<()> {
    let stride = layout.sample_stride();
    let root_sample = layout.root_sample();
    let frame_rate = config.frame_rate;

    for i in trajectory.root_index() + 1..trajectory.len() {
        let previous = decode_sample(output, layout, i / stride - root_sample, next_root)?;
        let next = decode_sample(output, layout, i.div_ceil(stride) - root_sample, next_root)?;
        let factor = (i % stride) as f32 / stride as f32;

        let point = trajectory.point_mut(i);
        let position = interpolate_vector(&previous.position, &next.position, factor);
        let direction = normalize_or(
            &interpolate_vector(&previous.direction, &next.direction, factor),
            &point.direction(),
        );
        let velocity = interpolate_vector(&previous.velocity, &next.velocity, factor);
        let position = interpolate_vector(
            &(point.position() + velocity / frame_rate),
            &position,
            config.dead_reckoning_blend,
        );

        point.set_position(interpolate_vector(&point.position(), &position, correction));
        point.set_direction(interpolate_vector(&point.direction(), &direction, correction));
        point.set_velocity(interpolate_vector(&point.velocity(), &velocity, correction));
    }
    Ok(())
}
