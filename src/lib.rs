//! Phase Locomotion Library
//!
//! Real-time character locomotion driven by a phase-functioned neural
//! network.
//!
//! Each tick the synthesizer bends a rolling trajectory window toward the
//! player's intent, encodes it together with the previous skeleton pose,
//! runs a three-layer network whose weights are a cyclic function of the
//! gait phase, and decodes root motion, a corrected future trajectory and
//! new joint poses.
//!
//! # Features
//!
//! - **Phase-functioned weights**: Catmull-Rom blending over control points
//!   gives weights that vary continuously with phase
//! - **Allocation-free ticks**: every buffer is sized at construction
//! - **Deterministic**: identical state and input give bit-identical output
//! - **Explicit seams**: [`Predictor`], [`Controller`] and [`Ground`] traits,
//!   and a [`PoseUpdate`] the skeleton owner applies itself
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use nalgebra::Isometry3;
//! use phase_locomotion::{
//!     bias_id, weight_id, FeatureLayout, InputController, MotionSynthesizer,
//!     NetworkParameters, PhaseFunctionedNetwork, Style, SynthesisConfig, Tensor, Trigger,
//! };
//!
//! let config = SynthesisConfig::default();
//! let layout = FeatureLayout::new(&config, 2, 0);
//! let (input, hidden, output) = (layout.input_dim(), 8, layout.output_dim());
//!
//! // A tiny all-zero parameter asset, normally loaded from disk.
//! let mut tensors = vec![
//!     Tensor::zeros("Xmean", input, 1),
//!     Tensor::from_fn("Xstd", input, 1, |_, _| 1.0),
//!     Tensor::zeros("Ymean", output, 1),
//!     Tensor::from_fn("Ystd", output, 1, |_, _| 1.0),
//! ];
//! for (l, (rows, cols)) in [(hidden, input), (hidden, hidden), (output, hidden)]
//!     .into_iter()
//!     .enumerate()
//! {
//!     for k in 0..config.control_points {
//!         tensors.push(Tensor::zeros(weight_id(l, k), rows, cols));
//!         tensors.push(Tensor::zeros(bias_id(l, k), rows, 1));
//!     }
//! }
//! let parameters = Arc::new(NetworkParameters::from_named_tensors(
//!     tensors,
//!     config.control_points,
//! )?);
//!
//! let network = PhaseFunctionedNetwork::from_config(parameters, &config);
//! let mut synthesizer =
//!     MotionSynthesizer::new(config, network, Isometry3::identity(), &[1.0, 0.0], 0)?;
//!
//! let mut controller = InputController::new(vec![
//!     Style::new("idle").with_key(Trigger::NoInput),
//!     Style::new("walk").with_key(Trigger::key("W")).with_bias(1.5),
//! ]);
//! controller.press("W");
//!
//! let update = synthesizer.tick(&controller, &[])?;
//! assert!(update.is_some());
//! # Ok::<(), phase_locomotion::SynthesisError>(())
//! ```
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`math`] | tensors, activations, root-space transforms |
//! | [`trajectory`] | rolling trajectory window |
//! | [`parameters`] / [`predictor`] | phase-functioned network |
//! | [`encoder`] / [`decoder`] / [`layout`] | network input and output |
//! | [`synthesizer`] | per-tick orchestration |
//! | [`controller`] / [`skeleton`] | collaborator seams |

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod controller;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod math;
pub mod parameters;
pub mod predictor;
pub mod skeleton;
pub mod synthesizer;
pub mod trajectory;
pub mod validation;

// Re-exports for convenient access
pub use config::{PhaseInterpolation, SynthesisConfig};
pub use controller::{Controller, InputController, MoveBindings, Multiplier, Style, StyleKey, Trigger};
pub use decoder::{decode_joint, decode_root_motion, decode_sample, RootMotion, SampleState};
pub use encoder::encode_input;
pub use error::{Result, SynthesisError};
pub use layout::FeatureLayout;
pub use math::{Activation, Tensor};
pub use parameters::{bias_id, weight_id, NetworkParameters, PhasedLayer, LAYER_COUNT};
pub use predictor::{ControlBlend, PhaseFunctionedNetwork, Predictor};
pub use skeleton::{Joint, JointPose, PoseUpdate, Skeleton};
pub use synthesizer::MotionSynthesizer;
pub use trajectory::{FlatGround, Ground, Trajectory, TrajectoryPoint};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
