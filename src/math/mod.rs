//! Mathematical utilities for motion synthesis.
//!
//! This module provides:
//! - [`tensor`]: dense 2D buffers and the fused layer/normalisation ops
//! - [`activation`]: in-place elementwise activations
//! - [`transform`]: root-space transforms and blending helpers

pub mod activation;
pub mod tensor;
pub mod transform;

pub use activation::Activation;
pub use tensor::{blend, layer, normalize, renormalize, Tensor};
pub use transform::{
    direction_from_root_space, direction_to_root_space, interpolate, look_rotation,
    normalize_weights, point_from_root_space, point_to_root_space, signed_angle, wrap_phase,
};
