//! Sanity checks for parameter assets and style weights.
//!
//! Parameter tensors are checked once at load time so that dimension and
//! numeric errors surface before the first tick instead of inside it.

use crate::error::{Result, SynthesisError};
use crate::math::tensor::Tensor;

/// Tolerance for "sums to one" checks on style weights.
pub const STYLE_SUM_EPS: f32 = 1e-5;

/// Reject tensors containing NaN or infinite entries.
///
/// # Errors
///
/// Returns [`SynthesisError::InvalidParameter`] naming the first bad entry.
pub fn check_finite(tensor: &Tensor) -> Result<()> {
    match tensor.as_slice().iter().position(|v| !v.is_finite()) {
        Some(i) => Err(SynthesisError::invalid_parameter(format!(
            "{} has a non-finite entry at flat index {i}",
            tensor.id()
        ))),
        None => Ok(()),
    }
}

/// Reject tensors containing exact zeros (used for standard deviations).
///
/// # Errors
///
/// Returns [`SynthesisError::InvalidParameter`] naming the first zero entry.
pub fn check_nonzero(tensor: &Tensor) -> Result<()> {
    match tensor.as_slice().iter().position(|v| *v == 0.0) {
        Some(i) => Err(SynthesisError::invalid_parameter(format!(
            "{} has a zero entry at flat index {i}",
            tensor.id()
        ))),
        None => Ok(()),
    }
}

/// Require an exact `(rows, cols)` shape.
///
/// # Errors
///
/// Returns [`SynthesisError::InvalidParameter`] describing both shapes.
pub fn check_shape(tensor: &Tensor, rows: usize, cols: usize) -> Result<()> {
    if tensor.shape() == (rows, cols) {
        Ok(())
    } else {
        Err(SynthesisError::invalid_parameter(format!(
            "{} has shape {:?}, expected ({rows}, {cols})",
            tensor.id(),
            tensor.shape()
        )))
    }
}

/// Whether `weights` are non-negative and sum to one, or are all zero.
#[must_use]
pub fn style_weights_valid(weights: &[f32]) -> bool {
    if weights.iter().all(|w| *w == 0.0) {
        return true;
    }
    let sum: f32 = weights.iter().sum();
    weights.iter().all(|w| *w >= 0.0) && (sum - 1.0).abs() <= STYLE_SUM_EPS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_finite() {
        assert!(check_finite(&Tensor::column("ok", &[1.0, -2.0])).is_ok());
        let err = check_finite(&Tensor::column("bad", &[1.0, f32::NAN])).unwrap_err();
        assert!(err.to_string().contains("bad"));
        assert!(check_finite(&Tensor::column("inf", &[f32::INFINITY])).is_err());
    }

    #[test]
    fn test_check_nonzero() {
        assert!(check_nonzero(&Tensor::column("std", &[0.5, 2.0])).is_ok());
        assert!(check_nonzero(&Tensor::column("std", &[0.5, 0.0])).is_err());
    }

    #[test]
    fn test_check_shape() {
        let t = Tensor::zeros("W0_000", 4, 3);
        assert!(check_shape(&t, 4, 3).is_ok());
        let err = check_shape(&t, 3, 4).unwrap_err();
        assert!(err.to_string().contains("W0_000"));
    }

    #[test]
    fn test_style_weights_valid() {
        assert!(style_weights_valid(&[0.0, 0.0]));
        assert!(style_weights_valid(&[0.25, 0.75]));
        assert!(!style_weights_valid(&[0.5, 0.6]));
        assert!(!style_weights_valid(&[1.5, -0.5]));
    }
}
