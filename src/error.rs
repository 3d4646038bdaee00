//! Error types for motion synthesis operations.
//!
//! Tensor operations, parameter loading and the synthesizer seams all
//! report through [`SynthesisError`].

use thiserror::Error;

/// Main error type for motion synthesis operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// Tensor operation rejected because operand shapes disagree.
    #[error("Dimension mismatch in {op}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        op: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// A required tensor is absent from the parameter asset.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// A tensor is present but unusable (wrong shape, NaN, zero std).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Controller and trajectory disagree on the number of styles.
    #[error("Style count mismatch: expected {expected}, got {actual}")]
    StyleCountMismatch { expected: usize, actual: usize },

    /// Pose snapshot and synthesizer disagree on the number of joints.
    #[error("Joint count mismatch: expected {expected}, got {actual}")]
    JointCountMismatch { expected: usize, actual: usize },

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for motion synthesis operations.
pub type Result<T> = std::result::Result<T, SynthesisError>;

impl SynthesisError {
    /// Create a dimension mismatch error.
    #[must_use]
    pub const fn dimension_mismatch(
        op: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        Self::DimensionMismatch {
            op,
            expected,
            actual,
        }
    }

    /// Create a missing parameter error.
    #[must_use]
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    /// Create an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a style count mismatch error.
    #[must_use]
    pub const fn style_count_mismatch(expected: usize, actual: usize) -> Self {
        Self::StyleCountMismatch { expected, actual }
    }

    /// Create a joint count mismatch error.
    #[must_use]
    pub const fn joint_count_mismatch(expected: usize, actual: usize) -> Self {
        Self::JointCountMismatch { expected, actual }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
