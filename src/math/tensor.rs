//! Dense 2D tensors and the fused operations of the forward pass.
//!
//! Every operation checks exact dimension agreement first. On mismatch it
//! logs a warning, leaves its output untouched and returns
//! [`SynthesisError::DimensionMismatch`]. No operation allocates.

use nalgebra::DMatrix;

use crate::error::{Result, SynthesisError};
use crate::math::activation::Activation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dense `rows x cols` matrix with a string id for lookup in parameter assets.
///
/// The shape is fixed at construction; values are mutable in place.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tensor {
    id: String,
    data: DMatrix<f32>,
}

impl Tensor {
    /// Create a zero-filled tensor.
    pub fn zeros(id: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self {
            id: id.into(),
            data: DMatrix::zeros(rows, cols),
        }
    }

    /// Create a tensor from row-major values.
    ///
    /// # Errors
    ///
    /// Returns an error if `values.len() != rows * cols`.
    pub fn from_row_slice(
        id: impl Into<String>,
        rows: usize,
        cols: usize,
        values: &[f32],
    ) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(SynthesisError::dimension_mismatch(
                "from_row_slice",
                (rows, cols),
                (values.len(), 1),
            ));
        }
        Ok(Self {
            id: id.into(),
            data: DMatrix::from_row_slice(rows, cols, values),
        })
    }

    /// Create a column vector.
    pub fn column(id: impl Into<String>, values: &[f32]) -> Self {
        Self {
            id: id.into(),
            data: DMatrix::from_column_slice(values.len(), 1, values),
        }
    }

    /// Create a tensor whose entries are produced by `f(row, col)`.
    pub fn from_fn(
        id: impl Into<String>,
        rows: usize,
        cols: usize,
        f: impl FnMut(usize, usize) -> f32,
    ) -> Self {
        Self {
            id: id.into(),
            data: DMatrix::from_fn(rows, cols, f),
        }
    }

    /// Lookup id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    /// Read one entry.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside the tensor.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[(row, col)]
    }

    /// Write one entry.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside the tensor.
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[(row, col)] = value;
    }

    /// Values in column-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        self.data.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.data.as_mut_slice()
    }

    /// Underlying matrix.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f32> {
        &self.data
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Apply an activation to every entry in place.
    pub fn apply(&mut self, activation: Activation) -> &mut Self {
        activation.apply(self.data.as_mut_slice());
        self
    }
}

fn check_shape(op: &'static str, expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        tracing::warn!(op, ?expected, ?actual, "tensor dimension mismatch, operation skipped");
        Err(SynthesisError::dimension_mismatch(op, expected, actual))
    }
}

/// `out[i] = (input[i] - mean[i]) / std[i]`.
///
/// # Errors
///
/// All four tensors must share one shape; otherwise `out` is left unchanged.
pub fn normalize(input: &Tensor, mean: &Tensor, std: &Tensor, out: &mut Tensor) -> Result<()> {
    let shape = input.shape();
    check_shape("normalize", shape, mean.shape())?;
    check_shape("normalize", shape, std.shape())?;
    check_shape("normalize", shape, out.shape())?;
    for (((o, x), m), s) in out
        .data
        .iter_mut()
        .zip(input.data.iter())
        .zip(mean.data.iter())
        .zip(std.data.iter())
    {
        *o = (x - m) / s;
    }
    Ok(())
}

/// `out[i] = input[i] * std[i] + mean[i]`, the inverse of [`normalize`].
///
/// # Errors
///
/// All four tensors must share one shape; otherwise `out` is left unchanged.
pub fn renormalize(input: &Tensor, mean: &Tensor, std: &Tensor, out: &mut Tensor) -> Result<()> {
    let shape = input.shape();
    check_shape("renormalize", shape, mean.shape())?;
    check_shape("renormalize", shape, std.shape())?;
    check_shape("renormalize", shape, out.shape())?;
    for (((o, x), m), s) in out
        .data
        .iter_mut()
        .zip(input.data.iter())
        .zip(mean.data.iter())
        .zip(std.data.iter())
    {
        *o = x * s + m;
    }
    Ok(())
}

/// Fused layer `out = w * input + b`.
///
/// Requires `input.rows == w.cols`, `w.rows == b.rows`, `input.cols == b.cols`
/// and `out` shaped like `b`.
///
/// # Errors
///
/// Returns an error and leaves `out` unchanged on any disagreement.
pub fn layer(input: &Tensor, w: &Tensor, b: &Tensor, out: &mut Tensor) -> Result<()> {
    if input.rows() != w.cols() {
        return check_shape("layer", (w.cols(), input.cols()), input.shape());
    }
    if w.rows() != b.rows() || input.cols() != b.cols() {
        return check_shape("layer", (w.rows(), input.cols()), b.shape());
    }
    check_shape("layer", b.shape(), out.shape())?;
    out.data.copy_from(&b.data);
    out.data.gemm(1.0, &w.data, &input.data, 1.0);
    Ok(())
}

/// Weighted accumulation `target += weight * w`.
///
/// Additive, not a running average: callers zero the target first and pass
/// basis weights that sum to one.
///
/// # Errors
///
/// Returns an error and leaves `target` unchanged if the shapes differ.
pub fn blend(target: &mut Tensor, w: &Tensor, weight: f32) -> Result<()> {
    check_shape("blend", target.shape(), w.shape())?;
    for (t, v) in target.data.iter_mut().zip(w.data.iter()) {
        *t += weight * v;
    }
    Ok(())
}
