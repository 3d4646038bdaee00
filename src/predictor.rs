//! Phase-functioned inference.
//!
//! The network weights are not fixed: each of the three layers stores one
//! weight/bias pair per phase control point, and the weights used for a
//! tick are blended from the control points around the current phase.
//!
//! # Algorithm
//!
//! 1. Map `phase` in `[0, 1)` to `p = phase * control_points`.
//! 2. Pick the control points around `p` and their basis weights
//!    ([`ControlBlend`]); the cubic scheme uses the Catmull-Rom basis over
//!    `floor(p) - 1 ..= floor(p) + 2`, wrapping around the cycle.
//! 3. Zero each effective tensor and accumulate `w_k * W_k`.
//! 4. Forward pass:
//!    `Y = renorm(W2 * ELU(W1 * ELU(W0 * norm(X) + b0) + b1) + b2)`.
//!
//! All buffers are allocated once at construction and reused every tick.

use std::sync::Arc;

use crate::config::{PhaseInterpolation, SynthesisConfig};
use crate::error::Result;
use crate::math::activation::Activation;
use crate::math::tensor::{blend, layer, normalize, renormalize, Tensor};
use crate::math::transform::wrap_phase;
use crate::parameters::{NetworkParameters, LAYER_COUNT};

/// Capability interface of a pose regressor driven by a phase scalar.
pub trait Predictor {
    /// Expected number of input rows.
    fn input_dim(&self) -> usize;

    /// Number of output rows produced by [`Predictor::predict`].
    fn output_dim(&self) -> usize;

    /// Whether parameters are loaded. An unready predictor never changes
    /// its output.
    fn is_ready(&self) -> bool;

    /// Run one inference step and return the output tensor.
    ///
    /// `damping` is recorded for downstream consumers; it does not alter
    /// the forward pass.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` does not match [`Predictor::input_dim`].
    /// The previous output is kept in that case.
    fn predict(&mut self, input: &Tensor, phase: f32, damping: f32) -> Result<&Tensor>;

    /// Output of the most recent successful prediction.
    fn output(&self) -> &Tensor;

    /// Control point count and interpolation scheme of the phase function,
    /// for predictors that have one.
    fn phase_function(&self) -> Option<(usize, PhaseInterpolation)> {
        None
    }
}

/// Control points and basis weights contributing at one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlBlend {
    indices: [usize; 4],
    weights: [f32; 4],
    len: usize,
}

impl ControlBlend {
    /// Compute the blend for `phase` over `count` control points.
    ///
    /// `phase` is wrapped into `[0, 1)` first. With `count == 0` the blend
    /// is empty.
    #[must_use]
    pub fn new(phase: f32, count: usize, mode: PhaseInterpolation) -> Self {
        let mut blend = Self {
            indices: [0; 4],
            weights: [0.0; 4],
            len: 0,
        };
        if count == 0 {
            return blend;
        }

        let p = wrap_phase(phase) * count as f32;
        let base = p.floor();
        let mu = p - base;
        let i1 = (base as usize) % count;

        match mode {
            PhaseInterpolation::Constant => {
                blend.indices[0] = i1;
                blend.weights[0] = 1.0;
                blend.len = 1;
            }
            PhaseInterpolation::Linear => {
                blend.indices[..2].copy_from_slice(&[i1, (i1 + 1) % count]);
                blend.weights[..2].copy_from_slice(&[1.0 - mu, mu]);
                blend.len = 2;
            }
            PhaseInterpolation::Cubic => {
                let mu2 = mu * mu;
                let mu3 = mu2 * mu;
                blend.indices = [
                    (i1 + count - 1) % count,
                    i1,
                    (i1 + 1) % count,
                    (i1 + 2) % count,
                ];
                blend.weights = [
                    -0.5 * mu3 + mu2 - 0.5 * mu,
                    1.5 * mu3 - 2.5 * mu2 + 1.0,
                    -1.5 * mu3 + 2.0 * mu2 + 0.5 * mu,
                    0.5 * mu3 - 0.5 * mu2,
                ];
                blend.len = 4;
            }
        }
        blend
    }

    /// `(control point, weight)` pairs, in basis order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices[..self.len]
            .iter()
            .copied()
            .zip(self.weights[..self.len].iter().copied())
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Three-layer ELU network whose weights are a function of phase.
///
/// # Example
///
/// ```
/// use phase_locomotion::{PhaseFunctionedNetwork, Predictor, Tensor};
///
/// // Without parameters the network is inert.
/// let mut network = PhaseFunctionedNetwork::unloaded();
/// assert!(!network.is_ready());
/// let output = network.predict(&Tensor::zeros("X", 0, 1), 0.3, 0.0)?;
/// assert_eq!(output.rows(), 0);
/// # Ok::<(), phase_locomotion::SynthesisError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PhaseFunctionedNetwork {
    parameters: Option<Arc<NetworkParameters>>,
    interpolation: PhaseInterpolation,
    normalized_input: Tensor,
    hidden: [Tensor; 2],
    raw_output: Tensor,
    output: Tensor,
    weights: [Tensor; LAYER_COUNT],
    biases: [Tensor; LAYER_COUNT],
    damping: f32,
}

impl PhaseFunctionedNetwork {
    /// Create a network over shared parameters.
    #[must_use]
    pub fn new(parameters: Arc<NetworkParameters>, interpolation: PhaseInterpolation) -> Self {
        let input = parameters.input_dim();
        let hidden = parameters.hidden_dim();
        let output = parameters.output_dim();
        let effective = |l: usize| {
            let w = parameters.layer(l).weights(0);
            (
                Tensor::zeros(format!("W{l}"), w.rows(), w.cols()),
                Tensor::zeros(format!("b{l}"), w.rows(), 1),
            )
        };
        let (w0, b0) = effective(0);
        let (w1, b1) = effective(1);
        let (w2, b2) = effective(2);

        Self {
            normalized_input: Tensor::zeros("Xn", input, 1),
            hidden: [Tensor::zeros("H0", hidden, 1), Tensor::zeros("H1", hidden, 1)],
            raw_output: Tensor::zeros("Yraw", output, 1),
            output: Tensor::zeros("Y", output, 1),
            weights: [w0, w1, w2],
            biases: [b0, b1, b2],
            parameters: Some(parameters),
            interpolation,
            damping: 0.0,
        }
    }

    /// Create a network using the interpolation scheme of `config`.
    ///
    /// The control point count is taken from `parameters`; the synthesizer
    /// compares it with `config.control_points`.
    #[must_use]
    pub fn from_config(parameters: Arc<NetworkParameters>, config: &SynthesisConfig) -> Self {
        Self::new(parameters, config.interpolation)
    }

    /// A network without parameters; [`Predictor::predict`] is a no-op.
    #[must_use]
    pub fn unloaded() -> Self {
        let empty = |id: &str| Tensor::zeros(id, 0, 0);
        Self {
            parameters: None,
            interpolation: PhaseInterpolation::default(),
            normalized_input: Tensor::zeros("Xn", 0, 1),
            hidden: [Tensor::zeros("H0", 0, 1), Tensor::zeros("H1", 0, 1)],
            raw_output: Tensor::zeros("Yraw", 0, 1),
            output: Tensor::zeros("Y", 0, 1),
            weights: [empty("W0"), empty("W1"), empty("W2")],
            biases: [empty("b0"), empty("b1"), empty("b2")],
            damping: 0.0,
        }
    }

    /// Shared parameters, if loaded.
    #[must_use]
    pub fn parameters(&self) -> Option<&Arc<NetworkParameters>> {
        self.parameters.as_ref()
    }

    #[must_use]
    pub const fn interpolation(&self) -> PhaseInterpolation {
        self.interpolation
    }

    /// Damping passed to the latest [`Predictor::predict`] call.
    #[must_use]
    pub const fn damping(&self) -> f32 {
        self.damping
    }

    /// Effective weights of `layer` from the latest interpolation.
    ///
    /// # Panics
    ///
    /// Panics if `layer >= LAYER_COUNT`.
    #[must_use]
    pub fn effective_weights(&self, layer: usize) -> &Tensor {
        &self.weights[layer]
    }

    /// Effective bias of `layer` from the latest interpolation.
    ///
    /// # Panics
    ///
    /// Panics if `layer >= LAYER_COUNT`.
    #[must_use]
    pub fn effective_bias(&self, layer: usize) -> &Tensor {
        &self.biases[layer]
    }

    /// Rebuild the effective weights and biases for `phase`.
    ///
    /// Does nothing when no parameters are loaded.
    ///
    /// # Errors
    ///
    /// Propagates tensor shape errors; shapes are fixed at construction so
    /// this only fails if the parameters were built inconsistently.
    pub fn interpolate(&mut self, phase: f32) -> Result<()> {
        let Some(parameters) = self.parameters.as_deref() else {
            return Ok(());
        };
        let control = ControlBlend::new(phase, parameters.control_points(), self.interpolation);
        for l in 0..LAYER_COUNT {
            let source = parameters.layer(l);
            self.weights[l].fill(0.0);
            self.biases[l].fill(0.0);
            for (k, weight) in control.entries() {
                blend(&mut self.weights[l], source.weights(k), weight)?;
                blend(&mut self.biases[l], source.bias(k), weight)?;
            }
        }
        Ok(())
    }

    fn forward(&mut self, input: &Tensor) -> Result<()> {
        let Some(parameters) = self.parameters.as_deref() else {
            return Ok(());
        };
        let [h0, h1] = &mut self.hidden;

        normalize(
            input,
            parameters.x_mean(),
            parameters.x_std(),
            &mut self.normalized_input,
        )?;
        layer(&self.normalized_input, &self.weights[0], &self.biases[0], h0)?;
        h0.apply(Activation::Elu);
        layer(h0, &self.weights[1], &self.biases[1], h1)?;
        h1.apply(Activation::Elu);
        layer(h1, &self.weights[2], &self.biases[2], &mut self.raw_output)?;
        renormalize(
            &self.raw_output,
            parameters.y_mean(),
            parameters.y_std(),
            &mut self.output,
        )
    }
}

impl Predictor for PhaseFunctionedNetwork {
    fn input_dim(&self) -> usize {
        self.normalized_input.rows()
    }

    fn output_dim(&self) -> usize {
        self.output.rows()
    }

    fn is_ready(&self) -> bool {
        self.parameters.is_some()
    }

    fn predict(&mut self, input: &Tensor, phase: f32, damping: f32) -> Result<&Tensor> {
        self.damping = damping;
        if self.parameters.is_none() {
            return Ok(&self.output);
        }
        self.interpolate(phase)?;
        self.forward(input)?;
        Ok(&self.output)
    }

    fn output(&self) -> &Tensor {
        &self.output
    }

    fn phase_function(&self) -> Option<(usize, PhaseInterpolation)> {
        self.parameters
            .as_deref()
            .map(|p| (p.control_points(), self.interpolation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SynthesisError;
    use crate::parameters::{bias_id, weight_id};
    use approx::assert_relative_eq;

    /// Control point `k` has every weight equal to `k` and every bias `-k`.
    fn ramp_parameters(input: usize, hidden: usize, output: usize, points: usize) -> Arc<NetworkParameters> {
        let mut tensors = vec![
            Tensor::zeros("Xmean", input, 1),
            Tensor::from_fn("Xstd", input, 1, |_, _| 1.0),
            Tensor::zeros("Ymean", output, 1),
            Tensor::from_fn("Ystd", output, 1, |_, _| 1.0),
        ];
        let dims = [(hidden, input), (hidden, hidden), (output, hidden)];
        for (l, (rows, cols)) in dims.into_iter().enumerate() {
            for k in 0..points {
                tensors.push(Tensor::from_fn(weight_id(l, k), rows, cols, |_, _| k as f32));
                tensors.push(Tensor::from_fn(bias_id(l, k), rows, 1, |_, _| -(k as f32)));
            }
        }
        Arc::new(NetworkParameters::from_named_tensors(tensors, points).unwrap())
    }

    #[test]
    fn test_phase_function_follows_config() {
        let config = SynthesisConfig::default().with_interpolation(PhaseInterpolation::Linear);
        let network = PhaseFunctionedNetwork::from_config(ramp_parameters(2, 3, 2, 4), &config);
        assert_eq!(network.interpolation(), PhaseInterpolation::Linear);
        assert_eq!(network.phase_function(), Some((4, PhaseInterpolation::Linear)));
        assert_eq!(PhaseFunctionedNetwork::unloaded().phase_function(), None);
    }

    #[test]
    fn test_cubic_basis_sums_to_one() {
        for i in 0..100 {
            let phase = i as f32 / 100.0;
            let blend = ControlBlend::new(phase, 50, PhaseInterpolation::Cubic);
            let sum: f32 = blend.entries().map(|(_, w)| w).sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cubic_at_control_point_selects_it() {
        let blend = ControlBlend::new(0.2, 50, PhaseInterpolation::Cubic);
        let entries: Vec<_> = blend.entries().collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1].0, 10);
        assert_relative_eq!(entries[1].1, 1.0, epsilon = 1e-5);
        assert_relative_eq!(entries[0].1, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_indices_wrap() {
        let blend = ControlBlend::new(0.99, 50, PhaseInterpolation::Cubic);
        let indices: Vec<usize> = blend.entries().map(|(k, _)| k).collect();
        assert_eq!(indices, vec![48, 49, 0, 1]);

        let blend = ControlBlend::new(0.0, 50, PhaseInterpolation::Cubic);
        let indices: Vec<usize> = blend.entries().map(|(k, _)| k).collect();
        assert_eq!(indices, vec![49, 0, 1, 2]);
    }

    #[test]
    fn test_linear_and_constant() {
        let linear = ControlBlend::new(0.25, 4, PhaseInterpolation::Linear);
        assert_eq!(linear.entries().collect::<Vec<_>>(), vec![(1, 1.0), (2, 0.0)]);

        let linear = ControlBlend::new(0.375, 4, PhaseInterpolation::Linear);
        let entries: Vec<_> = linear.entries().collect();
        assert_eq!(entries[0].0, 1);
        assert_relative_eq!(entries[0].1, 0.5);
        assert_relative_eq!(entries[1].1, 0.5);

        let constant = ControlBlend::new(0.99, 4, PhaseInterpolation::Constant);
        assert_eq!(constant.entries().collect::<Vec<_>>(), vec![(3, 1.0)]);
        assert!(ControlBlend::new(0.5, 0, PhaseInterpolation::Cubic).is_empty());
    }

    #[test]
    fn test_interpolated_weights_match_blend() {
        let params = ramp_parameters(3, 4, 2, 8);
        let mut network = PhaseFunctionedNetwork::new(params, PhaseInterpolation::Linear);

        // halfway between control points 2 and 3
        network.interpolate(2.5 / 8.0).unwrap();
        assert_relative_eq!(network.effective_weights(0).get(0, 0), 2.5, epsilon = 1e-5);
        assert_relative_eq!(network.effective_bias(2).get(1, 0), -2.5, epsilon = 1e-5);
    }

    #[test]
    fn test_forward_pass() {
        let params = ramp_parameters(2, 3, 1, 4);
        let mut network = PhaseFunctionedNetwork::new(params, PhaseInterpolation::Constant);
        let input = Tensor::column("X", &[1.0, -1.0]);

        // control point 1: all weights 1, all biases -1
        let y = network.predict(&input, 0.25, 0.3).unwrap().get(0, 0);
        // h0 = elu(1 - 1 - 1) = e^-1 - 1
        let h0 = (-1.0f32).exp() - 1.0;
        // h1 = elu(3 * h0 - 1)
        let pre = 3.0 * h0 - 1.0;
        let h1 = pre.exp() - 1.0;
        assert_relative_eq!(y, 3.0 * h1 - 1.0, epsilon = 1e-5);
        assert_relative_eq!(network.damping(), 0.3);
        assert_eq!(network.output().get(0, 0), y);
    }

    #[test]
    fn test_wrong_input_keeps_previous_output() {
        let params = ramp_parameters(2, 3, 1, 4);
        let mut network = PhaseFunctionedNetwork::new(params, PhaseInterpolation::Cubic);
        let before = network.predict(&Tensor::column("X", &[0.5, 0.5]), 0.1, 0.0).unwrap().get(0, 0);

        let err = network
            .predict(&Tensor::column("X", &[0.5, 0.5, 0.5]), 0.6, 0.0)
            .unwrap_err();
        assert!(matches!(err, SynthesisError::DimensionMismatch { .. }));
        assert_eq!(network.output().get(0, 0), before);
    }

    #[test]
    fn test_unloaded_is_noop() {
        let mut network = PhaseFunctionedNetwork::unloaded();
        assert!(!network.is_ready());
        assert_eq!(network.input_dim(), 0);
        let out = network.predict(&Tensor::column("X", &[1.0]), 0.5, 0.7).unwrap();
        assert_eq!(out.shape(), (0, 1));
        assert_relative_eq!(network.damping(), 0.7);
    }

    #[test]
    fn test_dimensions_reported() {
        let network =
            PhaseFunctionedNetwork::new(ramp_parameters(5, 6, 7, 3), PhaseInterpolation::Cubic);
        assert!(network.is_ready());
        assert_eq!(network.input_dim(), 5);
        assert_eq!(network.output_dim(), 7);
        assert_eq!(network.parameters().unwrap().control_points(), 3);
    }
}
