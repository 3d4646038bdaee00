//! Pre-trained network parameters sampled at phase control points.
//!
//! A parameter asset is an opaque collection of named tensors:
//!
//! | Name | Shape | Meaning |
//! |------|-------|---------|
//! | `Xmean`, `Xstd` | input x 1 | input normalisation |
//! | `Ymean`, `Ystd` | output x 1 | output renormalisation |
//! | `W0_kkk` | hidden x input | layer 0 weights at control point `kkk` |
//! | `W1_kkk` | hidden x hidden | layer 1 weights |
//! | `W2_kkk` | output x hidden | layer 2 weights |
//! | `b{l}_kkk` | rows of `W{l}` x 1 | layer biases |
//!
//! Loading checks every shape, finiteness, and non-zero standard
//! deviations. The resulting [`NetworkParameters`] are immutable and meant
//! to be shared (`Arc`) by every predictor using them.

use std::collections::HashMap;

use crate::error::{Result, SynthesisError};
use crate::math::tensor::Tensor;
use crate::validation::{check_finite, check_nonzero, check_shape};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of dense layers in the network.
pub const LAYER_COUNT: usize = 3;

/// Asset name of the weight tensor for `layer` at `point`.
#[must_use]
pub fn weight_id(layer: usize, point: usize) -> String {
    format!("W{layer}_{point:03}")
}

/// Asset name of the bias tensor for `layer` at `point`.
#[must_use]
pub fn bias_id(layer: usize, point: usize) -> String {
    format!("b{layer}_{point:03}")
}

/// Weights and biases of one layer at every control point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhasedLayer {
    weights: Vec<Tensor>,
    biases: Vec<Tensor>,
}

impl PhasedLayer {
    /// Bundle per-control-point tensors.
    ///
    /// # Errors
    ///
    /// Returns an error if the lists are empty, differ in length, or any
    /// tensor deviates from the first one's shape.
    pub fn new(weights: Vec<Tensor>, biases: Vec<Tensor>) -> Result<Self> {
        let Some(first) = weights.first() else {
            return Err(SynthesisError::invalid_parameter(
                "layer needs at least one control point",
            ));
        };
        if weights.len() != biases.len() {
            return Err(SynthesisError::invalid_parameter(format!(
                "layer has {} weight tensors but {} bias tensors",
                weights.len(),
                biases.len()
            )));
        }
        let (rows, cols) = first.shape();
        for (w, b) in weights.iter().zip(&biases) {
            check_shape(w, rows, cols)?;
            check_shape(b, rows, 1)?;
            check_finite(w)?;
            check_finite(b)?;
        }
        Ok(Self { weights, biases })
    }

    #[must_use]
    pub fn control_points(&self) -> usize {
        self.weights.len()
    }

    /// Fan-in of the layer.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.weights[0].cols()
    }

    /// Fan-out of the layer.
    #[must_use]
    pub fn output_dim(&self) -> usize {
        self.weights[0].rows()
    }

    /// # Panics
    ///
    /// Panics if `point >= control_points()`.
    #[must_use]
    pub fn weights(&self, point: usize) -> &Tensor {
        &self.weights[point]
    }

    /// # Panics
    ///
    /// Panics if `point >= control_points()`.
    #[must_use]
    pub fn bias(&self, point: usize) -> &Tensor {
        &self.biases[point]
    }
}

/// Complete, validated parameter set of a three-layer phase-functioned network.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkParameters {
    x_mean: Tensor,
    x_std: Tensor,
    y_mean: Tensor,
    y_std: Tensor,
    layers: [PhasedLayer; LAYER_COUNT],
}

impl NetworkParameters {
    /// Assemble and validate a parameter set.
    ///
    /// # Errors
    ///
    /// Returns an error if layer shapes do not chain
    /// (`input -> hidden -> hidden -> output`), control point counts differ,
    /// normalisation tensors have the wrong shape, or any value is unusable.
    pub fn new(
        x_mean: Tensor,
        x_std: Tensor,
        y_mean: Tensor,
        y_std: Tensor,
        layers: [PhasedLayer; LAYER_COUNT],
    ) -> Result<Self> {
        let input = layers[0].input_dim();
        let hidden = layers[0].output_dim();
        let output = layers[2].output_dim();
        let points = layers[0].control_points();

        for (l, layer) in layers.iter().enumerate() {
            if layer.control_points() != points {
                return Err(SynthesisError::invalid_parameter(format!(
                    "layer {l} has {} control points, layer 0 has {points}",
                    layer.control_points()
                )));
            }
        }
        check_shape(layers[1].weights(0), hidden, hidden)?;
        check_shape(layers[2].weights(0), output, hidden)?;

        check_shape(&x_mean, input, 1)?;
        check_shape(&x_std, input, 1)?;
        check_shape(&y_mean, output, 1)?;
        check_shape(&y_std, output, 1)?;
        for t in [&x_mean, &x_std, &y_mean, &y_std] {
            check_finite(t)?;
        }
        check_nonzero(&x_std)?;
        check_nonzero(&y_std)?;

        Ok(Self {
            x_mean,
            x_std,
            y_mean,
            y_std,
            layers,
        })
    }

    /// Resolve a parameter set from an asset's named tensors.
    ///
    /// Tensors not referenced by the naming scheme are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::MissingParameter`] for the first absent
    /// name, or any validation error from [`NetworkParameters::new`].
    pub fn from_named_tensors(
        tensors: impl IntoIterator<Item = Tensor>,
        control_points: usize,
    ) -> Result<Self> {
        let mut by_name: HashMap<String, Tensor> = tensors
            .into_iter()
            .map(|t| (t.id().to_owned(), t))
            .collect();
        let mut take = |name: &str| {
            by_name
                .remove(name)
                .ok_or_else(|| SynthesisError::missing_parameter(name))
        };

        let x_mean = take("Xmean")?;
        let x_std = take("Xstd")?;
        let y_mean = take("Ymean")?;
        let y_std = take("Ystd")?;

        let mut build_layer = |layer: usize| -> Result<PhasedLayer> {
            let mut weights = Vec::with_capacity(control_points);
            let mut biases = Vec::with_capacity(control_points);
            for point in 0..control_points {
                weights.push(take(weight_id(layer, point).as_str())?);
                biases.push(take(bias_id(layer, point).as_str())?);
            }
            PhasedLayer::new(weights, biases)
        };
        let layers = [build_layer(0)?, build_layer(1)?, build_layer(2)?];

        let params = Self::new(x_mean, x_std, y_mean, y_std, layers)?;
        tracing::debug!(
            input = params.input_dim(),
            hidden = params.hidden_dim(),
            output = params.output_dim(),
            control_points,
            "loaded network parameters"
        );
        Ok(params)
    }

    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.layers[0].input_dim()
    }

    #[must_use]
    pub fn hidden_dim(&self) -> usize {
        self.layers[0].output_dim()
    }

    #[must_use]
    pub fn output_dim(&self) -> usize {
        self.layers[2].output_dim()
    }

    #[must_use]
    pub fn control_points(&self) -> usize {
        self.layers[0].control_points()
    }

    /// # Panics
    ///
    /// Panics if `index >= LAYER_COUNT`.
    #[must_use]
    pub fn layer(&self, index: usize) -> &PhasedLayer {
        &self.layers[index]
    }

    #[must_use]
    pub fn x_mean(&self) -> &Tensor {
        &self.x_mean
    }

    #[must_use]
    pub fn x_std(&self) -> &Tensor {
        &self.x_std
    }

    #[must_use]
    pub fn y_mean(&self) -> &Tensor {
        &self.y_mean
    }

    #[must_use]
    pub fn y_std(&self) -> &Tensor {
        &self.y_std
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(input: usize, hidden: usize, output: usize, points: usize) -> Vec<Tensor> {
        let mut tensors = vec![
            Tensor::zeros("Xmean", input, 1),
            Tensor::from_fn("Xstd", input, 1, |_, _| 1.0),
            Tensor::zeros("Ymean", output, 1),
            Tensor::from_fn("Ystd", output, 1, |_, _| 2.0),
        ];
        let dims = [(hidden, input), (hidden, hidden), (output, hidden)];
        for (l, (rows, cols)) in dims.into_iter().enumerate() {
            for k in 0..points {
                tensors.push(Tensor::from_fn(weight_id(l, k), rows, cols, |r, c| {
                    (r + c + k) as f32 * 0.01
                }));
                tensors.push(Tensor::zeros(bias_id(l, k), rows, 1));
            }
        }
        tensors
    }

    #[test]
    fn test_ids() {
        assert_eq!(weight_id(0, 7), "W0_007");
        assert_eq!(bias_id(2, 49), "b2_049");
    }

    #[test]
    fn test_from_named_tensors() {
        let params = NetworkParameters::from_named_tensors(asset(6, 8, 5, 4), 4).unwrap();
        assert_eq!(params.input_dim(), 6);
        assert_eq!(params.hidden_dim(), 8);
        assert_eq!(params.output_dim(), 5);
        assert_eq!(params.control_points(), 4);
        assert_eq!(params.layer(1).weights(3).id(), "W1_003");
        assert_eq!(params.y_std().get(0, 0), 2.0);
    }

    #[test]
    fn test_missing_tensor() {
        let tensors: Vec<Tensor> = asset(6, 8, 5, 4)
            .into_iter()
            .filter(|t| t.id() != "b1_002")
            .collect();
        let err = NetworkParameters::from_named_tensors(tensors, 4).unwrap_err();
        assert_eq!(err, SynthesisError::MissingParameter("b1_002".into()));
    }

    #[test]
    fn test_requesting_more_points_than_stored() {
        let err = NetworkParameters::from_named_tensors(asset(6, 8, 5, 4), 5).unwrap_err();
        assert!(matches!(err, SynthesisError::MissingParameter(_)));
    }

    #[test]
    fn test_zero_std_rejected() {
        let tensors: Vec<Tensor> = asset(3, 4, 2, 2)
            .into_iter()
            .map(|t| {
                if t.id() == "Xstd" {
                    Tensor::zeros("Xstd", 3, 1)
                } else {
                    t
                }
            })
            .collect();
        let err = NetworkParameters::from_named_tensors(tensors, 2).unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidParameter(_)));
    }

    #[test]
    fn test_broken_chain_rejected() {
        let tensors: Vec<Tensor> = asset(3, 4, 2, 2)
            .into_iter()
            .map(|t| {
                if t.id() == "W2_001" {
                    Tensor::zeros("W2_001", 2, 5)
                } else {
                    t
                }
            })
            .collect();
        assert!(NetworkParameters::from_named_tensors(tensors, 2).is_err());
    }

    #[test]
    fn test_phased_layer_rejects_mismatched_lists() {
        let w = vec![Tensor::zeros("W", 2, 2)];
        assert!(PhasedLayer::new(w.clone(), Vec::new()).is_err());
        assert!(PhasedLayer::new(Vec::new(), Vec::new()).is_err());
        assert!(PhasedLayer::new(w, vec![Tensor::zeros("b", 2, 1)]).is_ok());
    }
}
