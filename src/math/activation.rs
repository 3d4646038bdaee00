//! Elementwise activation functions.
//!
//! All activations run in place over a flat slice and never allocate.
//! SoftMax and LogSoftMax subtract the maximum before exponentiating.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Activation applied elementwise to a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Activation {
    /// `x` for positive inputs, `exp(x) - 1` otherwise.
    Elu,
    /// `1 / (1 + exp(-x))`.
    Sigmoid,
    /// Hyperbolic tangent.
    TanH,
    /// Normalised exponentials over the whole buffer.
    SoftMax,
    /// Logarithm of [`Activation::SoftMax`].
    LogSoftMax,
    /// `x / (1 + |x|)`.
    SoftSign,
    /// Plain exponential.
    Exp,
}

impl Activation {
    /// Apply the activation in place.
    pub fn apply(self, values: &mut [f32]) {
        match self {
            Self::Elu => values.iter_mut().for_each(|v| *v = elu(*v)),
            Self::Sigmoid => values.iter_mut().for_each(|v| *v = 1.0 / (1.0 + (-*v).exp())),
            Self::TanH => values.iter_mut().for_each(|v| *v = v.tanh()),
            Self::SoftMax => softmax(values),
            Self::LogSoftMax => log_softmax(values),
            Self::SoftSign => values.iter_mut().for_each(|v| *v /= 1.0 + v.abs()),
            Self::Exp => values.iter_mut().for_each(|v| *v = v.exp()),
        }
    }
}

#[inline]
fn elu(x: f32) -> f32 {
    if x > 0.0 {
        x
    } else {
        x.exp() - 1.0
    }
}

fn max_value(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

fn softmax(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    let max = max_value(values);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

fn log_softmax(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    let max = max_value(values);
    let log_sum = values.iter().map(|v| (v - max).exp()).sum::<f32>().ln();
    for v in values.iter_mut() {
        *v = *v - max - log_sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_elu() {
        let mut v = [2.0, 0.0, -1.0];
        Activation::Elu.apply(&mut v);
        assert_relative_eq!(v[0], 2.0);
        assert_relative_eq!(v[1], 0.0);
        assert_relative_eq!(v[2], (-1.0f32).exp() - 1.0);
    }

    #[test]
    fn test_sigmoid_and_tanh() {
        let mut v = [0.0, 100.0, -100.0];
        Activation::Sigmoid.apply(&mut v);
        assert_relative_eq!(v[0], 0.5);
        assert_relative_eq!(v[1], 1.0, epsilon = 1e-6);
        assert_relative_eq!(v[2], 0.0, epsilon = 1e-6);

        let mut t = [0.5, -0.5];
        Activation::TanH.apply(&mut t);
        assert_relative_eq!(t[0], 0.5f32.tanh());
        assert_relative_eq!(t[1], -(0.5f32.tanh()));
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let mut v = [1.0, 2.0, 3.0, 1000.0];
        Activation::SoftMax.apply(&mut v);
        let sum: f32 = v.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
        assert!(v.iter().all(|x| x.is_finite()));
        assert!(v[3] > 0.99);
    }

    #[test]
    fn test_log_softmax_matches_softmax() {
        let input = [0.3, -1.2, 2.5];
        let mut soft = input;
        let mut log_soft = input;
        Activation::SoftMax.apply(&mut soft);
        Activation::LogSoftMax.apply(&mut log_soft);
        for (s, l) in soft.iter().zip(log_soft.iter()) {
            assert_relative_eq!(s.ln(), *l, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_softsign_and_exp() {
        let mut v = [1.0, -3.0];
        Activation::SoftSign.apply(&mut v);
        assert_relative_eq!(v[0], 0.5);
        assert_relative_eq!(v[1], -0.75);

        let mut e = [0.0, 1.0];
        Activation::Exp.apply(&mut e);
        assert_relative_eq!(e[0], 1.0);
        assert_relative_eq!(e[1], std::f32::consts::E);
    }

    #[test]
    fn test_empty_buffers() {
        let mut v: [f32; 0] = [];
        Activation::SoftMax.apply(&mut v);
        Activation::LogSoftMax.apply(&mut v);
    }
}
