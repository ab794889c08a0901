use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

/// Elementwise activation functions.
///
/// Each variant is a pure pair `(f, f')` over ℝ. The textual name is what the
/// model file stores, so it must stay stable and free of whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Sigmoid,
    Tanh,
    Relu,
    /// Slope 0.01 on the negative side.
    LeakyRelu,
    Linear,
    /// `x · σ(x)`
    Swish,
}

const LEAKY_SLOPE: f64 = 0.01;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Activation {
    pub const ALL: [Activation; 6] = [
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Relu,
        Activation::LeakyRelu,
        Activation::Linear,
        Activation::Swish,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Relu => "relu",
            Activation::LeakyRelu => "leaky_relu",
            Activation::Linear => "linear",
            Activation::Swish => "swish",
        }
    }

    /// Looks an activation up by the name stored in model files.
    pub fn from_name(name: &str) -> Result<Activation> {
        Activation::ALL
            .iter()
            .copied()
            .find(|a| a.name() == name)
            .ok_or_else(|| Error::UnknownActivation(name.to_string()))
    }

    pub fn function(&self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
            Activation::Relu => if x > 0.0 { x } else { 0.0 },
            Activation::LeakyRelu => if x > 0.0 { x } else { LEAKY_SLOPE * x },
            Activation::Linear => x,
            Activation::Swish => x * sigmoid(x),
        }
    }

    /// Derivative evaluated at the pre-activation value `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => {
                let s = sigmoid(x);
                s * (1.0 - s)
            }
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            Activation::Relu => if x > 0.0 { 1.0 } else { 0.0 },
            Activation::LeakyRelu => if x > 0.0 { 1.0 } else { LEAKY_SLOPE },
            Activation::Linear => 1.0,
            Activation::Swish => {
                let s = sigmoid(x);
                s + x * s * (1.0 - s)
            }
        }
    }

    pub fn forward(&self, t: &Tensor) -> Tensor {
        t.calc(|x| self.function(x))
    }

    pub fn backward(&self, t: &Tensor) -> Tensor {
        t.calc(|x| self.derivative(x))
    }

    pub fn apply(&self, t: &mut Tensor) {
        t.apply(|x| self.function(x));
    }

    pub fn apply_derivative(&self, t: &mut Tensor) {
        t.apply(|x| self.derivative(x));
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for a in Activation::ALL {
            assert_eq!(Activation::from_name(a.name()).unwrap(), a);
            assert!(!a.name().contains(char::is_whitespace));
        }
        assert!(matches!(Activation::from_name("softplus"), Err(Error::UnknownActivation(_))));
    }

    #[test]
    fn pointwise_values() {
        assert_eq!(Activation::Sigmoid.function(0.0), 0.5);
        assert_eq!(Activation::Sigmoid.derivative(0.0), 0.25);
        assert_eq!(Activation::Relu.function(-3.0), 0.0);
        assert_eq!(Activation::Relu.derivative(2.0), 1.0);
        assert_eq!(Activation::LeakyRelu.function(-2.0), -0.02);
        assert_eq!(Activation::LeakyRelu.derivative(-2.0), 0.01);
        assert_eq!(Activation::Linear.derivative(123.0), 1.0);
        assert_eq!(Activation::Tanh.derivative(0.0), 1.0);
        assert_eq!(Activation::Swish.function(0.0), 0.0);
        assert_eq!(Activation::Swish.derivative(0.0), 0.5);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let h = 1e-6;
        for a in Activation::ALL {
            for &x in &[-2.5, -0.3, 0.4, 1.7] {
                let numeric = (a.function(x + h) - a.function(x - h)) / (2.0 * h);
                assert!(
                    (numeric - a.derivative(x)).abs() < 1e-5,
                    "{a} at {x}: {numeric} vs {}",
                    a.derivative(x)
                );
            }
        }
    }

    #[test]
    fn forward_copies_and_apply_mutates() {
        let mut t = Tensor::array(&[-1.0, 0.0, 2.0]).unwrap();
        let out = Activation::Relu.forward(&t);
        assert_eq!(out.data(), &[0.0, 0.0, 2.0]);
        assert_eq!(t.data(), &[-1.0, 0.0, 2.0]);
        Activation::Relu.apply_derivative(&mut t);
        assert_eq!(t.data(), &[0.0, 0.0, 1.0]);
        assert_eq!(Activation::Relu.backward(&out).data(), &[0.0, 0.0, 1.0]);
    }
}
