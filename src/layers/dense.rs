use std::io::Write;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{Error, Result};
use crate::math::linalg::{column_sum, dense_forward, matrix_multiply, transpose};
use crate::math::tensor::{fmt_shape, Tensor};
use crate::network::format::{write_row, TokenReader};
use crate::optim::Optimizer;

/// A fully connected layer: `activation(x · W + b)`.
///
/// `weights` is `[input_size, output_size]` and `bias` is `[output_size]`.
/// The weight and bias tensors each get their own optimizer so that Adam
/// moments are never shared between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    input_size: usize,
    output_size: usize,
    weights: Tensor,
    bias: Tensor,
    pub activation: Activation,
    #[serde(skip)]
    weight_opt: Optimizer,
    #[serde(skip)]
    bias_opt: Optimizer,
}

impl Dense {
    /// He-initialised weights drawn from `N(0, √(2 / input_size))`, zero bias.
    pub fn new(input_size: usize, output_size: usize, activation: Activation) -> Result<Dense> {
        Dense::new_with(input_size, output_size, activation, &mut rand::thread_rng())
    }

    pub fn new_with<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Dense> {
        let std_dev = (2.0 / input_size.max(1) as f64).sqrt();
        let weights = Tensor::randn_with(&[input_size, output_size], 0.0, std_dev, rng)?;
        let bias = Tensor::zeros(&[output_size])?;
        Dense::from_parts(weights, bias, activation)
    }

    /// Builds a layer around existing parameters.
    pub fn from_parts(weights: Tensor, bias: Tensor, activation: Activation) -> Result<Dense> {
        if weights.rank() != 2 {
            return Err(Error::RankMismatch { expected: 2, got: weights.rank() });
        }
        let (input_size, output_size) = (weights.shape()[0], weights.shape()[1]);
        if bias.shape() != [output_size] {
            return Err(Error::ShapeMismatch {
                lhs: weights.shape().to_vec(),
                rhs: bias.shape().to_vec(),
            });
        }
        Ok(Dense {
            input_size,
            output_size,
            weights,
            bias,
            activation,
            weight_opt: Optimizer::default(),
            bias_opt: Optimizer::default(),
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    pub fn param_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    /// Installs fresh copies of `opt` for the weights and the bias.
    pub fn set_optimizer(&mut self, opt: &Optimizer) {
        self.weight_opt = opt.clone();
        self.bias_opt = opt.clone();
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.weight_opt
    }

    /// Re-checks the parameter shapes against the declared sizes, e.g. after
    /// deserializing from JSON.
    pub(crate) fn validate(&self) -> Result<()> {
        let expected = [self.input_size, self.output_size];
        if self.weights.shape() != expected {
            return Err(Error::MalformedModel(format!(
                "dense weights are {}, expected {}",
                fmt_shape(self.weights.shape()),
                fmt_shape(&expected)
            )));
        }
        if self.bias.shape() != [self.output_size] {
            return Err(Error::MalformedModel(format!(
                "dense bias is {}, expected ({})",
                fmt_shape(self.bias.shape()),
                self.output_size
            )));
        }
        Ok(())
    }

    /// Accepts `[input_size]` or `[N, input_size]`.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let mut out = dense_forward(input, &self.weights, &self.bias)?;
        self.activation.apply(&mut out);
        Ok(out)
    }

    /// Backpropagates `grad` (∂L/∂output) through the layer, updates the
    /// parameters and returns ∂L/∂input, shaped like `input`.
    ///
    /// Parameter gradients are averaged over the rows of the batch. The input
    /// gradient is computed from the weights as they were before the update.
    pub fn backward(&mut self, input: &Tensor, grad: &Tensor) -> Result<Tensor> {
        let single = input.rank() == 1;
        let x = if single {
            input.clone().reshaped(&[1, input.len()])?
        } else {
            input.clone()
        };
        let pre = dense_forward(&x, &self.weights, &self.bias)?;
        if grad.len() != pre.len() {
            return Err(Error::ShapeMismatch {
                lhs: pre.shape().to_vec(),
                rhs: grad.shape().to_vec(),
            });
        }
        let dy = grad.clone().reshaped(pre.shape())?;
        let g = self.activation.backward(&pre).mul(&dy)?;

        let n = x.rows() as f64;
        let d_weights = &matrix_multiply(&transpose(&x)?, &g)? / n;
        let d_bias = &column_sum(&g)? / n;
        let mut dx = matrix_multiply(&g, &transpose(&self.weights)?)?;

        self.weight_opt.apply_grad(&mut self.weights, &d_weights)?;
        self.bias_opt.apply_grad(&mut self.bias, &d_bias)?;

        if single {
            dx.reshape(input.shape())?;
        }
        Ok(dx)
    }

    /// Writes the activation name, the sizes, the weights row by row and the bias.
    pub fn save<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}", self.activation.name())?;
        writeln!(out, "{} {}", self.input_size, self.output_size)?;
        for row in self.weights.data().chunks(self.output_size) {
            write_row(out, row)?;
        }
        write_row(out, self.bias.data())
    }

    pub(crate) fn load(tokens: &mut TokenReader<'_>) -> Result<Dense> {
        let activation = Activation::from_name(tokens.word("activation name")?)?;
        let input_size: usize = tokens.parse("input size")?;
        let output_size: usize = tokens.parse("output size")?;
        if input_size == 0 || output_size == 0 {
            return Err(Error::MalformedModel(format!(
                "dense layer sizes must be at least 1, got {input_size} x {output_size}"
            )));
        }
        let weights = tokens.floats(input_size * output_size, "weight")?;
        let bias = tokens.floats(output_size, "bias")?;
        Dense::from_parts(
            Tensor::from_vec(&[input_size, output_size], weights)?,
            Tensor::from_vec(&[output_size], bias)?,
            activation,
        )
    }

    pub fn summary(&self) -> String {
        format!(
            "Dense({} -> {}, {}) params: {}",
            self.input_size,
            self.output_size,
            self.activation,
            self.param_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::Sgd;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn approx_eq(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    fn example_layer() -> Dense {
        Dense::from_parts(
            Tensor::array(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap(),
            Tensor::array(&[-4.2, 6.9]).unwrap(),
            Activation::Linear,
        )
        .unwrap()
    }

    #[test]
    fn forward_matches_hand_computation() {
        let layer = example_layer();
        let out = layer.forward(&Tensor::array(&[1.0, 2.0, -1.0]).unwrap()).unwrap();
        assert_eq!(out.shape(), &[2]);
        assert!(approx_eq(out.data(), &[-2.2, 10.9]));

        let batch = Tensor::array(&[[1.0, 2.0, -1.0], [0.0, 0.0, 0.0]]).unwrap();
        let out = layer.forward(&batch).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert!(approx_eq(out.data(), &[-2.2, 10.9, -4.2, 6.9]));
    }

    #[test]
    fn backward_uses_weights_before_the_update() {
        let mut layer = example_layer();
        let x = Tensor::array(&[1.0, 2.0, -1.0]).unwrap();
        let dy = Tensor::array(&[1.0, 2.0]).unwrap();
        let dx = layer.backward(&x, &dy).unwrap();
        assert_eq!(dx.shape(), &[3]);
        assert!(approx_eq(dx.data(), &[5.0, 11.0, 17.0]));

        assert!(approx_eq(layer.weights().data(), &[0.99, 1.98, 2.98, 3.96, 5.01, 6.02]));
        assert!(approx_eq(layer.bias().data(), &[-4.21, 6.88]));
    }

    #[test]
    fn parameter_gradients_are_averaged_over_the_batch() {
        let mut single = example_layer();
        let mut double = example_layer();
        single.set_optimizer(&Optimizer::Sgd(Sgd::new(0.1)));
        double.set_optimizer(&Optimizer::Sgd(Sgd::new(0.1)));

        let x = Tensor::array(&[0.5, -1.0, 2.0]).unwrap();
        let dy = Tensor::array(&[0.3, -0.7]).unwrap();
        single.backward(&x, &dy).unwrap();

        let xs = Tensor::stack(&[x.clone(), x]).unwrap();
        let dys = Tensor::stack(&[dy.clone(), dy]).unwrap();
        let dx = double.backward(&xs, &dys).unwrap();
        assert_eq!(dx.shape(), &[2, 3]);

        assert!(approx_eq(single.weights().data(), double.weights().data()));
        assert!(approx_eq(single.bias().data(), double.bias().data()));
    }

    #[test]
    fn backward_rejects_mismatched_gradient() {
        let mut layer = example_layer();
        let x = Tensor::array(&[1.0, 2.0, -1.0]).unwrap();
        let dy = Tensor::array(&[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(layer.backward(&x, &dy), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn he_initialisation_has_zero_bias_and_expected_spread() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = Dense::new_with(200, 50, Activation::Relu, &mut rng).unwrap();
        assert!(layer.bias().iter().all(|&b| b == 0.0));
        let n = layer.weights().len() as f64;
        let mean = layer.weights().iter().sum::<f64>() / n;
        let var = layer.weights().iter().map(|w| (w - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.01);
        assert!((var - 0.01).abs() < 0.001, "variance {var}");
    }

    #[test]
    fn from_parts_checks_bias_shape() {
        let w = Tensor::zeros(&[3, 2]).unwrap();
        let b = Tensor::zeros(&[3]).unwrap();
        assert!(matches!(Dense::from_parts(w, b, Activation::Relu), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn text_round_trip_is_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = Dense::new_with(4, 3, Activation::Swish, &mut rng).unwrap();
        let mut buf = Vec::new();
        layer.save(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let back = Dense::load(&mut TokenReader::new(&text)).unwrap();
        assert_eq!(back.weights(), layer.weights());
        assert_eq!(back.bias(), layer.bias());
        assert_eq!(back.activation, Activation::Swish);
    }

    #[test]
    fn load_rejects_zero_sizes_and_unknown_activations() {
        let err = Dense::load(&mut TokenReader::new("relu 0 2")).unwrap_err();
        assert!(matches!(err, Error::MalformedModel(_)));
        let err = Dense::load(&mut TokenReader::new("gelu 1 1 0.5 0.0")).unwrap_err();
        assert!(matches!(err, Error::UnknownActivation(name) if name == "gelu"));
    }
}
