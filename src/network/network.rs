use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layers::Layer;
use crate::loss::Loss;
use crate::math::tensor::Tensor;
use crate::network::format::TokenReader;
use crate::optim::Optimizer;
use crate::train::{train_loop, EpochStats, Metric, TrainConfig};

/// A feedforward network: an ordered stack of layers trained against one loss.
///
/// The optimizer is a template. Every Dense layer receives its own fresh
/// copies of it, one for the weights and one for the bias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Layer>,
    loss: Loss,
    #[serde(default)]
    optimizer: Optimizer,
}

impl Mlp {
    pub fn new(layers: Vec<Layer>, loss: Loss, optimizer: Optimizer) -> Mlp {
        let mut mlp = Mlp { layers, loss, optimizer };
        mlp.attach_optimizers();
        mlp
    }

    /// Builds a network from a text model file.
    pub fn from_file<P: AsRef<Path>>(path: P, loss: Loss, optimizer: Optimizer) -> Result<Mlp> {
        let mut mlp = Mlp::new(Vec::new(), loss, optimizer);
        mlp.load(path)?;
        Ok(mlp)
    }

    /// Appends a layer, giving it fresh optimizers from the template.
    pub fn add(&mut self, layer: impl Into<Layer>) -> &mut Mlp {
        let mut layer = layer.into();
        layer.set_optimizer(&self.optimizer);
        self.layers.push(layer);
        self
    }

    pub fn set_loss(&mut self, loss: Loss) {
        self.loss = loss;
    }

    /// Replaces the template and resets every layer's optimizer state.
    pub fn set_optimizer(&mut self, optimizer: Optimizer) {
        self.optimizer = optimizer;
        self.attach_optimizers();
    }

    fn attach_optimizers(&mut self) {
        for layer in &mut self.layers {
            layer.set_optimizer(&self.optimizer);
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn param_count(&self) -> usize {
        self.layers.iter().map(Layer::param_count).sum()
    }

    /// Forward pass through every layer in order.
    pub fn run(&self, input: &Tensor) -> Result<Tensor> {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// One descent step on a batch. Returns the batch loss measured before
    /// the update.
    pub fn grad_descent(&mut self, x: &Tensor, y: &Tensor) -> Result<f64> {
        let activations = self.forward_cached(x)?;
        let output = activations.last().unwrap_or(x);
        let loss = self.loss.calc_loss(y, output)?;
        let grad = self.loss.calc_derivative(y, output)?;
        self.backward_from(&activations, grad)?;
        Ok(loss)
    }

    /// Backpropagates an externally computed gradient of some objective with
    /// respect to the network output, updating every layer. Returns the
    /// gradient with respect to `x`.
    pub fn backward_pass(&mut self, x: &Tensor, grad: &Tensor) -> Result<Tensor> {
        let activations = self.forward_cached(x)?;
        self.backward_from(&activations, grad.clone())
    }

    /// Inputs seen by each layer, followed by the network output.
    fn forward_cached(&self, x: &Tensor) -> Result<Vec<Tensor>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.clone());
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1])?;
            activations.push(next);
        }
        Ok(activations)
    }

    fn backward_from(&mut self, activations: &[Tensor], mut grad: Tensor) -> Result<Tensor> {
        let inputs = &activations[..self.layers.len()];
        for (layer, input) in self.layers.iter_mut().zip(inputs).rev() {
            grad = layer.backward(input, &grad)?;
        }
        Ok(grad)
    }

    /// See [`train_loop`].
    pub fn train(
        &mut self,
        x_train: &Tensor,
        y_train: &Tensor,
        validation: Option<(&Tensor, &Tensor)>,
        config: &TrainConfig,
    ) -> Result<Vec<EpochStats>> {
        train_loop(self, x_train, y_train, validation, config)
    }

    pub fn calc_loss(&self, x: &Tensor, y: &Tensor) -> Result<f64> {
        let prediction = self.run(x)?;
        self.loss.calc_loss(y, &prediction)
    }

    /// Accuracy over the whole dataset. Labels are class indices exactly when
    /// the loss is sparse. A single-output model is scored as a binary
    /// decision at 0.5, or at 0 when the loss takes logits.
    pub fn calc_accuracy(&self, x: &Tensor, y: &Tensor) -> Result<f64> {
        let metric = if self.loss.is_sparse() {
            Metric::SparseCategoricalAccuracy
        } else {
            Metric::Accuracy
        };
        self.evaluate(x, y, metric)
    }

    /// Scores the whole dataset with one metric.
    pub fn evaluate(&self, x: &Tensor, y: &Tensor, metric: Metric) -> Result<f64> {
        let prediction = self.run(x)?;
        metric.evaluate(&prediction, y, self.loss.from_logits())
    }

    /// Writes the layers to `path` in the text model format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(fs::File::create(path)?);
        writeln!(out, "{}", self.layers.len())?;
        for layer in &self.layers {
            layer.save(&mut out)?;
        }
        out.flush()?;
        log::info!("saved {} layers to {}", self.layers.len(), path.display());
        Ok(())
    }

    /// Replaces the layers with those stored at `path`. The loss and the
    /// optimizer template are kept; loaded layers get fresh optimizers.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut tokens = TokenReader::new(&text);
        let count: usize = tokens.parse("layer count")?;
        let layers = (0..count)
            .map(|_| Layer::load(&mut tokens))
            .collect::<Result<Vec<Layer>>>()?;
        if !tokens.is_done() {
            return Err(Error::MalformedModel(format!(
                "trailing data after {count} layers"
            )));
        }
        self.layers = layers;
        self.attach_optimizers();
        log::info!("loaded {} layers from {}", count, path.display());
        Ok(())
    }

    /// Serializes layers, loss and optimizer hyperparameters as pretty JSON.
    /// Optimizer moments are not stored.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = fs::File::create(path.as_ref())?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        log::info!("saved model json to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Mlp> {
        let file = fs::File::open(path.as_ref())?;
        let reader = std::io::BufReader::new(file);
        let mut mlp: Mlp = serde_json::from_reader(reader)?;
        for layer in &mlp.layers {
            if let Layer::Dense(dense) = layer {
                dense.validate()?;
            }
        }
        mlp.attach_optimizers();
        log::info!("loaded model json from {}", path.as_ref().display());
        Ok(mlp)
    }

    /// Layer listing with parameter counts, the loss and the optimizer.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        for (i, layer) in self.layers.iter().enumerate() {
            s.push_str(&format!("{i:>3}: {}\n", layer.summary()));
        }
        s.push_str(&format!("total params: {}\n", self.param_count()));
        s.push_str(&format!("loss: {}\n", self.loss));
        s.push_str(&format!("optimizer: {}", self.optimizer));
        s
    }
}

impl fmt::Display for Mlp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::layers::{Dense, Softmax};
    use crate::optim::{Adam, Sgd};

    fn affine(w: f64, b: f64) -> Layer {
        Dense::from_parts(
            Tensor::array(&[[w]]).unwrap(),
            Tensor::array(&[b]).unwrap(),
            Activation::Linear,
        )
        .unwrap()
        .into()
    }

    #[test]
    fn run_folds_through_layers() {
        let mlp = Mlp::new(vec![affine(2.0, -1.0)], Loss::Mse, Optimizer::default());
        let out = mlp.run(&Tensor::array(&[6.9]).unwrap()).unwrap();
        assert!((out.data()[0] - 12.8).abs() < 1e-12);

        let mut stacked = mlp.clone();
        stacked.add(Layer::Identity).add(affine(0.5, 0.0));
        let out = stacked.run(&Tensor::array(&[[6.9], [1.0]]).unwrap()).unwrap();
        assert_eq!(out.shape(), &[2, 1]);
        assert!((out.data()[0] - 6.4).abs() < 1e-12);
        assert!((out.data()[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn grad_descent_reduces_loss() {
        let mut mlp = Mlp::new(vec![affine(0.0, 0.0)], Loss::Mse, Optimizer::Sgd(Sgd::new(0.1)));
        let x = Tensor::array(&[[1.0], [2.0], [3.0]]).unwrap();
        let y = Tensor::array(&[[1.0], [3.0], [5.0]]).unwrap();
        let first = mlp.grad_descent(&x, &y).unwrap();
        let second = mlp.grad_descent(&x, &y).unwrap();
        assert!(second < first);
        assert!(mlp.calc_loss(&x, &y).unwrap() < second);
    }

    #[test]
    fn backward_pass_returns_input_gradient() {
        let mut mlp = Mlp::new(vec![affine(3.0, 0.0)], Loss::Mse, Optimizer::default());
        let dx = mlp.backward_pass(&Tensor::array(&[[1.0]]).unwrap(), &Tensor::array(&[[2.0]]).unwrap()).unwrap();
        assert_eq!(dx.data(), &[6.0]);
    }

    #[test]
    fn set_optimizer_reaches_every_dense_layer() {
        let mut mlp = Mlp::new(vec![affine(1.0, 0.0), Layer::Softmax(Softmax)], Loss::Mse, Optimizer::default());
        assert_eq!(mlp.optimizer().name(), "SGD");
        mlp.set_optimizer(Adam::default().into());
        assert_eq!(mlp.optimizer().name(), "Adam");
        match &mlp.layers()[0] {
            Layer::Dense(dense) => assert_eq!(dense.optimizer().name(), "Adam"),
            other => panic!("unexpected layer {}", other.name()),
        }
    }

    #[test]
    fn accuracy_on_one_hot_labels() {
        let mlp = Mlp::new(vec![Layer::Identity], Loss::Crossentropy { from_logits: false }, Optimizer::default());
        let x = Tensor::array(&[[0.1, 0.9], [0.8, 0.2], [0.3, 0.7]]).unwrap();
        let y = Tensor::array(&[[0.0, 1.0], [0.0, 1.0], [1.0, 0.0]]).unwrap();
        assert!((mlp.calc_accuracy(&x, &y).unwrap() - 1.0 / 3.0).abs() < 1e-12);

        let sparse = Tensor::array(&[1.0, 1.0, 0.0]).unwrap();
        assert!(matches!(mlp.calc_accuracy(&x, &sparse), Err(Error::ShapeMismatch { .. })));
        let mut sparse_mlp = mlp.clone();
        sparse_mlp.set_loss(Loss::SparseCategoricalCrossentropy { from_logits: false });
        assert!((sparse_mlp.calc_accuracy(&x, &sparse).unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    fn sigmoid_unit(w: f64) -> Layer {
        Dense::from_parts(
            Tensor::array(&[[w]]).unwrap(),
            Tensor::array(&[0.0]).unwrap(),
            Activation::Sigmoid,
        )
        .unwrap()
        .into()
    }

    #[test]
    fn single_sigmoid_accuracy_is_thresholded() {
        let loss = Loss::BinaryCrossentropy { from_logits: false };
        // predicts the opposite of every label
        let mlp = Mlp::new(vec![sigmoid_unit(-5.0)], loss, Optimizer::default());
        let x = Tensor::array(&[[1.0], [-2.0]]).unwrap();
        assert_eq!(mlp.calc_accuracy(&x, &Tensor::array(&[[1.0], [0.0]]).unwrap()).unwrap(), 0.0);
        assert_eq!(mlp.calc_accuracy(&x, &Tensor::array(&[0.0, 1.0]).unwrap()).unwrap(), 1.0);
    }

    #[test]
    fn saturated_sigmoid_keeps_parameters_finite() {
        let loss = Loss::BinaryCrossentropy { from_logits: false };
        let mut mlp = Mlp::new(vec![sigmoid_unit(50.0)], loss, Optimizer::default());
        let x = Tensor::array(&[[1.0], [-0.01]]).unwrap();
        let y = Tensor::array(&[[1.0], [0.0]]).unwrap();
        assert_eq!(mlp.run(&x).unwrap().data()[0], 1.0);
        assert!(mlp.grad_descent(&x, &y).unwrap().is_finite());
        match &mlp.layers()[0] {
            Layer::Dense(dense) => {
                assert!(dense.weights().iter().all(|w| w.is_finite()));
                assert!(dense.bias().iter().all(|b| b.is_finite()));
            }
            other => panic!("unexpected layer {}", other.name()),
        }
    }

    #[test]
    fn summary_lists_layers() {
        let mlp = Mlp::new(vec![affine(1.0, 0.0), Layer::Softmax(Softmax)], Loss::Huber, Optimizer::default());
        let text = mlp.to_string();
        assert!(text.contains("Dense(1 -> 1, linear) params: 2"));
        assert!(text.contains("Softmax"));
        assert!(text.contains("total params: 2"));
        assert!(text.contains("loss: huber"));
    }
}
