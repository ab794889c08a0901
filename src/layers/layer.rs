use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layers::{Dense, Softmax};
use crate::math::tensor::Tensor;
use crate::network::format::TokenReader;
use crate::optim::Optimizer;

/// One stage of an [`Mlp`](crate::network::Mlp).
///
/// `forward` is pure. `backward` takes the input the layer saw on the forward
/// pass and the gradient of the loss with respect to its output, updates any
/// parameters and returns the gradient with respect to its input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    Dense(Dense),
    Softmax(Softmax),
    Identity,
}

impl Layer {
    /// Tag written at the head of the layer in model files.
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Dense(_) => "Dense",
            Layer::Softmax(_) => "Softmax",
            Layer::Identity => "Identity",
        }
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        match self {
            Layer::Dense(dense) => dense.forward(input),
            Layer::Softmax(softmax) => softmax.forward(input),
            Layer::Identity => Ok(input.clone()),
        }
    }

    pub fn backward(&mut self, input: &Tensor, grad: &Tensor) -> Result<Tensor> {
        match self {
            Layer::Dense(dense) => dense.backward(input, grad),
            Layer::Softmax(softmax) => softmax.backward(input, grad),
            Layer::Identity => Ok(grad.clone()),
        }
    }

    /// Parameterless layers ignore this.
    pub fn set_optimizer(&mut self, opt: &Optimizer) {
        if let Layer::Dense(dense) = self {
            dense.set_optimizer(opt);
        }
    }

    pub fn param_count(&self) -> usize {
        match self {
            Layer::Dense(dense) => dense.param_count(),
            _ => 0,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Layer::Dense(dense) => dense.summary(),
            other => other.name().to_string(),
        }
    }

    pub fn save<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}", self.name())?;
        match self {
            Layer::Dense(dense) => dense.save(out),
            _ => Ok(()),
        }
    }

    pub(crate) fn load(tokens: &mut TokenReader<'_>) -> Result<Layer> {
        match tokens.word("layer type")? {
            "Dense" => Ok(Layer::Dense(Dense::load(tokens)?)),
            "Softmax" => Ok(Layer::Softmax(Softmax)),
            "Identity" => Ok(Layer::Identity),
            other => Err(Error::UnknownLayerType(other.to_string())),
        }
    }
}

impl From<Dense> for Layer {
    fn from(dense: Dense) -> Layer {
        Layer::Dense(dense)
    }
}

impl From<Softmax> for Layer {
    fn from(softmax: Softmax) -> Layer {
        Layer::Softmax(softmax)
    }
}
