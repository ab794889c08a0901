use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::tensor::Tensor;
use crate::optim::{Adam, GradientStep, Sgd};

/// The update rule a layer applies to its parameters.
///
/// Every Dense layer owns two of these, one for the weights and one for the
/// bias, so stateful optimizers never share moments across tensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Optimizer {
    #[serde(rename = "SGD")]
    Sgd(Sgd),
    Adam(Adam),
}

impl Optimizer {
    /// Updates `params` in place from `grad`.
    pub fn apply_grad(&mut self, params: &mut Tensor, grad: &Tensor) -> Result<()> {
        match self {
            Optimizer::Sgd(sgd) => sgd.step(params, grad),
            Optimizer::Adam(adam) => adam.step(params, grad),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Optimizer::Sgd(_) => "SGD",
            Optimizer::Adam(_) => "Adam",
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            Optimizer::Sgd(sgd) => sgd.learning_rate,
            Optimizer::Adam(adam) => adam.alpha,
        }
    }
}

impl Default for Optimizer {
    fn default() -> Optimizer {
        Optimizer::Sgd(Sgd::default())
    }
}

impl From<Sgd> for Optimizer {
    fn from(sgd: Sgd) -> Optimizer {
        Optimizer::Sgd(sgd)
    }
}

impl From<Adam> for Optimizer {
    fn from(adam: Adam) -> Optimizer {
        Optimizer::Adam(adam)
    }
}

impl std::fmt::Display for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (lr = {})", self.name(), self.learning_rate())
    }
}
