use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;
use crate::optim::GradientStep;

/// Plain stochastic gradient descent: `params -= learning_rate * grad`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Default for Sgd {
    fn default() -> Sgd {
        Sgd::new(0.01)
    }
}

impl GradientStep for Sgd {
    fn step(&mut self, params: &mut Tensor, grad: &Tensor) -> Result<()> {
        if params.shape() != grad.shape() {
            return Err(Error::ShapeMismatch {
                lhs: params.shape().to_vec(),
                rhs: grad.shape().to_vec(),
            });
        }
        let lr = self.learning_rate;
        params.apply_with(grad, |p, g| p - lr * g)
    }
}
