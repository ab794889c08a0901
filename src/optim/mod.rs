pub mod adam;
pub mod optimizer;
pub mod sgd;

pub use adam::Adam;
pub use optimizer::Optimizer;
pub use sgd::Sgd;

use crate::error::Result;
use crate::math::tensor::Tensor;

/// One in-place parameter update from a gradient of the same shape.
pub trait GradientStep {
    fn step(&mut self, params: &mut Tensor, grad: &Tensor) -> Result<()>;
}
