use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::linalg::softmax;
use crate::math::tensor::Tensor;

/// Row-wise softmax. Has no parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Softmax;

impl Softmax {
    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        softmax(input)
    }

    /// Multiplies `grad` by the softmax Jacobian of each input row.
    ///
    /// With `s = exp(x − max)` and `S = Σs`:
    /// `dx_j = Σ_k dy_k · s_j · (𝟙[j = k]·S − s_k) / S²`
    pub fn backward(&self, input: &Tensor, grad: &Tensor) -> Result<Tensor> {
        if input.rank() == 0 || input.rank() > 2 {
            return Err(Error::RankMismatch { expected: 2, got: input.rank() });
        }
        if input.shape() != grad.shape() {
            return Err(Error::ShapeMismatch {
                lhs: input.shape().to_vec(),
                rhs: grad.shape().to_vec(),
            });
        }
        let (_, cols) = input.row_view();
        let mut dx = grad.clone();
        let mut s = vec![0.0; cols];
        for ((x, dy), out) in input.data().chunks(cols)
            .zip(grad.data().chunks(cols))
            .zip(dx.data_mut().chunks_mut(cols))
        {
            let m = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            for (s, &x) in s.iter_mut().zip(x) {
                *s = (x - m).exp();
            }
            let total: f64 = s.iter().sum();
            // Σ_k dy_k·s_k, shared by every j
            let weighted: f64 = dy.iter().zip(&s).map(|(d, s)| d * s).sum();
            for ((o, &sj), &dyj) in out.iter_mut().zip(&s).zip(dy) {
                *o = sj * (dyj * total - weighted) / (total * total);
            }
        }
        Ok(dx)
    }
}
