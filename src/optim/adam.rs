use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;
use crate::optim::GradientStep;

/// Adam with bias-corrected first and second moment estimates.
///
/// The moments are allocated on the first step and reallocated whenever the
/// parameter shape changes. Cloning copies the hyperparameters only, so every
/// clone starts from a clean state.
#[derive(Debug, Serialize, Deserialize)]
pub struct Adam {
    pub alpha: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    #[serde(skip)]
    m: Option<Tensor>,
    #[serde(skip)]
    v: Option<Tensor>,
    #[serde(skip)]
    t: u64,
}

impl Adam {
    pub fn new(alpha: f64, beta1: f64, beta2: f64, epsilon: f64) -> Adam {
        Adam { alpha, beta1, beta2, epsilon, m: None, v: None, t: 0 }
    }

    /// Adam with default betas and epsilon.
    pub fn with_learning_rate(alpha: f64) -> Adam {
        Adam { alpha, ..Adam::default() }
    }

    /// Index of the next step, 0 before the first one.
    pub fn timestep(&self) -> u64 {
        self.t
    }

    fn reset(&mut self, shape: &[usize]) -> Result<()> {
        self.m = Some(Tensor::zeros(shape)?);
        self.v = Some(Tensor::zeros(shape)?);
        self.t = 1;
        Ok(())
    }
}

impl Default for Adam {
    fn default() -> Adam {
        Adam::new(0.001, 0.9, 0.999, 1e-8)
    }
}

impl Clone for Adam {
    fn clone(&self) -> Adam {
        Adam::new(self.alpha, self.beta1, self.beta2, self.epsilon)
    }
}

impl PartialEq for Adam {
    fn eq(&self, other: &Adam) -> bool {
        self.alpha == other.alpha
            && self.beta1 == other.beta1
            && self.beta2 == other.beta2
            && self.epsilon == other.epsilon
    }
}

impl GradientStep for Adam {
    fn step(&mut self, params: &mut Tensor, grad: &Tensor) -> Result<()> {
        if params.shape() != grad.shape() {
            return Err(Error::ShapeMismatch {
                lhs: params.shape().to_vec(),
                rhs: grad.shape().to_vec(),
            });
        }
        let stale = match &self.m {
            Some(m) => m.shape() != params.shape(),
            None => true,
        };
        if stale {
            self.reset(params.shape())?;
        }

        let (b1, b2) = (self.beta1, self.beta2);
        let t = self.t as i32;
        let (m, v) = match (self.m.as_mut(), self.v.as_mut()) {
            (Some(m), Some(v)) => (m, v),
            _ => return Err(Error::InvalidArgument("adam moments missing".to_string())),
        };
        m.apply_with(grad, |m, g| b1 * m + (1.0 - b1) * g)?;
        v.apply_with(grad, |v, g| b2 * v + (1.0 - b2) * g * g)?;

        let m_corr = 1.0 - b1.powi(t);
        let v_corr = 1.0 - b2.powi(t);
        let (alpha, eps) = (self.alpha, self.epsilon);
        for ((p, &m), &v) in params.iter_mut().zip(m.iter()).zip(v.iter()) {
            let m_hat = m / m_corr;
            let v_hat = v / v_corr;
            *p -= alpha * m_hat / (v_hat.sqrt() + eps);
        }

        self.t += 1;
        Ok(())
    }
}
