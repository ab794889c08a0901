use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::loss::bce::BceLoss;
use crate::loss::cross_entropy::{CrossEntropyLoss, SparseCrossEntropyLoss};
use crate::loss::huber::HuberLoss;
use crate::loss::mse::MseLoss;
use crate::math::tensor::Tensor;

/// Every gradient element leaving a loss is clamped to `[-CLIP, CLIP]`.
pub const CLIP: f64 = 1e6;

/// Selects the loss function a network is trained against.
///
/// Per-row contributions are summed over the outputs and averaged over the
/// rows of the batch. Gradients are per example: the Dense layer divides its
/// parameter gradients by the batch size itself.
///
/// - `Mse`: squared error; pair with a linear output.
/// - `Huber`: quadratic within |d| ≤ 1, linear beyond.
/// - `BinaryCrossentropy`: independent sigmoid outputs.
/// - `Crossentropy`: one-hot targets; pair with a Softmax layer, or feed raw
///   logits with `from_logits: true`.
/// - `SparseCategoricalCrossentropy`: one integer class index per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Loss {
    Mse,
    Huber,
    BinaryCrossentropy { from_logits: bool },
    Crossentropy { from_logits: bool },
    SparseCategoricalCrossentropy { from_logits: bool },
}

impl Loss {
    pub fn name(&self) -> &'static str {
        match self {
            Loss::Mse => "mse",
            Loss::Huber => "huber",
            Loss::BinaryCrossentropy { .. } => "binary_crossentropy",
            Loss::Crossentropy { .. } => "crossentropy",
            Loss::SparseCategoricalCrossentropy { .. } => "sparse_categorical_crossentropy",
        }
    }

    pub fn from_logits(&self) -> bool {
        match self {
            Loss::Mse | Loss::Huber => false,
            Loss::BinaryCrossentropy { from_logits }
            | Loss::Crossentropy { from_logits }
            | Loss::SparseCategoricalCrossentropy { from_logits } => *from_logits,
        }
    }

    /// Whether accuracy is the natural default metric for this loss.
    pub fn is_classification(&self) -> bool {
        !matches!(self, Loss::Mse | Loss::Huber)
    }

    /// Whether labels are integer class indices rather than target rows.
    pub fn is_sparse(&self) -> bool {
        matches!(self, Loss::SparseCategoricalCrossentropy { .. })
    }

    /// Scalar loss of `prediction` against `label`.
    pub fn calc_loss(&self, label: &Tensor, prediction: &Tensor) -> Result<f64> {
        let (rows, cols) = row_view(prediction)?;
        let total: f64 = match *self {
            Loss::Mse => dense_rows(label, prediction, cols, MseLoss::loss)?.sum(),
            Loss::Huber => dense_rows(label, prediction, cols, HuberLoss::loss)?.sum(),
            Loss::BinaryCrossentropy { from_logits } => {
                dense_rows(label, prediction, cols, |p, y| BceLoss::loss(p, y, from_logits))?.sum()
            }
            Loss::Crossentropy { from_logits } => {
                dense_rows(label, prediction, cols, |p, y| CrossEntropyLoss::loss(p, y, from_logits))?.sum()
            }
            Loss::SparseCategoricalCrossentropy { from_logits } => {
                let classes = sparse_classes(label, rows, cols)?;
                prediction.data().chunks(cols).zip(classes)
                    .map(|(row, class)| SparseCrossEntropyLoss::loss(row, class, from_logits))
                    .sum()
            }
        };
        Ok(total / rows as f64)
    }

    /// Gradient of the loss with respect to `prediction`, shaped like
    /// `prediction`, every element clipped to `[-CLIP, CLIP]`.
    pub fn calc_derivative(&self, label: &Tensor, prediction: &Tensor) -> Result<Tensor> {
        let (rows, cols) = row_view(prediction)?;
        let mut grad: Vec<f64> = match *self {
            Loss::Mse => dense_rows(label, prediction, cols, MseLoss::derivative)?.flatten().collect(),
            Loss::Huber => dense_rows(label, prediction, cols, HuberLoss::derivative)?.flatten().collect(),
            Loss::BinaryCrossentropy { from_logits } => {
                dense_rows(label, prediction, cols, |p, y| BceLoss::derivative(p, y, from_logits))?
                    .flatten()
                    .collect()
            }
            Loss::Crossentropy { from_logits } => {
                dense_rows(label, prediction, cols, |p, y| CrossEntropyLoss::derivative(p, y, from_logits))?
                    .flatten()
                    .collect()
            }
            Loss::SparseCategoricalCrossentropy { from_logits } => {
                let classes = sparse_classes(label, rows, cols)?;
                prediction.data().chunks(cols).zip(classes)
                    .flat_map(|(row, class)| SparseCrossEntropyLoss::derivative(row, class, from_logits))
                    .collect()
            }
        };

        grad.iter_mut().for_each(|g| *g = g.clamp(-CLIP, CLIP));
        Ok(Tensor::from_vec(prediction.shape(), grad)?.to_device(prediction.device().clone()))
    }
}

impl std::fmt::Display for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.from_logits() {
            write!(f, "{} (from logits)", self.name())
        } else {
            f.write_str(self.name())
        }
    }
}

impl std::str::FromStr for Loss {
    type Err = Error;

    /// Parses the names produced by [`Loss::name`]; a `_logits` suffix
    /// selects the `from_logits` variant of the cross-entropy losses.
    fn from_str(s: &str) -> Result<Loss> {
        let (base, from_logits) = match s.strip_suffix("_logits") {
            Some(base) => (base, true),
            None => (s, false),
        };
        match (base, from_logits) {
            ("mse", false) => Ok(Loss::Mse),
            ("huber", false) => Ok(Loss::Huber),
            ("binary_crossentropy", _) => Ok(Loss::BinaryCrossentropy { from_logits }),
            ("crossentropy", _) => Ok(Loss::Crossentropy { from_logits }),
            ("sparse_categorical_crossentropy", _) => Ok(Loss::SparseCategoricalCrossentropy { from_logits }),
            _ => Err(Error::UnknownLoss(s.to_string())),
        }
    }
}

fn row_view(prediction: &Tensor) -> Result<(usize, usize)> {
    match prediction.row_view() {
        (rows, cols) if rows > 0 && cols > 0 => Ok((rows, cols)),
        _ => Err(Error::InvalidShape { shape: prediction.shape().to_vec() }),
    }
}

/// Pairs each prediction row with its label row and applies `kernel`.
fn dense_rows<'a, T, F>(
    label: &'a Tensor,
    prediction: &'a Tensor,
    cols: usize,
    kernel: F,
) -> Result<impl Iterator<Item = T> + 'a>
where
    T: 'a,
    F: Fn(&[f64], &[f64]) -> T + 'a,
{
    if label.len() != prediction.len() {
        return Err(Error::ShapeMismatch {
            lhs: label.shape().to_vec(),
            rhs: prediction.shape().to_vec(),
        });
    }
    Ok(prediction.data().chunks(cols).zip(label.data().chunks(cols)).map(move |(p, y)| kernel(p, y)))
}

/// Reads one class index per row out of a `[rows]` or `[rows, 1]` label tensor.
pub(crate) fn sparse_classes(label: &Tensor, rows: usize, classes: usize) -> Result<Vec<usize>> {
    if label.len() != rows {
        return Err(Error::ShapeMismatch {
            lhs: label.shape().to_vec(),
            rhs: vec![rows, classes],
        });
    }
    label.iter()
        .map(|&c| {
            if c.is_finite() && c >= 0.0 && c.fract() == 0.0 && (c as usize) < classes {
                Ok(c as usize)
            } else {
                Err(Error::InvalidLabel { label: c, classes })
            }
        })
        .collect()
}
