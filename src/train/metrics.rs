use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::loss::loss::sparse_classes;
use crate::loss::Loss;
use crate::math::linalg::argmax;
use crate::math::tensor::Tensor;

/// A score reported for the training and validation sets after every epoch.
///
/// - `Accuracy`: argmax agreement with one-hot label rows. A single-output
///   model is thresholded instead (0.5 on probabilities, 0 on logits).
/// - `MeanSquaredError`: mean of `(y − p)²` over every element.
/// - `SparseCategoricalAccuracy`: argmax agreement with one class index per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    MeanSquaredError,
    SparseCategoricalAccuracy,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::MeanSquaredError => "mean_squared_error",
            Metric::SparseCategoricalAccuracy => "sparse_categorical_accuracy",
        }
    }

    /// What `train` reports when the caller picks nothing: the matching
    /// accuracy for classification losses, nothing for regression.
    pub fn defaults_for(loss: &Loss) -> Vec<Metric> {
        if loss.is_sparse() {
            vec![Metric::SparseCategoricalAccuracy]
        } else if loss.is_classification() {
            vec![Metric::Accuracy]
        } else {
            Vec::new()
        }
    }

    /// Scores `prediction` against `label`. `from_logits` only moves the
    /// decision threshold of a single-output `Accuracy`.
    pub fn evaluate(&self, prediction: &Tensor, label: &Tensor, from_logits: bool) -> Result<f64> {
        match self {
            Metric::Accuracy => {
                let threshold = if from_logits { 0.0 } else { 0.5 };
                accuracy(prediction, label, false, threshold)
            }
            Metric::MeanSquaredError => mean_squared_error(prediction, label),
            Metric::SparseCategoricalAccuracy => accuracy(prediction, label, true, 0.5),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Metric> {
        match s {
            "accuracy" => Ok(Metric::Accuracy),
            "mean_squared_error" | "mse" => Ok(Metric::MeanSquaredError),
            "sparse_categorical_accuracy" => Ok(Metric::SparseCategoricalAccuracy),
            _ => Err(Error::InvalidArgument(format!("unknown metric '{s}'"))),
        }
    }
}

/// Fraction of rows classified correctly.
///
/// With `sparse` the label holds one class index per row and is compared to
/// the argmax of each prediction row. Otherwise the label holds one target
/// row per prediction row: wide rows compare argmaxes, and a single output
/// column is a binary decision `p > threshold` against `y > 0.5`.
pub fn accuracy(prediction: &Tensor, label: &Tensor, sparse: bool, threshold: f64) -> Result<f64> {
    let (rows, cols) = prediction.row_view();
    if rows == 0 {
        return Err(Error::InvalidShape { shape: prediction.shape().to_vec() });
    }
    if !sparse && label.len() != prediction.len() {
        return Err(Error::ShapeMismatch {
            lhs: label.shape().to_vec(),
            rhs: prediction.shape().to_vec(),
        });
    }

    let correct = if sparse {
        let predicted = argmax(&prediction.clone().reshaped(&[rows, cols])?, Some(1))?;
        let classes = sparse_classes(label, rows, cols)?;
        predicted.iter().zip(classes).filter(|&(&p, c)| p as usize == c).count()
    } else if cols == 1 {
        prediction.iter().zip(label.iter())
            .filter(|&(&p, &y)| (p > threshold) == (y > 0.5))
            .count()
    } else {
        let predicted = argmax(&prediction.clone().reshaped(&[rows, cols])?, Some(1))?;
        let expected = argmax(&label.clone().reshaped(&[rows, cols])?, Some(1))?;
        predicted.iter().zip(expected.iter()).filter(|&(p, e)| p == e).count()
    };
    Ok(correct as f64 / rows as f64)
}

/// Mean of the squared differences over every element.
pub fn mean_squared_error(prediction: &Tensor, label: &Tensor) -> Result<f64> {
    if prediction.is_empty() {
        return Err(Error::InvalidShape { shape: prediction.shape().to_vec() });
    }
    if label.len() != prediction.len() {
        return Err(Error::ShapeMismatch {
            lhs: label.shape().to_vec(),
            rhs: prediction.shape().to_vec(),
        });
    }
    let total: f64 = prediction.iter().zip(label.iter()).map(|(p, y)| (y - p).powi(2)).sum();
    Ok(total / prediction.len() as f64)
}
