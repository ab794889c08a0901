use serde::{Deserialize, Serialize};

use crate::train::metrics::Metric;

/// Per-epoch training statistics.
///
/// `train` returns one of these per epoch and, when a `progress_tx` channel
/// is configured in `TrainConfig`, also sends each one as soon as the epoch
/// is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Loss over the whole training set after this epoch's updates.
    pub train_loss: f64,
    /// Loss over the validation set, if one was provided.
    pub val_loss: Option<f64>,
    /// One score per configured metric, in configuration order.
    pub train_metrics: Vec<(Metric, f64)>,
    /// Same metrics on the validation set; empty without one.
    pub val_metrics: Vec<(Metric, f64)>,
    /// Wall-clock duration of the epoch's update pass in milliseconds.
    pub elapsed_ms: u64,
}

impl EpochStats {
    pub fn train_metric(&self, metric: Metric) -> Option<f64> {
        lookup(&self.train_metrics, metric)
    }

    pub fn val_metric(&self, metric: Metric) -> Option<f64> {
        lookup(&self.val_metrics, metric)
    }
}

fn lookup(scores: &[(Metric, f64)], metric: Metric) -> Option<f64> {
    scores.iter().find(|(m, _)| *m == metric).map(|&(_, v)| v)
}

impl std::fmt::Display for EpochStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "epoch {}/{}: loss {:.6}", self.epoch, self.total_epochs, self.train_loss)?;
        for (metric, value) in &self.train_metrics {
            write!(f, ", {metric} {value:.4}")?;
        }
        if let Some(loss) = self.val_loss {
            write!(f, ", val loss {loss:.6}")?;
        }
        for (metric, value) in &self.val_metrics {
            write!(f, ", val {metric} {value:.4}")?;
        }
        write!(f, " ({} ms)", self.elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_metrics_for_both_sets() {
        let stats = EpochStats {
            epoch: 2,
            total_epochs: 5,
            train_loss: 0.25,
            val_loss: Some(0.5),
            train_metrics: vec![(Metric::Accuracy, 0.75)],
            val_metrics: vec![(Metric::Accuracy, 0.5)],
            elapsed_ms: 3,
        };
        assert_eq!(
            stats.to_string(),
            "epoch 2/5: loss 0.250000, accuracy 0.7500, val loss 0.500000, val accuracy 0.5000 (3 ms)"
        );
        assert_eq!(stats.train_metric(Metric::Accuracy), Some(0.75));
        assert_eq!(stats.val_metric(Metric::MeanSquaredError), None);
    }
}
