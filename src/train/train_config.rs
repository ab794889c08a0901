use std::path::PathBuf;
use std::sync::mpsc;

use crate::train::epoch_stats::EpochStats;
use crate::train::metrics::Metric;

/// Configuration for a training run.
///
/// # Fields
/// - `epochs`      — number of full passes over the training data
/// - `batch_size`  — samples per mini-batch; use `1` for online SGD
/// - `save_file`   — when set, the model is saved here after every epoch
/// - `seed`        — seeds the per-epoch shuffles; `None` uses the thread RNG
/// - `metrics`     — scores reported per epoch; `None` picks them from the loss
/// - `progress_tx` — optional channel sender; one `EpochStats` is sent per
///                   completed epoch. A dropped receiver does not stop training.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub save_file: Option<PathBuf>,
    pub seed: Option<u64>,
    pub metrics: Option<Vec<Metric>>,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl TrainConfig {
    /// Creates a minimal `TrainConfig`: no checkpointing, unseeded, no progress channel.
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            save_file: None,
            seed: None,
            metrics: None,
            progress_tx: None,
        }
    }

    pub fn with_save_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_file = Some(path.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reports exactly these metrics, in this order. An empty list reports none.
    pub fn with_metrics(mut self, metrics: impl IntoIterator<Item = Metric>) -> Self {
        self.metrics = Some(metrics.into_iter().collect());
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }
}
