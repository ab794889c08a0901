use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;
use crate::network::Mlp;
use crate::train::epoch_stats::EpochStats;
use crate::train::metrics::Metric;
use crate::train::train_config::TrainConfig;

/// Trains `mlp` for exactly `config.epochs` epochs of minibatch descent.
///
/// Every epoch draws a fresh permutation of the training rows, walks it in
/// contiguous batches of `config.batch_size` (the last one may be shorter)
/// and runs one `grad_descent` per batch. The epoch is then evaluated on the
/// full training set and, if given, the validation set.
///
/// # Errors
/// `InvalidArgument` for zero epochs or a zero batch size, `ShapeMismatch`
/// when inputs and labels disagree on the number of rows, and anything a
/// forward/backward pass or a checkpoint save reports.
pub fn train_loop(
    mlp: &mut Mlp,
    x_train: &Tensor,
    y_train: &Tensor,
    validation: Option<(&Tensor, &Tensor)>,
    config: &TrainConfig,
) -> Result<Vec<EpochStats>> {
    if config.epochs == 0 {
        return Err(Error::InvalidArgument("epochs must be at least 1".to_string()));
    }
    if config.batch_size == 0 {
        return Err(Error::InvalidArgument("batch_size must be at least 1".to_string()));
    }
    check_rows(x_train, y_train)?;
    if let Some((x_val, y_val)) = validation {
        check_rows(x_val, y_val)?;
    }

    let n = x_train.rows();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(rand::thread_rng())
            .map_err(|e| Error::InvalidArgument(format!("cannot seed shuffle rng: {e}")))?,
    };
    let mut indices: Vec<usize> = (0..n).collect();
    let mut history = Vec::with_capacity(config.epochs);
    let mut progress = config.progress_tx.clone();
    let metrics = match &config.metrics {
        Some(chosen) => chosen.clone(),
        None => Metric::defaults_for(&mlp.loss()),
    };

    log::info!(
        "training {} samples for {} epochs, batch size {}, {} with {}",
        n,
        config.epochs,
        config.batch_size,
        mlp.loss(),
        mlp.optimizer()
    );

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        indices.shuffle(&mut rng);
        for (b, batch) in indices.chunks(config.batch_size).enumerate() {
            let x = x_train.select_rows(batch)?;
            let y = y_train.select_rows(batch)?;
            let loss = mlp.grad_descent(&x, &y)?;
            log::debug!("epoch {epoch} batch {b}: loss {loss:.6}");
        }

        let elapsed_ms = t_start.elapsed().as_millis() as u64;

        let (train_loss, train_metrics) = evaluate(mlp, x_train, y_train, &metrics)?;
        let (val_loss, val_metrics) = match validation {
            Some((x_val, y_val)) => {
                let (loss, scores) = evaluate(mlp, x_val, y_val, &metrics)?;
                (Some(loss), scores)
            }
            None => (None, Vec::new()),
        };

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            val_loss,
            train_metrics,
            val_metrics,
            elapsed_ms,
        };
        log::info!("{stats}");

        if let Some(tx) = &progress {
            if tx.send(stats.clone()).is_err() {
                log::warn!("progress receiver dropped, no further epoch stats will be sent");
                progress = None;
            }
        }

        if let Some(path) = &config.save_file {
            mlp.save(path)?;
        }

        history.push(stats);
    }

    Ok(history)
}

/// One forward pass over a whole dataset, scored by the loss and every metric.
fn evaluate(mlp: &Mlp, x: &Tensor, y: &Tensor, metrics: &[Metric]) -> Result<(f64, Vec<(Metric, f64)>)> {
    let prediction = mlp.run(x)?;
    let loss = mlp.loss();
    let value = loss.calc_loss(y, &prediction)?;
    let mut scores = Vec::with_capacity(metrics.len());
    for &metric in metrics {
        scores.push((metric, metric.evaluate(&prediction, y, loss.from_logits())?));
    }
    Ok((value, scores))
}

fn check_rows(x: &Tensor, y: &Tensor) -> Result<()> {
    if x.rank() < 2 || x.rows() != y.rows() {
        return Err(Error::ShapeMismatch {
            lhs: x.shape().to_vec(),
            rhs: y.shape().to_vec(),
        });
    }
    Ok(())
}
