use crate::math::linalg::{log_sum_exp, softmax_row};

/// Categorical cross-entropy against a one-hot (or soft) target row.
pub struct CrossEntropyLoss;

/// Cross-entropy against a single integer class per row.
pub struct SparseCrossEntropyLoss;

/// Small epsilon floor inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// Probabilities: −Σ expected[i]·ln(predicted[i])
    ///
    /// Logits: Σ expected[i]·(lse(z) − z[i]) where lse is the max-shifted
    /// log-sum-exp, so adding a constant to every logit changes nothing.
    pub fn loss(predicted: &[f64], expected: &[f64], from_logits: bool) -> f64 {
        if from_logits {
            let lse = log_sum_exp(predicted);
            predicted.iter().zip(expected.iter())
                .map(|(z, y)| y * (lse - z))
                .sum()
        } else {
            predicted.iter().zip(expected.iter())
                .filter(|&(_, &y)| y != 0.0)
                .map(|(p, y)| -y * p.max(EPS).ln())
                .sum()
        }
    }

    /// Probabilities: −expected/predicted (zero where expected is zero).
    ///
    /// Logits: softmax(z)·Σexpected − expected, the combined gradient of a
    /// softmax followed by cross-entropy.
    pub fn derivative(predicted: &[f64], expected: &[f64], from_logits: bool) -> Vec<f64> {
        if from_logits {
            let mut s = vec![0.0; predicted.len()];
            softmax_row(predicted, &mut s);
            let mass: f64 = expected.iter().sum();
            s.iter().zip(expected.iter())
                .map(|(s, y)| s * mass - y)
                .collect()
        } else {
            predicted.iter().zip(expected.iter())
                .map(|(p, &y)| if y == 0.0 { 0.0 } else { -y / p })
                .collect()
        }
    }
}

impl SparseCrossEntropyLoss {
    /// −ln(predicted[class]) or, from logits, lse(z) − z[class].
    pub fn loss(predicted: &[f64], class: usize, from_logits: bool) -> f64 {
        if from_logits {
            log_sum_exp(predicted) - predicted[class]
        } else {
            -predicted[class].max(EPS).ln()
        }
    }

    pub fn derivative(predicted: &[f64], class: usize, from_logits: bool) -> Vec<f64> {
        if from_logits {
            let mut s = vec![0.0; predicted.len()];
            softmax_row(predicted, &mut s);
            s[class] -= 1.0;
            s
        } else {
            let mut g = vec![0.0; predicted.len()];
            g[class] = -1.0 / predicted[class];
            g
        }
    }
}
