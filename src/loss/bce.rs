/// Binary cross-entropy over independent outputs.
pub struct BceLoss;

/// Floor applied inside log() so that saturated probabilities stay finite.
const EPS: f64 = 1e-12;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl BceLoss {
    /// Probabilities: −Σ [y·ln(p) + (1−y)·ln(1−p)]
    ///
    /// Logits: Σ max(z, 0) − z·y + ln(1 + e^(−|z|)), which never evaluates
    /// an exponential of a large positive number.
    pub fn loss(predicted: &[f64], expected: &[f64], from_logits: bool) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(&p, &y)| {
                if from_logits {
                    p.max(0.0) - p * y + (-p.abs()).exp().ln_1p()
                } else {
                    -(y * p.max(EPS).ln() + (1.0 - y) * (1.0 - p).max(EPS).ln())
                }
            })
            .sum()
    }

    /// Probabilities: −y/p + (1−y)/(1−p), with p kept inside [EPS, 1 − EPS].
    /// Logits: σ(z) − y.
    pub fn derivative(predicted: &[f64], expected: &[f64], from_logits: bool) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(&p, &y)| {
                if from_logits {
                    sigmoid(p) - y
                } else {
                    let p = p.clamp(EPS, 1.0 - EPS);
                    -y / p + (1.0 - y) / (1.0 - p)
                }
            })
            .collect()
    }
}
