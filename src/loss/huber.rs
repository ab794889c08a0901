pub struct HuberLoss;

// Quadratic inside |d| <= DELTA, linear outside. Both pieces meet at 0.5.
const DELTA: f64 = 1.0;

impl HuberLoss {
    /// Σ h(predicted − expected) over one row, where
    /// h(d) = ½·d²           if |d| ≤ δ
    ///        δ·(|d| − ½·δ)  otherwise
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| {
                let d = p - y;
                if d.abs() <= DELTA {
                    0.5 * d * d
                } else {
                    DELTA * (d.abs() - 0.5 * DELTA)
                }
            })
            .sum()
    }

    /// Per-output gradient: d clamped to [−δ, δ]
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| (p - y).clamp(-DELTA, DELTA))
            .collect()
    }
}
