/// Squared error, summed over one row.
pub struct MseLoss;

impl MseLoss {
    /// Σ (predicted - expected)²
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| (p - y).powi(2))
            .sum()
    }

    /// Per-output gradient: 2·(predicted - expected)
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| 2.0 * (p - y))
            .collect()
    }
}
