//! Bonferroni family-wise error correction.

/// Multiply each p-value by the number of hypotheses, capped at 1.
pub fn correct_bonferroni(p_values: &[f64], n: usize) -> Vec<f64> {
    let n = n as f64;
    p_values.iter().map(|p| (p * n).min(1.0)).collect()
}
