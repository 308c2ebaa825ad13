//! Benjamini-Hochberg style false discovery rate adjustment.

/// Apply the rank-scaled Benjamini-Hochberg adjustment.
///
/// P-values are ranked ascending, ties broken by feature id. The adjusted
/// value at rank i (1-based) is `p(i) * n / i`.
///
/// This is the per-rank formula only. No running minimum is taken from the
/// largest rank down and values are not capped at 1, so adjusted values
/// need not be monotone in the raw p-values.
///
/// # Arguments
/// * `p_values` - Raw p-values
/// * `feature_ids` - Feature identifiers (same order as p_values)
/// * `n` - Number of hypotheses
///
/// # Returns
/// Adjusted p-values in input order.
pub fn correct_bh(p_values: &[f64], feature_ids: &[String], n: usize) -> Vec<f64> {
    let mut indices: Vec<usize> = (0..p_values.len()).collect();
    indices.sort_by(|&a, &b| {
        p_values[a]
            .total_cmp(&p_values[b])
            .then_with(|| feature_ids[a].cmp(&feature_ids[b]))
    });

    let n_f64 = n as f64;
    let mut adjusted = vec![0.0; p_values.len()];
    for (i, &orig_idx) in indices.iter().enumerate() {
        let rank = (i + 1) as f64;
        adjusted[orig_idx] = p_values[orig_idx] * n_f64 / rank;
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("feat_{}", i)).collect()
    }

    #[test]
    fn test_bh_literal_ranks() {
        let p_values = vec![0.01, 0.04, 0.05];
        let adjusted = correct_bh(&p_values, &ids(3), 3);

        assert_relative_eq!(adjusted[0], 0.03, epsilon = 1e-12);
        assert_relative_eq!(adjusted[1], 0.06, epsilon = 1e-12);
        // rank 3 scales by 3/3 and stays below rank 2
        assert_relative_eq!(adjusted[2], 0.05, epsilon = 1e-12);
        assert!(adjusted[2] < adjusted[1]);
    }

    #[test]
    fn test_bh_restores_input_order() {
        let p_values = vec![0.04, 0.01, 0.03, 0.005];
        let adjusted = correct_bh(&p_values, &ids(4), 4);

        // 0.005 has rank 1
        assert_relative_eq!(adjusted[3], 0.02, epsilon = 1e-12);
        // 0.01 has rank 2
        assert_relative_eq!(adjusted[1], 0.02, epsilon = 1e-12);
        assert_relative_eq!(adjusted[2], 0.04, epsilon = 1e-12);
        assert_relative_eq!(adjusted[0], 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_bh_uses_hypothesis_count() {
        // two tested features out of five hypotheses
        let adjusted = correct_bh(&[0.1, 0.2], &ids(2), 5);
        assert_relative_eq!(adjusted[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(adjusted[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_bh_not_capped() {
        let adjusted = correct_bh(&[0.9], &ids(1), 4);
        assert_relative_eq!(adjusted[0], 3.6, epsilon = 1e-12);
    }

    #[test]
    fn test_bh_ties_ranked_by_name() {
        let feature_ids = vec!["b".to_string(), "a".to_string()];
        let adjusted = correct_bh(&[0.1, 0.1], &feature_ids, 2);
        // "a" takes rank 1
        assert_relative_eq!(adjusted[1], 0.2, epsilon = 1e-12);
        assert_relative_eq!(adjusted[0], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_bh_empty() {
        assert!(correct_bh(&[], &[], 3).is_empty());
    }
}
