//! Relative abundance normalization.
//!
//! Each sample is divided by its total abundance so that every row sums to
//! one. This is total sum scaling applied along samples.

use crate::data::AbundanceMatrix;
use crate::error::{CaError, Result};
use nalgebra::DMatrix;

/// Convert a sample-major abundance matrix to relative abundances.
///
/// # Formula
/// For sample i: rel(x_ij) = x_ij / sum_j(x_ij)
///
/// # Errors
/// Fails on an empty matrix or when any sample has zero total abundance.
pub fn norm_relative(abundance: &AbundanceMatrix) -> Result<AbundanceMatrix> {
    let n_samples = abundance.n_samples();
    let n_features = abundance.n_features();

    if n_samples == 0 || n_features == 0 {
        return Err(CaError::EmptyData(
            "Cannot normalize an empty matrix".to_string(),
        ));
    }

    let totals = abundance.row_sums();
    for (i, &total) in totals.iter().enumerate() {
        if total <= 0.0 {
            return Err(CaError::Numerical(format!(
                "Sample {} has zero total abundance, cannot normalize",
                abundance.sample_ids()[i]
            )));
        }
    }

    let data = DMatrix::from_fn(n_samples, n_features, |i, j| abundance.get(i, j) / totals[i]);
    abundance.with_data(data)
}
