//! Principal coordinates analysis.

use crate::data::Profile;
use crate::error::{CaError, Result};
use crate::ordination::distance::{pairwise, DistanceMetric};
use crate::ordination::OrdinationResult;
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Relative tolerance for treating the centered matrix as symmetric.
const SYMMETRY_TOLERANCE: f64 = 1e-8;

/// Run PCoA on the samples of a profile.
///
/// # Algorithm
/// 1. D = pairwise distances between samples
/// 2. A = -0.5 * D∘D (elementwise square)
/// 3. B = A double-centered by its row, column, and grand means
/// 4. Eigendecompose B and keep the two leading eigenvectors as axes
///
/// Each axis is sign-normalized so its largest-magnitude entry is positive.
pub fn pcoa(profile: &Profile, metric: &DistanceMetric) -> Result<OrdinationResult> {
    let n = profile.n_samples();
    if n < 2 {
        return Err(CaError::EmptyData(format!(
            "PCoA needs at least two samples, got {}",
            n
        )));
    }

    let d = pairwise(profile.abundance().data(), metric)?;
    let a = d.map(|x| -0.5 * x * x);
    let mut b = double_center(&a);

    let asymmetry = max_asymmetry(&b);
    let scale = b.amax().max(1.0);
    if asymmetry > SYMMETRY_TOLERANCE * scale {
        tracing::warn!(asymmetry, "centered matrix is not symmetric, symmetrizing");
    }
    b = (&b + b.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(b);
    let order = descending_order(&eigen.eigenvalues);

    let axis = |k: usize| -> Vec<f64> {
        let mut v: Vec<f64> = eigen.eigenvectors.column(order[k]).iter().copied().collect();
        orient_sign(&mut v);
        v
    };
    let axis1 = axis(0);
    let axis2 = axis(1);
    let eigenvalues = [eigen.eigenvalues[order[0]], eigen.eigenvalues[order[1]]];

    tracing::info!(
        samples = n,
        metric = %metric,
        lambda1 = eigenvalues[0],
        lambda2 = eigenvalues[1],
        "computed PCoA"
    );

    Ok(OrdinationResult {
        method: format!("pcoa-{}", metric),
        sample_ids: profile.abundance().sample_ids().to_vec(),
        class_labels: profile.references().class_labels(),
        axis1,
        axis2,
        variance_ratio: None,
        eigenvalues: Some(eigenvalues),
        loadings: Vec::new(),
    })
}

/// Double-center a square matrix.
///
/// B[i,j] = A[i,j] - rowmean_i - colmean_j + grandmean, with all means taken
/// from the uncentered A.
pub fn double_center(a: &DMatrix<f64>) -> DMatrix<f64> {
    let row_means = a.column_mean();
    let col_means = a.row_mean();
    let grand = a.mean();
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| {
        a[(i, j)] - row_means[i] - col_means[j] + grand
    })
}

fn max_asymmetry(b: &DMatrix<f64>) -> f64 {
    (b - b.transpose()).amax()
}

fn descending_order(values: &DVector<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));
    order
}

fn orient_sign(v: &mut [f64]) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
}
