//! Principal component analysis.

use crate::data::Profile;
use crate::error::{CaError, Result};
use crate::ordination::{Loading, OrdinationResult};
use nalgebra::{DMatrix, SVD};

/// Loadings are limited to this many (exclusive).
pub const MAX_LOADINGS: usize = 5;

/// Run a two-component PCA on the samples of a profile.
///
/// The data is column-centered and decomposed with a thin SVD. Component
/// signs are fixed so the largest-magnitude entry of each left singular
/// vector is positive. `n_loadings` features with the largest loading norm
/// are returned.
///
/// # Errors
/// `InvalidLoadingCount` when `n_loadings >= 5`, checked before any work.
pub fn pca(profile: &Profile, n_loadings: usize) -> Result<OrdinationResult> {
    if n_loadings >= MAX_LOADINGS {
        return Err(CaError::InvalidLoadingCount(n_loadings));
    }

    let data = profile.abundance().data();
    let (n, p) = data.shape();
    if n.min(p) < 2 {
        return Err(CaError::EmptyData(format!(
            "PCA needs at least two samples and two features, got {}x{}",
            n, p
        )));
    }

    let centered = center_columns(data);
    let svd = SVD::new(centered, true, true);
    let mut u = svd
        .u
        .ok_or_else(|| CaError::Numerical("SVD did not produce U".to_string()))?;
    let mut v_t = svd
        .v_t
        .ok_or_else(|| CaError::Numerical("SVD did not produce V^T".to_string()))?;
    let singular = svd.singular_values;

    let mut order: Vec<usize> = (0..singular.len()).collect();
    order.sort_by(|&i, &j| singular[j].total_cmp(&singular[i]));
    let (c1, c2) = (order[0], order[1]);

    for &k in &[c1, c2] {
        flip_component(&mut u, &mut v_t, k);
    }

    let total: f64 = singular.iter().map(|s| s * s).sum();
    let variance_ratio = if total > 0.0 {
        [singular[c1].powi(2) / total, singular[c2].powi(2) / total]
    } else {
        [0.0, 0.0]
    };

    let axis1: Vec<f64> = u.column(c1).iter().map(|x| x * singular[c1]).collect();
    let axis2: Vec<f64> = u.column(c2).iter().map(|x| x * singular[c2]).collect();

    let mut loadings: Vec<Loading> = profile
        .abundance()
        .feature_ids()
        .iter()
        .enumerate()
        .map(|(j, feature)| {
            let coefficients = [v_t[(c1, j)], v_t[(c2, j)]];
            Loading {
                feature: feature.clone(),
                norm: coefficients[0].hypot(coefficients[1]),
                coefficients,
            }
        })
        .collect();
    loadings.sort_by(|a, b| b.norm.total_cmp(&a.norm));
    loadings.truncate(n_loadings);

    tracing::info!(
        samples = n,
        features = p,
        ratio1 = variance_ratio[0],
        ratio2 = variance_ratio[1],
        "computed PCA"
    );

    Ok(OrdinationResult {
        method: "pca".to_string(),
        sample_ids: profile.abundance().sample_ids().to_vec(),
        class_labels: profile.references().class_labels(),
        axis1,
        axis2,
        variance_ratio: Some(variance_ratio),
        eigenvalues: None,
        loadings,
    })
}

fn center_columns(data: &DMatrix<f64>) -> DMatrix<f64> {
    let means = data.row_mean();
    DMatrix::from_fn(data.nrows(), data.ncols(), |i, j| data[(i, j)] - means[j])
}

/// Make the largest-magnitude entry of column k of U positive.
fn flip_component(u: &mut DMatrix<f64>, v_t: &mut DMatrix<f64>, k: usize) {
    let pivot = u
        .column(k)
        .iter()
        .copied()
        .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        u.column_mut(k).neg_mut();
        v_t.row_mut(k).neg_mut();
    }
}
