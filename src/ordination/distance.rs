//! Pairwise distances between samples.
//!
//! Rows of the input matrix are observations. Boolean metrics treat any
//! non-zero value as presence.

use crate::error::{CaError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported distance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DistanceMetric {
    Cityblock,
    Euclidean,
    SqEuclidean,
    Chebyshev,
    /// Minkowski distance of order p.
    Minkowski(f64),
    Canberra,
    BrayCurtis,
    Cosine,
    Correlation,
    /// Euclidean distance scaled by per-feature variance.
    SEuclidean,
    Mahalanobis,
    Dice,
    Kulsinski,
    Matching,
    RogersTanimoto,
    SokalMichener,
    SokalSneath,
}

impl DistanceMetric {
    /// Every metric under its canonical name.
    pub const ALL: [DistanceMetric; 17] = [
        Self::Cityblock,
        Self::Cosine,
        Self::Euclidean,
        Self::BrayCurtis,
        Self::Canberra,
        Self::Chebyshev,
        Self::Correlation,
        Self::Dice,
        Self::Kulsinski,
        Self::Mahalanobis,
        Self::Matching,
        Self::Minkowski(2.0),
        Self::RogersTanimoto,
        Self::SEuclidean,
        Self::SokalMichener,
        Self::SokalSneath,
        Self::SqEuclidean,
    ];

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cityblock => "cityblock",
            Self::Euclidean => "euclidean",
            Self::SqEuclidean => "sqeuclidean",
            Self::Chebyshev => "chebyshev",
            Self::Minkowski(_) => "minkowski",
            Self::Canberra => "canberra",
            Self::BrayCurtis => "braycurtis",
            Self::Cosine => "cosine",
            Self::Correlation => "correlation",
            Self::SEuclidean => "seuclidean",
            Self::Mahalanobis => "mahalanobis",
            Self::Dice => "dice",
            Self::Kulsinski => "kulsinski",
            Self::Matching => "matching",
            Self::RogersTanimoto => "rogerstanimoto",
            Self::SokalMichener => "sokalmichener",
            Self::SokalSneath => "sokalsneath",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minkowski(p) if *p != 2.0 => write!(f, "minkowski:{}", p),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = CaError;

    fn from_str(s: &str) -> Result<Self> {
        let mut name = s.trim().to_lowercase();
        if name == "kulsinki" {
            name = "kulsinski".to_string();
        }
        if let Some(order) = name.strip_prefix("minkowski:") {
            return match order.parse::<f64>() {
                Ok(p) if p >= 1.0 => Ok(Self::Minkowski(p)),
                _ => Err(CaError::UnsupportedMetric(s.to_string())),
            };
        }
        Self::ALL
            .iter()
            .find(|m| m.name() == name)
            .copied()
            .ok_or_else(|| CaError::UnsupportedMetric(s.to_string()))
    }
}

impl TryFrom<String> for DistanceMetric {
    type Error = CaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DistanceMetric> for String {
    fn from(metric: DistanceMetric) -> Self {
        metric.to_string()
    }
}

/// Compute the symmetric n×n distance matrix between the rows of `data`.
pub fn pairwise(data: &DMatrix<f64>, metric: &DistanceMetric) -> Result<DMatrix<f64>> {
    let n = data.nrows();
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| data.row(i).iter().copied().collect())
        .collect();

    let kernel = Kernel::prepare(data, metric)?;

    let mut dist = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = kernel.distance(&rows[i], &rows[j]);
            dist[(i, j)] = d;
            dist[(j, i)] = d;
        }
    }

    tracing::debug!(samples = n, metric = %metric, "computed distance matrix");
    Ok(dist)
}

/// A metric plus any statistics precomputed from the whole matrix.
enum Kernel {
    Plain(DistanceMetric),
    SEuclidean(Vec<f64>),
    Mahalanobis(DMatrix<f64>),
}

impl Kernel {
    fn prepare(data: &DMatrix<f64>, metric: &DistanceMetric) -> Result<Self> {
        match metric {
            DistanceMetric::SEuclidean => Ok(Self::SEuclidean(column_variances(data))),
            DistanceMetric::Mahalanobis => {
                let cov = covariance(data)?;
                let inv = cov.try_inverse().ok_or_else(|| {
                    CaError::Numerical(
                        "Covariance matrix is singular, mahalanobis distance undefined".to_string(),
                    )
                })?;
                Ok(Self::Mahalanobis(inv))
            }
            other => Ok(Self::Plain(*other)),
        }
    }

    fn distance(&self, u: &[f64], v: &[f64]) -> f64 {
        match self {
            Self::SEuclidean(var) => u
                .iter()
                .zip(v)
                .zip(var)
                .filter(|(_, &s)| s > 0.0)
                .map(|((a, b), s)| (a - b).powi(2) / s)
                .sum::<f64>()
                .sqrt(),
            Self::Mahalanobis(vi) => {
                let diff: Vec<f64> = u.iter().zip(v).map(|(a, b)| a - b).collect();
                let mut total = 0.0;
                for (r, dr) in diff.iter().enumerate() {
                    for (c, dc) in diff.iter().enumerate() {
                        total += dr * vi[(r, c)] * dc;
                    }
                }
                total.max(0.0).sqrt()
            }
            Self::Plain(metric) => plain_distance(metric, u, v),
        }
    }
}

fn plain_distance(metric: &DistanceMetric, u: &[f64], v: &[f64]) -> f64 {
    let diffs = u.iter().zip(v).map(|(a, b)| (a - b).abs());
    match metric {
        DistanceMetric::Cityblock => diffs.sum(),
        DistanceMetric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
        DistanceMetric::SqEuclidean => diffs.map(|d| d * d).sum(),
        DistanceMetric::Chebyshev => diffs.fold(0.0, f64::max),
        DistanceMetric::Minkowski(p) => diffs.map(|d| d.powf(*p)).sum::<f64>().powf(1.0 / p),
        DistanceMetric::Canberra => u
            .iter()
            .zip(v)
            .map(|(a, b)| {
                let denom = a.abs() + b.abs();
                if denom > 0.0 {
                    (a - b).abs() / denom
                } else {
                    0.0
                }
            })
            .sum(),
        DistanceMetric::BrayCurtis => {
            let num: f64 = diffs.sum();
            let denom: f64 = u.iter().zip(v).map(|(a, b)| (a + b).abs()).sum();
            ratio(num, denom)
        }
        DistanceMetric::Cosine => cosine(u, v),
        DistanceMetric::Correlation => {
            let cu = centered(u);
            let cv = centered(v);
            cosine(&cu, &cv)
        }
        boolean => boolean_distance(boolean, u, v),
    }
}

fn boolean_distance(metric: &DistanceMetric, u: &[f64], v: &[f64]) -> f64 {
    let mut ctt = 0.0;
    let mut ctf = 0.0;
    let mut cft = 0.0;
    let mut cff = 0.0;
    for (a, b) in u.iter().zip(v) {
        match (*a != 0.0, *b != 0.0) {
            (true, true) => ctt += 1.0,
            (true, false) => ctf += 1.0,
            (false, true) => cft += 1.0,
            (false, false) => cff += 1.0,
        }
    }
    let n = u.len() as f64;
    let mismatch = ctf + cft;

    match metric {
        DistanceMetric::Dice => ratio(mismatch, 2.0 * ctt + mismatch),
        DistanceMetric::Kulsinski => ratio(mismatch - ctt + n, mismatch + n),
        DistanceMetric::Matching => ratio(mismatch, n),
        DistanceMetric::RogersTanimoto | DistanceMetric::SokalMichener => {
            ratio(2.0 * mismatch, ctt + cff + 2.0 * mismatch)
        }
        DistanceMetric::SokalSneath => ratio(2.0 * mismatch, ctt + 2.0 * mismatch),
        _ => 0.0,
    }
}

fn ratio(num: f64, denom: f64) -> f64 {
    if denom == 0.0 {
        0.0
    } else {
        num / denom
    }
}

fn cosine(u: &[f64], v: &[f64]) -> f64 {
    let dot: f64 = u.iter().zip(v).map(|(a, b)| a * b).sum();
    let nu = u.iter().map(|a| a * a).sum::<f64>().sqrt();
    let nv = v.iter().map(|b| b * b).sum::<f64>().sqrt();
    if nu == 0.0 || nv == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (nu * nv)).max(0.0)
}

fn centered(x: &[f64]) -> Vec<f64> {
    let mean = x.iter().sum::<f64>() / x.len().max(1) as f64;
    x.iter().map(|a| a - mean).collect()
}

/// Per-column sample variance (ddof = 1).
fn column_variances(data: &DMatrix<f64>) -> Vec<f64> {
    let n = data.nrows();
    if n < 2 {
        return vec![0.0; data.ncols()];
    }
    data.column_iter()
        .map(|col| {
            let mean = col.mean();
            col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        })
        .collect()
}

/// Feature covariance matrix (ddof = 1).
fn covariance(data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = data.nrows();
    if n < 2 {
        return Err(CaError::EmptyData(
            "Covariance needs at least two samples".to_string(),
        ));
    }
    let means = data.row_mean();
    let mut centered = data.clone();
    for mut row in centered.row_iter_mut() {
        row -= &means;
    }
    Ok(centered.transpose() * &centered / (n - 1) as f64)
}
