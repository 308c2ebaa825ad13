//! Ordination output shared by PCA and PCoA.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Feature contribution to the first two principal components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loading {
    pub feature: String,
    /// Euclidean norm of `coefficients`.
    pub norm: f64,
    pub coefficients: [f64; 2],
}

/// Two-axis embedding of the samples of a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinationResult {
    /// Method and metric, e.g. `pca` or `pcoa-braycurtis`.
    pub method: String,
    /// Samples in class order.
    pub sample_ids: Vec<String>,
    /// Class of each sample.
    pub class_labels: Vec<String>,
    pub axis1: Vec<f64>,
    pub axis2: Vec<f64>,
    /// Explained variance ratio of each axis (PCA).
    pub variance_ratio: Option<[f64; 2]>,
    /// Leading eigenvalues (PCoA).
    pub eigenvalues: Option<[f64; 2]>,
    /// Top loadings, descending by norm (PCA).
    pub loadings: Vec<Loading>,
}

impl OrdinationResult {
    /// Number of embedded samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Coordinates of one sample.
    pub fn coordinates(&self, sample_id: &str) -> Option<(f64, f64)> {
        let idx = self.sample_ids.iter().position(|s| s == sample_id)?;
        Some((self.axis1[idx], self.axis2[idx]))
    }

    /// Write the result as pretty-printed JSON.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_json_roundtrip_fields() {
        let result = OrdinationResult {
            method: "pca".to_string(),
            sample_ids: vec!["S1".into(), "S2".into()],
            class_labels: vec!["a".into(), "b".into()],
            axis1: vec![1.0, -1.0],
            axis2: vec![0.5, -0.5],
            variance_ratio: Some([0.8, 0.2]),
            eigenvalues: None,
            loadings: vec![Loading {
                feature: "K1".into(),
                norm: 1.0,
                coefficients: [1.0, 0.0],
            }],
        };
        assert_eq!(result.coordinates("S2"), Some((-1.0, -0.5)));

        let file = NamedTempFile::new().unwrap();
        result.to_json(file.path()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(json["method"], "pca");
        assert_eq!(json["class_labels"][1], "b");
        assert!(json["eigenvalues"].is_null());
        assert_eq!(json["loadings"][0]["feature"], "K1");
    }
}
