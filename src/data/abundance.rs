//! Dense abundance matrix with samples as rows and features as columns.

use crate::error::{CaError, Result};
use nalgebra::DMatrix;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A dense matrix of non-negative abundances.
///
/// Rows represent samples, columns represent features. Files stored
/// feature-major are loaded as-is and flipped with [`AbundanceMatrix::transpose`]
/// once the sample set is known.
#[derive(Debug, Clone)]
pub struct AbundanceMatrix {
    /// Abundance values (samples × features)
    data: DMatrix<f64>,
    /// Sample identifiers (row names)
    sample_ids: Vec<String>,
    /// Feature identifiers (column names)
    feature_ids: Vec<String>,
}

impl AbundanceMatrix {
    /// Create a new AbundanceMatrix from a dense matrix and identifiers.
    pub fn new(data: DMatrix<f64>, sample_ids: Vec<String>, feature_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != sample_ids.len() {
            return Err(CaError::DimensionMismatch {
                expected: nrows,
                actual: sample_ids.len(),
            });
        }
        if ncols != feature_ids.len() {
            return Err(CaError::DimensionMismatch {
                expected: ncols,
                actual: feature_ids.len(),
            });
        }
        Ok(Self {
            data,
            sample_ids,
            feature_ids,
        })
    }

    /// Load an abundance matrix from a delimited file.
    ///
    /// Expected format:
    /// - First row: header with column identifiers (first cell is the index name)
    /// - Subsequent rows: row identifier followed by abundance values
    ///
    /// Values must parse as finite, non-negative numbers.
    pub fn from_delimited<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(CaError::EmptyData(
                "Abundance file must have at least one data column".to_string(),
            ));
        }
        let column_ids: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();
        let n_cols = column_ids.len();

        let mut row_ids = Vec::new();
        let mut values = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            if record.len() != n_cols + 1 {
                return Err(CaError::DimensionMismatch {
                    expected: n_cols + 1,
                    actual: record.len(),
                });
            }
            row_ids.push(record[0].trim().to_string());
            for (col_idx, raw) in record.iter().skip(1).enumerate() {
                values.push(parse_abundance(raw, row_idx, col_idx)?);
            }
        }

        if row_ids.is_empty() {
            return Err(CaError::EmptyData("No rows in abundance file".to_string()));
        }

        let data = DMatrix::from_row_slice(row_ids.len(), n_cols, &values);
        Self::new(data, row_ids, column_ids)
    }

    /// Write the matrix to a delimited file (samples as rows).
    pub fn to_delimited<P: AsRef<Path>>(&self, path: P, delimiter: u8) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let sep = delimiter as char;

        write!(writer, "sample_id")?;
        for feature_id in &self.feature_ids {
            write!(writer, "{}{}", sep, feature_id)?;
        }
        writeln!(writer)?;

        for (row, sample_id) in self.sample_ids.iter().enumerate() {
            write!(writer, "{}", sample_id)?;
            for col in 0..self.n_features() {
                write!(writer, "{}{}", sep, self.data[(row, col)])?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Swap rows and columns, turning a feature-major matrix sample-major.
    pub fn transpose(self) -> Self {
        Self {
            data: self.data.transpose(),
            sample_ids: self.feature_ids,
            feature_ids: self.sample_ids,
        }
    }

    /// Get the value for a sample and feature.
    #[inline]
    pub fn get(&self, sample: usize, feature: usize) -> f64 {
        self.data[(sample, feature)]
    }

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of features (columns).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Get reference to the underlying matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Total abundance per sample.
    pub fn row_sums(&self) -> Vec<f64> {
        self.data.row_iter().map(|row| row.sum()).collect()
    }

    /// Build a sample-id to row-index lookup.
    pub fn sample_index(&self) -> HashMap<&str, usize> {
        self.sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect()
    }

    /// Subset to the given samples, in the given order.
    pub fn select_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let index = self.sample_index();
        let rows: Vec<usize> = sample_ids
            .iter()
            .map(|sid| {
                index.get(sid.as_str()).copied().ok_or_else(|| {
                    CaError::SampleMismatch(format!("Sample '{}' not found in abundance data", sid))
                })
            })
            .collect::<Result<_>>()?;

        let data = self.data.select_rows(rows.iter());
        Self::new(data, sample_ids.to_vec(), self.feature_ids.clone())
    }

    /// Drop the named samples, keeping the remaining order.
    pub fn remove_samples(&self, names: &HashSet<String>) -> Result<Self> {
        let keep: Vec<String> = self
            .sample_ids
            .iter()
            .filter(|s| !names.contains(*s))
            .cloned()
            .collect();
        self.select_samples(&keep)
    }

    /// Replace the values with a matrix of the same shape.
    pub fn with_data(&self, data: DMatrix<f64>) -> Result<Self> {
        if data.shape() != self.data.shape() {
            return Err(CaError::DimensionMismatch {
                expected: self.data.len(),
                actual: data.len(),
            });
        }
        Self::new(data, self.sample_ids.clone(), self.feature_ids.clone())
    }
}

fn parse_abundance(raw: &str, row: usize, col: usize) -> Result<f64> {
    let invalid = || CaError::InvalidValue {
        value: raw.to_string(),
        row,
        col,
    };
    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> AbundanceMatrix {
        // 4 samples × 3 features
        let data = DMatrix::from_row_slice(
            4,
            3,
            &[
                10.0, 100.0, 1.0, //
                20.0, 200.0, 0.0, //
                0.0, 150.0, 0.0, //
                5.0, 175.0, 0.0,
            ],
        );
        let sample_ids = vec!["S1", "S2", "S3", "S4"].into_iter().map(String::from).collect();
        let feature_ids = vec!["feat_A", "feat_B", "feat_C"].into_iter().map(String::from).collect();
        AbundanceMatrix::new(data, sample_ids, feature_ids).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_samples(), 4);
        assert_eq!(mat.n_features(), 3);
        assert_eq!(mat.get(1, 1), 200.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let data = DMatrix::zeros(2, 2);
        let result = AbundanceMatrix::new(data, vec!["a".into()], vec!["x".into(), "y".into()]);
        assert!(matches!(result, Err(CaError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_load_tab_delimited() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tK01\tK02").unwrap();
        writeln!(file, "S1\t1.5\t0").unwrap();
        writeln!(file, "S2\t2\t3.25").unwrap();
        file.flush().unwrap();

        let mat = AbundanceMatrix::from_delimited(file.path(), b'\t').unwrap();
        assert_eq!(mat.sample_ids(), &["S1", "S2"]);
        assert_eq!(mat.feature_ids(), &["K01", "K02"]);
        assert_eq!(mat.get(0, 0), 1.5);
        assert_eq!(mat.get(1, 1), 3.25);
    }

    #[test]
    fn test_load_comma_delimited() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,S1,S2,S3").unwrap();
        writeln!(file, "K01,1,2,3").unwrap();
        file.flush().unwrap();

        let mat = AbundanceMatrix::from_delimited(file.path(), b',').unwrap();
        assert_eq!(mat.n_samples(), 1);
        assert_eq!(mat.n_features(), 3);
    }

    #[test]
    fn test_negative_value_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tK01").unwrap();
        writeln!(file, "S1\t-1").unwrap();
        file.flush().unwrap();

        let result = AbundanceMatrix::from_delimited(file.path(), b'\t');
        assert!(matches!(result, Err(CaError::InvalidValue { .. })));
    }

    #[test]
    fn test_unparsable_value_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tK01").unwrap();
        writeln!(file, "S1\tabc").unwrap();
        file.flush().unwrap();

        let result = AbundanceMatrix::from_delimited(file.path(), b'\t');
        assert!(matches!(result, Err(CaError::InvalidValue { row: 0, col: 0, .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = AbundanceMatrix::from_delimited("/nonexistent/abundance.tab", b'\t');
        assert!(result.is_err());
    }

    #[test]
    fn test_transpose() {
        let mat = create_test_matrix().transpose();
        assert_eq!(mat.n_samples(), 3);
        assert_eq!(mat.n_features(), 4);
        assert_eq!(mat.sample_ids(), &["feat_A", "feat_B", "feat_C"]);
        assert_eq!(mat.get(1, 2), 150.0);
    }

    #[test]
    fn test_select_samples_reorders() {
        let mat = create_test_matrix();
        let subset = mat.select_samples(&["S4".to_string(), "S1".to_string()]).unwrap();
        assert_eq!(subset.sample_ids(), &["S4", "S1"]);
        assert_eq!(subset.get(0, 0), 5.0);
        assert_eq!(subset.get(1, 0), 10.0);
    }

    #[test]
    fn test_select_unknown_sample() {
        let mat = create_test_matrix();
        let result = mat.select_samples(&["S9".to_string()]);
        assert!(matches!(result, Err(CaError::SampleMismatch(_))));
    }

    #[test]
    fn test_remove_samples() {
        let mat = create_test_matrix();
        let names: HashSet<String> = ["S2".to_string()].into_iter().collect();
        let subset = mat.remove_samples(&names).unwrap();
        assert_eq!(subset.sample_ids(), &["S1", "S3", "S4"]);
    }

    #[test]
    fn test_row_sums() {
        let mat = create_test_matrix();
        assert_eq!(mat.row_sums(), vec![111.0, 220.0, 150.0, 180.0]);
    }

    #[test]
    fn test_delimited_roundtrip() {
        let mat = create_test_matrix();
        let file = NamedTempFile::new().unwrap();
        mat.to_delimited(file.path(), b'\t').unwrap();

        let loaded = AbundanceMatrix::from_delimited(file.path(), b'\t').unwrap();
        assert_eq!(loaded.sample_ids(), mat.sample_ids());
        assert_eq!(loaded.feature_ids(), mat.feature_ids());
        assert_eq!(loaded.data(), mat.data());
    }
}
