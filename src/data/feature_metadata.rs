//! Auxiliary per-feature annotation table.

use crate::error::{CaError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Feature annotations keyed by feature identifier.
///
/// Loaded as-is; no cross-checking against the abundance matrix is done.
#[derive(Debug, Clone, Default)]
pub struct FeatureMetadata {
    column_names: Vec<String>,
    feature_ids: Vec<String>,
    rows: HashMap<String, Vec<String>>,
}

impl FeatureMetadata {
    /// Load feature metadata from a delimited file with a header row.
    pub fn from_delimited<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let column_names: Vec<String> = reader
            .headers()?
            .iter()
            .skip(1)
            .map(|s| s.trim().to_string())
            .collect();

        let mut feature_ids = Vec::new();
        let mut rows = HashMap::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let feature_id = record[0].trim().to_string();
            let values = record.iter().skip(1).map(|s| s.trim().to_string()).collect();
            feature_ids.push(feature_id.clone());
            rows.insert(feature_id, values);
        }

        if feature_ids.is_empty() {
            return Err(CaError::EmptyData("No rows in feature metadata".to_string()));
        }

        Ok(Self {
            column_names,
            feature_ids,
            rows,
        })
    }

    /// Column names (excluding the feature ID column).
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Feature IDs in file order.
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Number of annotated features.
    pub fn len(&self) -> usize {
        self.feature_ids.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.feature_ids.is_empty()
    }

    /// Look up one annotation value.
    pub fn get(&self, feature_id: &str, column: &str) -> Option<&str> {
        let col = self.column_names.iter().position(|c| c == column)?;
        self.rows
            .get(feature_id)
            .and_then(|r| r.get(col))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_feature_metadata() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "feature\tpathway\tlevel").unwrap();
        writeln!(file, "K00001\tglycolysis\t2").unwrap();
        writeln!(file, "K00002\tTCA cycle\t3").unwrap();
        file.flush().unwrap();

        let fm = FeatureMetadata::from_delimited(file.path(), b'\t').unwrap();
        assert_eq!(fm.len(), 2);
        assert_eq!(fm.column_names(), &["pathway", "level"]);
        assert_eq!(fm.get("K00002", "pathway"), Some("TCA cycle"));
        assert_eq!(fm.get("K00003", "pathway"), None);
        assert_eq!(fm.get("K00001", "missing"), None);
    }
}
