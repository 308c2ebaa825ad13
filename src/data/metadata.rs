//! Sample metadata handling.

use crate::error::{CaError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// A metadata value, either categorical or continuous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as continuous f64.
    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            _ => None,
        }
    }

    /// Ordering used when sorting samples by a label column.
    ///
    /// Numbers compare numerically, strings lexicographically, and missing
    /// values sort last.
    pub fn sort_cmp(&self, other: &Variable) -> Ordering {
        match (self, other) {
            (Variable::Continuous(a), Variable::Continuous(b)) => a.total_cmp(b),
            (Variable::Categorical(a), Variable::Categorical(b)) => a.cmp(b),
            (Variable::Missing, Variable::Missing) => Ordering::Equal,
            (Variable::Missing, _) => Ordering::Greater,
            (_, Variable::Missing) => Ordering::Less,
            (a, b) => a.to_string().cmp(&b.to_string()),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Categorical(s) => write!(f, "{}", s),
            Variable::Continuous(v) => write!(f, "{}", v),
            Variable::Missing => write!(f, "NA"),
        }
    }
}

/// Inferred type of a metadata column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

/// Sample metadata containing variables for each sample.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Sample IDs in file order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    /// Inferred type of each column.
    column_types: HashMap<String, VariableType>,
}

impl Metadata {
    /// Load metadata from a delimited file.
    ///
    /// The first column holds sample IDs. When `has_header` is false the
    /// remaining columns are named `"1"`, `"2"`, ... in file order.
    ///
    /// Columns are inferred as continuous if all values parse as numbers,
    /// otherwise categorical. Empty cells and `NA` are missing.
    pub fn from_delimited<P: AsRef<Path>>(path: P, delimiter: u8, has_header: bool) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(has_header)
            .flexible(true)
            .from_path(path)?;

        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let sample_id = record[0].trim().to_string();
            let values: Vec<String> = record.iter().skip(1).map(|s| s.trim().to_string()).collect();
            raw_data.push((sample_id, values));
        }

        if raw_data.is_empty() {
            return Err(CaError::EmptyData("No samples in metadata".to_string()));
        }

        let column_names: Vec<String> = if has_header {
            reader
                .headers()?
                .iter()
                .skip(1)
                .map(|s| s.trim().to_string())
                .collect()
        } else {
            let width = raw_data.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
            (1..=width).map(|i| i.to_string()).collect()
        };

        if column_names.is_empty() {
            return Err(CaError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }

        Self::from_raw(column_names, raw_data)
    }

    /// Build metadata from raw string cells.
    pub fn from_raw(column_names: Vec<String>, raw_data: Vec<(String, Vec<String>)>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (sample_id, _) in &raw_data {
            if !seen.insert(sample_id.as_str()) {
                return Err(CaError::SampleMismatch(format!(
                    "Duplicate sample '{}' in metadata",
                    sample_id
                )));
            }
        }

        // Infer column types
        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            let all_numeric = raw_data.iter().all(|(_, values)| match values.get(col_idx) {
                None => true,
                Some(v) => is_missing(v) || v.parse::<f64>().is_ok(),
            });
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };
            column_types.insert(col_name.clone(), var_type);
        }

        let mut sample_ids = Vec::with_capacity(raw_data.len());
        let mut data = HashMap::new();

        for (sample_id, values) in raw_data {
            sample_ids.push(sample_id.clone());
            let mut sample_data = HashMap::new();

            for (col_idx, col_name) in column_names.iter().enumerate() {
                let var = match values.get(col_idx) {
                    Some(raw) if !is_missing(raw) => match column_types.get(col_name) {
                        Some(VariableType::Continuous) => raw
                            .parse::<f64>()
                            .map(Variable::Continuous)
                            .unwrap_or(Variable::Missing),
                        _ => Variable::Categorical(raw.clone()),
                    },
                    _ => Variable::Missing,
                };
                sample_data.insert(col_name.clone(), var);
            }
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
            column_types,
        })
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Get the type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Resolve an optional label to a column name, defaulting to the first column.
    pub fn resolve_label(&self, label: Option<&str>) -> Result<String> {
        match label {
            Some(l) if self.has_column(l) => Ok(l.to_string()),
            Some(l) => Err(CaError::MissingColumn(l.to_string())),
            None => self
                .column_names
                .first()
                .cloned()
                .ok_or_else(|| CaError::EmptyData("Metadata has no columns".to_string())),
        }
    }

    /// Sample IDs stably sorted ascending by a column's values.
    pub fn sorted_by(&self, column: &str) -> Result<Vec<String>> {
        if !self.has_column(column) {
            return Err(CaError::MissingColumn(column.to_string()));
        }
        let mut sorted = self.sample_ids.clone();
        sorted.sort_by(|a, b| {
            let va = self.get(a, column).unwrap_or(&Variable::Missing);
            let vb = self.get(b, column).unwrap_or(&Variable::Missing);
            va.sort_cmp(vb)
        });
        Ok(sorted)
    }

    /// Drop the named samples, keeping the remaining order.
    pub fn remove_samples(&self, names: &HashSet<String>) -> Self {
        let sample_ids: Vec<String> = self
            .sample_ids
            .iter()
            .filter(|s| !names.contains(*s))
            .cloned()
            .collect();
        let data = self
            .data
            .iter()
            .filter(|(k, _)| !names.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            sample_ids,
            column_names: self.column_names.clone(),
            data,
            column_types: self.column_types.clone(),
        }
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }
}

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw == "NA" || raw == "na"
}
