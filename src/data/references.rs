//! Ordered partition of samples into named classes.

use crate::data::{Metadata, Variable};
use crate::error::{CaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One class and its member samples, in grouping order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub name: String,
    pub sample_ids: Vec<String>,
}

/// Class label to sample list mapping with a fixed, explicit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassReferences {
    groups: Vec<ClassGroup>,
}

impl ClassReferences {
    /// Partition samples by the values of a metadata column.
    ///
    /// Samples are stably sorted by `label`, then split into runs of equal
    /// value. Each run becomes one class named after the value, or after its
    /// entry in `class_names` when one is given.
    pub fn from_metadata(
        metadata: &Metadata,
        label: &str,
        class_names: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        let sorted = metadata.sorted_by(label)?;
        if sorted.is_empty() {
            return Err(CaError::EmptyData("No samples left to group".to_string()));
        }

        let mut groups: Vec<ClassGroup> = Vec::new();
        let mut previous: Option<&Variable> = None;

        for sample_id in &sorted {
            let value = match metadata.get(sample_id, label) {
                Some(v) if !v.is_missing() => v,
                _ => {
                    return Err(CaError::MissingLabelValue {
                        sample: sample_id.clone(),
                        column: label.to_string(),
                    })
                }
            };

            match (previous, groups.last_mut()) {
                (Some(prev), Some(current)) if prev == value => {
                    current.sample_ids.push(sample_id.clone());
                }
                _ => {
                    groups.push(ClassGroup {
                        name: display_name(value, class_names),
                        sample_ids: vec![sample_id.clone()],
                    });
                }
            }
            previous = Some(value);
        }

        let mut seen = HashSet::new();
        for group in &groups {
            if !seen.insert(group.name.as_str()) {
                return Err(CaError::DuplicateClass(group.name.clone()));
            }
        }

        Ok(Self { groups })
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Class names in order.
    pub fn class_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Samples of a class.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.sample_ids.as_slice())
    }

    /// Iterate over classes in order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassGroup> {
        self.groups.iter()
    }

    /// All samples, class by class.
    pub fn sample_order(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|g| g.sample_ids.iter().cloned())
            .collect()
    }

    /// Class name of each sample in [`ClassReferences::sample_order`].
    pub fn class_labels(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|g| std::iter::repeat(g.name.clone()).take(g.sample_ids.len()))
            .collect()
    }

    /// Total number of grouped samples.
    pub fn total_sample_count(&self) -> usize {
        self.groups.iter().map(|g| g.sample_ids.len()).sum()
    }

    /// Check that the classes partition `sample_ids` exactly.
    pub fn validate_partition(&self, sample_ids: &[String]) -> Result<()> {
        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.sample_ids.is_empty() {
                return Err(CaError::EmptyData(format!("Class '{}' has no samples", group.name)));
            }
            for sid in &group.sample_ids {
                if !seen.insert(sid.as_str()) {
                    return Err(CaError::SampleMismatch(format!(
                        "Sample '{}' belongs to more than one class",
                        sid
                    )));
                }
            }
        }
        let expected: HashSet<&str> = sample_ids.iter().map(String::as_str).collect();
        if seen != expected {
            return Err(CaError::SampleMismatch(
                "Class references do not cover the sample set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Numeric labels also match keys written in another numeric form, so a
/// value read from `1.0` finds the key `"1"` and the other way round.
fn display_name(value: &Variable, class_names: Option<&HashMap<String, String>>) -> String {
    let raw = value.to_string();
    match class_names {
        Some(names) => match names.get(&raw).or_else(|| numeric_key(value, names)) {
            Some(name) => name.clone(),
            None => {
                tracing::warn!(value = %raw, "no class name given for label value, using raw value");
                raw
            }
        },
        None => raw,
    }
}

fn numeric_key<'a>(value: &Variable, names: &'a HashMap<String, String>) -> Option<&'a String> {
    let Variable::Continuous(v) = value else {
        return None;
    };
    names
        .iter()
        .find(|(key, _)| key.trim().parse::<f64>().ok() == Some(*v))
        .map(|(_, name)| name)
}
