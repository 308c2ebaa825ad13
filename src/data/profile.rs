//! Class-partitioned abundance profile.

use crate::data::{AbundanceMatrix, ClassReferences, FeatureMetadata, Metadata};
use crate::error::{CaError, Result};
use crate::filter::{filter_samples_by_name, filter_samples_by_rules, FilterRule};
use crate::normalize::Normalization;
use nalgebra::DMatrix;
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

/// Options controlling how a profile is loaded and grouped.
#[derive(Debug, Clone)]
pub struct ProfileOptions {
    /// Delimiter of the abundance file.
    pub abundance_delimiter: u8,
    /// Delimiter of the metadata file.
    pub metadata_delimiter: u8,
    /// Whether the metadata file starts with a header row.
    pub metadata_header: bool,
    /// Grouping column; the first metadata column when `None`.
    pub metadata_label: Option<String>,
    /// Display names keyed by raw label value.
    pub class_names: Option<HashMap<String, String>>,
    /// Samples to drop by name.
    pub filter_labels: Vec<String>,
    /// Samples to drop by metadata rule.
    pub filter_rules: Vec<FilterRule>,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            abundance_delimiter: b'\t',
            metadata_delimiter: b'\t',
            metadata_header: false,
            metadata_label: None,
            class_names: None,
            filter_labels: Vec::new(),
            filter_rules: Vec::new(),
        }
    }
}

impl ProfileOptions {
    /// Create default options (tab-delimited, headerless metadata).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both file delimiters.
    pub fn delimiters(mut self, abundance: u8, metadata: u8) -> Self {
        self.abundance_delimiter = abundance;
        self.metadata_delimiter = metadata;
        self
    }

    /// Set whether the metadata has a header row.
    pub fn metadata_header(mut self, has_header: bool) -> Self {
        self.metadata_header = has_header;
        self
    }

    /// Set the grouping column.
    pub fn metadata_label(mut self, label: &str) -> Self {
        self.metadata_label = Some(label.to_string());
        self
    }

    /// Set class display names.
    pub fn class_names(mut self, names: HashMap<String, String>) -> Self {
        self.class_names = Some(names);
        self
    }

    /// Drop these samples by name.
    pub fn filter_labels(mut self, labels: Vec<String>) -> Self {
        self.filter_labels = labels;
        self
    }

    /// Drop samples matching these rules.
    pub fn filter_rules(mut self, rules: Vec<FilterRule>) -> Self {
        self.filter_rules = rules;
        self
    }
}

/// Abundance data, sample metadata, and the class partition derived from them.
///
/// Abundance rows are stored in class order, so every class occupies a
/// contiguous block of rows.
#[derive(Debug, Clone)]
pub struct Profile {
    abundance: AbundanceMatrix,
    metadata: Metadata,
    label: String,
    references: ClassReferences,
    feature_metadata: Option<FeatureMetadata>,
    normalization: Option<Normalization>,
}

impl Profile {
    /// Load a profile from an abundance file and a metadata file.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        abundance_path: P,
        metadata_path: Q,
        options: &ProfileOptions,
    ) -> Result<Self> {
        let abundance = AbundanceMatrix::from_delimited(abundance_path, options.abundance_delimiter)?;
        let metadata = Metadata::from_delimited(
            metadata_path,
            options.metadata_delimiter,
            options.metadata_header,
        )?;
        Self::from_parts(abundance, metadata, options)
    }

    /// Build a profile from data already in memory.
    ///
    /// Steps: fix orientation, apply filters, group by label, then align the
    /// abundance rows with the grouped samples.
    pub fn from_parts(
        abundance: AbundanceMatrix,
        metadata: Metadata,
        options: &ProfileOptions,
    ) -> Result<Self> {
        let mut abundance = orient(abundance, &metadata);
        let mut metadata = metadata;

        if !options.filter_labels.is_empty() {
            (abundance, metadata) = filter_samples_by_name(&abundance, &metadata, &options.filter_labels)?;
        }
        if !options.filter_rules.is_empty() {
            (abundance, metadata) = filter_samples_by_rules(&abundance, &metadata, &options.filter_rules)?;
        }

        let label = metadata.resolve_label(options.metadata_label.as_deref())?;
        let references = ClassReferences::from_metadata(&metadata, &label, options.class_names.as_ref())?;

        let order = references.sample_order();
        if abundance.n_samples() > order.len() {
            tracing::warn!(
                dropped = abundance.n_samples() - order.len(),
                "abundance samples without metadata are ignored"
            );
        }
        let abundance = abundance.select_samples(&order)?;
        references.validate_partition(abundance.sample_ids())?;

        tracing::info!(
            samples = abundance.n_samples(),
            features = abundance.n_features(),
            classes = references.len(),
            label = %label,
            "loaded profile"
        );

        Ok(Self {
            abundance,
            metadata,
            label,
            references,
            feature_metadata: None,
            normalization: None,
        })
    }

    /// Attach a feature annotation table.
    pub fn attach_feature_metadata<P: AsRef<Path>>(&mut self, path: P, delimiter: u8) -> Result<()> {
        self.feature_metadata = Some(FeatureMetadata::from_delimited(path, delimiter)?);
        Ok(())
    }

    /// Normalize the abundance data in place.
    ///
    /// A profile can be normalized only once.
    pub fn normalize(&mut self, method: Normalization) -> Result<()> {
        if self.normalization.is_some() {
            return Err(CaError::AlreadyNormalized);
        }
        if let Some(normalized) = method.apply(&self.abundance)? {
            self.abundance = normalized;
        }
        self.normalization = Some(method);
        tracing::debug!(?method, "normalized profile");
        Ok(())
    }

    /// Abundance data, rows in class order.
    pub fn abundance(&self) -> &AbundanceMatrix {
        &self.abundance
    }

    /// Sample metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Metadata column used for grouping.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Class partition.
    pub fn references(&self) -> &ClassReferences {
        &self.references
    }

    /// Attached feature annotations, if any.
    pub fn feature_metadata(&self) -> Option<&FeatureMetadata> {
        self.feature_metadata.as_ref()
    }

    /// Normalization that has been applied, if any.
    pub fn normalization(&self) -> Option<Normalization> {
        self.normalization
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.abundance.n_samples()
    }

    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.abundance.n_features()
    }

    /// Number of classes.
    pub fn n_classes(&self) -> usize {
        self.references.len()
    }

    /// Row range of each class in the abundance matrix.
    pub fn class_ranges(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.references
            .iter()
            .map(|g| {
                let range = start..start + g.sample_ids.len();
                start = range.end;
                range
            })
            .collect()
    }

    /// Abundance rows of each class, in class order.
    pub fn class_subsets(&self) -> Vec<DMatrix<f64>> {
        let data = self.abundance.data();
        self.class_ranges()
            .into_iter()
            .map(|r| data.rows(r.start, r.len()).into_owned())
            .collect()
    }
}

/// Transpose when the first row label is not a known sample.
fn orient(abundance: AbundanceMatrix, metadata: &Metadata) -> AbundanceMatrix {
    let first = abundance.sample_ids().first().map(String::as_str).unwrap_or("");
    if metadata.has_sample(first) {
        abundance
    } else {
        tracing::debug!("abundance rows are not samples, transposing");
        abundance.transpose()
    }
}
