//! Batch configuration loaded from YAML.

use crate::correct::Correction;
use crate::data::ProfileOptions;
use crate::error::{CaError, Result};
use crate::filter::FilterRule;
use crate::normalize::Normalization;
use crate::ordination::pca::MAX_LOADINGS;
use crate::ordination::DistanceMetric;
use crate::test::TwoSampleTest;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// What to do when one analysis of a batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the batch at the first failure.
    #[default]
    Abort,
    /// Record the failure and run the remaining analyses.
    SkipAndContinue,
}

/// Kind of analysis and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Principal component analysis.
    Pca {
        #[serde(default)]
        loadings: usize,
    },
    /// Principal coordinates analysis.
    Pcoa {
        #[serde(default = "default_metric")]
        metric: DistanceMetric,
    },
    /// Per-feature enrichment between classes.
    Enrichment {
        test: TwoSampleTest,
        #[serde(default)]
        correction: Correction,
    },
}

fn default_metric() -> DistanceMetric {
    DistanceMetric::Euclidean
}

impl AnalysisKind {
    /// Short type name, also the base of generated analysis names.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Pca { .. } => "pca",
            Self::Pcoa { .. } => "pcoa",
            Self::Enrichment { .. } => "enrichment",
        }
    }

    /// One-line summary of the analysis and its parameters.
    pub fn describe(&self) -> String {
        match self {
            Self::Pca { loadings } => {
                let shown = if *loadings > 0 {
                    loadings.to_string()
                } else {
                    "no".to_string()
                };
                format!("PCA with {} loadings shown.", shown)
            }
            Self::Pcoa { metric } => format!("PCoA with {} distance metric shown.", metric),
            Self::Enrichment { test, correction } => {
                let mut text = format!("Enrichment was performed using {}.", test.display_name());
                let extra = correction.describe();
                if !extra.is_empty() {
                    text.push(' ');
                    text.push_str(&extra);
                }
                text
            }
        }
    }
}

/// One analysis of a batch, with optional per-analysis overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSpec {
    /// Output name; generated from the kind when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: AnalysisKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_names: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization: Option<Normalization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_rules: Option<Vec<FilterRule>>,
}

impl AnalysisSpec {
    /// Create a spec with no overrides.
    pub fn new(kind: AnalysisKind) -> Self {
        Self {
            name: None,
            kind,
            metadata_label: None,
            class_names: None,
            normalization: None,
            filter_labels: None,
            filter_rules: None,
        }
    }

    /// Set an explicit name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Group by a different metadata column.
    pub fn metadata_label(mut self, label: &str) -> Self {
        self.metadata_label = Some(label.to_string());
        self
    }

    /// Use a different normalization.
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = Some(normalization);
        self
    }

    /// Drop samples matching these rules.
    pub fn filter_rules(mut self, rules: Vec<FilterRule>) -> Self {
        self.filter_rules = Some(rules);
        self
    }

    /// Human-readable summary.
    pub fn describe(&self) -> String {
        self.kind.describe()
    }
}

/// Batch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Batch title.
    #[serde(default = "default_title")]
    pub title: String,
    /// Abundance table path.
    pub abundance: PathBuf,
    /// Sample metadata path.
    pub metadata: PathBuf,
    #[serde(default = "default_delimiter")]
    pub abundance_delimiter: char,
    #[serde(default = "default_delimiter")]
    pub metadata_delimiter: char,
    #[serde(default)]
    pub metadata_header: bool,
    #[serde(default)]
    pub metadata_label: Option<String>,
    #[serde(default)]
    pub class_names: Option<HashMap<String, String>>,
    /// Optional feature annotation table.
    #[serde(default)]
    pub feature_metadata: Option<PathBuf>,
    #[serde(default = "default_delimiter")]
    pub feature_metadata_delimiter: char,
    #[serde(default)]
    pub normalization: Normalization,
    #[serde(default)]
    pub filter_labels: Vec<String>,
    #[serde(default)]
    pub filter_rules: Vec<FilterRule>,
    /// Each analysis writes into a subdirectory named after it.
    pub output_directory: PathBuf,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub analyses: Vec<AnalysisSpec>,
}

fn default_title() -> String {
    "comparative analysis".to_string()
}

fn default_delimiter() -> char {
    '\t'
}

impl AnalysisConfig {
    /// Create a config with defaults and no analyses.
    pub fn new(
        abundance: impl AsRef<Path>,
        metadata: impl AsRef<Path>,
        output_directory: impl AsRef<Path>,
    ) -> Self {
        Self {
            title: default_title(),
            abundance: abundance.as_ref().to_path_buf(),
            metadata: metadata.as_ref().to_path_buf(),
            abundance_delimiter: default_delimiter(),
            metadata_delimiter: default_delimiter(),
            metadata_header: false,
            metadata_label: None,
            class_names: None,
            feature_metadata: None,
            feature_metadata_delimiter: default_delimiter(),
            normalization: Normalization::None,
            filter_labels: Vec::new(),
            filter_rules: Vec::new(),
            output_directory: output_directory.as_ref().to_path_buf(),
            failure_policy: FailurePolicy::Abort,
            analyses: Vec::new(),
        }
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(CaError::from)
    }

    /// Set the metadata grouping column.
    pub fn metadata_label(mut self, label: &str) -> Self {
        self.metadata_label = Some(label.to_string());
        self
    }

    /// Set whether the metadata file has a header.
    pub fn metadata_header(mut self, has_header: bool) -> Self {
        self.metadata_header = has_header;
        self
    }

    /// Set the default normalization.
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set the failure policy.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Add an analysis.
    pub fn analysis(mut self, spec: AnalysisSpec) -> Self {
        self.analyses.push(spec);
        self
    }

    /// Add a PCA.
    pub fn pca(self, loadings: usize) -> Self {
        self.analysis(AnalysisSpec::new(AnalysisKind::Pca { loadings }))
    }

    /// Add a PCoA.
    pub fn pcoa(self, metric: DistanceMetric) -> Self {
        self.analysis(AnalysisSpec::new(AnalysisKind::Pcoa { metric }))
    }

    /// Add an enrichment analysis.
    pub fn enrichment(self, test: TwoSampleTest, correction: Correction) -> Self {
        self.analysis(AnalysisSpec::new(AnalysisKind::Enrichment { test, correction }))
    }

    /// Check delimiters and analysis parameters before anything runs.
    pub fn validate(&self) -> Result<()> {
        for delimiter in [
            self.abundance_delimiter,
            self.metadata_delimiter,
            self.feature_metadata_delimiter,
        ] {
            delimiter_byte(delimiter)?;
        }
        for spec in &self.analyses {
            if let AnalysisKind::Pca { loadings } = spec.kind {
                if loadings >= MAX_LOADINGS {
                    return Err(CaError::InvalidLoadingCount(loadings));
                }
            }
        }
        let mut seen = HashSet::new();
        for name in self.analysis_names() {
            if !seen.insert(name.clone()) {
                return Err(CaError::InvalidParameter(format!(
                    "Analysis name '{}' is used more than once",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Output name of every analysis, in order.
    ///
    /// Unnamed analyses are named after their type. Repeats of a type get
    /// `_2`, `_3`, ... suffixes counted over all analyses of that type.
    pub fn analysis_names(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        self.analyses
            .iter()
            .map(|spec| {
                let type_name = spec.kind.type_name();
                let count = counts.entry(type_name).or_insert(0);
                *count += 1;
                match &spec.name {
                    Some(name) => name.clone(),
                    None if *count > 1 => format!("{}_{}", type_name, count),
                    None => type_name.to_string(),
                }
            })
            .collect()
    }

    /// Profile options for one analysis, applying its overrides.
    pub fn profile_options(&self, spec: &AnalysisSpec) -> Result<ProfileOptions> {
        let mut options = ProfileOptions::new()
            .delimiters(
                delimiter_byte(self.abundance_delimiter)?,
                delimiter_byte(self.metadata_delimiter)?,
            )
            .metadata_header(self.metadata_header)
            .filter_labels(
                spec.filter_labels
                    .clone()
                    .unwrap_or_else(|| self.filter_labels.clone()),
            )
            .filter_rules(
                spec.filter_rules
                    .clone()
                    .unwrap_or_else(|| self.filter_rules.clone()),
            );

        if let Some(label) = spec.metadata_label.as_ref().or(self.metadata_label.as_ref()) {
            options = options.metadata_label(label);
        }
        if let Some(names) = spec.class_names.as_ref().or(self.class_names.as_ref()) {
            options = options.class_names(names.clone());
        }
        Ok(options)
    }

    /// Normalization for one analysis.
    pub fn normalization_for(&self, spec: &AnalysisSpec) -> Normalization {
        spec.normalization.unwrap_or(self.normalization)
    }

    /// An example configuration covering every analysis type.
    pub fn example() -> Self {
        let mut class_names = HashMap::new();
        class_names.insert("0".to_string(), "healthy".to_string());
        class_names.insert("1".to_string(), "disease".to_string());

        let mut config = Self::new("abundance.tab", "metadata.tab", "results")
            .normalization(Normalization::Relative)
            .pca(3)
            .pcoa(DistanceMetric::BrayCurtis)
            .pcoa(DistanceMetric::Euclidean)
            .enrichment(TwoSampleTest::TTest, Correction::Bonferroni)
            .enrichment(TwoSampleTest::RankSum, Correction::Fdr(0.05));
        config.class_names = Some(class_names);
        config
    }
}

/// Convert a configured delimiter to the single byte the csv reader needs.
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter).map_err(|_| {
        CaError::InvalidParameter(format!("Delimiter '{}' is not a single-byte character", delimiter))
    })
}
