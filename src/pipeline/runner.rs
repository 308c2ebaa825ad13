//! Batch runner executing every analysis of a configuration.

use crate::data::Profile;
use crate::enrichment::{run_enrichment, write_enrichment};
use crate::error::{CaError, Result};
use crate::normalize::Normalization;
use crate::ordination::{pca, pcoa};
use crate::pipeline::config::{delimiter_byte, AnalysisConfig, AnalysisKind, AnalysisSpec, FailurePolicy};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Normalized abundances written next to each analysis output.
pub const NORMALIZED_FILE: &str = "normalized_abundance_data.tab";

/// Batch summary written to the output directory.
pub const REPORT_FILE: &str = "report.json";

/// Final state of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed { files: Vec<PathBuf> },
    Failed { error: String },
}

/// One analysis in a batch report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub status: AnalysisStatus,
}

impl AnalysisOutcome {
    /// Check if the analysis completed.
    pub fn is_completed(&self) -> bool {
        matches!(self.status, AnalysisStatus::Completed { .. })
    }
}

/// Outcomes of a batch, in configuration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub title: String,
    pub outcomes: Vec<AnalysisOutcome>,
}

impl BatchReport {
    /// Number of completed analyses.
    pub fn n_completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    /// Number of failed analyses.
    pub fn n_failed(&self) -> usize {
        self.outcomes.len() - self.n_completed()
    }

    /// Get the outcome of an analysis by name.
    pub fn get(&self, name: &str) -> Option<&AnalysisOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Write the report as pretty-printed JSON.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Run every analysis of `config`.
///
/// Each analysis loads a fresh profile, so normalization and filters never
/// leak between analyses. Outputs go to `<output_directory>/<name>/`. With
/// [`FailurePolicy::Abort`] the first failure is returned as
/// `CaError::Pipeline`; with [`FailurePolicy::SkipAndContinue`] it is
/// recorded in the report and the batch goes on.
pub fn run_batch(config: &AnalysisConfig) -> Result<BatchReport> {
    config.validate()?;
    fs::create_dir_all(&config.output_directory)?;

    let names = config.analysis_names();
    let mut outcomes = Vec::with_capacity(names.len());

    for (spec, name) in config.analyses.iter().zip(names) {
        let description = spec.describe();
        tracing::info!(analysis = %name, "{}", description);

        let dir = config.output_directory.join(&name);
        let status = match run_analysis(config, spec, &dir) {
            Ok(files) => AnalysisStatus::Completed { files },
            Err(e) => {
                let err = CaError::Pipeline(format!("Analysis '{}' failed: {}", name, e));
                match config.failure_policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::SkipAndContinue => {
                        tracing::warn!(analysis = %name, error = %e, "analysis failed, continuing");
                        AnalysisStatus::Failed {
                            error: err.to_string(),
                        }
                    }
                }
            }
        };

        outcomes.push(AnalysisOutcome {
            name,
            description,
            status,
        });
    }

    let report = BatchReport {
        title: config.title.clone(),
        outcomes,
    };
    report.to_json(config.output_directory.join(REPORT_FILE))?;

    tracing::info!(
        completed = report.n_completed(),
        failed = report.n_failed(),
        "batch finished"
    );
    Ok(report)
}

/// Run one analysis, returning the files it wrote.
pub fn run_analysis(config: &AnalysisConfig, spec: &AnalysisSpec, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let options = config.profile_options(spec)?;
    let mut profile = Profile::load(&config.abundance, &config.metadata, &options)?;
    if let Some(path) = &config.feature_metadata {
        profile.attach_feature_metadata(path, delimiter_byte(config.feature_metadata_delimiter)?)?;
    }

    let mut files = Vec::new();

    let normalization = config.normalization_for(spec);
    if normalization != Normalization::None {
        profile.normalize(normalization)?;
        let path = dir.join(NORMALIZED_FILE);
        profile.abundance().to_delimited(&path, b'\t')?;
        files.push(path);
    }

    match &spec.kind {
        AnalysisKind::Pca { loadings } => {
            let result = pca(&profile, *loadings)?;
            let path = dir.join("pca.json");
            result.to_json(&path)?;
            files.push(path);
        }
        AnalysisKind::Pcoa { metric } => {
            let result = pcoa(&profile, metric)?;
            let path = dir.join(format!("pcoa_{}.json", metric.name()));
            result.to_json(&path)?;
            files.push(path);
        }
        AnalysisKind::Enrichment { test, correction } => {
            let enrichment = run_enrichment(&profile, *test, correction)?;
            files.extend(write_enrichment(&enrichment, dir)?);
        }
    }

    Ok(files)
}
