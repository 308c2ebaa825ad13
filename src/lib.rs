//! Comparative Analysis Library
//!
//! Statistical comparison of a sample-by-feature abundance matrix whose
//! samples are partitioned into named classes.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (AbundanceMatrix, Metadata, Profile, results)
//! - **filter**: Sample filtering by name or metadata rule
//! - **normalize**: Normalization methods (relative abundance)
//! - **ordination**: Distance metrics, PCoA and PCA
//! - **test**: Two-sample tests (t-test, rank-sum)
//! - **correct**: Multiple testing correction (Bonferroni, Benjamini-Hochberg)
//! - **enrichment**: Per-feature differential abundance between classes
//! - **pipeline**: Batch configuration and execution
//!
//! # Example
//!
//! ```no_run
//! use comparative_analysis::prelude::*;
//!
//! let options = ProfileOptions::new().metadata_header(true).metadata_label("group");
//! let mut profile = Profile::load("abundance.tab", "metadata.tab", &options).unwrap();
//! profile.normalize(Normalization::Relative).unwrap();
//!
//! let coords = pcoa(&profile, &DistanceMetric::BrayCurtis).unwrap();
//! let enrichment = run_enrichment(&profile, TwoSampleTest::TTest, &Correction::Bonferroni).unwrap();
//! write_enrichment(&enrichment, "results").unwrap();
//! ```

pub mod correct;
pub mod data;
pub mod enrichment;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod ordination;
pub mod pipeline;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::correct::{correct_bh, correct_bonferroni, Correction};
    pub use crate::data::{
        AbundanceMatrix, ClassGroup, ClassReferences, Direction, EnrichmentResult, EnrichmentRow,
        FeatureMetadata, Metadata, PairwiseEnrichment, Profile, ProfileOptions, Variable,
    };
    pub use crate::enrichment::{run_enrichment, write_enrichment, Enrichment};
    pub use crate::error::{CaError, Result};
    pub use crate::filter::{filter_samples_by_name, filter_samples_by_rules, FilterRule, Operator};
    pub use crate::normalize::{norm_relative, Normalization};
    pub use crate::ordination::{pca, pcoa, DistanceMetric, Loading, OrdinationResult};
    pub use crate::pipeline::{
        run_batch, AnalysisConfig, AnalysisKind, AnalysisSpec, BatchReport, FailurePolicy,
    };
    pub use crate::test::{TestStatistic, TwoSampleTest};
}
