//! Per-feature differential abundance between classes.

use crate::correct::Correction;
use crate::data::{
    Direction, EnrichmentResult, EnrichmentRow, PairwiseEnrichment, Profile,
};
use crate::error::{CaError, Result};
use crate::test::TwoSampleTest;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the merged pairwise table.
pub const MASTER_FILE: &str = "enrichment_master.tab";

/// Outcome of an enrichment analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Enrichment {
    /// Exactly two classes.
    TwoClass {
        test: TwoSampleTest,
        result: EnrichmentResult,
    },
    /// More than two classes, one comparison per pair.
    Pairwise {
        test: TwoSampleTest,
        result: PairwiseEnrichment,
    },
}

impl Enrichment {
    /// Test that produced the p-values.
    pub fn test(&self) -> TwoSampleTest {
        match self {
            Self::TwoClass { test, .. } | Self::Pairwise { test, .. } => *test,
        }
    }
}

/// Run the enrichment analysis on a profile.
///
/// With two classes every feature is tested once and `correction` is
/// applied to the defined p-values, using the profile's feature count as
/// the number of hypotheses. With more classes each pair i < j is compared
/// in class order with the t-test and no correction is applied.
pub fn run_enrichment(
    profile: &Profile,
    test: TwoSampleTest,
    correction: &Correction,
) -> Result<Enrichment> {
    let names = profile.references().class_names();
    if names.len() < 2 {
        return Err(CaError::InvalidParameter(format!(
            "Enrichment needs at least two classes, found {}",
            names.len()
        )));
    }

    let subsets = profile.class_subsets();
    let features = profile.abundance().feature_ids();

    if names.len() == 2 {
        let (mut rows, not_applicable) =
            compare_classes(&subsets[0], &subsets[1], names[0], names[1], features, test);

        if *correction != Correction::None {
            let p_values: Vec<f64> = rows.iter().map(|r| r.p_value).collect();
            let ids: Vec<String> = rows.iter().map(|r| r.feature.clone()).collect();
            let adjusted = correction.apply(&p_values, &ids, profile.n_features());
            for (row, p) in rows.iter_mut().zip(adjusted) {
                row.p_value = p;
            }
        }

        let result = EnrichmentResult::new(None, rows, not_applicable);
        tracing::info!(
            test = %test,
            correction = %correction,
            tested = result.rows.len(),
            not_applicable = result.not_applicable.len(),
            "two-class enrichment finished"
        );
        return Ok(Enrichment::TwoClass { test, result });
    }

    if test != TwoSampleTest::TTest {
        tracing::warn!(requested = %test, "pairwise comparisons always use the t-test");
    }
    if *correction != Correction::None {
        tracing::warn!(correction = %correction, "correction is not applied to pairwise comparisons");
    }

    let pair_test = TwoSampleTest::TTest;
    let mut comparisons = Vec::new();
    for i in 0..names.len() - 1 {
        for j in (i + 1)..names.len() {
            let (rows, not_applicable) =
                compare_classes(&subsets[i], &subsets[j], names[i], names[j], features, pair_test);
            let tag = format!("{} vs {}", names[i], names[j]);
            tracing::debug!(comparison = %tag, tested = rows.len(), "pairwise comparison");
            comparisons.push(EnrichmentResult::new(Some(tag), rows, not_applicable));
        }
    }

    let result = PairwiseEnrichment::new(comparisons);
    tracing::info!(
        comparisons = result.comparisons.len(),
        rows = result.master.len(),
        "pairwise enrichment finished"
    );
    Ok(Enrichment::Pairwise {
        test: pair_test,
        result,
    })
}

/// Test every feature column between two class subsets.
///
/// Returns the defined rows (unsorted) and, in column order, the features
/// whose test was undefined.
pub fn compare_classes(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    label_a: &str,
    label_b: &str,
    feature_ids: &[String],
    test: TwoSampleTest,
) -> (Vec<EnrichmentRow>, Vec<String>) {
    let mut rows = Vec::new();
    let mut not_applicable = Vec::new();

    for (j, feature) in feature_ids.iter().enumerate() {
        let col_a: Vec<f64> = a.column(j).iter().copied().collect();
        let col_b: Vec<f64> = b.column(j).iter().copied().collect();

        let stat = test.apply(&col_a, &col_b);
        if !stat.is_defined() {
            not_applicable.push(feature.clone());
            continue;
        }

        rows.push(EnrichmentRow {
            feature: feature.clone(),
            p_value: stat.p_value,
            direction: Direction::from_means(mean(&col_a), mean(&col_b), label_a, label_b),
        });
    }

    (rows, not_applicable)
}

fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Write enrichment tables into `dir`, returning the created paths.
///
/// Two-class results go to `<stem>.tab`. Pairwise results go to one
/// `<stem>_<A>_vs_<B>.tab` per pair plus `enrichment_master.tab`.
pub fn write_enrichment<P: AsRef<Path>>(enrichment: &Enrichment, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let stem = enrichment.test().file_stem();

    match enrichment {
        Enrichment::TwoClass { result, .. } => {
            let path = dir.join(format!("{}.tab", stem));
            result.to_tsv(&path)?;
            Ok(vec![path])
        }
        Enrichment::Pairwise { result, .. } => {
            let mut paths = Vec::with_capacity(result.comparisons.len() + 1);
            for comparison in &result.comparisons {
                let tag = comparison.comparison.as_deref().unwrap_or_default();
                let path = dir.join(format!("{}_{}.tab", stem, tag.replace(' ', "_")));
                comparison.to_tsv(&path)?;
                paths.push(path);
            }
            let master = dir.join(MASTER_FILE);
            result.master_to_tsv(&master)?;
            paths.push(master);
            Ok(paths)
        }
    }
}
