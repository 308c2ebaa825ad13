//! Result types for enrichment analysis.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header of an enrichment table. The spelling is part of the file format.
pub const ENRICHMENT_HEADER: &str = "name\tp-val\tenrinched in";

/// Which class a feature is enriched in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Higher mean in this class.
    Class(String),
    /// Equal means.
    NotApplicable,
}

impl Direction {
    /// Pick the class with the strictly greater mean.
    pub fn from_means(mean_a: f64, mean_b: f64, label_a: &str, label_b: &str) -> Self {
        if mean_a > mean_b {
            Self::Class(label_a.to_string())
        } else if mean_b > mean_a {
            Self::Class(label_b.to_string())
        } else {
            Self::NotApplicable
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(name) => f.write_str(name),
            Self::NotApplicable => f.write_str("n/a"),
        }
    }
}

/// One tested feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRow {
    pub feature: String,
    pub p_value: f64,
    pub direction: Direction,
}

/// Results of comparing two classes across all features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// Pair tag (`"A vs B"`) for pairwise comparisons.
    pub comparison: Option<String>,
    /// Tested features, sorted by p-value then name.
    pub rows: Vec<EnrichmentRow>,
    /// Features whose statistic was undefined, in discovery order.
    pub not_applicable: Vec<String>,
}

impl EnrichmentResult {
    /// Create a result set, sorting the rows.
    pub fn new(comparison: Option<String>, mut rows: Vec<EnrichmentRow>, not_applicable: Vec<String>) -> Self {
        sort_rows(&mut rows);
        Self {
            comparison,
            rows,
            not_applicable,
        }
    }

    /// Number of rows written, including not-applicable ones.
    pub fn len(&self) -> usize {
        self.rows.len() + self.not_applicable.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// P-values of the tested rows, in row order.
    pub fn p_values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.p_value).collect()
    }

    /// Get the row for a feature.
    pub fn get(&self, feature: &str) -> Option<&EnrichmentRow> {
        self.rows.iter().find(|r| r.feature == feature)
    }

    /// Write the table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{}", ENRICHMENT_HEADER)?;
        for r in &self.rows {
            writeln!(
                writer,
                "{}\t{}\t{}",
                r.feature,
                format_p_value(r.p_value),
                r.direction
            )?;
        }
        for feature in &self.not_applicable {
            writeln!(writer, "{}\tn/a", feature)?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// One row of the merged pairwise table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterRow {
    pub feature: String,
    /// `None` for not-applicable rows.
    pub p_value: Option<f64>,
    pub direction: Option<Direction>,
    pub comparison: String,
}

/// All pairwise comparisons plus the merged master table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseEnrichment {
    pub comparisons: Vec<EnrichmentResult>,
    pub master: Vec<MasterRow>,
}

impl PairwiseEnrichment {
    /// Concatenate the comparisons into a master table.
    pub fn new(comparisons: Vec<EnrichmentResult>) -> Self {
        let mut master = Vec::new();
        for result in &comparisons {
            let tag = result.comparison.clone().unwrap_or_default();
            master.extend(result.rows.iter().map(|r| MasterRow {
                feature: r.feature.clone(),
                p_value: Some(r.p_value),
                direction: Some(r.direction.clone()),
                comparison: tag.clone(),
            }));
            master.extend(result.not_applicable.iter().map(|f| MasterRow {
                feature: f.clone(),
                p_value: None,
                direction: None,
                comparison: tag.clone(),
            }));
        }
        Self { comparisons, master }
    }

    /// Write the master table to a TSV file.
    pub fn master_to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{}\tcomparison", ENRICHMENT_HEADER)?;
        for r in &self.master {
            let p = r.p_value.map(format_p_value).unwrap_or_else(|| "n/a".to_string());
            let direction = r.direction.as_ref().map(|d| d.to_string()).unwrap_or_default();
            writeln!(writer, "{}\t{}\t{}\t{}", r.feature, p, direction, r.comparison)?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// Sort ascending by p-value, ties broken by feature name.
pub fn sort_rows(rows: &mut [EnrichmentRow]) {
    rows.sort_by(|a, b| {
        a.p_value
            .partial_cmp(&b.p_value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.feature.cmp(&b.feature))
    });
}

/// Round to four significant digits and print without trailing zeros.
pub fn format_p_value(p: f64) -> String {
    if p == 0.0 || !p.is_finite() {
        return if p == 0.0 { "0".to_string() } else { p.to_string() };
    }
    let digits = 4 - p.abs().log10().floor() as i32 - 1;
    let factor = 10f64.powi(digits);
    // subnormal p overflows the factor; it prints as zero either way
    let rounded = if factor.is_finite() {
        (p * factor).round() / factor
    } else {
        p
    };
    let text = format!("{:.12}", rounded);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
