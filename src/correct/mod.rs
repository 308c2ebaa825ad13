//! Multiple-testing correction.

pub mod bh;
pub mod bonferroni;

pub use bh::correct_bh;
pub use bonferroni::correct_bonferroni;

use crate::error::{CaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Correction requested for an enrichment analysis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Correction {
    #[default]
    None,
    Bonferroni,
    /// Benjamini-Hochberg at the given false discovery rate.
    Fdr(f64),
}

impl Correction {
    /// Adjust `p_values` for `n` hypotheses, returning values in input order.
    pub fn apply(&self, p_values: &[f64], feature_ids: &[String], n: usize) -> Vec<f64> {
        match self {
            Self::None => p_values.to_vec(),
            Self::Bonferroni => correct_bonferroni(p_values, n),
            Self::Fdr(_) => correct_bh(p_values, feature_ids, n),
        }
    }

    /// Sentence describing the adjustment, empty for `None`.
    pub fn describe(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Bonferroni => "P-values adjusted using the Bonferroni correction.".to_string(),
            Self::Fdr(rate) => format!(
                "P-values adjusted using the Benjamini-Hochberg method using a false discovery rate = {}.",
                rate
            ),
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bonferroni => f.write_str("bonferroni"),
            Self::Fdr(rate) => write!(f, "fdr-{}", rate),
        }
    }
}

impl FromStr for Correction {
    type Err = CaError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "" | "none" => return Ok(Self::None),
            "bonferroni" => return Ok(Self::Bonferroni),
            _ => {}
        }
        match name.strip_prefix("fdr-").map(str::parse::<f64>) {
            Some(Ok(rate)) if rate > 0.0 && rate < 1.0 => Ok(Self::Fdr(rate)),
            _ => Err(CaError::UnsupportedCorrection(s.to_string())),
        }
    }
}

impl TryFrom<String> for Correction {
    type Error = CaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Correction> for String {
    fn from(correction: Correction) -> Self {
        correction.to_string()
    }
}
