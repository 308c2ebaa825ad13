//! Normalization methods for abundance profiles.

pub mod relative;

pub use relative::norm_relative;

use crate::data::AbundanceMatrix;
use crate::error::{CaError, Result};
use serde::{Deserialize, Serialize};

/// Normalization applied to a profile before analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Leave abundances untouched.
    #[default]
    None,
    /// Divide each sample by its total.
    Relative,
}

impl Normalization {
    /// Apply the normalization, returning `None` when nothing changes.
    pub fn apply(&self, abundance: &AbundanceMatrix) -> Result<Option<AbundanceMatrix>> {
        match self {
            Self::None => Ok(None),
            Self::Relative => norm_relative(abundance).map(Some),
        }
    }
}

impl std::str::FromStr for Normalization {
    type Err = CaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "relative" => Ok(Self::Relative),
            other => Err(CaError::InvalidParameter(format!(
                "Unknown normalization '{}'",
                other
            ))),
        }
    }
}
