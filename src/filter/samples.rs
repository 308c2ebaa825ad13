//! Sample filtering by name or by metadata rule.

use crate::data::{AbundanceMatrix, Metadata, Variable};
use crate::error::{CaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Comparison operator for a filter rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
}

impl Operator {
    /// Symbol used in configs and messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }

    fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Gt => ordering == Greater,
            Self::Lt => ordering == Less,
        }
    }
}

impl FromStr for Operator {
    type Err = CaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "=" | "==" => Ok(Self::Eq),
            "!=" | "≠" => Ok(Self::Ne),
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            other => Err(CaError::InvalidOperator(other.to_string())),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = CaError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.symbol().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A rule removing every sample whose `label` value satisfies `operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Metadata column to test; the first column when `None`.
    #[serde(default)]
    pub label: Option<String>,
    pub operator: Operator,
    pub value: String,
}

impl FilterRule {
    /// Create a new rule.
    pub fn new(label: Option<&str>, operator: Operator, value: &str) -> Self {
        Self {
            label: label.map(String::from),
            operator,
            value: value.to_string(),
        }
    }

    /// Check whether a metadata value satisfies this rule.
    ///
    /// Numeric values are compared numerically when the rule value parses as
    /// a number; everything else compares as text. Missing values never match.
    pub fn matches(&self, var: &Variable) -> bool {
        let ordering = match var {
            Variable::Missing => return false,
            Variable::Continuous(x) => match self.value.trim().parse::<f64>() {
                Ok(v) => match x.partial_cmp(&v) {
                    Some(o) => o,
                    None => return false,
                },
                Err(_) => x.to_string().as_str().cmp(self.value.as_str()),
            },
            Variable::Categorical(s) => s.as_str().cmp(self.value.as_str()),
        };
        self.operator.holds(ordering)
    }
}

/// Collect samples matched by any rule.
///
/// Every rule sees the metadata as it was before any removal.
pub fn samples_matching_rules(metadata: &Metadata, rules: &[FilterRule]) -> Result<HashSet<String>> {
    let mut matched = HashSet::new();
    for rule in rules {
        let column = metadata.resolve_label(rule.label.as_deref())?;
        for sample_id in metadata.sample_ids() {
            if let Some(var) = metadata.get(sample_id, &column) {
                if rule.matches(var) {
                    matched.insert(sample_id.clone());
                }
            }
        }
    }
    Ok(matched)
}

/// Remove samples by name from both the abundance matrix and metadata.
///
/// Names not present in the data are ignored.
pub fn filter_samples_by_name(
    abundance: &AbundanceMatrix,
    metadata: &Metadata,
    names: &[String],
) -> Result<(AbundanceMatrix, Metadata)> {
    let names: HashSet<String> = names.iter().cloned().collect();
    for name in &names {
        if !metadata.has_sample(name) {
            tracing::warn!(sample = %name, "filter name not present in metadata");
        }
    }
    remove(abundance, metadata, &names)
}

/// Remove samples matching any of the rules.
pub fn filter_samples_by_rules(
    abundance: &AbundanceMatrix,
    metadata: &Metadata,
    rules: &[FilterRule],
) -> Result<(AbundanceMatrix, Metadata)> {
    let matched = samples_matching_rules(metadata, rules)?;
    remove(abundance, metadata, &matched)
}

fn remove(
    abundance: &AbundanceMatrix,
    metadata: &Metadata,
    names: &HashSet<String>,
) -> Result<(AbundanceMatrix, Metadata)> {
    let abundance = abundance.remove_samples(names)?;
    let metadata = metadata.remove_samples(names);
    tracing::debug!(
        removed = names.len(),
        remaining = metadata.n_samples(),
        "filtered samples"
    );
    Ok((abundance, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn create_test_data() -> (AbundanceMatrix, Metadata) {
        let sample_ids: Vec<String> = (1..=4).map(|i| format!("S{}", i)).collect();
        let abundance = AbundanceMatrix::new(
            DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
            sample_ids.clone(),
            vec!["f1".into(), "f2".into()],
        )
        .unwrap();

        let raw = vec![
            ("S1".to_string(), vec!["gut".to_string(), "10".to_string()]),
            ("S2".to_string(), vec!["skin".to_string(), "20".to_string()]),
            ("S3".to_string(), vec!["gut".to_string(), "30".to_string()]),
            ("S4".to_string(), vec!["oral".to_string(), "".to_string()]),
        ];
        let metadata = Metadata::from_raw(vec!["site".into(), "depth".into()], raw).unwrap();
        (abundance, metadata)
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("!=".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!("≠".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!(">".parse::<Operator>().unwrap(), Operator::Gt);
        assert_eq!("<".parse::<Operator>().unwrap(), Operator::Lt);
        assert!(matches!("~".parse::<Operator>(), Err(CaError::InvalidOperator(_))));
    }

    #[test]
    fn test_filter_by_name() {
        let (abundance, metadata) = create_test_data();
        let (a, m) =
            filter_samples_by_name(&abundance, &metadata, &["S2".to_string(), "S9".to_string()]).unwrap();
        assert_eq!(a.sample_ids(), &["S1", "S3", "S4"]);
        assert_eq!(m.sample_ids(), &["S1", "S3", "S4"]);
    }

    #[test]
    fn test_filter_by_categorical_rule() {
        let (abundance, metadata) = create_test_data();
        let rules = vec![FilterRule::new(Some("site"), Operator::Eq, "gut")];
        let (a, m) = filter_samples_by_rules(&abundance, &metadata, &rules).unwrap();
        assert_eq!(a.sample_ids(), &["S2", "S4"]);
        assert_eq!(m.n_samples(), 2);
    }

    #[test]
    fn test_filter_numeric_rule_skips_missing() {
        let (abundance, metadata) = create_test_data();
        let rules = vec![FilterRule::new(Some("depth"), Operator::Gt, "15")];
        let (_, m) = filter_samples_by_rules(&abundance, &metadata, &rules).unwrap();
        // S4 has no depth and is kept
        assert_eq!(m.sample_ids(), &["S1", "S4"]);
    }

    #[test]
    fn test_rules_see_original_metadata() {
        let (_, metadata) = create_test_data();
        let rules = vec![
            FilterRule::new(None, Operator::Ne, "gut"),
            FilterRule::new(Some("depth"), Operator::Lt, "15"),
        ];
        let matched = samples_matching_rules(&metadata, &rules).unwrap();
        let mut matched: Vec<_> = matched.into_iter().collect();
        matched.sort();
        assert_eq!(matched, vec!["S1", "S2", "S4"]);
    }

    #[test]
    fn test_rule_unknown_label() {
        let (abundance, metadata) = create_test_data();
        let rules = vec![FilterRule::new(Some("host"), Operator::Eq, "x")];
        let result = filter_samples_by_rules(&abundance, &metadata, &rules);
        assert!(matches!(result, Err(CaError::MissingColumn(_))));
    }
}
