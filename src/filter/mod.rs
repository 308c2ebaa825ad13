//! Filtering primitives applied to samples before grouping.

pub mod samples;

pub use samples::{
    filter_samples_by_name, filter_samples_by_rules, samples_matching_rules, FilterRule, Operator,
};
