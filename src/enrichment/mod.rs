//! Differential abundance between the classes of a profile.

mod engine;

pub use engine::{compare_classes, run_enrichment, write_enrichment, Enrichment, MASTER_FILE};
