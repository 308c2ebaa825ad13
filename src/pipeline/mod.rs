//! Batch configuration and execution.

mod config;
mod runner;

pub use config::{
    delimiter_byte, AnalysisConfig, AnalysisKind, AnalysisSpec, FailurePolicy,
};
pub use runner::{
    run_analysis, run_batch, AnalysisOutcome, AnalysisStatus, BatchReport, NORMALIZED_FILE,
    REPORT_FILE,
};
