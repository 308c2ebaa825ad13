//! Data structures for comparative profile analysis.

mod abundance;
mod feature_metadata;
mod metadata;
mod profile;
mod references;
mod result;

pub use abundance::AbundanceMatrix;
pub use feature_metadata::FeatureMetadata;
pub use metadata::{Metadata, Variable, VariableType};
pub use profile::{Profile, ProfileOptions};
pub use references::{ClassGroup, ClassReferences};
pub use result::{
    format_p_value, sort_rows, Direction, EnrichmentResult, EnrichmentRow, MasterRow,
    PairwiseEnrichment, ENRICHMENT_HEADER,
};
