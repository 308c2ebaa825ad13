//! Two-dimensional embeddings of profile samples.

pub mod distance;
pub mod pca;
pub mod pcoa;
mod result;

pub use distance::{pairwise, DistanceMetric};
pub use pca::pca;
pub use pcoa::{double_center, pcoa};
pub use result::{Loading, OrdinationResult};
