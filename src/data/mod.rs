//! Data structures for strain count observations.

mod datasets;
mod observations;

pub use datasets::{list_datasets, PublishedDataset};
pub use observations::{StrainCounts, StrainObservation};
