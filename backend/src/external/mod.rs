//! File-based collaborators feeding the pipeline

pub mod artifacts;
pub mod observations;

pub use artifacts::{ArtifactStore, FileArtifactStore};
pub use observations::{CsvObservationSource, ObservationQuery, ObservationSource};
