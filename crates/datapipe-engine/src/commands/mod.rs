//! Command orchestration layer.
//!
//! Coordinates core shaping and comparison with the persistence layer.

pub mod ingest;
pub mod publish;

pub use ingest::{IngestStats, Ingestor, QuarantinePolicy, QuarantinedRecord};
pub use publish::{publish, run_pipeline};
