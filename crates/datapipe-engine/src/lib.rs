//! datapipe engine: orchestration layer
//!
//! Runs publishers and the subscriber ingest loop on top of the core shaper,
//! the shape diff engine and the shape registration store.

pub mod commands;

pub use commands::{IngestStats, Ingestor, QuarantinePolicy};
