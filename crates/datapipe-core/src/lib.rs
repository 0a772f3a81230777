//! datapipe core
//!
//! Shape inference and shape-change detection for a publisher/subscriber
//! data pipeline:
//! - [`shaper`] derives a [`Shape`] (sorted `"name:type"` tokens plus CRC-32C
//!   hashes) from a nested record
//! - [`diff`] compares a new shape with the last one on record for its entity
//!   and reports new keys and properties
//! - [`model`] holds shapes and the data points that carry records
//! - [`plugin`] and [`registry`] define publisher, activity and subscriber
//!   contracts and the named factory registries that build them
//! - [`ops`] defines the shape registration store seam

pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod plugin;
pub mod registry;
pub mod shaper;

/// Re-exported so the logging macros resolve shared field names from any crate
pub use datapipe_core_types as types;

pub use diff::{compare_shapes, generate_shape_info, ShapeInfo, ShapeResolution};
pub use errors::{ExError, ExErrorKind, PipelineError, Result};
pub use model::{DataPoint, DataPointAction, PropertyType, Record, Shape};
pub use ops::{InMemoryShapeStore, ShapeStore};
pub use registry::{PluginRegistry, Registry};
pub use shaper::{DefaultShaper, Shaper};
