//! Shape-change detection.
//!
//! Compares the shape of an incoming record with the last shape on record for
//! its entity and reports whether downstream storage has to evolve.
//!
//! ```
//! use datapipe_core::diff::generate_shape_info;
//! use datapipe_core::model::Shape;
//! use std::collections::HashMap;
//!
//! let known: HashMap<String, Shape> = HashMap::new();
//! let shape = Shape::from_properties(vec!["id:number".into()], vec!["id".into()]);
//! let info = generate_shape_info(&known, "user", shape, &[]);
//! assert!(info.is_new && info.has_changes());
//! ```
//!
//! ## Guarantees
//!
//! - **Total**: comparison never fails; an unknown entity is reported through
//!   `is_new`, not an error.
//! - **Subset tolerance**: a record that leaves optional fields unpopulated does
//!   not narrow the shape on record.
//! - **Order-sensitive keys**: reordering key names is a key change.

pub mod engine;
pub mod model;

pub use engine::{adopt_key_names, compare_shapes, generate_shape_info};
pub use model::{PropertiesAndTypes, ShapeInfo, ShapeResolution};
