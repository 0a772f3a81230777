//! datapipe store: SQLite-backed shape registration
//!
//! Provides:
//! - SQLite connection setup and an embedded, checksummed migration runner
//! - `SqliteShapeStore`, the per-subscriber registration store for shapes

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

pub use errors::Result;
pub use repo::{list_shapes, load_known_shapes, SqliteShapeStore, StoredShape};
