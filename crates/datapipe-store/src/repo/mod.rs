//! Repository layer persisting shapes to SQLite

pub mod shape_repo;

pub use shape_repo::{list_shapes, load_known_shapes, SqliteShapeStore, StoredShape};
