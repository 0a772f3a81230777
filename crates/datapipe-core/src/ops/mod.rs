pub mod store;

pub use store::{InMemoryShapeStore, ShapeStore};
