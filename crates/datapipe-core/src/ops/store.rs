use std::collections::HashMap;

use crate::errors::ExError;
use crate::model::Shape;

/// Last-known shape per entity, scoped to one subscriber
///
/// Entries are replaced wholesale; there is no partial update of a shape.
pub trait ShapeStore {
    /// # Errors
    ///
    /// Implementations backed by I/O return `Persistence`/`Serialization` errors.
    fn get_shape(&self, entity: &str) -> Result<Option<Shape>, ExError>;

    /// # Errors
    ///
    /// Implementations backed by I/O return `Persistence`/`Serialization` errors.
    fn put_shape(&mut self, entity: &str, shape: &Shape) -> Result<(), ExError>;
}

/// HashMap-backed shape store
///
/// Not thread-safe; one store per subscriber ingest loop.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShapeStore {
    shapes: HashMap<String, Shape>,
}

impl InMemoryShapeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from a previously loaded mapping
    pub fn from_shapes(shapes: HashMap<String, Shape>) -> Self {
        Self { shapes }
    }

    /// The whole entity to shape mapping
    pub fn known_shapes(&self) -> &HashMap<String, Shape> {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl ShapeStore for InMemoryShapeStore {
    fn get_shape(&self, entity: &str) -> Result<Option<Shape>, ExError> {
        Ok(self.shapes.get(entity).cloned())
    }

    fn put_shape(&mut self, entity: &str, shape: &Shape) -> Result<(), ExError> {
        self.shapes.insert(entity.to_string(), shape.clone());
        Ok(())
    }
}
