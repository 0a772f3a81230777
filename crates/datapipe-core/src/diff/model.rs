//! Shape comparison output types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Shape;

/// Property name to type, ordered by name for deterministic output
pub type PropertiesAndTypes = BTreeMap<String, String>;

/// Which branch of the comparison selected the canonical shape
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShapeResolution {
    /// No prior shape for the entity; the new shape is canonical
    New,
    /// Property hashes matched; the new shape is canonical
    HashMatch,
    /// The new shape only uses properties already on record; the prior
    /// (wider) shape stays canonical
    SubsetOfPrevious,
    /// The new shape introduces properties; it becomes canonical
    Widened,
}

/// How a record's shape relates to the shape on record for its entity
///
/// A read-only, single-use result. When [`ShapeInfo::has_changes`] is true the
/// caller persists `shape` for the entity before delivering the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShapeInfo {
    /// No prior shape existed for the entity
    pub is_new: bool,
    /// The key name list differs from the one on record
    pub has_key_changes: bool,
    /// At least one `name:type` pair is not on record
    pub has_new_properties: bool,
    /// Shape on record before this comparison (default when `is_new`)
    pub previous_shape: Shape,
    /// Shape to treat as canonical from now on
    pub shape: Shape,
    /// Full current key list when keys changed, empty otherwise
    pub new_keys: Vec<String>,
    /// Properties of `shape` that are not on record
    pub new_properties: PropertiesAndTypes,
    pub resolution: ShapeResolution,
}

impl ShapeInfo {
    /// True when downstream storage must adjust before the record is written
    pub fn has_changes(&self) -> bool {
        self.is_new || self.has_key_changes || self.has_new_properties
    }

    /// Info for a record that was not compared, e.g. a control action
    pub fn unchanged(shape: Shape) -> Self {
        Self {
            is_new: false,
            has_key_changes: false,
            has_new_properties: false,
            previous_shape: shape.clone(),
            shape,
            new_keys: Vec::new(),
            new_properties: PropertiesAndTypes::new(),
            resolution: ShapeResolution::HashMatch,
        }
    }
}
