use serde::{Deserialize, Serialize};
use std::fmt;

/// Separates a property name from its type in a `"name:type"` token
pub const TYPE_SEPARATOR: char = ':';

/// Separates tokens in the string a shape hash is computed over
pub const LIST_DELIMITER: char = ',';

/// Joins a nested property name to its parent path
pub const PATH_SEPARATOR: char = '.';

/// Inferred type of a single property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Number,
    Bool,
    Date,
    Object,
    Unknown,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Bool => "bool",
            PropertyType::Date => "date",
            PropertyType::Object => "object",
            PropertyType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural fingerprint of a record
///
/// `properties` holds `"name:type"` tokens sorted case-insensitively by name;
/// `property_hash` is a CRC-32C over their lower-cased, comma-joined form and
/// serves as an O(1) equality pre-check between two shapes. `key_names` and
/// `key_names_hash` play the same roles for the fields identifying a record.
///
/// Shapes are compared, never updated in place: the registration store keeps
/// the last shape of record per entity and replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub property_hash: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_names: Vec<String>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub key_names_hash: u32,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl Shape {
    /// Build a shape from an already-flattened property list
    ///
    /// The list is sorted into canonical order before hashing, so producers
    /// may declare their properties in any order.
    pub fn from_properties(mut properties: Vec<String>, key_names: Vec<String>) -> Self {
        sort_properties(&mut properties);
        let property_hash = checksum(&properties);
        let key_names_hash = checksum(&key_names);
        Self {
            properties,
            property_hash,
            key_names,
            key_names_hash,
        }
    }

    /// Replace the key names and recompute their hash
    pub fn with_key_names(mut self, key_names: Vec<String>) -> Self {
        self.key_names_hash = checksum(&key_names);
        self.key_names = key_names;
        self
    }

    /// True for the zero value used when no prior shape exists
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.key_names.is_empty()
            && self.property_hash == 0
            && self.key_names_hash == 0
    }

    /// Exact (case-sensitive) membership test for a `"name:type"` token
    pub fn contains_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// True when every property of `self` also appears in `other`
    pub fn is_subset_of(&self, other: &Shape) -> bool {
        self.properties.iter().all(|p| other.contains_property(p))
    }

    /// Iterate `(name, type)` pairs
    pub fn property_types(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|p| split_property(p))
    }
}

/// Split a `"name:type"` token at its first separator
///
/// Tokens without a separator are reported with type `unknown`.
pub fn split_property(property: &str) -> (&str, &str) {
    property
        .split_once(TYPE_SEPARATOR)
        .unwrap_or((property, PropertyType::Unknown.as_str()))
}

/// Format a `"name:type"` token
pub fn format_property(name: &str, property_type: PropertyType) -> String {
    format!("{}{}{}", name, TYPE_SEPARATOR, property_type)
}

/// Stable, case-insensitive sort of `"name:type"` tokens by name
pub fn sort_properties(properties: &mut [String]) {
    properties.sort_by_cached_key(|p| split_property(p).0.to_lowercase());
}

/// CRC-32 (Castagnoli) over the lower-cased, comma-joined items
///
/// No trailing delimiter; an empty list hashes the empty string (0).
pub fn checksum(items: &[String]) -> u32 {
    let mut joined = String::with_capacity(items.iter().map(|s| s.len() + 1).sum());
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            joined.push(LIST_DELIMITER);
        }
        joined.push_str(&item.to_lowercase());
    }
    crc32c::crc32c(joined.as_bytes())
}
