//! Shape inference
//!
//! A [`Shaper`] walks a record and produces its [`Shape`]: every field becomes
//! a `"name:type"` token, nested records contribute an `object` token for the
//! container plus dotted tokens for their own fields, and the flattened list is
//! sorted and hashed.
//!
//! ```
//! use datapipe_core::shaper::{DefaultShaper, Shaper};
//! use serde_json::json;
//!
//! let data = json!({"id": 1, "company": {"name": "test"}});
//! let shape = DefaultShaper
//!     .get_shape(&["id".to_string()], data.as_object().unwrap())
//!     .unwrap();
//! assert_eq!(
//!     shape.properties,
//!     vec!["company:object", "company.name:string", "id:number"]
//! );
//! ```

pub mod classify;

use serde_json::Value;

use crate::errors::{PipelineError, Result};
use crate::model::shape::{format_property, LIST_DELIMITER, PATH_SEPARATOR, TYPE_SEPARATOR};
use crate::model::{Record, Shape};

pub use classify::{classify, is_date};

/// Derives the shape of a record
pub trait Shaper {
    /// # Errors
    ///
    /// Returns `InvalidPropertyName` if any field name, at any depth, contains
    /// `:` or `,`. No partial shape is produced.
    fn get_shape(&self, key_names: &[String], data: &Record) -> Result<Shape>;
}

/// Type inference straight from the JSON values
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultShaper;

impl Shaper for DefaultShaper {
    fn get_shape(&self, key_names: &[String], data: &Record) -> Result<Shape> {
        let mut properties = Vec::with_capacity(data.len());
        collect_properties(&mut properties, None, data)?;

        let shape = Shape::from_properties(properties, key_names.to_vec());
        tracing::trace!(
            property_count = shape.properties.len(),
            property_hash = shape.property_hash,
            key_names_hash = shape.key_names_hash,
            "shape computed"
        );
        Ok(shape)
    }
}

fn collect_properties(
    properties: &mut Vec<String>,
    prefix: Option<&str>,
    data: &Record,
) -> Result<()> {
    for (key, value) in data {
        if key.contains(TYPE_SEPARATOR) || key.contains(LIST_DELIMITER) {
            return Err(PipelineError::InvalidPropertyName {
                property: key.clone(),
            });
        }

        let name = match prefix {
            Some(parent) => format!("{}{}{}", parent, PATH_SEPARATOR, key),
            None => key.clone(),
        };

        properties.push(format_property(&name, classify(value)));

        if let Value::Object(nested) = value {
            collect_properties(properties, Some(&name), nested)?;
        }
    }
    Ok(())
}

/// Type of `name` in `shape`, if present
pub fn property_type<'a>(shape: &'a Shape, name: &str) -> Option<&'a str> {
    shape
        .property_types()
        .find(|(n, _)| *n == name)
        .map(|(_, t)| t)
}

/// Convenience for callers holding a bare JSON value
///
/// # Errors
///
/// `Internal` if `data` is not a JSON object, otherwise as [`Shaper::get_shape`].
pub fn shape_of_value(shaper: &dyn Shaper, key_names: &[String], data: &Value) -> Result<Shape> {
    match data {
        Value::Object(record) => shaper.get_shape(key_names, record),
        other => Err(PipelineError::Internal {
            message: format!(
                "expected a JSON object record, got {}",
                json_kind(other)
            ),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
