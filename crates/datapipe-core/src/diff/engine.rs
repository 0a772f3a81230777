//! Shape comparison engine.
//!
//! [`generate_shape_info`] looks the entity up in a map of known shapes;
//! [`compare_shapes`] does the comparison proper for callers that fetched the
//! prior shape themselves (e.g. from a registration store).

use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::diff::model::{PropertiesAndTypes, ShapeInfo, ShapeResolution};
use crate::model::shape::split_property;
use crate::model::Shape;

/// Compare `new_shape` with the shape on record for `entity`
///
/// `key_names` is applied to `new_shape` only when the shape carries no key
/// names of its own, which happens for producer-declared shapes.
pub fn generate_shape_info<S: BuildHasher>(
    known_shapes: &HashMap<String, Shape, S>,
    entity: &str,
    new_shape: Shape,
    key_names: &[String],
) -> ShapeInfo {
    let new_shape = adopt_key_names(new_shape, key_names);
    compare_shapes(known_shapes.get(entity), new_shape)
}

/// Fill in key names for a shape that has none
pub fn adopt_key_names(shape: Shape, key_names: &[String]) -> Shape {
    if shape.key_names.is_empty() && !key_names.is_empty() {
        shape.with_key_names(key_names.to_vec())
    } else {
        shape
    }
}

/// Compare `new_shape` with the prior shape, if any
///
/// | prior | hash equal | subset of prior | canonical |
/// |-------|------------|-----------------|-----------|
/// | no    | -          | -               | new       |
/// | yes   | yes        | -               | new       |
/// | yes   | no         | yes             | prior     |
/// | yes   | no         | no              | new       |
///
/// Key names and new properties are then computed between the canonical
/// shape and the prior shape.
pub fn compare_shapes(previous: Option<&Shape>, new_shape: Shape) -> ShapeInfo {
    let Some(previous) = previous else {
        let new_properties = collect_new_properties(&new_shape, &Shape::default());
        return ShapeInfo {
            is_new: true,
            has_key_changes: true,
            has_new_properties: true,
            previous_shape: Shape::default(),
            new_keys: new_shape.key_names.clone(),
            new_properties,
            shape: new_shape,
            resolution: ShapeResolution::New,
        };
    };

    // Fast path on the hash, then the subset check
    let (shape, resolution) = if new_shape.property_hash == previous.property_hash {
        (new_shape, ShapeResolution::HashMatch)
    } else if new_shape.is_subset_of(previous) {
        (previous.clone(), ShapeResolution::SubsetOfPrevious)
    } else {
        (new_shape, ShapeResolution::Widened)
    };

    let has_key_changes = shape.key_names != previous.key_names;
    let new_keys = if has_key_changes {
        shape.key_names.clone()
    } else {
        Vec::new()
    };

    let new_properties = collect_new_properties(&shape, previous);

    ShapeInfo {
        is_new: false,
        has_key_changes,
        has_new_properties: !new_properties.is_empty(),
        previous_shape: previous.clone(),
        shape,
        new_keys,
        new_properties,
        resolution,
    }
}

/// Tokens of `shape` absent (verbatim) from `previous`, split into name/type.
///
/// A type change on an existing name is reported as a new property.
fn collect_new_properties(shape: &Shape, previous: &Shape) -> PropertiesAndTypes {
    shape
        .properties
        .iter()
        .filter(|p| !previous.contains_property(p))
        .map(|p| {
            let (name, property_type) = split_property(p);
            (name.to_string(), property_type.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(props: &[&str], keys: &[&str]) -> Shape {
        Shape::from_properties(
            props.iter().map(|s| s.to_string()).collect(),
            keys.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_type_change_counts_as_new_property() {
        let prev = shape(&["id:number", "age:number"], &["id"]);
        let new = shape(&["id:number", "age:string"], &["id"]);
        let info = compare_shapes(Some(&prev), new.clone());

        assert_eq!(info.resolution, ShapeResolution::Widened);
        assert_eq!(info.shape, new);
        assert_eq!(info.new_properties.get("age").map(String::as_str), Some("string"));
        assert_eq!(info.new_properties.len(), 1);
    }

    #[test]
    fn test_disjoint_fields_new_shape_wins() {
        let prev = shape(&["id:number", "surname:string"], &["id"]);
        let new = shape(&["id:number", "last_name:string"], &["id"]);
        let info = compare_shapes(Some(&prev), new.clone());

        assert_eq!(info.shape, new);
        assert!(info.has_new_properties);
        assert_eq!(info.new_properties.len(), 1);
        assert!(info.new_properties.contains_key("last_name"));
    }

    #[test]
    fn test_case_only_difference_takes_hash_fast_path() {
        let prev = shape(&["id:number", "name:string"], &["id"]);
        let new = shape(&["id:number", "Name:string"], &["id"]);
        assert_eq!(prev.property_hash, new.property_hash);

        let info = compare_shapes(Some(&prev), new.clone());
        assert_eq!(info.resolution, ShapeResolution::HashMatch);
        assert_eq!(info.shape, new);
    }

    #[test]
    fn test_adopt_key_names_only_when_missing() {
        let keyless = shape(&["id:number"], &[]);
        let adopted = adopt_key_names(keyless, &["id".to_string()]);
        assert_eq!(adopted.key_names, vec!["id".to_string()]);
        assert_ne!(adopted.key_names_hash, 0);

        let keyed = shape(&["id:number"], &["id"]);
        let kept = adopt_key_names(keyed.clone(), &["other".to_string()]);
        assert_eq!(kept, keyed);
    }

    #[test]
    fn test_generate_shape_info_uses_entity_lookup() {
        let mut known = HashMap::new();
        known.insert("user".to_string(), shape(&["id:number"], &["id"]));

        let info = generate_shape_info(&known, "invoice", shape(&["id:number"], &["id"]), &[]);
        assert!(info.is_new);

        let info = generate_shape_info(&known, "user", shape(&["id:number"], &["id"]), &[]);
        assert!(!info.has_changes());
    }
}
