//! Per-subscriber shape registration store
//!
//! One row per `(subscriber_id, entity)`. Property and key name lists are
//! stored as JSON arrays next to their hashes; a write replaces the whole row.

#![allow(clippy::result_large_err)]

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use datapipe_core::errors::{ExError, ExErrorKind};
use datapipe_core::model::Shape;
use datapipe_core::ops::ShapeStore;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::errors::{from_rusqlite, from_serde, Result};

/// A stored shape with its bookkeeping columns
#[derive(Debug, Clone, PartialEq)]
pub struct StoredShape {
    pub entity: String,
    pub shape: Shape,
    pub updated_at: DateTime<Utc>,
}

/// [`ShapeStore`] over the `subscriber_shapes` table
///
/// Borrows the connection; the owner decides when it is opened and migrated.
pub struct SqliteShapeStore<'a> {
    conn: &'a Connection,
    subscriber_id: String,
}

impl<'a> SqliteShapeStore<'a> {
    pub fn new(conn: &'a Connection, subscriber_id: impl Into<String>) -> Self {
        Self {
            conn,
            subscriber_id: subscriber_id.into(),
        }
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Remove the stored shape for `entity`; returns whether a row existed
    pub fn delete_shape(&self, entity: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM subscriber_shapes WHERE subscriber_id = ?1 AND entity = ?2",
                rusqlite::params![self.subscriber_id, entity],
            )
            .map_err(from_rusqlite)?;
        Ok(removed > 0)
    }
}

impl ShapeStore for SqliteShapeStore<'_> {
    fn get_shape(&self, entity: &str) -> std::result::Result<Option<Shape>, ExError> {
        let row = self
            .conn
            .query_row(
                "SELECT entity, properties, property_hash, key_names, key_names_hash, updated_at
                 FROM subscriber_shapes
                 WHERE subscriber_id = ?1 AND entity = ?2",
                rusqlite::params![self.subscriber_id, entity],
                read_row,
            )
            .optional()
            .map_err(|e| from_rusqlite(e).with_op("get_shape").with_entity(entity))?;

        row.map(decode).transpose().map(|s| s.map(|s| s.shape))
    }

    fn put_shape(&mut self, entity: &str, shape: &Shape) -> std::result::Result<(), ExError> {
        let properties = serde_json::to_string(&shape.properties)
            .map_err(|e| from_serde("properties", e))?;
        let key_names =
            serde_json::to_string(&shape.key_names).map_err(|e| from_serde("key_names", e))?;

        self.conn
            .execute(
                "INSERT INTO subscriber_shapes
                    (subscriber_id, entity, properties, property_hash, key_names, key_names_hash, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(subscriber_id, entity) DO UPDATE SET
                    properties = excluded.properties,
                    property_hash = excluded.property_hash,
                    key_names = excluded.key_names,
                    key_names_hash = excluded.key_names_hash,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    self.subscriber_id,
                    entity,
                    properties,
                    shape.property_hash,
                    key_names,
                    shape.key_names_hash,
                    Utc::now().timestamp_millis(),
                ],
            )
            .map_err(|e| from_rusqlite(e).with_op("put_shape").with_entity(entity))?;

        Ok(())
    }
}

/// Raw column values, decoded outside the rusqlite callback
struct RawRow {
    entity: String,
    properties: String,
    property_hash: u32,
    key_names: String,
    key_names_hash: u32,
    updated_at: i64,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        entity: row.get(0)?,
        properties: row.get(1)?,
        property_hash: row.get(2)?,
        key_names: row.get(3)?,
        key_names_hash: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn decode(raw: RawRow) -> Result<StoredShape> {
    let properties: Vec<String> =
        serde_json::from_str(&raw.properties).map_err(|e| from_serde("properties", e))?;
    let key_names: Vec<String> =
        serde_json::from_str(&raw.key_names).map_err(|e| from_serde("key_names", e))?;
    let updated_at = Utc
        .timestamp_millis_opt(raw.updated_at)
        .single()
        .ok_or_else(|| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("decode_column")
                .with_entity(&raw.entity)
                .with_message(format!("updated_at out of range: {}", raw.updated_at))
        })?;

    Ok(StoredShape {
        entity: raw.entity,
        shape: Shape {
            properties,
            property_hash: raw.property_hash,
            key_names,
            key_names_hash: raw.key_names_hash,
        },
        updated_at,
    })
}

/// Every stored shape of a subscriber, ordered by entity
pub fn list_shapes(conn: &Connection, subscriber_id: &str) -> Result<Vec<StoredShape>> {
    let mut stmt = conn
        .prepare(
            "SELECT entity, properties, property_hash, key_names, key_names_hash, updated_at
             FROM subscriber_shapes
             WHERE subscriber_id = ?1
             ORDER BY entity",
        )
        .map_err(from_rusqlite)?;

    let raw = stmt
        .query_map([subscriber_id], read_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    raw.into_iter().map(decode).collect()
}

/// The entity to shape mapping of a subscriber, as the diff engine consumes it
pub fn load_known_shapes(conn: &Connection, subscriber_id: &str) -> Result<HashMap<String, Shape>> {
    Ok(list_shapes(conn, subscriber_id)?
        .into_iter()
        .map(|s| (s.entity, s.shape))
        .collect())
}
