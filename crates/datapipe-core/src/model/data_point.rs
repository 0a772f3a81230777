use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use super::shape::Shape;
use crate::errors::{PipelineError, Result};

/// A nested record: field name to JSON value
pub type Record = serde_json::Map<String, serde_json::Value>;

fn valid_repository() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_]{3,15}$").expect("repository pattern is valid")
    })
}

fn valid_entity() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.]{3,250}$").expect("entity pattern is valid")
    })
}

/// What a subscriber should do with a data point
///
/// Parsed case-insensitively. Unrecognized values are preserved in `Other`
/// so that newer producers do not break older subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataPointAction {
    #[default]
    Unspecified,
    Upsert,
    Delete,
    /// Start of a publish run; the subscriber should drop and recreate its target
    StartPublish,
    EndPublish,
    /// Unexpected end of a publish run
    Abend,
    /// Log it, never write it
    Malformed,
    /// Produced during discovery/editing, never written
    Sample,
    Other(String),
}

impl DataPointAction {
    pub fn as_str(&self) -> &str {
        match self {
            DataPointAction::Unspecified => "",
            DataPointAction::Upsert => "upsert",
            DataPointAction::Delete => "delete",
            DataPointAction::StartPublish => "start-publish",
            DataPointAction::EndPublish => "end-publish",
            DataPointAction::Abend => "abend",
            DataPointAction::Malformed => "malformed",
            DataPointAction::Sample => "sample",
            DataPointAction::Other(s) => s,
        }
    }

    /// Upserts and deletes carry record data; every other action is control flow
    pub fn carries_data(&self) -> bool {
        matches!(self, DataPointAction::Upsert | DataPointAction::Delete)
    }
}

impl From<String> for DataPointAction {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "" => DataPointAction::Unspecified,
            "upsert" => DataPointAction::Upsert,
            "delete" => DataPointAction::Delete,
            "start-publish" => DataPointAction::StartPublish,
            "end-publish" => DataPointAction::EndPublish,
            "abend" => DataPointAction::Abend,
            "malformed" => DataPointAction::Malformed,
            "sample" => DataPointAction::Sample,
            _ => DataPointAction::Other(normalized),
        }
    }
}

impl From<DataPointAction> for String {
    fn from(value: DataPointAction) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DataPointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of data flowing from a publisher to subscribers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Tenant repository the data point belongs to
    #[serde(default)]
    pub repository: String,

    /// Record category, e.g. `user`
    #[serde(default)]
    pub entity: String,

    /// Optional identifier of the producing source
    #[serde(default)]
    pub source: String,

    /// Optional producer-declared shape
    #[serde(default, skip_serializing_if = "Shape::is_empty")]
    pub shape: Shape,

    #[serde(default)]
    pub action: DataPointAction,

    /// Fields that uniquely identify the record
    #[serde(default)]
    pub key_names: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,

    #[serde(default)]
    pub data: Record,
}

impl DataPoint {
    /// Check that the data point can be processed
    ///
    /// Key names and data are only required for upserts and deletes; control
    /// actions only need a repository, an entity and an action.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule: `NoRepository`, `InvalidRepository`,
    /// `NoEntity`, `InvalidEntity`, `NoAction`, `NoKeyNames`, `NoData` or
    /// `DataMissingKeys`.
    pub fn validate(&self) -> Result<()> {
        if self.repository.is_empty() {
            return Err(PipelineError::NoRepository);
        }
        if !valid_repository().is_match(&self.repository) {
            return Err(PipelineError::InvalidRepository {
                repository: self.repository.clone(),
            });
        }
        if self.entity.is_empty() {
            return Err(PipelineError::NoEntity);
        }
        if !valid_entity().is_match(&self.entity) {
            return Err(PipelineError::InvalidEntity {
                entity: self.entity.clone(),
            });
        }
        if self.action == DataPointAction::Unspecified {
            return Err(PipelineError::NoAction);
        }
        if !self.action.carries_data() {
            return Ok(());
        }
        if self.key_names.is_empty() {
            return Err(PipelineError::NoKeyNames);
        }
        if self.data.is_empty() {
            return Err(PipelineError::NoData);
        }

        let missing: Vec<String> = self
            .key_names
            .iter()
            .filter(|k| !self.data.contains_key(k.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::DataMissingKeys { missing });
        }

        Ok(())
    }

    /// True when the producer supplied shape information
    pub fn is_shaped(&self) -> bool {
        !self.shape.properties.is_empty() && self.shape.property_hash != 0
    }
}
