//! Plugin contracts
//!
//! Publishers push data points into the pipeline, activities transform them
//! in flight and subscribers receive them together with their [`ShapeInfo`].
//! Optional one-time setup is a capability: factories return a handle tagged
//! `Plain` or `Initializable`, and runners call [`Initialize::init`] only for
//! the latter.
//!
//! [`ShapeInfo`]: crate::diff::ShapeInfo

pub mod activity;
pub mod publisher;
pub mod subscriber;
pub mod transport;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::ExError;
use crate::model::{DataPoint, DataPointAction, Record};
use crate::types::{RequestContext, Sensitive};

pub use activity::{Activity, ActivityFactory, ActivityHandle, OutputCollector};
pub use publisher::{Publisher, PublisherFactory, PublisherHandle};
pub use subscriber::{Subscriber, SubscriberFactory, SubscriberHandle};
pub use transport::{CollectingTransport, DataTransport};

/// Instance settings as configured for a plugin
pub type Settings = BTreeMap<String, Value>;

/// One-time setup, run before the plugin's first use
pub trait Initialize {
    /// # Errors
    ///
    /// Any error aborts the run before data flows.
    fn init(&mut self, ctx: &PluginContext) -> Result<(), ExError>;
}

/// What a plugin instance gets to see of its environment
#[derive(Debug, Clone, Default)]
pub struct PluginContext {
    pub repository: String,
    pub source: String,
    pub request: RequestContext,
    settings: Settings,
    api_token: Sensitive<String>,
}

impl PluginContext {
    pub fn new(repository: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Sensitive::new(token.into());
        self
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn api_token(&self) -> &Sensitive<String> {
        &self.api_token
    }

    /// A setting as a string; `None` when absent, not a string, or empty
    pub fn get_string_setting(&self, path: &str) -> Option<&str> {
        match self.settings.get(path) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// An upsert for `entity` stamped with this context's repository and source
    pub fn new_data_point(&self, entity: &str, key_names: &[String], data: Record) -> DataPoint {
        DataPoint {
            repository: self.repository.clone(),
            entity: entity.to_string(),
            source: self.source.clone(),
            action: DataPointAction::Upsert,
            key_names: key_names.to_vec(),
            data,
            ..Default::default()
        }
    }
}
