//! Named factory registries
//!
//! Registries are plain values built at startup and handed to whatever runs
//! plugins. Registering the same name twice is an error, never a panic.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{PipelineError, Result};
use crate::plugin::{ActivityFactory, PublisherFactory, SubscriberFactory};

/// Factories of one plugin kind, keyed by name
pub struct Registry<F> {
    kind: &'static str,
    factories: BTreeMap<String, F>,
}

impl<F> Registry<F> {
    /// `kind` names the registry in error messages, e.g. `"publisher"`
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// # Errors
    ///
    /// `DuplicateFactory` if `name` is already registered; the existing
    /// factory is kept.
    pub fn register(&mut self, name: impl Into<String>, factory: F) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(PipelineError::DuplicateFactory {
                registry: self.kind.to_string(),
                name,
            });
        }
        tracing::debug!(registry = self.kind, name = %name, "factory registered");
        self.factories.insert(name, factory);
        Ok(())
    }

    /// # Errors
    ///
    /// `FactoryNotFound` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&F> {
        self.factories
            .get(name)
            .ok_or_else(|| PipelineError::FactoryNotFound {
                registry: self.kind.to_string(),
                name: name.to_string(),
            })
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<F> fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

/// The three plugin registries of a process
#[derive(Debug)]
pub struct PluginRegistry {
    pub publishers: Registry<PublisherFactory>,
    pub subscribers: Registry<SubscriberFactory>,
    pub activities: Registry<ActivityFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            publishers: Registry::new("publisher"),
            subscribers: Registry::new("subscriber"),
            activities: Registry::new("activity"),
        }
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
