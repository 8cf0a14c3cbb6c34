//! Plugin registry -- named constructors for the available plugins.
//!
//! The registry is an ordinary value: the binary builds one per plugin kind
//! at startup and passes it to whatever needs to instantiate plugins by
//! name.

use std::collections::BTreeMap;

use super::{Input, Processor};

/// Label for a plugin trait object, used in errors and listings.
pub trait PluginKind {
    const KIND: &'static str;
}

/// Builds a plugin from its TOML options table.
pub type Factory<T> =
    Box<dyn Fn(&toml::Table) -> Result<Box<T>, RegistryError> + Send + Sync>;

pub type ProcessorFactory = Factory<dyn Processor>;
pub type InputFactory = Factory<dyn Input>;

/// Transforms by name.
pub type ProcessorRegistry = Registry<dyn Processor>;

/// Sources by name.
pub type InputRegistry = Registry<dyn Input>;

/// Errors from registry lookups.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown {kind} {name:?}")]
    Unknown { kind: &'static str, name: String },

    #[error("invalid options for {plugin:?}: {message}")]
    InvalidOptions { plugin: String, message: String },
}

struct Entry<T: ?Sized> {
    description: String,
    factory: Factory<T>,
}

/// A collection of plugin constructors keyed by name.
pub struct Registry<T: ?Sized> {
    entries: BTreeMap<String, Entry<T>>,
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: ?Sized + PluginKind> Registry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`.
    ///
    /// Returns `true` if an existing registration was replaced.
    pub fn register<F>(&mut self, name: &str, description: &str, factory: F) -> bool
    where
        F: Fn(&toml::Table) -> Result<Box<T>, RegistryError> + Send + Sync + 'static,
    {
        self.entries
            .insert(
                name.to_string(),
                Entry {
                    description: description.to_string(),
                    factory: Box::new(factory),
                },
            )
            .is_some()
    }

    /// Instantiate the plugin registered under `name`.
    pub fn create(&self, name: &str, options: &toml::Table) -> Result<Box<T>, RegistryError> {
        let entry = self.entries.get(name).ok_or_else(|| RegistryError::Unknown {
            kind: T::KIND,
            name: name.to_string(),
        })?;
        (entry.factory)(options)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// `(name, description)` pairs in name order.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.description.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized + PluginKind> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &T::KIND)
            .field("plugins", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
