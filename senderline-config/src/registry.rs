//! Configuration Registry
//!
//! Central store for every tunable entity of the running pipelines: entry
//! metadata for the configuration UI plus the current value of each key,
//! written through to a [`Backend`] on every change.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use senderline_core::{
    config::{ConfigEntry, ConfigStore},
    SenderResult,
};

use crate::{
    backend::{Backend, Document, MemoryBackend},
    ConfigError, ConfigResult,
};

/// Thread-safe configuration registry
pub struct ConfigRegistry<B: Backend = MemoryBackend> {
    /// Entry metadata indexed by key
    entries: RwLock<HashMap<String, ConfigEntry>>,

    /// Current values, mirrored to the backend
    values: RwLock<Document>,

    backend: B,
}

impl<B: Backend> ConfigRegistry<B> {
    /// Open a registry, loading every persisted value from `backend`
    pub fn open(backend: B) -> ConfigResult<Self> {
        let values = backend.load()?;
        log::debug!("Loaded {} configuration values", values.len());
        Ok(Self {
            entries: RwLock::new(HashMap::new()),
            values: RwLock::new(values),
            backend,
        })
    }

    /// Attach metadata to a key
    ///
    /// Two entries never share a key; the second registration is refused.
    pub fn register(&self, entry: ConfigEntry) -> ConfigResult<()> {
        let mut entries = self.entries.write().map_err(|_| ConfigError::LockPoisoned)?;
        if entries.contains_key(&entry.key) {
            log::warn!("Refusing duplicate configuration key {}", entry.key);
            return Err(ConfigError::Duplicate(entry.key));
        }
        entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    /// Metadata of one key
    pub fn entry(&self, key: &str) -> ConfigResult<ConfigEntry> {
        let entries = self.entries.read().map_err(|_| ConfigError::LockPoisoned)?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))
    }

    /// Every registered entry, in UI order
    ///
    /// Ordered by `sort_order`, then by key so equal orders stay stable.
    pub fn entries(&self) -> ConfigResult<Vec<ConfigEntry>> {
        let entries = self.entries.read().map_err(|_| ConfigError::LockPoisoned)?;
        let mut list: Vec<ConfigEntry> = entries.values().cloned().collect();
        list.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.key.cmp(&b.key)));
        Ok(list)
    }

    /// Current value of `key`, if one is set
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> ConfigResult<Option<T>> {
        let values = self.values.read().map_err(|_| ConfigError::LockPoisoned)?;
        match values.get(key) {
            Some(value) => Ok(Some(T::deserialize(value)?)),
            None => Ok(None),
        }
    }

    /// Current value of `key`, or `default` when unset
    pub fn get_or_default<T: DeserializeOwned>(&self, key: &str, default: T) -> ConfigResult<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Set `key` and persist the document
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> ConfigResult<()> {
        let value = serde_json::to_value(value)?;
        self.store(key, value)
    }

    /// Forget the value of `key`; returns whether one was set
    pub fn remove(&self, key: &str) -> ConfigResult<bool> {
        let mut values = self.values.write().map_err(|_| ConfigError::LockPoisoned)?;
        if values.remove(key).is_none() {
            return Ok(false);
        }
        self.backend.persist(&values)?;
        Ok(true)
    }

    /// Keys that currently hold a value
    pub fn keys(&self) -> ConfigResult<Vec<String>> {
        let values = self.values.read().map_err(|_| ConfigError::LockPoisoned)?;
        Ok(values.keys().cloned().collect())
    }

    /// Persistence backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn store(&self, key: &str, value: Value) -> ConfigResult<()> {
        let mut values = self.values.write().map_err(|_| ConfigError::LockPoisoned)?;
        let previous = values.insert(key.to_string(), value);

        if let Err(e) = self.backend.persist(&values) {
            // Memory and disk stay in step: undo the change
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            log::warn!("Could not persist {}: {}", key, e);
            return Err(e);
        }
        Ok(())
    }
}

impl<B: Backend> ConfigStore for ConfigRegistry<B> {
    fn load_blob(&self, key: &str) -> SenderResult<Option<String>> {
        let values = self.values.read().map_err(|_| ConfigError::LockPoisoned)?;
        Ok(values.get(key).map(Value::to_string))
    }

    fn save_blob(&self, key: &str, blob: &str) -> SenderResult<()> {
        let value: Value = serde_json::from_str(blob).map_err(ConfigError::from)?;
        Ok(self.store(key, value)?)
    }

    fn describe(&self, entry: &ConfigEntry) -> SenderResult<()> {
        Ok(self.register(entry.clone())?)
    }
}

impl ConfigRegistry<MemoryBackend> {
    /// Empty registry without disk persistence
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            values: RwLock::new(Document::new()),
            backend: MemoryBackend::new(),
        }
    }
}

impl Default for ConfigRegistry<MemoryBackend> {
    fn default() -> Self {
        Self::in_memory()
    }
}
