//! Restart persistence behind the registry
//!
//! A backend loads the whole value document once at open and rewrites it on
//! every change. Configuration edits are rare and small, so there is no
//! incremental format.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use crate::{ConfigError, ConfigResult};

/// Key-ordered value document
pub type Document = BTreeMap<String, Value>;

/// Persistence for the registry's values
pub trait Backend: Send + Sync {
    /// Read every persisted value
    fn load(&self) -> ConfigResult<Document>;

    /// Replace the persisted document
    fn persist(&self, document: &Document) -> ConfigResult<()>;
}

/// Process-lifetime backend
///
/// Keeps the last persisted document, so a registry reopened on the same
/// backend sees earlier edits, the way a restart would.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    document: Mutex<Document>,
}

impl MemoryBackend {
    /// Empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend preloaded with values
    pub fn with_document(document: Document) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }
}

impl Backend for MemoryBackend {
    fn load(&self) -> ConfigResult<Document> {
        let document = self.document.lock().map_err(|_| ConfigError::LockPoisoned)?;
        Ok(document.clone())
    }

    fn persist(&self, document: &Document) -> ConfigResult<()> {
        let mut stored = self.document.lock().map_err(|_| ConfigError::LockPoisoned)?;
        *stored = document.clone();
        Ok(())
    }
}

impl<B: Backend + ?Sized> Backend for &B {
    fn load(&self) -> ConfigResult<Document> {
        (**self).load()
    }

    fn persist(&self, document: &Document) -> ConfigResult<()> {
        (**self).persist(document)
    }
}

/// One pretty-printed JSON document on disk
///
/// Writes go to a sibling temporary file first and are renamed into place,
/// so a power cut leaves either the old document or the new one.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Store at `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Document location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for JsonFileBackend {
    fn load(&self) -> ConfigResult<Document> {
        if !self.path.exists() {
            log::info!("No configuration at {}, starting empty", self.path.display());
            return Ok(Document::new());
        }

        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Document::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn persist(&self, document: &Document) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let text = serde_json::to_string_pretty(document)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, text)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
