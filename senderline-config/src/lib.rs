//! Persisted Configuration for Sender Pipelines
//!
//! ## Overview
//!
//! `senderline-core` decides *what* is configurable and how a pipeline
//! behaves when nothing is persisted. This crate decides *where* it lives:
//!
//! - [`ConfigRegistry`]: thread-safe key/value registry holding the
//!   metadata of every configuration entry and its current value. It
//!   refuses a second entry for the same key and lists entries in UI order.
//! - [`Backend`]: restart persistence behind the registry.
//!   [`MemoryBackend`] keeps values for the lifetime of the process,
//!   [`JsonFileBackend`] keeps them in one JSON document on disk.
//!
//! The registry implements [`senderline_core::config::ConfigStore`], so it
//! plugs straight into a [`senderline_core::PipelineAssembler`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use senderline_config::{ConfigRegistry, MemoryBackend};
//! use senderline_core::config::{ConfigEntry, ConfigTemplate, LinearConfig};
//!
//! let registry = ConfigRegistry::open(MemoryBackend::new())?;
//! registry.register(ConfigEntry::derive(ConfigTemplate::TankVolume, "Fuel", 3003))?;
//! registry.set("/Tanks/Fuel/Total Volume", &LinearConfig { multiplier: 0.2, offset: 0.0 })?;
//!
//! let volume: LinearConfig = registry.get_or_default("/Tanks/Fuel/Total Volume", LinearConfig::default())?;
//! assert_eq!(volume.multiplier, 0.2);
//!
//! let shared: senderline_core::config::SharedStore = Arc::new(registry);
//! # let _ = shared;
//! # Ok::<(), senderline_config::ConfigError>(())
//! ```
//!
//! ## Document Layout
//!
//! Values are stored as JSON, keyed by their configuration path:
//!
//! ```json
//! {
//!   "/Tanks/Fuel/Level Curve": { "samples": [ { "input": 0.0, "output": 0.0 } ] },
//!   "/Tanks/Fuel/Total Volume": { "multiplier": 0.12, "offset": 0.0 }
//! }
//! ```
//!
//! Entry metadata (title, description, sort order) is not persisted; the
//! pipelines register it again on every start.

use senderline_core::SenderError;

pub mod backend;
pub mod registry;

pub use backend::{Backend, JsonFileBackend, MemoryBackend};
pub use registry::ConfigRegistry;

/// Result type for registry operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration registry errors
#[derive(Debug, thiserror_no_std::Error)]
pub enum ConfigError {
    /// No entry registered under the key
    #[error("Configuration key not found: {0}")]
    NotFound(String),

    /// A second entry for an already registered key
    #[error("Configuration key already registered: {0}")]
    Duplicate(String),

    /// Value could not be encoded or decoded as JSON
    #[error("Malformed configuration value: {0}")]
    Serialization(String),

    /// Backend read or write failed
    #[error("Configuration storage failed: {0}")]
    Io(String),

    /// A writer panicked while holding a registry lock
    #[error("Configuration lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<ConfigError> for SenderError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound(_) => SenderError::Storage { reason: "key not found" },
            ConfigError::Duplicate(_) => SenderError::KeyCollision,
            ConfigError::Serialization(_) => SenderError::Serialization { reason: "malformed json" },
            ConfigError::Io(_) => SenderError::Storage { reason: "io error" },
            ConfigError::LockPoisoned => SenderError::Storage { reason: "lock poisoned" },
        }
    }
}
