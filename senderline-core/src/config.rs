//! Configuration Keys, Entries and Persisted Payloads
//!
//! Every user-tunable entity (curve samples, transform coefficients, Signal K
//! paths, output toggles) owns one configuration key. Keys, titles and
//! descriptions are derived in one place from a [`ConfigTemplate`] and the
//! sensor's name, so no call site formats a key by hand:
//!
//! ```rust
//! use senderline_core::config::{ConfigEntry, ConfigTemplate};
//!
//! let entry = ConfigEntry::derive(ConfigTemplate::TankLevelCurve, "Fuel", 3001);
//! assert_eq!(entry.key, "/Tanks/Fuel/Level Curve");
//! assert_eq!(entry.title, "Fuel Tank Level Curve");
//! ```
//!
//! Storage mechanics live behind [`ConfigStore`]. The core only decides what
//! is persisted and what happens when nothing is: a missing or unreadable
//! blob falls back to the built-in default.

use alloc::{format, string::String, sync::Arc, vec::Vec};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    curve::{CurveKind, Sample},
    errors::{SenderError, SenderResult},
};

/// Key, title and description patterns for every tunable entity
///
/// `{}` in a pattern is replaced by the sensor name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigTemplate {
    /// Signal K path of a tank sender's resistance
    TankResistancePath,
    /// Tank level curve samples
    TankLevelCurve,
    /// Signal K path of the tank level
    TankLevelPath,
    /// Tank volume transform coefficients
    TankVolume,
    /// Signal K path of the tank volume
    TankVolumePath,
    /// NMEA 2000 fluid level output
    TankBusOutput,
    /// Signal K path of an engine sender's resistance
    EngineResistancePath,
    /// Engine sender curve samples
    EngineCurve,
    /// Signal K path of the engine sender reading
    EnginePath,
    /// One-stage linear calibration coefficients
    LinearCalibration,
    /// Signal K path of a linear sensor
    LinearPath,
    /// Pulses-to-revolutions multiplier of a tacho input
    TachoMultiplier,
    /// Signal K path of a tacho input
    TachoPath,
    /// Enabled output classes of a sender
    Outputs,
}

impl ConfigTemplate {
    /// `(key, title, description)` patterns
    const fn patterns(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            ConfigTemplate::TankResistancePath => (
                "/Tanks/{}/Resistance/SK Path",
                "{} Tank Sender Resistance SK Path",
                "Signal K path for the sender resistance of the {} tank",
            ),
            ConfigTemplate::TankLevelCurve => (
                "/Tanks/{}/Level Curve",
                "{} Tank Level Curve",
                "Piecewise linear curve for the {} tank level",
            ),
            ConfigTemplate::TankLevelPath => (
                "/Tanks/{}/Current Level SK Path",
                "{} Tank Level SK Path",
                "Signal K path for the {} tank level",
            ),
            ConfigTemplate::TankVolume => (
                "/Tanks/{}/Total Volume",
                "{} Tank Total Volume",
                "Calculated total volume of the {} tank",
            ),
            ConfigTemplate::TankVolumePath => (
                "/Tanks/{}/Current Volume SK Path",
                "{} Tank Volume SK Path",
                "Signal K path for the {} tank volume",
            ),
            ConfigTemplate::TankBusOutput => (
                "/Tanks/{}/NMEA 2000",
                "Tank {} NMEA 2000",
                "NMEA 2000 tank sender for tank {}",
            ),
            ConfigTemplate::EngineResistancePath => (
                "/Propulsion/{}/Resistance/SK Path",
                "{} Sender Resistance SK Path",
                "Signal K path for the sender resistance of the {}",
            ),
            ConfigTemplate::EngineCurve => (
                "/propulsion/{}/Linear Curve",
                "{} Level Curve",
                "Piecewise linear curve for the {}",
            ),
            ConfigTemplate::EnginePath => (
                "/{}/Current Level SK Path",
                "{} Engine SK Path",
                "Signal K path for the {}",
            ),
            ConfigTemplate::LinearCalibration => (
                "/{}/linear",
                "{} Calibration",
                "Calibration for the {} sensor",
            ),
            ConfigTemplate::LinearPath => (
                "/{}/skPath",
                "{} Signal K Path",
                "Signal K path for the {}",
            ),
            ConfigTemplate::TachoMultiplier => (
                "/Tacho {}/Revolution Multiplier",
                "Tacho {} Multiplier",
                "Revolutions per input pulse of tacho {}",
            ),
            ConfigTemplate::TachoPath => (
                "/Tacho {}/Revolutions SK Path",
                "Tacho {} Signal K Path",
                "Signal K path for the revolutions of engine {}",
            ),
            ConfigTemplate::Outputs => (
                "/Senders/{}/Outputs",
                "{} Outputs",
                "Enabled outputs for the {}",
            ),
        }
    }
}

/// Fill `{}` in a pattern with a sensor identity
pub fn fill(pattern: &str, identity: &str) -> String {
    pattern.replace("{}", identity)
}

/// Configuration key of `template` for the sensor named `name`
pub fn config_key(template: ConfigTemplate, name: &str) -> String {
    fill(template.patterns().0, name)
}

/// Default Signal K paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkPath {
    /// `tanks.<id>.senderResistance`
    TankResistance,
    /// `tanks.<id>.currentLevel`
    TankLevel,
    /// `tanks.<id>.currentVolume`
    TankVolume,
    /// `propulsion.1.<id>.senderResistance`
    EngineResistance,
    /// `propulsion.1.<id>`
    Engine,
    /// `propulsion.<id>.revolutions`
    Revolutions,
}

impl SkPath {
    /// Render the path for a Signal K id
    pub fn render(&self, sk_id: &str) -> String {
        let pattern = match self {
            SkPath::TankResistance => "tanks.{}.senderResistance",
            SkPath::TankLevel => "tanks.{}.currentLevel",
            SkPath::TankVolume => "tanks.{}.currentVolume",
            SkPath::EngineResistance => "propulsion.1.{}.senderResistance",
            SkPath::Engine => "propulsion.1.{}",
            SkPath::Revolutions => "propulsion.{}.revolutions",
        };
        fill(pattern, sk_id)
    }
}

/// Metadata record attached to one configuration key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique hierarchical key
    pub key: String,
    /// UI title
    pub title: String,
    /// UI description
    pub description: String,
    /// UI ordering only
    pub sort_order: i32,
}

impl ConfigEntry {
    /// Derive the entry for `template` and sensor `name`
    pub fn derive(template: ConfigTemplate, name: &str, sort_order: i32) -> Self {
        let (key, title, description) = template.patterns();
        Self {
            key: fill(key, name),
            title: fill(title, name),
            description: fill(description, name),
            sort_order,
        }
    }

    /// Name the curve axes in the description
    pub fn with_axes(mut self, kind: CurveKind) -> Self {
        self.description = format!(
            "{} ({} to {})",
            self.description,
            kind.input_title(),
            kind.output_title()
        );
        self
    }
}

/// Persisted calibration curve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveConfig {
    /// Samples in domain order; empty means "use the built-in default"
    pub samples: Vec<Sample>,
}

/// Persisted linear coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearConfig {
    /// Scale factor
    pub multiplier: f32,
    /// Additive offset
    pub offset: f32,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self { multiplier: 1.0, offset: 0.0 }
    }
}

/// Persisted Signal K path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Signal K path
    pub sk_path: String,
}

/// Enabled sink classes of one router
///
/// Classes a router never carries (a display row on the resistance router)
/// are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageOutputs {
    /// Publish the Signal K path
    pub signalk: bool,
    /// Write to the local display
    pub display: bool,
    /// Write the NMEA 2000 message field
    pub nmea2000: bool,
}

impl Default for StageOutputs {
    fn default() -> Self {
        Self { signalk: true, display: true, nmea2000: true }
    }
}

/// Persisted output toggles of one sender, evaluated once at assembly
///
/// Each router has its own set, so the tank level can stay on Signal K while
/// the volume path is dropped. Missing fields default to enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkFlags {
    /// Resistance router
    pub resistance: StageOutputs,
    /// Final reading router (curve output, tacho frequency)
    pub reading: StageOutputs,
    /// Derived router (tank volume)
    pub derived: StageOutputs,
}

/// Key-addressed blob store with per-key metadata
///
/// Implementations provide restart persistence and surface entries to a
/// configuration UI. `describe` must refuse a key that is already described.
pub trait ConfigStore: Send + Sync {
    /// Persisted blob for `key`, if any
    fn load_blob(&self, key: &str) -> SenderResult<Option<String>>;

    /// Persist a blob under `key`
    fn save_blob(&self, key: &str, blob: &str) -> SenderResult<()>;

    /// Attach UI metadata to a key
    fn describe(&self, entry: &ConfigEntry) -> SenderResult<()>;
}

/// Shared handle to a configuration store
pub type SharedStore = Arc<dyn ConfigStore>;

/// Load a typed value, falling back to `default` when missing or unreadable
pub fn load_or<T: DeserializeOwned>(store: &dyn ConfigStore, key: &str, default: T) -> T {
    match store.load_blob(key) {
        Ok(Some(blob)) => match serde_json::from_str(&blob) {
            Ok(value) => value,
            Err(_) => {
                log_warn!("Ignoring malformed configuration at {}", key);
                default
            }
        },
        Ok(None) => default,
        Err(_e) => {
            log_warn!("Configuration read failed at {}: {}", key, _e);
            default
        }
    }
}

/// Persist a typed value
pub fn save<T: Serialize>(store: &dyn ConfigStore, key: &str, value: &T) -> SenderResult<()> {
    let blob = serde_json::to_string(value).map_err(|_| SenderError::Serialization {
        reason: "could not encode value",
    })?;
    store.save_blob(key, &blob)
}
