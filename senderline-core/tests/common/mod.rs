//! Common test collaborators for integration tests
//!
//! - Scripted ADC that reports a chosen sender resistance per channel
//! - Recording display and Signal K publisher
//! - In-memory configuration store that refuses duplicate descriptions and
//!   can be told to fail every save

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use senderline_core::{
    channel::{AdcGain, AnalogInput},
    config::{ConfigEntry, ConfigStore},
    constants::{MEASUREMENT_CURRENT_A, VOLTAGE_DIVIDER_SCALE},
    sink::{DisplayPort, DisplayValue, PathMetadata, PathPublisher},
    SenderError, SenderResult,
};

/// ADC code that makes a reference-board resistive channel read `ohms`
pub fn code_for_ohms(ohms: f32) -> i16 {
    let pin_volts = ohms * MEASUREMENT_CURRENT_A / VOLTAGE_DIVIDER_SCALE;
    (pin_volts * 32768.0 / AdcGain::One.full_scale_volts()).round() as i16
}

/// ADC returning a settable code per channel
#[derive(Default)]
pub struct ScriptedAdc {
    codes: Mutex<HashMap<u8, i16>>,
}

impl ScriptedAdc {
    pub fn set_code(&self, channel: u8, code: i16) {
        self.codes.lock().unwrap().insert(channel, code);
    }

    pub fn set_ohms(&self, channel: u8, ohms: f32) {
        self.set_code(channel, code_for_ohms(ohms));
    }
}

impl AnalogInput for ScriptedAdc {
    fn read(&self, channel: u8) -> i16 {
        self.codes.lock().unwrap().get(&channel).copied().unwrap_or(0)
    }

    fn raw_code_to_volts(&self, raw: i16) -> f32 {
        AdcGain::One.raw_code_to_volts(raw)
    }
}

/// Display line as written by a sink
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Number(f32),
    Text(String),
}

/// Display that remembers the last line written to each row
#[derive(Default)]
pub struct RecordingDisplay {
    rows: Mutex<BTreeMap<u8, (String, Line)>>,
}

impl RecordingDisplay {
    pub fn row(&self, row: u8) -> Option<(String, Line)> {
        self.rows.lock().unwrap().get(&row).cloned()
    }

    pub fn number(&self, row: u8) -> Option<f32> {
        match self.row(row) {
            Some((_, Line::Number(v))) => Some(v),
            _ => None,
        }
    }
}

impl DisplayPort for RecordingDisplay {
    fn write_line(&self, row: u8, label: &str, value: DisplayValue<'_>) {
        let line = match value {
            DisplayValue::Number(v) => Line::Number(v),
            DisplayValue::Text(text) => Line::Text(text.to_string()),
        };
        self.rows.lock().unwrap().insert(row, (label.to_string(), line));
    }
}

/// Published delta
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub path: String,
    pub value: f32,
    pub units: String,
}

/// Signal K publisher that keeps every delta
#[derive(Default)]
pub struct RecordingPublisher {
    deltas: Mutex<Vec<Delta>>,
}

impl RecordingPublisher {
    pub fn deltas(&self) -> Vec<Delta> {
        self.deltas.lock().unwrap().clone()
    }

    /// Last value published at `path`
    pub fn latest(&self, path: &str) -> Option<f32> {
        self.deltas
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|d| d.path == path)
            .map(|d| d.value)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.deltas.lock().unwrap().iter().map(|d| d.path.clone()).collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

impl PathPublisher for RecordingPublisher {
    fn publish(&self, path: &str, value: f32, metadata: &PathMetadata) {
        self.deltas.lock().unwrap().push(Delta {
            path: path.to_string(),
            value,
            units: metadata.units.clone(),
        });
    }
}

/// Minimal in-memory configuration store
#[derive(Default)]
pub struct TestStore {
    blobs: Mutex<HashMap<String, String>>,
    entries: Mutex<Vec<ConfigEntry>>,
    read_only: AtomicBool,
}

impl TestStore {
    /// Make every later save fail, as a full flash would
    pub fn refuse_saves(&self) {
        self.read_only.store(true, Ordering::Relaxed);
    }

    pub fn put(&self, key: &str, blob: &str) {
        self.blobs.lock().unwrap().insert(key.to_string(), blob.to_string());
    }

    pub fn blob(&self, key: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    pub fn entry(&self, key: &str) -> Option<ConfigEntry> {
        self.entries.lock().unwrap().iter().find(|e| e.key == key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().iter().map(|e| e.key.clone()).collect()
    }
}

impl ConfigStore for TestStore {
    fn load_blob(&self, key: &str) -> SenderResult<Option<String>> {
        Ok(self.blob(key))
    }

    fn save_blob(&self, key: &str, blob: &str) -> SenderResult<()> {
        if self.read_only.load(Ordering::Relaxed) {
            return Err(SenderError::Storage { reason: "disk full" });
        }
        self.put(key, blob);
        Ok(())
    }

    fn describe(&self, entry: &ConfigEntry) -> SenderResult<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.key == entry.key) {
            return Err(SenderError::KeyCollision);
        }
        entries.push(entry.clone());
        Ok(())
    }
}

/// Float comparison with an absolute tolerance
pub fn assert_close(actual: f32, expected: f32, tolerance: f32) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} ± {}, got {}",
        expected,
        tolerance,
        actual
    );
}
