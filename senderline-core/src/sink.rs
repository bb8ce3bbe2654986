//! Output Sinks
//!
//! A sink consumes computed values. Three variants cover the consumers on
//! the boat:
//!
//! - [`DisplaySink`]: one labelled row on the local OLED
//! - [`SignalKSink`]: a Signal K path with unit metadata
//! - [`BusFieldSink`]: a field inside an NMEA 2000 message sender
//!
//! Encoding, framing and transport belong to the collaborators behind
//! [`DisplayPort`], [`PathPublisher`] and [`FieldSlot`]. A sink only hands
//! the value over; delivery is synchronous before [`Sink::accept`] returns.

use alloc::{string::String, sync::Arc};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::ConfigEntry;

/// Capability shared by every sink variant
pub trait Sink {
    /// Deliver one value
    fn accept(&self, value: f32);
}

/// Value written to a display row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayValue<'a> {
    /// Numeric reading
    Number(f32),
    /// Status text (IP address, alarm indicator)
    Text(&'a str),
}

/// Line-oriented display driver
pub trait DisplayPort: Send + Sync {
    /// Overwrite `row` with a label and value
    fn write_line(&self, row: u8, label: &str, value: DisplayValue<'_>);
}

/// Signal K metadata attached to a published path
#[derive(Debug, Clone, PartialEq)]
pub struct PathMetadata {
    /// SI unit string (`ohm`, `ratio`, `m3`, `K`, `Pa`)
    pub units: String,
    /// Short name for dashboards
    pub display_name: String,
    /// Longer human-readable description
    pub description: String,
}

/// Signal K delta publisher
pub trait PathPublisher: Send + Sync {
    /// Publish a value at a path
    fn publish(&self, path: &str, value: f32, metadata: &PathMetadata);
}

/// Shared scalar field of a bus message
///
/// Stands in for a field reference exposed by an NMEA 2000 message sender.
/// The router writes; the message sender reads when it next transmits.
/// Fields start as "not available" (NaN).
#[derive(Debug, Clone)]
pub struct FieldSlot {
    bits: Arc<AtomicU32>,
}

impl FieldSlot {
    /// Create an unset field
    pub fn new() -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(f32::NAN.to_bits())),
        }
    }

    /// Store a value
    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Last stored value, `None` until first written
    pub fn get(&self) -> Option<f32> {
        let value = f32::from_bits(self.bits.load(Ordering::Acquire));
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }
}

impl Default for FieldSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared boolean field of a bus message (engine status flags)
#[derive(Debug, Clone, Default)]
pub struct FlagSlot {
    flag: Arc<AtomicBool>,
}

impl FlagSlot {
    /// Create a cleared flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a flag value
    pub fn set(&self, value: bool) {
        self.flag.store(value, Ordering::Release);
    }

    /// Current flag value
    pub fn get(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Labelled display row
#[derive(Clone)]
pub struct DisplaySink {
    port: Arc<dyn DisplayPort>,
    row: u8,
    label: String,
    scale: f32,
}

impl DisplaySink {
    /// Show values unscaled on `row`
    pub fn new(port: Arc<dyn DisplayPort>, row: u8, label: impl Into<String>) -> Self {
        Self {
            port,
            row,
            label: label.into(),
            scale: 1.0,
        }
    }

    /// Multiply values before display (ratio → percent, Hz → RPM)
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Display row
    pub fn row(&self) -> u8 {
        self.row
    }
}

impl Sink for DisplaySink {
    fn accept(&self, value: f32) {
        self.port
            .write_line(self.row, &self.label, DisplayValue::Number(self.scale * value));
    }
}

/// Signal K path output
#[derive(Clone)]
pub struct SignalKSink {
    publisher: Arc<dyn PathPublisher>,
    path: String,
    metadata: PathMetadata,
    entry: ConfigEntry,
}

impl SignalKSink {
    /// Publish at `path` with metadata; `entry` is the path's config entry
    pub fn new(
        publisher: Arc<dyn PathPublisher>,
        path: impl Into<String>,
        metadata: PathMetadata,
        entry: ConfigEntry,
    ) -> Self {
        Self {
            publisher,
            path: path.into(),
            metadata,
            entry,
        }
    }

    /// Published path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Metadata sent with every value
    pub fn metadata(&self) -> &PathMetadata {
        &self.metadata
    }

    /// Configuration entry for the path
    pub fn entry(&self) -> &ConfigEntry {
        &self.entry
    }
}

impl Sink for SignalKSink {
    fn accept(&self, value: f32) {
        self.publisher.publish(&self.path, value, &self.metadata);
    }
}

/// NMEA 2000 message field
#[derive(Debug, Clone)]
pub struct BusFieldSink {
    field: FieldSlot,
}

impl BusFieldSink {
    /// Write into an existing message field
    pub fn new(field: FieldSlot) -> Self {
        Self { field }
    }
}

impl Sink for BusFieldSink {
    fn accept(&self, value: f32) {
        self.field.set(value);
    }
}

/// Tagged union over the sink variants
#[derive(Clone)]
pub enum OutputSink {
    /// Local display row
    Display(DisplaySink),
    /// Signal K path
    SignalK(SignalKSink),
    /// NMEA 2000 field
    BusField(BusFieldSink),
}

impl OutputSink {
    /// Short variant name for logs
    pub const fn name(&self) -> &'static str {
        match self {
            OutputSink::Display(_) => "display",
            OutputSink::SignalK(_) => "signalk",
            OutputSink::BusField(_) => "nmea2000",
        }
    }
}

impl Sink for OutputSink {
    fn accept(&self, value: f32) {
        match self {
            OutputSink::Display(sink) => sink.accept(value),
            OutputSink::SignalK(sink) => sink.accept(value),
            OutputSink::BusField(sink) => sink.accept(value),
        }
    }
}

impl From<DisplaySink> for OutputSink {
    fn from(sink: DisplaySink) -> Self {
        OutputSink::Display(sink)
    }
}

impl From<SignalKSink> for OutputSink {
    fn from(sink: SignalKSink) -> Self {
        OutputSink::SignalK(sink)
    }
}

impl From<BusFieldSink> for OutputSink {
    fn from(sink: BusFieldSink) -> Self {
        OutputSink::BusField(sink)
    }
}
