//! Piecewise-Linear Calibration Curves
//!
//! A resistive sender is characterised by a handful of measured points:
//! ohms on the input side, a physical quantity on the output side. Between
//! points the curve is linear; outside the table it clamps to the nearest
//! endpoint.
//!
//! ```text
//! output
//!   ▲        (x1,y1)────────────── clamp-right
//!   │       ╱
//!   │      ╱  y = y0 + (y1-y0)(x-x0)/(x1-x0)
//!   │     ╱
//!   ────(x0,y0)                    clamp-left
//!   └──────────────────────────────▶ input
//! ```
//!
//! ## Table lifecycle
//!
//! A curve starts *unseeded* (empty). [`CalibrationCurve::bootstrap`] fills an
//! empty table with the literal default for its [`CurveKind`]; a seeded table
//! is left alone. Clearing the table through a configuration edit returns it
//! to unseeded, and the next bootstrap reseeds it. Emptiness is the only
//! state; there is no first-run flag.
//!
//! ## Edits
//!
//! [`CalibrationCurve::replace_samples`] validates and sorts a complete new
//! table, then swaps it in with a single assignment. Interpolation borrows
//! the curve immutably, so a call observes either the old table or the new
//! one, never a mix. A rejected edit leaves the old table in place.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::{
    constants::MAX_CURVE_SAMPLES,
    errors::{SenderError, SenderResult},
};

/// One calibration point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Input value (typically sender ohms)
    pub input: f32,
    /// Output value in the curve's engineering unit
    pub output: f32,
}

impl Sample {
    /// Create a calibration point
    pub const fn new(input: f32, output: f32) -> Self {
        Self { input, output }
    }
}

/// Bounded, ordered sample table
pub type SampleTable = Vec<Sample, MAX_CURVE_SAMPLES>;

/// Sender kind, selecting the bootstrap default table and axis titles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    /// Tank sender ohms → level ratio
    TankLevel,
    /// Engine coolant sender ohms → temperature (K)
    EngineTemperature,
    /// Oil pressure sender ohms → pressure (Pa)
    OilPressure,
    /// Engine speed (RPM) → fuel flow (m³/s)
    FuelFlow,
    /// User-defined curve without a default table
    Custom,
}

/// Tank level: empty at 0 Ω, full from 180 Ω up.
const TANK_LEVEL_DEFAULT: [Sample; 3] = [
    Sample::new(0.0, 0.0),
    Sample::new(180.0, 1.0),
    Sample::new(1000.0, 1.0),
];

/// Engine temperature: NTC sender, 23 Ω at 120 °C down to 300 Ω at 40 °C.
const ENGINE_TEMPERATURE_DEFAULT: [Sample; 9] = [
    Sample::new(23.0, 393.15),
    Sample::new(26.0, 383.15),
    Sample::new(31.0, 373.15),
    Sample::new(45.0, 363.15),
    Sample::new(65.0, 353.15),
    Sample::new(100.0, 343.15),
    Sample::new(150.0, 333.15),
    Sample::new(220.0, 323.15),
    Sample::new(300.0, 313.15),
];

/// Oil pressure: 10 Ω at 10 bar, open circuit reads as zero pressure.
const OIL_PRESSURE_DEFAULT: [Sample; 11] = [
    Sample::new(10.0, 1_000_000.0),
    Sample::new(31.0, 900_000.0),
    Sample::new(48.0, 800_000.0),
    Sample::new(65.0, 700_000.0),
    Sample::new(82.0, 600_000.0),
    Sample::new(99.0, 500_000.0),
    Sample::new(116.0, 400_000.0),
    Sample::new(133.0, 300_000.0),
    Sample::new(150.0, 200_000.0),
    Sample::new(167.0, 100_000.0),
    Sample::new(184.0, 0.0),
];

/// Fuel flow by engine speed.
const FUEL_FLOW_DEFAULT: [Sample; 13] = [
    Sample::new(500.0, 0.000_000_11),
    Sample::new(1000.0, 0.000_000_19),
    Sample::new(1500.0, 0.000_000_3),
    Sample::new(1800.0, 0.000_000_41),
    Sample::new(2000.0, 0.000_000_52),
    Sample::new(2200.0, 0.000_000_66),
    Sample::new(2400.0, 0.000_000_79),
    Sample::new(2600.0, 0.000_000_97),
    Sample::new(2800.0, 0.000_001_24),
    Sample::new(3000.0, 0.000_001_53),
    Sample::new(3200.0, 0.000_001_83),
    Sample::new(3400.0, 0.000_002),
    Sample::new(3800.0, 0.000_002_05),
];

impl CurveKind {
    /// Literal bootstrap table for this kind
    pub const fn default_samples(&self) -> &'static [Sample] {
        match self {
            CurveKind::TankLevel => &TANK_LEVEL_DEFAULT,
            CurveKind::EngineTemperature => &ENGINE_TEMPERATURE_DEFAULT,
            CurveKind::OilPressure => &OIL_PRESSURE_DEFAULT,
            CurveKind::FuelFlow => &FUEL_FLOW_DEFAULT,
            CurveKind::Custom => &[],
        }
    }

    /// Input axis title shown in the configuration UI
    pub const fn input_title(&self) -> &'static str {
        match self {
            CurveKind::FuelFlow => "Engine Speed (RPM)",
            _ => "Sender Resistance (ohms)",
        }
    }

    /// Output axis title shown in the configuration UI
    pub const fn output_title(&self) -> &'static str {
        match self {
            CurveKind::TankLevel => "Fuel Level (ratio)",
            CurveKind::EngineTemperature => "Temperature (K)",
            CurveKind::OilPressure => "Pressure (Pa)",
            CurveKind::FuelFlow => "Fuel Flow (m3/s)",
            CurveKind::Custom => "Output",
        }
    }
}

/// Where the current table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOrigin {
    /// No table yet (unseeded)
    Empty,
    /// Seeded from the kind's literal default
    Default,
    /// Loaded from persisted configuration or set by an edit
    Persisted,
}

/// Piecewise-linear calibration curve for one sender
#[derive(Debug, Clone)]
pub struct CalibrationCurve {
    kind: CurveKind,
    samples: SampleTable,
    origin: TableOrigin,
}

impl CalibrationCurve {
    /// Create an unseeded curve
    pub fn new(kind: CurveKind) -> Self {
        Self {
            kind,
            samples: Vec::new(),
            origin: TableOrigin::Empty,
        }
    }

    /// Create a curve from persisted samples, seeding defaults if there are none
    pub fn from_persisted(kind: CurveKind, samples: &[Sample]) -> SenderResult<Self> {
        let mut curve = Self::new(kind);
        curve.replace_samples(samples)?;
        curve.bootstrap();
        Ok(curve)
    }

    /// Sender kind
    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    /// Current table, ascending by input
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Where the current table came from
    pub fn origin(&self) -> TableOrigin {
        self.origin
    }

    /// True once the table holds at least one sample
    pub fn is_seeded(&self) -> bool {
        !self.samples.is_empty()
    }

    /// Seed an empty table with the kind's default
    ///
    /// Returns `true` if seeding happened. A seeded table is never touched,
    /// so calling this on every tick is cheap and idempotent.
    pub fn bootstrap(&mut self) -> bool {
        if self.is_seeded() {
            return false;
        }

        let defaults = self.kind.default_samples();
        if defaults.is_empty() {
            return false;
        }

        let mut table = SampleTable::new();
        for sample in defaults {
            // Default tables are sorted and fit by construction
            let _ = table.push(*sample);
        }
        self.samples = table;
        self.origin = TableOrigin::Default;

        log_info!(
            "Seeded {:?} curve with {} default samples",
            self.kind,
            self.samples.len()
        );
        true
    }

    /// Replace the whole table
    ///
    /// The edit is validated and sorted by input before the swap. On error
    /// the previous table stays in place. An empty edit returns the curve to
    /// unseeded.
    pub fn replace_samples(&mut self, samples: &[Sample]) -> SenderResult<()> {
        let table = build_table(samples)?;
        self.origin = if table.is_empty() {
            TableOrigin::Empty
        } else {
            TableOrigin::Persisted
        };
        self.samples = table;
        Ok(())
    }

    /// Append one sample, keeping the table sorted
    pub fn add_sample(&mut self, sample: Sample) -> SenderResult<()> {
        let mut edit: alloc::vec::Vec<Sample> = self.samples.iter().copied().collect();
        edit.push(sample);
        self.replace_samples(&edit)
    }

    /// Map an input through the curve
    ///
    /// An unseeded table answers from the kind's default without storing it;
    /// call [`bootstrap`](Self::bootstrap) to make the seeding stick.
    pub fn interpolate(&self, x: f32) -> f32 {
        if self.samples.is_empty() {
            return interpolate_table(self.kind.default_samples(), x);
        }
        interpolate_table(&self.samples, x)
    }
}

/// Validate, copy and sort an edit into a bounded table
fn build_table(samples: &[Sample]) -> SenderResult<SampleTable> {
    if samples.len() > MAX_CURVE_SAMPLES {
        return Err(SenderError::TooManySamples {
            max: MAX_CURVE_SAMPLES,
            given: samples.len(),
        });
    }

    let mut table = SampleTable::new();
    for (index, sample) in samples.iter().enumerate() {
        if !sample.input.is_finite() || !sample.output.is_finite() {
            return Err(SenderError::NonFiniteSample { index });
        }
        let _ = table.push(*sample);
    }

    // Stable: among duplicate inputs the first inserted stays first
    table.sort_by(|a, b| {
        a.input
            .partial_cmp(&b.input)
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    Ok(table)
}

/// Interpolate over a table sorted ascending by input
///
/// - empty table: 0.0
/// - single sample: that sample's output
/// - outside the domain: clamp to the nearest endpoint
/// - duplicate inputs bracketing `x`: the first sample's output
/// - NaN input: propagated unchanged
pub fn interpolate_table(samples: &[Sample], x: f32) -> f32 {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0.0,
    };

    if x.is_nan() {
        return x;
    }

    if x <= first.input {
        if x < first.input {
            log_debug!("Curve input {} clamped to {}", x, first.input);
        }
        return first.output;
    }

    if x >= last.input {
        if x > last.input {
            log_debug!("Curve input {} clamped to {}", x, last.input);
        }
        return last.output;
    }

    for pair in samples.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if lo.input <= x && x <= hi.input {
            let span = hi.input - lo.input;
            if span == 0.0 {
                return lo.output;
            }
            return lo.output + (hi.output - lo.output) * (x - lo.input) / span;
        }
    }

    // Unreachable for a sorted table; keep a plausible value regardless
    last.output
}
