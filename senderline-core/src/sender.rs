//! Sender pipeline assembly
//!
//! Wires one physical sender into a fixed chain:
//!
//! ```text
//! Sampler ──▶ resistance router (Signal K ohms)
//!    │
//!    ▼
//! CalibrationCurve ──▶ level router (Signal K, display, NMEA 2000)
//!    │
//!    ▼ (tanks only)
//! LinearTransform ──▶ volume router (Signal K m³)
//! ```
//!
//! Everything the user can tune lives in the [`ConfigStore`] under keys
//! derived from the sender's name. Assembly reads it once: curve samples,
//! transform coefficients, Signal K paths and the output toggles of each
//! router. A sink whose toggle is off, or whose collaborator is missing (no
//! display detected, no Signal K connection), is never built.
//!
//! After assembly only two things change at runtime: the curve table and
//! the transform coefficients, through [`SenderPipeline::apply_curve_edit`]
//! and [`SenderPipeline::apply_transform_edit`]. Both swap the whole value
//! in one assignment. An edit the store refuses to persist is not applied.

use alloc::{format, string::String, sync::Arc};
use fugit::MillisDurationU32;

use crate::{
    channel::{Channel, SharedAnalogInput},
    config::{
        load_or, save, ConfigEntry, ConfigTemplate, CurveConfig, LinearConfig, PathConfig,
        SharedStore, SinkFlags, SkPath, StageOutputs,
    },
    constants::{RPM_PER_HZ, TANK_DEFAULT_SIZE_M3},
    curve::{CalibrationCurve, CurveKind, Sample},
    errors::{SenderError, SenderResult},
    router::{OutputRouter, RouterBuilder},
    sampler::Sampler,
    scheduler::Periodic,
    sink::{BusFieldSink, DisplayPort, DisplaySink, FieldSlot, PathMetadata, PathPublisher, SignalKSink},
    time::Timestamp,
    transform::LinearTransform,
};

/// Where a sender shows up on the local display
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    /// Row index
    pub row: u8,
    /// Row label
    pub label: String,
    /// Presentation scale (100 for percent)
    pub scale: f32,
}

/// Identity and wiring of one resistive sender
#[derive(Debug, Clone)]
pub struct SenderSpec {
    /// Analog input the sender is wired to
    pub channel: Channel,
    /// Human name, used in configuration keys and titles
    pub name: String,
    /// Signal K identity (`fuel.main`, `temperature`)
    pub sk_id: String,
    /// Base UI order; each entry of the sender adds a fixed offset
    pub sort_order: i32,
    /// Display row for the final reading
    pub display: Option<DisplayRow>,
    /// NMEA 2000 field for the final reading
    pub bus_field: Option<FieldSlot>,
}

impl SenderSpec {
    /// Sender without display row or bus field
    pub fn new(channel: Channel, name: impl Into<String>, sk_id: impl Into<String>, sort_order: i32) -> Self {
        Self {
            channel,
            name: name.into(),
            sk_id: sk_id.into(),
            sort_order,
            display: None,
            bus_field: None,
        }
    }

    /// Show the final reading on a display row
    pub fn with_display(mut self, row: u8, label: impl Into<String>, scale: f32) -> Self {
        self.display = Some(DisplayRow {
            row,
            label: label.into(),
            scale,
        });
        self
    }

    /// Write the final reading into a bus message field
    pub fn with_bus_field(mut self, field: FieldSlot) -> Self {
        self.bus_field = Some(field);
        self
    }
}

/// Identity of a single-stage linear sensor
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSpec {
    /// Human name, used in configuration keys
    pub name: String,
    /// Default Signal K path
    pub sk_path: String,
    /// Signal K metadata
    pub metadata: PathMetadata,
    /// Default calibration
    pub calibration: LinearConfig,
    /// Base UI order
    pub sort_order: i32,
}

/// Identity and wiring of one tacho input
///
/// The sampler feeds pulse frequency (Hz); the configured multiplier turns it
/// into revolutions per second.
#[derive(Debug, Clone)]
pub struct TachoSpec {
    /// Engine name, used in configuration keys
    pub name: String,
    /// Signal K engine id (`main`, `port`)
    pub sk_id: String,
    /// Base UI order
    pub sort_order: i32,
    /// Display row, shown in RPM
    pub display: Option<DisplayRow>,
    /// NMEA 2000 engine speed field (rev/s)
    pub bus_field: Option<FieldSlot>,
}

impl TachoSpec {
    /// Tacho without display row or bus field
    pub fn new(name: impl Into<String>, sk_id: impl Into<String>, sort_order: i32) -> Self {
        Self {
            name: name.into(),
            sk_id: sk_id.into(),
            sort_order,
            display: None,
            bus_field: None,
        }
    }

    /// Show the engine speed in RPM on a display row
    pub fn with_display(mut self, row: u8, label: impl Into<String>) -> Self {
        self.display = Some(DisplayRow {
            row,
            label: label.into(),
            scale: RPM_PER_HZ,
        });
        self
    }

    /// Write revolutions per second into a bus message field
    pub fn with_bus_field(mut self, field: FieldSlot) -> Self {
        self.bus_field = Some(field);
        self
    }
}

/// Borrowed identity shared by sender and tacho assembly
struct Wiring<'a> {
    name: &'a str,
    sk_id: &'a str,
    sort_order: i32,
    display: Option<&'a DisplayRow>,
    bus_field: Option<&'a FieldSlot>,
}

impl SenderSpec {
    fn wiring(&self) -> Wiring<'_> {
        Wiring {
            name: &self.name,
            sk_id: &self.sk_id,
            sort_order: self.sort_order,
            display: self.display.as_ref(),
            bus_field: self.bus_field.as_ref(),
        }
    }
}

impl TachoSpec {
    fn wiring(&self) -> Wiring<'_> {
        Wiring {
            name: &self.name,
            sk_id: &self.sk_id,
            sort_order: self.sort_order,
            display: self.display.as_ref(),
            bus_field: self.bus_field.as_ref(),
        }
    }
}

/// Values produced by one sender tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SenderReading {
    /// Scaled channel reading (ohms)
    pub raw: f32,
    /// Curve output
    pub value: f32,
    /// Transform output, for senders with a derived stage
    pub derived: Option<f32>,
}

/// Optional scale/offset stage with its own sinks
struct DerivedStage {
    transform: LinearTransform,
    key: String,
    router: OutputRouter,
}

/// One assembled resistive sender
pub struct SenderPipeline {
    name: String,
    sampler: Sampler,
    resistance: OutputRouter,
    curve: CalibrationCurve,
    curve_key: String,
    level: OutputRouter,
    derived: Option<DerivedStage>,
    store: SharedStore,
    last: Option<SenderReading>,
}

impl SenderPipeline {
    /// Sender name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calibration curve
    pub fn curve(&self) -> &CalibrationCurve {
        &self.curve
    }

    /// Derived transform, if the sender has one
    pub fn transform(&self) -> Option<&LinearTransform> {
        self.derived.as_ref().map(|stage| &stage.transform)
    }

    /// Router for the resistance reading
    pub fn resistance_router(&self) -> &OutputRouter {
        &self.resistance
    }

    /// Router for the curve output
    pub fn level_router(&self) -> &OutputRouter {
        &self.level
    }

    /// Router for the derived output
    pub fn derived_router(&self) -> Option<&OutputRouter> {
        self.derived.as_ref().map(|stage| &stage.router)
    }

    /// Most recent tick result
    pub fn last(&self) -> Option<SenderReading> {
        self.last
    }

    /// Sample once and push through every stage
    pub fn tick(&mut self) -> SenderReading {
        let raw = self.sampler.sample();
        self.resistance.push(raw);

        // An empty table is reseeded on the next read
        self.curve.bootstrap();
        let value = self.curve.interpolate(raw);
        self.level.push(value);

        let derived = self.derived.as_ref().map(|stage| {
            let derived = stage.transform.apply(value);
            stage.router.push(derived);
            derived
        });

        let reading = SenderReading { raw, value, derived };
        self.last = Some(reading);
        reading
    }

    /// Replace the curve table and persist it
    ///
    /// A rejected or unpersisted edit leaves the old table answering. An
    /// empty edit clears the table; the next tick reseeds it from the
    /// built-in default.
    pub fn apply_curve_edit(&mut self, samples: &[Sample]) -> SenderResult<()> {
        let previous = self.curve.clone();
        if let Err(e) = self.curve.replace_samples(samples) {
            log_warn!("Rejected curve edit for {}: {}", self.name, e);
            return Err(e);
        }

        let persisted = save(
            self.store.as_ref(),
            &self.curve_key,
            &CurveConfig {
                samples: self.curve.samples().to_vec(),
            },
        );
        if let Err(e) = persisted {
            log_warn!("Could not persist curve edit for {}: {}", self.name, e);
            self.curve = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Persist new transform coefficients, then apply them
    pub fn apply_transform_edit(&mut self, config: LinearConfig) -> SenderResult<()> {
        let stage = self
            .derived
            .as_mut()
            .ok_or(SenderError::InvalidConfig("sender has no derived stage"))?;
        save(self.store.as_ref(), &stage.key, &config)?;
        stage.transform = LinearTransform::from_config(&config);
        Ok(())
    }
}

impl Periodic for SenderPipeline {
    fn period(&self) -> MillisDurationU32 {
        self.sampler.period()
    }

    fn run(&mut self, _now: Timestamp) {
        self.tick();
    }

    fn name(&self) -> &'static str {
        "sender"
    }
}

impl core::fmt::Debug for SenderPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SenderPipeline")
            .field("name", &self.name)
            .field("curve", &self.curve.kind())
            .field("resistance", &self.resistance)
            .field("level", &self.level)
            .field("derived", &self.derived.as_ref().map(|stage| &stage.router))
            .finish()
    }
}

/// Single-stage linear sensor (1-Wire temperatures, engine room climate, tacho)
pub struct LinearSender {
    sampler: Sampler,
    transform: LinearTransform,
    key: String,
    router: OutputRouter,
    store: SharedStore,
}

impl LinearSender {
    /// Current calibration
    pub fn transform(&self) -> &LinearTransform {
        &self.transform
    }

    /// Output router
    pub fn router(&self) -> &OutputRouter {
        &self.router
    }

    /// Sample once and publish the calibrated value
    pub fn tick(&mut self) -> f32 {
        let value = self.transform.apply(self.sampler.sample());
        self.router.push(value);
        value
    }

    /// Persist a new calibration, then apply it
    pub fn apply_transform_edit(&mut self, config: LinearConfig) -> SenderResult<()> {
        save(self.store.as_ref(), &self.key, &config)?;
        self.transform = LinearTransform::from_config(&config);
        Ok(())
    }
}

impl Periodic for LinearSender {
    fn period(&self) -> MillisDurationU32 {
        self.sampler.period()
    }

    fn run(&mut self, _now: Timestamp) {
        self.tick();
    }

    fn name(&self) -> &'static str {
        "linear sender"
    }
}

/// Entry offsets within a sender's sort order block
mod order {
    pub const RESISTANCE: i32 = 0;
    pub const CURVE: i32 = 1;
    pub const LEVEL: i32 = 2;
    pub const VOLUME: i32 = 3;
    pub const VOLUME_PATH: i32 = 4;
    pub const BUS: i32 = 5;
    pub const OUTPUTS: i32 = 6;
}

/// Builds sender pipelines against shared collaborators
///
/// Collaborators that were not detected at boot are simply left unset; every
/// pipeline assembled afterwards omits that sink class.
pub struct PipelineAssembler {
    store: SharedStore,
    adc: SharedAnalogInput,
    signalk: Option<Arc<dyn PathPublisher>>,
    display: Option<Arc<dyn DisplayPort>>,
}

impl PipelineAssembler {
    /// Assemble against a store and an ADC
    pub fn new(store: SharedStore, adc: SharedAnalogInput) -> Self {
        Self {
            store,
            adc,
            signalk: None,
            display: None,
        }
    }

    /// Signal K connection
    pub fn with_signalk(mut self, publisher: Arc<dyn PathPublisher>) -> Self {
        self.signalk = Some(publisher);
        self
    }

    /// Local display
    pub fn with_display(mut self, port: Arc<dyn DisplayPort>) -> Self {
        self.display = Some(port);
        self
    }

    /// Configuration store used by assembled pipelines
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Tank sender: resistance, level ratio and volume
    pub fn connect_tank_sender(&self, spec: &SenderSpec) -> SenderResult<SenderPipeline> {
        let wiring = spec.wiring();
        let name = wiring.name;
        let flags = self.output_flags(&wiring)?;

        let resistance = RouterBuilder::new()
            .with_opt(self.signalk_sink(
                flags.resistance.signalk,
                ConfigTemplate::TankResistancePath,
                &wiring,
                order::RESISTANCE,
                SkPath::TankResistance,
                metadata("ohm", format!("Resistance {}", name), format!("Measured tank {} sender resistance", name)),
            )?)?
            .build();

        let (curve, curve_key) = self.curve(CurveKind::TankLevel, ConfigTemplate::TankLevelCurve, &wiring)?;

        let level = self
            .final_sinks(
                flags.reading,
                &wiring,
                ConfigTemplate::TankLevelPath,
                order::LEVEL,
                SkPath::TankLevel,
                {
                    let label = format!("Tank {} level", name);
                    metadata("ratio", label.clone(), label)
                },
                Some(ConfigTemplate::TankBusOutput),
            )?
            .build();

        let volume_entry = ConfigEntry::derive(ConfigTemplate::TankVolume, name, wiring.sort_order + order::VOLUME);
        self.store.describe(&volume_entry)?;
        let volume = load_or(
            self.store.as_ref(),
            &volume_entry.key,
            LinearConfig {
                multiplier: TANK_DEFAULT_SIZE_M3,
                offset: 0.0,
            },
        );

        let volume_router = RouterBuilder::new()
            .with_opt(self.signalk_sink(
                flags.derived.signalk,
                ConfigTemplate::TankVolumePath,
                &wiring,
                order::VOLUME_PATH,
                SkPath::TankVolume,
                metadata(
                    "m3",
                    format!("Tank {} volume", name),
                    format!("Calculated tank {} remaining volume", name),
                ),
            )?)?
            .build();

        Ok(self.pipeline(
            spec,
            resistance,
            curve,
            curve_key,
            level,
            Some(DerivedStage {
                transform: LinearTransform::from_config(&volume),
                key: volume_entry.key,
                router: volume_router,
            }),
        ))
    }

    /// Engine coolant temperature sender (K)
    pub fn connect_engine_temperature_sender(&self, spec: &SenderSpec) -> SenderResult<SenderPipeline> {
        self.connect_engine_sender(spec, CurveKind::EngineTemperature, "K")
    }

    /// Engine oil pressure sender (Pa)
    pub fn connect_oil_pressure_sender(&self, spec: &SenderSpec) -> SenderResult<SenderPipeline> {
        self.connect_engine_sender(spec, CurveKind::OilPressure, "Pa")
    }

    /// Single-stage linear sensor fed by a driver callback
    pub fn connect_linear_sender(&self, spec: &LinearSpec, sampler: Sampler) -> SenderResult<LinearSender> {
        let name = spec.name.as_str();

        let calibration_entry = ConfigEntry::derive(ConfigTemplate::LinearCalibration, name, spec.sort_order);
        self.store.describe(&calibration_entry)?;
        let calibration = load_or(self.store.as_ref(), &calibration_entry.key, spec.calibration);

        let mut router = RouterBuilder::new();
        if let Some(publisher) = &self.signalk {
            let entry = ConfigEntry::derive(ConfigTemplate::LinearPath, name, spec.sort_order + 1);
            self.store.describe(&entry)?;
            let path = load_or(
                self.store.as_ref(),
                &entry.key,
                PathConfig {
                    sk_path: spec.sk_path.clone(),
                },
            );
            router = router.with(SignalKSink::new(
                publisher.clone(),
                path.sk_path,
                spec.metadata.clone(),
                entry,
            ))?;
        } else {
            log_info!("No Signal K connection, {} has no outputs", name);
        }

        Ok(LinearSender {
            sampler,
            transform: LinearTransform::from_config(&calibration),
            key: calibration_entry.key,
            router: router.build(),
            store: self.store.clone(),
        })
    }

    /// Tacho input: pulse frequency to revolutions per second
    ///
    /// Publishes revolutions (Hz) to Signal K and the bus engine speed
    /// field; the display row shows RPM.
    pub fn connect_tacho_sender(&self, spec: &TachoSpec, sampler: Sampler) -> SenderResult<LinearSender> {
        let wiring = spec.wiring();
        let name = wiring.name;
        let flags = self.output_flags(&wiring)?;

        let multiplier_entry =
            ConfigEntry::derive(ConfigTemplate::TachoMultiplier, name, wiring.sort_order + order::CURVE);
        self.store.describe(&multiplier_entry)?;
        let multiplier = load_or(self.store.as_ref(), &multiplier_entry.key, LinearConfig::default());

        let router = self
            .final_sinks(
                flags.reading,
                &wiring,
                ConfigTemplate::TachoPath,
                order::LEVEL,
                SkPath::Revolutions,
                metadata(
                    "Hz",
                    format!("Engine {} revolutions", name),
                    format!("Revolutions of engine {}", name),
                ),
                None,
            )?
            .build();

        log_info!("Assembled tacho {}: {} sinks", name, router.len());
        Ok(LinearSender {
            sampler,
            transform: LinearTransform::from_config(&multiplier),
            key: multiplier_entry.key,
            router,
            store: self.store.clone(),
        })
    }

    fn connect_engine_sender(&self, spec: &SenderSpec, kind: CurveKind, units: &str) -> SenderResult<SenderPipeline> {
        let wiring = spec.wiring();
        let name = wiring.name;
        let flags = self.output_flags(&wiring)?;

        let resistance = RouterBuilder::new()
            .with_opt(self.signalk_sink(
                flags.resistance.signalk,
                ConfigTemplate::EngineResistancePath,
                &wiring,
                order::RESISTANCE,
                SkPath::EngineResistance,
                metadata(
                    "ohm",
                    format!("Resistance {}", name),
                    format!("{} sender resistance", name),
                ),
            )?)?
            .build();

        let (curve, curve_key) = self.curve(kind, ConfigTemplate::EngineCurve, &wiring)?;

        let level = self
            .final_sinks(
                flags.reading,
                &wiring,
                ConfigTemplate::EnginePath,
                order::LEVEL,
                SkPath::Engine,
                metadata(units, String::from(name), String::from(name)),
                None,
            )?
            .build();

        Ok(self.pipeline(spec, resistance, curve, curve_key, level, None))
    }

    fn pipeline(
        &self,
        spec: &SenderSpec,
        resistance: OutputRouter,
        curve: CalibrationCurve,
        curve_key: String,
        level: OutputRouter,
        derived: Option<DerivedStage>,
    ) -> SenderPipeline {
        log_info!(
            "Assembled {}: {} resistance, {} level sinks",
            spec.name,
            resistance.len(),
            level.len()
        );
        SenderPipeline {
            name: spec.name.clone(),
            sampler: Sampler::adc(self.adc.clone(), spec.channel),
            resistance,
            curve,
            curve_key,
            level,
            derived,
            store: self.store.clone(),
            last: None,
        }
    }

    /// Register and load the sender's output toggles
    fn output_flags(&self, wiring: &Wiring<'_>) -> SenderResult<SinkFlags> {
        let entry = ConfigEntry::derive(ConfigTemplate::Outputs, wiring.name, wiring.sort_order + order::OUTPUTS);
        self.store.describe(&entry)?;
        let flags: SinkFlags = load_or(self.store.as_ref(), &entry.key, SinkFlags::default());

        let wants_signalk = flags.resistance.signalk || flags.reading.signalk || flags.derived.signalk;
        if wants_signalk && self.signalk.is_none() {
            log_info!("No Signal K connection, omitting {} paths", wiring.name);
        }
        if flags.reading.display && wiring.display.is_some() && self.display.is_none() {
            log_info!("No display detected, omitting {} row", wiring.name);
        }
        Ok(flags)
    }

    /// Register and load the curve, seeding defaults when nothing is persisted
    fn curve(&self, kind: CurveKind, template: ConfigTemplate, wiring: &Wiring<'_>) -> SenderResult<(CalibrationCurve, String)> {
        let entry = ConfigEntry::derive(template, wiring.name, wiring.sort_order + order::CURVE).with_axes(kind);
        self.store.describe(&entry)?;

        let persisted: CurveConfig = load_or(self.store.as_ref(), &entry.key, CurveConfig::default());
        let curve = match CalibrationCurve::from_persisted(kind, &persisted.samples) {
            Ok(curve) => curve,
            Err(_e) => {
                log_warn!("Persisted curve at {} unusable ({}), using default", entry.key, _e);
                let mut curve = CalibrationCurve::new(kind);
                curve.bootstrap();
                curve
            }
        };
        Ok((curve, entry.key))
    }

    /// Signal K sink for one path, or `None` when switched off or absent
    fn signalk_sink(
        &self,
        enabled: bool,
        template: ConfigTemplate,
        wiring: &Wiring<'_>,
        offset: i32,
        default_path: SkPath,
        metadata: PathMetadata,
    ) -> SenderResult<Option<SignalKSink>> {
        let publisher = match (&self.signalk, enabled) {
            (Some(publisher), true) => publisher.clone(),
            _ => return Ok(None),
        };

        let entry = ConfigEntry::derive(template, wiring.name, wiring.sort_order + offset);
        self.store.describe(&entry)?;
        let path = load_or(
            self.store.as_ref(),
            &entry.key,
            PathConfig {
                sk_path: default_path.render(wiring.sk_id),
            },
        );
        Ok(Some(SignalKSink::new(publisher, path.sk_path, metadata, entry)))
    }

    /// Sinks for the final reading: Signal K, display row, bus field
    fn final_sinks(
        &self,
        outputs: StageOutputs,
        wiring: &Wiring<'_>,
        template: ConfigTemplate,
        offset: i32,
        default_path: SkPath,
        metadata: PathMetadata,
        bus_template: Option<ConfigTemplate>,
    ) -> SenderResult<RouterBuilder> {
        let mut builder = RouterBuilder::new().with_opt(self.signalk_sink(
            outputs.signalk,
            template,
            wiring,
            offset,
            default_path,
            metadata,
        )?)?;

        if let (true, Some(port), Some(row)) = (outputs.display, &self.display, wiring.display) {
            builder = builder.with(DisplaySink::new(port.clone(), row.row, row.label.clone()).with_scale(row.scale))?;
        }

        if let (true, Some(field)) = (outputs.nmea2000, wiring.bus_field) {
            if let Some(bus_template) = bus_template {
                let entry = ConfigEntry::derive(bus_template, wiring.name, wiring.sort_order + order::BUS);
                self.store.describe(&entry)?;
            }
            builder = builder.with(BusFieldSink::new(field.clone()))?;
        }

        Ok(builder)
    }
}

fn metadata(units: &str, display_name: String, description: String) -> PathMetadata {
    PathMetadata {
        units: String::from(units),
        display_name,
        description,
    }
}
