//! Engine Room Monitor Example
//!
//! Wires a fuel tank sender, the engine coolant and oil pressure senders,
//! a voltage input, the engine tacho, two alarm inputs and the engine room
//! climate sensors into one event loop, then runs it against simulated
//! hardware for a few seconds.
//!
//! ## Pipeline
//!
//! ```text
//! ADC ch0 → ohms → level curve → volume transform → Signal K / display / N2K
//! ADC ch2 → ohms → oil pressure curve              → Signal K / N2K
//! ADC ch3 → ohms → coolant curve                    → Signal K / N2K
//! ADC ch1 → volts                                   → Signal K
//! D1      → pulse Hz → revolutions                  → Signal K / display (RPM) / N2K
//! D2, D3  → alarm states                            → display alarm row
//! ```
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_tank_sender
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use senderline_core::{
    alarm::{AlarmIndicator, AlarmInput, AlarmStates},
    channel::{AdcGain, AnalogInput, Channel, DigitalInput},
    config::{ConfigEntry, ConfigStore, LinearConfig},
    constants::{
        ANALOG_READ_PERIOD_MS, DISPLAY_ALARM_SLOTS, ONEWIRE_READ_PERIOD_MS, ROOM_PRESSURE_PERIOD_MS,
        ROOM_TEMPERATURE_PERIOD_MS, TACHO_READ_PERIOD_MS,
    },
    sampler::Sampler,
    sender::{LinearSpec, TachoSpec},
    sink::{DisplayPort, DisplayValue, FieldSlot, FlagSlot, PathMetadata, PathPublisher},
    time::{FixedTime, TimeSource},
    EventLoop, PipelineAssembler, SenderError, SenderResult, SenderSpec,
};

/// ADC with a fixed code per channel
struct SimulatedAdc {
    codes: HashMap<u8, i16>,
}

impl AnalogInput for SimulatedAdc {
    fn read(&self, channel: u8) -> i16 {
        self.codes.get(&channel).copied().unwrap_or(0)
    }

    fn raw_code_to_volts(&self, raw: i16) -> f32 {
        AdcGain::One.raw_code_to_volts(raw)
    }
}

/// D2 low (oil pressure ok), D3 low (over temperature, inverted input)
struct SimulatedPins;

impl DigitalInput for SimulatedPins {
    fn is_high(&self, _pin: u8) -> bool {
        false
    }
}

struct ConsoleDisplay;

impl DisplayPort for ConsoleDisplay {
    fn write_line(&self, row: u8, label: &str, value: DisplayValue<'_>) {
        match value {
            DisplayValue::Number(v) => println!("  [display {}] {}: {:.0}", row, label, v),
            DisplayValue::Text(text) => println!("  [display {}] {}: {}", row, label, text),
        }
    }
}

struct ConsoleSignalK;

impl PathPublisher for ConsoleSignalK {
    fn publish(&self, path: &str, value: f32, metadata: &PathMetadata) {
        println!("  [signalk] {} = {:.4} {}", path, value, metadata.units);
    }
}

#[derive(Default)]
struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
    entries: Mutex<Vec<ConfigEntry>>,
}

impl ConfigStore for MemoryStore {
    fn load_blob(&self, key: &str) -> SenderResult<Option<String>> {
        let blobs = self.blobs.lock().map_err(|_| SenderError::Storage { reason: "lock poisoned" })?;
        Ok(blobs.get(key).cloned())
    }

    fn save_blob(&self, key: &str, blob: &str) -> SenderResult<()> {
        let mut blobs = self.blobs.lock().map_err(|_| SenderError::Storage { reason: "lock poisoned" })?;
        blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn describe(&self, entry: &ConfigEntry) -> SenderResult<()> {
        let mut entries = self.entries.lock().map_err(|_| SenderError::Storage { reason: "lock poisoned" })?;
        if entries.iter().any(|e| e.key == entry.key) {
            return Err(SenderError::KeyCollision);
        }
        entries.push(entry.clone());
        Ok(())
    }
}

fn main() -> SenderResult<()> {
    println!("Senderline Engine Room Monitor Example");
    println!("======================================\n");

    // 760 codes ≈ 96 Ω (tank half full), 400 ≈ 50 Ω, 1100 ≈ 139 Ω, 9600 ≈ 12.1 V
    let adc = Arc::new(SimulatedAdc {
        codes: HashMap::from([(0, 760), (1, 9600), (2, 400), (3, 1100)]),
    });
    let store = Arc::new(MemoryStore::default());
    let display: Arc<dyn DisplayPort> = Arc::new(ConsoleDisplay);

    let assembler = PipelineAssembler::new(store.clone(), adc.clone())
        .with_signalk(Arc::new(ConsoleSignalK))
        .with_display(display.clone());

    // NMEA 2000 message fields
    let tank_level = FieldSlot::new();
    let engine_speed = FieldSlot::new();
    let oil_pressure = FieldSlot::new();
    let coolant_temperature = FieldSlot::new();
    let low_oil_pressure = FlagSlot::new();
    let over_temperature = FlagSlot::new();

    let tank = assembler.connect_tank_sender(
        &SenderSpec::new(Channel::resistive(0, ANALOG_READ_PERIOD_MS), "Fuel", "fuel.main", 3000)
            .with_display(2, "Tank A1", 100.0)
            .with_bus_field(tank_level.clone()),
    )?;
    let oil = assembler.connect_oil_pressure_sender(
        &SenderSpec::new(Channel::resistive(2, ANALOG_READ_PERIOD_MS), "Engine Oil Pressure", "oilPressure", 1000)
            .with_bus_field(oil_pressure.clone()),
    )?;
    let coolant = assembler.connect_engine_temperature_sender(
        &SenderSpec::new(Channel::resistive(3, ANALOG_READ_PERIOD_MS), "Engine Temperature", "temperature", 1000)
            .with_bus_field(coolant_temperature.clone()),
    )?;

    let room = assembler.connect_linear_sender(
        &LinearSpec {
            name: "Engine_Room_Temperature".into(),
            sk_path: "propulsion.engineRoom.temperature".into(),
            metadata: PathMetadata {
                units: "K".into(),
                display_name: "Engine room temperature".into(),
                description: "Engine room air temperature".into(),
            },
            calibration: LinearConfig { multiplier: 1.0, offset: 273.15 },
            sort_order: 400,
        },
        Sampler::from_fn(ROOM_TEMPERATURE_PERIOD_MS, || 31.5),
    )?;

    let pressure = assembler.connect_linear_sender(
        &LinearSpec {
            name: "Engine_Room_Pressure".into(),
            sk_path: "propulsion.engineRoom.pressure".into(),
            metadata: PathMetadata {
                units: "Pa".into(),
                display_name: "Engine room pressure".into(),
                description: "Engine room barometric pressure".into(),
            },
            calibration: LinearConfig::default(),
            sort_order: 410,
        },
        Sampler::from_fn(ROOM_PRESSURE_PERIOD_MS, || 101_325.0),
    )?;

    let exhaust = assembler.connect_linear_sender(
        &LinearSpec {
            name: "Exhaust_Temperature".into(),
            sk_path: "propulsion.main.exhaustTemperature".into(),
            metadata: PathMetadata {
                units: "K".into(),
                display_name: "Exhaust temperature".into(),
                description: "1-Wire exhaust elbow temperature".into(),
            },
            calibration: LinearConfig { multiplier: 1.0, offset: 273.15 },
            sort_order: 420,
        },
        Sampler::from_fn(ONEWIRE_READ_PERIOD_MS, || 48.0),
    )?;

    let a2 = assembler.connect_linear_sender(
        &LinearSpec {
            name: "Voltage A2".into(),
            sk_path: "sensors.a2.voltage".into(),
            metadata: PathMetadata {
                units: "V".into(),
                display_name: "Analog Voltage A2".into(),
                description: "Voltage level of analog input A2".into(),
            },
            calibration: LinearConfig::default(),
            sort_order: 500,
        },
        Sampler::adc(adc, Channel::voltage(1, ANALOG_READ_PERIOD_MS)),
    )?;

    // 38 Hz on D1, one pulse per revolution
    let tacho = assembler.connect_tacho_sender(
        &TachoSpec::new("1", "main", 3015)
            .with_display(3, "RPM D1")
            .with_bus_field(engine_speed.clone()),
        Sampler::from_fn(TACHO_READ_PERIOD_MS, || 38.0),
    )?;

    let alarms = AlarmStates::<DISPLAY_ALARM_SLOTS>::new();
    let pins = Arc::new(SimulatedPins);
    let oil_alarm = AlarmInput::new(pins.clone(), 2, alarms.clone(), 1)?.with_flag(low_oil_pressure.clone())?;
    let temperature_alarm = AlarmInput::new(pins, 3, alarms.clone(), 2)?
        .inverted()
        .with_flag(over_temperature.clone())?;

    let mut clock = FixedTime::new(0);
    let mut event_loop = EventLoop::new();
    event_loop.on_repeat(tank, clock.now());
    event_loop.on_repeat(oil, clock.now());
    event_loop.on_repeat(coolant, clock.now());
    event_loop.on_repeat(room, clock.now());
    event_loop.on_repeat(pressure, clock.now());
    event_loop.on_repeat(exhaust, clock.now());
    event_loop.on_repeat(a2, clock.now());
    event_loop.on_repeat(tacho, clock.now());
    event_loop.on_repeat(oil_alarm, clock.now());
    event_loop.on_repeat(temperature_alarm, clock.now());
    event_loop.on_repeat(AlarmIndicator::new(alarms, display, 4), clock.now());

    for _ in 0..50 {
        clock.advance(100);
        if event_loop.tick_with(&clock) > 0 && clock.now() % 1000 == 0 {
            println!("t = {} ms", clock.now());
        }
    }

    println!("\nNMEA 2000 fields after 5 s:");
    println!("  tank level:  {:?}", tank_level.get());
    println!("  oil:         {:?} Pa", oil_pressure.get());
    println!("  coolant:     {:?} K", coolant_temperature.get());
    println!("  engine:      {:?} rev/s", engine_speed.get());
    println!("  low oil:     {}", low_oil_pressure.get());
    println!("  over temp:   {}", over_temperature.get());

    println!("\nConfiguration entries:");
    let mut entries = store.entries.lock().map_err(|_| SenderError::Storage { reason: "lock poisoned" })?.clone();
    entries.sort_by_key(|e| e.sort_order);
    for entry in entries {
        println!("  {:>5}  {:<45} {}", entry.sort_order, entry.key, entry.title);
    }

    Ok(())
}
