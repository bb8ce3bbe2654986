//! Integration tests for sender assembly
//!
//! Drives complete pipelines from a scripted ADC through calibration curves
//! and routers into recording sinks, with configuration served from an
//! in-memory store.

#![cfg(test)]

mod common;

use std::sync::Arc;

use senderline_core::{
    channel::{AdcGain, Channel},
    config::{LinearConfig, SharedStore},
    constants::{ANALOG_READ_PERIOD_MS, MEASUREMENT_CURRENT_A, TACHO_READ_PERIOD_MS, VOLTAGE_DIVIDER_SCALE},
    curve::TableOrigin,
    sampler::Sampler,
    sender::{LinearSpec, TachoSpec},
    sink::{FieldSlot, PathMetadata},
    EventLoop, PipelineAssembler, Sample, SenderError, SenderSpec,
};

use common::{assert_close, RecordingDisplay, RecordingPublisher, ScriptedAdc, TestStore};

struct Rig {
    adc: Arc<ScriptedAdc>,
    store: Arc<TestStore>,
    publisher: Arc<RecordingPublisher>,
    display: Arc<RecordingDisplay>,
}

impl Rig {
    fn new() -> Self {
        Self {
            adc: Arc::new(ScriptedAdc::default()),
            store: Arc::new(TestStore::default()),
            publisher: Arc::new(RecordingPublisher::default()),
            display: Arc::new(RecordingDisplay::default()),
        }
    }

    fn store(&self) -> SharedStore {
        self.store.clone()
    }

    fn assembler(&self) -> PipelineAssembler {
        PipelineAssembler::new(self.store(), self.adc.clone())
            .with_signalk(self.publisher.clone())
            .with_display(self.display.clone())
    }
}

fn fuel_tank(field: &FieldSlot) -> SenderSpec {
    SenderSpec::new(Channel::resistive(0, ANALOG_READ_PERIOD_MS), "Fuel", "fuel.main", 3000)
        .with_display(2, "Tank A1", 100.0)
        .with_bus_field(field.clone())
}

#[test]
fn test_tank_sender_reaches_every_sink() {
    let rig = Rig::new();
    let level_field = FieldSlot::new();
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&level_field)).unwrap();

    rig.adc.set_ohms(0, 90.0);
    let reading = tank.tick();

    assert_close(reading.raw, 90.0, 0.1);
    assert_close(reading.value, 0.5, 1e-3);
    assert_close(reading.derived.unwrap(), 0.06, 1e-4);

    assert_close(rig.publisher.latest("tanks.fuel.main.senderResistance").unwrap(), 90.0, 0.1);
    assert_close(rig.publisher.latest("tanks.fuel.main.currentLevel").unwrap(), 0.5, 1e-3);
    assert_close(rig.publisher.latest("tanks.fuel.main.currentVolume").unwrap(), 0.06, 1e-4);
    assert_close(rig.display.number(2).unwrap(), 50.0, 0.1);
    assert_close(level_field.get().unwrap(), 0.5, 1e-3);

    let units: Vec<String> = rig.publisher.deltas().iter().map(|d| d.units.clone()).collect();
    assert_eq!(units, vec!["ohm", "ratio", "m3"]);
}

#[test]
fn test_tank_sender_registers_entries() {
    let rig = Rig::new();
    rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    let curve = rig.store.entry("/Tanks/Fuel/Level Curve").unwrap();
    assert_eq!(curve.title, "Fuel Tank Level Curve");
    assert_eq!(curve.sort_order, 3001);
    assert!(curve.description.ends_with("(Sender Resistance (ohms) to Fuel Level (ratio))"));

    let volume_path = rig.store.entry("/Tanks/Fuel/Current Volume SK Path").unwrap();
    assert_eq!(volume_path.sort_order, 3004);

    let bus = rig.store.entry("/Tanks/Fuel/NMEA 2000").unwrap();
    assert_eq!(bus.sort_order, 3005);

    for key in [
        "/Tanks/Fuel/Resistance/SK Path",
        "/Tanks/Fuel/Current Level SK Path",
        "/Tanks/Fuel/Total Volume",
        "/Senders/Fuel/Outputs",
    ] {
        assert!(rig.store.entry(key).is_some(), "missing {}", key);
    }
}

#[test]
fn test_disabled_output_leaves_other_sinks_unchanged() {
    let enabled = Rig::new();
    let disabled = Rig::new();
    disabled.store.put(
        "/Senders/Fuel/Outputs",
        r#"{"resistance":{"signalk":false},"reading":{"signalk":false},"derived":{"signalk":false}}"#,
    );

    let mut a = enabled.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();
    let mut b = disabled.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    for ohms in [0.0, 45.0, 133.0, 500.0] {
        enabled.adc.set_ohms(0, ohms);
        disabled.adc.set_ohms(0, ohms);
        a.tick();
        b.tick();
        assert_eq!(enabled.display.number(2), disabled.display.number(2));
    }

    assert!(disabled.publisher.deltas().is_empty());
    assert!(b.resistance_router().is_empty());
    assert_eq!(b.level_router().len(), 2);
    assert!(disabled.store.entry("/Tanks/Fuel/Current Level SK Path").is_none());
}

#[test]
fn test_volume_outputs_toggle_independently() {
    let enabled = Rig::new();
    let no_volume = Rig::new();
    no_volume.store.put("/Senders/Fuel/Outputs", r#"{"derived":{"signalk":false}}"#);

    let mut a = enabled.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();
    let mut b = no_volume.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    for ohms in [20.0, 90.0, 175.0] {
        enabled.adc.set_ohms(0, ohms);
        no_volume.adc.set_ohms(0, ohms);
        a.tick();
        b.tick();
        assert_eq!(
            enabled.publisher.latest("tanks.fuel.main.currentLevel"),
            no_volume.publisher.latest("tanks.fuel.main.currentLevel")
        );
    }

    assert_eq!(
        no_volume.publisher.paths(),
        vec!["tanks.fuel.main.currentLevel", "tanks.fuel.main.senderResistance"]
    );
    assert!(b.derived_router().unwrap().is_empty());
    assert_eq!(b.level_router().len(), a.level_router().len());
    assert!(no_volume.store.entry("/Tanks/Fuel/Current Volume SK Path").is_none());
    assert!(no_volume.store.entry("/Tanks/Fuel/Total Volume").is_some());
}

#[test]
fn test_resistance_path_can_be_dropped() {
    let rig = Rig::new();
    rig.store.put("/Senders/Fuel/Outputs", r#"{"resistance":{"signalk":false}}"#);
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    rig.adc.set_ohms(0, 90.0);
    tank.tick();

    assert!(tank.resistance_router().is_empty());
    assert_eq!(tank.derived_router().unwrap().len(), 1);
    assert_eq!(
        rig.publisher.paths(),
        vec!["tanks.fuel.main.currentLevel", "tanks.fuel.main.currentVolume"]
    );
}

#[test]
fn test_missing_collaborators_are_omitted() {
    let rig = Rig::new();
    let assembler = PipelineAssembler::new(rig.store(), rig.adc.clone());
    let tank = assembler.connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    // Only the bus field survives without Signal K and display
    assert!(tank.resistance_router().is_empty());
    assert_eq!(tank.level_router().len(), 1);
    assert!(tank.derived_router().unwrap().is_empty());
}

#[test]
fn test_persisted_curve_wins_over_default() {
    let rig = Rig::new();
    rig.store.put(
        "/Tanks/Fuel/Level Curve",
        r#"{"samples":[{"input":240.0,"output":1.0},{"input":0.0,"output":0.0}]}"#,
    );
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();
    assert_eq!(tank.curve().origin(), TableOrigin::Persisted);

    rig.adc.set_ohms(0, 120.0);
    assert_close(tank.tick().value, 0.5, 1e-3);
}

#[test]
fn test_malformed_curve_falls_back_to_default() {
    let rig = Rig::new();
    rig.store.put("/Tanks/Fuel/Level Curve", "not json");
    let tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    assert_eq!(tank.curve().origin(), TableOrigin::Default);
    assert_eq!(tank.curve().samples().len(), 3);
}

#[test]
fn test_curve_edit_is_persisted_sorted() {
    let rig = Rig::new();
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    tank.apply_curve_edit(&[Sample::new(200.0, 1.0), Sample::new(0.0, 0.0)]).unwrap();

    let blob = rig.store.blob("/Tanks/Fuel/Level Curve").unwrap();
    assert_eq!(
        blob,
        r#"{"samples":[{"input":0.0,"output":0.0},{"input":200.0,"output":1.0}]}"#
    );

    rig.adc.set_ohms(0, 50.0);
    assert_close(tank.tick().value, 0.25, 1e-3);
}

#[test]
fn test_cleared_curve_reseeds_on_next_read() {
    let rig = Rig::new();
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    tank.apply_curve_edit(&[]).unwrap();
    assert!(!tank.curve().is_seeded());

    rig.adc.set_ohms(0, 90.0);
    assert_close(tank.tick().value, 0.5, 1e-3);
    assert_eq!(tank.curve().origin(), TableOrigin::Default);
}

#[test]
fn test_rejected_edit_keeps_previous_table() {
    let rig = Rig::new();
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();
    let before = tank.curve().samples().to_vec();

    let result = tank.apply_curve_edit(&[Sample::new(0.0, 0.0), Sample::new(f32::INFINITY, 1.0)]);
    assert_eq!(result, Err(SenderError::NonFiniteSample { index: 1 }));
    assert_eq!(tank.curve().samples(), before.as_slice());
    assert!(rig.store.blob("/Tanks/Fuel/Level Curve").is_none());
}

#[test]
fn test_unpersisted_curve_edit_keeps_previous_table() {
    let rig = Rig::new();
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();
    let before = tank.curve().samples().to_vec();
    rig.store.refuse_saves();

    let result = tank.apply_curve_edit(&[Sample::new(0.0, 0.0), Sample::new(500.0, 1.0)]);

    assert_eq!(result, Err(SenderError::Storage { reason: "disk full" }));
    assert_eq!(tank.curve().samples(), before.as_slice());
    assert_eq!(tank.curve().origin(), TableOrigin::Default);

    rig.adc.set_ohms(0, 90.0);
    assert_close(tank.tick().value, 0.5, 1e-3);
}

#[test]
fn test_unpersisted_transform_edit_keeps_coefficients() {
    let rig = Rig::new();
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();
    rig.store.refuse_saves();

    assert!(tank.apply_transform_edit(LinearConfig { multiplier: 0.2, offset: 0.0 }).is_err());
    assert_eq!(tank.transform().unwrap().multiplier(), 0.12);

    rig.adc.set_ohms(0, 90.0);
    assert_close(tank.tick().derived.unwrap(), 0.06, 1e-4);
}

#[test]
fn test_volume_transform_edit() {
    let rig = Rig::new();
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    tank.apply_transform_edit(LinearConfig { multiplier: 0.2, offset: 0.0 }).unwrap();
    rig.adc.set_ohms(0, 90.0);
    assert_close(tank.tick().derived.unwrap(), 0.1, 1e-3);
    assert!(rig.store.blob("/Tanks/Fuel/Total Volume").is_some());
}

#[test]
fn test_engine_senders() {
    let rig = Rig::new();
    let assembler = rig.assembler();

    let temperature = SenderSpec::new(Channel::resistive(3, ANALOG_READ_PERIOD_MS), "Engine Temperature", "temperature", 1000);
    let oil = SenderSpec::new(Channel::resistive(2, ANALOG_READ_PERIOD_MS), "Engine Oil Pressure", "oilPressure", 1000);

    let mut coolant = assembler.connect_engine_temperature_sender(&temperature).unwrap();
    let mut pressure = assembler.connect_oil_pressure_sender(&oil).unwrap();

    rig.adc.set_ohms(3, 23.0);
    rig.adc.set_ohms(2, 200.0);
    let t = coolant.tick();
    let p = pressure.tick();

    assert_close(t.value, 393.15, 0.5);
    assert_eq!(t.derived, None);
    assert_eq!(p.value, 0.0);

    assert!(rig.publisher.latest("propulsion.1.temperature").is_some());
    assert!(rig.publisher.latest("propulsion.1.temperature.senderResistance").is_some());
    assert_eq!(rig.publisher.latest("propulsion.1.oilPressure"), Some(0.0));

    let entry = rig.store.entry("/propulsion/Engine Oil Pressure/Linear Curve").unwrap();
    assert_eq!(entry.title, "Engine Oil Pressure Level Curve");
    assert!(rig.store.entry("/Engine Temperature/Current Level SK Path").is_some());

    assert_eq!(
        coolant.apply_transform_edit(LinearConfig::default()),
        Err(SenderError::InvalidConfig("sender has no derived stage"))
    );
}

#[test]
fn test_duplicate_sender_is_refused() {
    let rig = Rig::new();
    let assembler = rig.assembler();
    let spec = fuel_tank(&FieldSlot::new());

    assembler.connect_tank_sender(&spec).unwrap();
    assert!(matches!(
        assembler.connect_tank_sender(&spec),
        Err(SenderError::KeyCollision)
    ));
}

#[test]
fn test_device_fault_propagates() {
    let rig = Rig::new();
    let mut tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();

    // Open circuit drives the ADC to full scale
    rig.adc.set_code(0, i16::MAX);
    let reading = tank.tick();

    let full_scale = VOLTAGE_DIVIDER_SCALE * AdcGain::One.raw_code_to_volts(i16::MAX) / MEASUREMENT_CURRENT_A;
    assert_close(reading.raw, full_scale, 0.5);
    assert!(reading.raw > 4_000.0);
    assert_eq!(reading.value, 1.0);
    assert_eq!(rig.publisher.latest("tanks.fuel.main.senderResistance"), Some(reading.raw));
}

#[test]
fn test_event_loop_drives_senders() {
    let rig = Rig::new();
    let tank = rig.assembler().connect_tank_sender(&fuel_tank(&FieldSlot::new())).unwrap();
    rig.adc.set_ohms(0, 180.0);

    let mut event_loop = EventLoop::new();
    event_loop.on_repeat(tank, 0);

    assert_eq!(event_loop.tick(499), 0);
    assert!(rig.publisher.deltas().is_empty());

    assert_eq!(event_loop.tick(500), 1);
    assert_close(rig.publisher.latest("tanks.fuel.main.currentLevel").unwrap(), 1.0, 1e-3);

    event_loop.tick(1_000);
    assert_eq!(rig.publisher.deltas().len(), 6);
}

#[test]
fn test_linear_sender() {
    let rig = Rig::new();
    let spec = LinearSpec {
        name: "Engine_Room_Temperature".into(),
        sk_path: "propulsion.engineRoom.temperature".into(),
        metadata: PathMetadata {
            units: "K".into(),
            display_name: "Engine room temperature".into(),
            description: "Engine room air temperature".into(),
        },
        calibration: LinearConfig { multiplier: 1.0, offset: 273.15 },
        sort_order: 400,
    };

    let mut room = rig
        .assembler()
        .connect_linear_sender(&spec, Sampler::from_fn(5000, || 20.0))
        .unwrap();

    assert_close(room.tick(), 293.15, 1e-3);
    assert_close(rig.publisher.latest("propulsion.engineRoom.temperature").unwrap(), 293.15, 1e-3);
    assert!(rig.store.entry("/Engine_Room_Temperature/linear").is_some());
    assert!(rig.store.entry("/Engine_Room_Temperature/skPath").is_some());

    room.apply_transform_edit(LinearConfig { multiplier: 1.0, offset: 274.15 }).unwrap();
    assert_close(room.tick(), 294.15, 1e-3);

    rig.store.refuse_saves();
    assert!(room.apply_transform_edit(LinearConfig { multiplier: 2.0, offset: 0.0 }).is_err());
    assert_close(room.tick(), 294.15, 1e-3);
}

#[test]
fn test_linear_sender_on_voltage_channel() {
    let rig = Rig::new();
    let spec = LinearSpec {
        name: "Voltage A2".into(),
        sk_path: "sensors.a2.voltage".into(),
        metadata: PathMetadata {
            units: "V".into(),
            display_name: "Analog Voltage A2".into(),
            description: "Voltage level of analog input A2".into(),
        },
        calibration: LinearConfig::default(),
        sort_order: 500,
    };
    let sampler = Sampler::adc(rig.adc.clone(), Channel::voltage(1, ANALOG_READ_PERIOD_MS));
    let mut a2 = rig.assembler().connect_linear_sender(&spec, sampler).unwrap();

    rig.adc.set_code(1, 9_600);
    let expected = VOLTAGE_DIVIDER_SCALE * AdcGain::One.raw_code_to_volts(9_600);

    assert_close(a2.tick(), expected, 1e-3);
    assert_close(rig.publisher.latest("sensors.a2.voltage").unwrap(), expected, 1e-3);
}

#[test]
fn test_tacho_sender() {
    let rig = Rig::new();
    let engine_speed = FieldSlot::new();
    let spec = TachoSpec::new("1", "main", 3015)
        .with_display(3, "RPM D1")
        .with_bus_field(engine_speed.clone());

    let mut tacho = rig
        .assembler()
        .connect_tacho_sender(&spec, Sampler::from_fn(TACHO_READ_PERIOD_MS, || 25.0))
        .unwrap();

    assert_eq!(tacho.router().len(), 3);
    assert_close(tacho.tick(), 25.0, 1e-4);
    assert_close(rig.display.number(3).unwrap(), 1500.0, 1e-2);
    assert_close(engine_speed.get().unwrap(), 25.0, 1e-4);

    let delta = rig.publisher.deltas().pop().unwrap();
    assert_eq!(delta.path, "propulsion.main.revolutions");
    assert_eq!(delta.units, "Hz");

    assert_eq!(rig.store.entry("/Tacho 1/Revolution Multiplier").unwrap().sort_order, 3016);
    assert_eq!(rig.store.entry("/Tacho 1/Revolutions SK Path").unwrap().sort_order, 3017);
    assert!(rig.store.entry("/Senders/1/Outputs").is_some());

    // Two pulses per revolution
    tacho.apply_transform_edit(LinearConfig { multiplier: 0.5, offset: 0.0 }).unwrap();
    assert_close(tacho.tick(), 12.5, 1e-4);
    assert_close(rig.display.number(3).unwrap(), 750.0, 1e-2);
    assert!(rig.store.blob("/Tacho 1/Revolution Multiplier").is_some());
}

#[test]
fn test_tacho_display_can_be_switched_off() {
    let rig = Rig::new();
    rig.store.put("/Senders/1/Outputs", r#"{"reading":{"display":false}}"#);
    let spec = TachoSpec::new("1", "main", 3015).with_display(3, "RPM D1");

    let mut tacho = rig
        .assembler()
        .connect_tacho_sender(&spec, Sampler::from_fn(TACHO_READ_PERIOD_MS, || 25.0))
        .unwrap();
    tacho.tick();

    assert_eq!(tacho.router().len(), 1);
    assert_eq!(rig.display.number(3), None);
    assert_eq!(rig.publisher.latest("propulsion.main.revolutions"), Some(25.0));
}
