//! Integration tests: registry-backed pipelines across restarts

#![cfg(test)]

use std::sync::Arc;

use senderline_config::{Backend, ConfigRegistry, JsonFileBackend, MemoryBackend};
use senderline_core::{
    channel::{AdcGain, AnalogInput, Channel},
    config::{ConfigStore, CurveConfig, LinearConfig, SharedStore},
    constants::ANALOG_READ_PERIOD_MS,
    curve::TableOrigin,
    PipelineAssembler, Sample, SenderError, SenderSpec,
};

/// ADC pinned at 760 codes (≈ 96 Ω on a resistive channel)
struct SteadyAdc;

impl AnalogInput for SteadyAdc {
    fn read(&self, _channel: u8) -> i16 {
        760
    }

    fn raw_code_to_volts(&self, raw: i16) -> f32 {
        AdcGain::One.raw_code_to_volts(raw)
    }
}

fn fuel() -> SenderSpec {
    SenderSpec::new(Channel::resistive(0, ANALOG_READ_PERIOD_MS), "Fuel", "fuel.main", 3000)
}

fn assembler(store: SharedStore) -> PipelineAssembler {
    PipelineAssembler::new(store, Arc::new(SteadyAdc))
}

#[test]
fn test_edits_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("senderline.json");

    {
        let registry = Arc::new(ConfigRegistry::open(JsonFileBackend::new(&path)).unwrap());
        let mut tank = assembler(registry.clone()).connect_tank_sender(&fuel()).unwrap();
        assert_eq!(tank.curve().origin(), TableOrigin::Default);

        tank.apply_curve_edit(&[Sample::new(0.0, 0.0), Sample::new(240.0, 1.0)]).unwrap();
        tank.apply_transform_edit(LinearConfig { multiplier: 0.2, offset: 0.0 }).unwrap();
    }

    let registry = Arc::new(ConfigRegistry::open(JsonFileBackend::new(&path)).unwrap());
    let mut tank = assembler(registry.clone()).connect_tank_sender(&fuel()).unwrap();

    assert_eq!(tank.curve().origin(), TableOrigin::Persisted);
    assert_eq!(tank.curve().samples().len(), 2);
    assert_eq!(tank.transform().unwrap().multiplier(), 0.2);

    let reading = tank.tick();
    assert!((reading.value - reading.raw / 240.0).abs() < 1e-4);
}

#[test]
fn test_file_document_is_readable_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("senderline.json");
    let registry = ConfigRegistry::open(JsonFileBackend::new(&path)).unwrap();

    registry
        .set("/Tanks/Fuel/Level Curve", &CurveConfig { samples: vec![Sample::new(0.0, 0.0)] })
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let document: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(document["/Tanks/Fuel/Level Curve"]["samples"][0]["input"], 0.0);
}

#[test]
fn test_memory_backend_reopen() {
    let backend = MemoryBackend::new();
    ConfigRegistry::open(&backend).unwrap().set("/Fuel/linear", &LinearConfig::default()).unwrap();

    let reopened = ConfigRegistry::open(&backend).unwrap();
    assert_eq!(reopened.get::<LinearConfig>("/Fuel/linear").unwrap(), Some(LinearConfig::default()));
    assert_eq!(backend.load().unwrap().len(), 1);
}

#[test]
fn test_registry_lists_sender_entries_in_ui_order() {
    let registry = Arc::new(ConfigRegistry::in_memory());
    let assembler = assembler(registry.clone());

    assembler
        .connect_oil_pressure_sender(&SenderSpec::new(
            Channel::resistive(2, ANALOG_READ_PERIOD_MS),
            "Engine Oil Pressure",
            "oilPressure",
            1000,
        ))
        .unwrap();
    assembler.connect_tank_sender(&fuel()).unwrap();

    let entries = registry.entries().unwrap();
    let orders: Vec<i32> = entries.iter().map(|e| e.sort_order).collect();
    let mut sorted = orders.clone();
    sorted.sort();
    assert_eq!(orders, sorted);

    let first = &entries[0];
    assert_eq!(first.key, "/propulsion/Engine Oil Pressure/Linear Curve");
    assert_eq!(first.sort_order, 1001);
}

#[test]
fn test_second_sender_with_same_name_is_refused() {
    let registry = Arc::new(ConfigRegistry::in_memory());
    let assembler = assembler(registry.clone());

    assembler.connect_tank_sender(&fuel()).unwrap();
    assert_eq!(
        assembler.connect_tank_sender(&fuel()).err(),
        Some(SenderError::KeyCollision)
    );
}

#[test]
fn test_malformed_blob_is_rejected_by_store() {
    let registry = ConfigRegistry::in_memory();
    assert!(registry.save_blob("/Tanks/Fuel/Level Curve", "[1, 2").is_err());
    assert!(registry.load_blob("/Tanks/Fuel/Level Curve").unwrap().is_none());
}
