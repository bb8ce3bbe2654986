//! Board Constants and Default Sensor Parameters
//!
//! Values match the HALMET reference board: an ADS1115 behind a 33.3/3.3
//! voltage divider, with a constant-current source driving resistive senders.

// ===== ANALOG FRONT END =====

/// Constant measurement current pushed through a resistive sender (A).
pub const MEASUREMENT_CURRENT_A: f32 = 0.01;

/// Input voltage divider between the connector and the ADC pin.
///
/// The ADC sees 3.3/33.3 of the connector voltage, so readings are scaled
/// back up by this factor.
pub const VOLTAGE_DIVIDER_SCALE: f32 = 33.3 / 3.3;

/// Full-scale ADC code magnitude for a 16-bit signed converter.
pub const ADC_FULL_SCALE_CODE: f32 = 32768.0;

// ===== TANKS =====

/// Default fuel tank size (m³).
pub const TANK_DEFAULT_SIZE_M3: f32 = 120.0 / 1000.0;

// ===== ENGINE =====

/// Display scale from revolutions per second to RPM.
pub const RPM_PER_HZ: f32 = 60.0;

// ===== SAMPLING PERIODS =====

/// Period for resistive sender reads (ms).
pub const ANALOG_READ_PERIOD_MS: u32 = 500;

/// Gate period of the tacho pulse counter (ms).
pub const TACHO_READ_PERIOD_MS: u32 = 500;

/// Period for 1-Wire temperature sensors (ms).
pub const ONEWIRE_READ_PERIOD_MS: u32 = 1000;

/// Period for the engine room temperature sensor (ms).
pub const ROOM_TEMPERATURE_PERIOD_MS: u32 = 5000;

/// Period for the engine room barometric pressure sensor (ms).
pub const ROOM_PRESSURE_PERIOD_MS: u32 = 60_000;

/// Period for digital alarm input polling (ms).
pub const ALARM_POLL_PERIOD_MS: u32 = 100;

/// Period for refreshing display status rows (ms).
pub const DISPLAY_REFRESH_PERIOD_MS: u32 = 1000;

// ===== CAPACITIES =====

/// Maximum samples in one calibration curve.
pub const MAX_CURVE_SAMPLES: usize = 32;

/// Maximum sinks attached to one router.
pub const MAX_SINKS: usize = 8;

/// Maximum boolean bus fields driven by one alarm input.
pub const MAX_ALARM_FLAGS: usize = 4;

/// Number of alarm slots shown on the display alarm row.
pub const DISPLAY_ALARM_SLOTS: usize = 4;
