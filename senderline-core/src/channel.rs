//! Physical Input Channels and Front-End Scaling
//!
//! The pipeline never talks to a converter directly. An ADC driver exposes
//! the two primitives the sampler needs through [`AnalogInput`]:
//!
//! ```text
//! read(channel) → raw code → raw_code_to_volts → ChannelScale → ohms / volts
//! ```
//!
//! ## Resistive senders
//!
//! HALMET drives each sender with a constant current and measures the
//! voltage across it behind a 33.3/3.3 divider:
//!
//! ```text
//! R = divider × V_adc / I
//!   = 10.09 × V_adc / 0.01 A
//! ```
//!
//! ## Faults
//!
//! Drivers signal trouble with out-of-range codes. The channel does not try
//! to interpret them; the scaled value flows on as-is.

use alloc::sync::Arc;
use fugit::MillisDurationU32;

use crate::constants::{ADC_FULL_SCALE_CODE, MEASUREMENT_CURRENT_A, VOLTAGE_DIVIDER_SCALE};

/// ADS1115 programmable gain
///
/// Ranges refer to the voltage at the ADC pin, after the board divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdcGain {
    /// ±6.144 V, 0.1875 mV/bit
    TwoThirds,
    /// ±4.096 V, 0.125 mV/bit
    #[default]
    One,
    /// ±2.048 V, 0.0625 mV/bit
    Two,
    /// ±1.024 V, 0.03125 mV/bit
    Four,
    /// ±0.512 V, 0.015625 mV/bit
    Eight,
    /// ±0.256 V, 0.0078125 mV/bit
    Sixteen,
}

impl AdcGain {
    /// Full-scale range (V)
    pub const fn full_scale_volts(&self) -> f32 {
        match self {
            AdcGain::TwoThirds => 6.144,
            AdcGain::One => 4.096,
            AdcGain::Two => 2.048,
            AdcGain::Four => 1.024,
            AdcGain::Eight => 0.512,
            AdcGain::Sixteen => 0.256,
        }
    }

    /// Convert a raw conversion code to volts at the ADC pin
    pub fn raw_code_to_volts(&self, raw: i16) -> f32 {
        raw as f32 * self.full_scale_volts() / ADC_FULL_SCALE_CODE
    }
}

/// Raw-read primitive provided by an ADC driver
///
/// Methods take `&self`: one converter is shared by every sender wired to
/// it, and the driver owns whatever bus locking it needs.
pub trait AnalogInput: Send + Sync {
    /// Single-ended conversion on `channel`
    fn read(&self, channel: u8) -> i16;

    /// Convert a code from [`read`](Self::read) to volts
    fn raw_code_to_volts(&self, raw: i16) -> f32;
}

/// Shared handle to an ADC driver
pub type SharedAnalogInput = Arc<dyn AnalogInput>;

/// Digital level primitive provided by a GPIO driver
pub trait DigitalInput: Send + Sync {
    /// Current level of `pin`
    fn is_high(&self, pin: u8) -> bool;
}

/// Shared handle to a GPIO driver
pub type SharedDigitalInput = Arc<dyn DigitalInput>;

/// Conversion from ADC pin volts to the channel's physical reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelScale {
    /// Constant-current resistive sender, reports ohms
    Resistive {
        /// Board divider ratio
        divider: f32,
        /// Excitation current (A)
        excitation_current: f32,
    },
    /// Plain voltage input, reports connector volts
    Voltage {
        /// Board divider ratio
        divider: f32,
    },
}

impl ChannelScale {
    /// Resistive sender on the reference board
    pub const fn halmet_resistive() -> Self {
        ChannelScale::Resistive {
            divider: VOLTAGE_DIVIDER_SCALE,
            excitation_current: MEASUREMENT_CURRENT_A,
        }
    }

    /// Voltage input on the reference board
    pub const fn halmet_voltage() -> Self {
        ChannelScale::Voltage {
            divider: VOLTAGE_DIVIDER_SCALE,
        }
    }

    /// Scale ADC pin volts
    pub fn apply(&self, volts: f32) -> f32 {
        match *self {
            ChannelScale::Resistive { divider, excitation_current } => {
                divider * volts / excitation_current
            }
            ChannelScale::Voltage { divider } => divider * volts,
        }
    }

    /// Unit of the scaled reading
    pub const fn unit(&self) -> &'static str {
        match self {
            ChannelScale::Resistive { .. } => "ohm",
            ChannelScale::Voltage { .. } => "V",
        }
    }
}

/// One physical analog input; immutable after construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    index: u8,
    period: MillisDurationU32,
    scale: ChannelScale,
}

impl Channel {
    /// Create a channel
    pub const fn new(index: u8, period: MillisDurationU32, scale: ChannelScale) -> Self {
        Self { index, period, scale }
    }

    /// Resistive sender channel on the reference board
    pub const fn resistive(index: u8, period_ms: u32) -> Self {
        Self::new(index, MillisDurationU32::millis(period_ms), ChannelScale::halmet_resistive())
    }

    /// Voltage channel on the reference board
    pub const fn voltage(index: u8, period_ms: u32) -> Self {
        Self::new(index, MillisDurationU32::millis(period_ms), ChannelScale::halmet_voltage())
    }

    /// ADC input index
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Sampling period
    pub fn period(&self) -> MillisDurationU32 {
        self.period
    }

    /// Front-end scaling
    pub fn scale(&self) -> ChannelScale {
        self.scale
    }
}
