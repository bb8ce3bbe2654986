//! Linear scale/offset stage applied after a calibration curve
//!
//! Used to turn a tank level ratio into a volume, or to trim a sensor that
//! already reports engineering units.

use crate::config::LinearConfig;

/// `y = multiplier * x + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTransform {
    multiplier: f32,
    offset: f32,
}

impl LinearTransform {
    /// Create a transform
    pub const fn new(multiplier: f32, offset: f32) -> Self {
        Self { multiplier, offset }
    }

    /// Pass-through transform
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0)
    }

    /// Build from persisted coefficients
    pub fn from_config(config: &LinearConfig) -> Self {
        Self::new(config.multiplier, config.offset)
    }

    /// Coefficients for persistence
    pub fn to_config(&self) -> LinearConfig {
        LinearConfig {
            multiplier: self.multiplier,
            offset: self.offset,
        }
    }

    /// Scale factor
    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Additive offset
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Apply to one value
    pub fn apply(&self, x: f32) -> f32 {
        self.multiplier * x + self.offset
    }
}

impl Default for LinearTransform {
    fn default() -> Self {
        Self::identity()
    }
}
