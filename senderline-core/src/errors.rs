//! Error Types for Pipeline Assembly and Configuration Edits
//!
//! Nothing on the sampling path returns an error. A device-read fault shows
//! up as an implausible value and flows through the curve to the sinks
//! unchanged; a degraded reading is preferred over a silent sensor.
//!
//! Errors only surface at two points:
//!
//! - **Assembly**: building routers, registering configuration entries,
//!   loading persisted state.
//! - **Configuration edits**: a rejected edit leaves the previous table or
//!   coefficients in place.
//!
//! ```rust
//! use senderline_core::{CalibrationCurve, CurveKind, Sample, SenderError};
//!
//! let mut curve = CalibrationCurve::new(CurveKind::TankLevel);
//! curve.bootstrap();
//!
//! let edit = [Sample::new(0.0, 0.0), Sample::new(f32::NAN, 1.0)];
//! match curve.replace_samples(&edit) {
//!     Err(SenderError::NonFiniteSample { index }) => assert_eq!(index, 1),
//!     other => panic!("unexpected {:?}", other),
//! }
//! // Old table still answers
//! assert_eq!(curve.interpolate(180.0), 1.0);
//! ```

use thiserror_no_std::Error;

/// Result type for assembly and configuration operations
pub type SenderResult<T> = Result<T, SenderError>;

/// Pipeline errors - small and `Copy` so they can be logged and stored freely
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SenderError {
    /// A curve edit carried more samples than the table can hold
    #[error("Curve holds at most {max} samples, edit has {given}")]
    TooManySamples {
        /// Table capacity
        max: usize,
        /// Samples in the rejected edit
        given: usize,
    },

    /// A curve edit contained NaN or infinity
    #[error("Sample {index} is not a finite number")]
    NonFiniteSample {
        /// Position of the offending sample in the edit
        index: usize,
    },

    /// Router already holds the maximum number of sinks
    #[error("Router holds at most {max} sinks")]
    SinkCapacity {
        /// Router capacity
        max: usize,
    },

    /// Two configuration entries derived the same key
    #[error("Configuration key already registered")]
    KeyCollision,

    /// Persisted blob could not be encoded or decoded
    #[error("Configuration payload malformed: {reason}")]
    Serialization {
        /// What went wrong
        reason: &'static str,
    },

    /// Backing store refused a read or write
    #[error("Configuration storage failed: {reason}")]
    Storage {
        /// What went wrong
        reason: &'static str,
    },

    /// Assembly request is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

#[cfg(feature = "defmt")]
impl defmt::Format for SenderError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::TooManySamples { max, given } =>
                defmt::write!(fmt, "Curve max {} samples, got {}", max, given),
            Self::NonFiniteSample { index } =>
                defmt::write!(fmt, "Sample {} not finite", index),
            Self::SinkCapacity { max } =>
                defmt::write!(fmt, "Router max {} sinks", max),
            Self::KeyCollision =>
                defmt::write!(fmt, "Config key collision"),
            Self::Serialization { reason } =>
                defmt::write!(fmt, "Config payload: {}", reason),
            Self::Storage { reason } =>
                defmt::write!(fmt, "Config storage: {}", reason),
            Self::InvalidConfig(reason) =>
                defmt::write!(fmt, "Invalid config: {}", reason),
        }
    }
}
