//! Sender interpretation pipeline for marine engine and tank monitoring
//!
//! Turns raw analog samples from resistive senders (fuel level, engine
//! temperature, oil pressure) into calibrated physical quantities and fans
//! them out to independently enabled sinks (local display, Signal K paths,
//! NMEA 2000 message fields).
//!
//! ```text
//! Sampler → CalibrationCurve → [LinearTransform] → OutputRouter → {sinks}
//!    ↓
//! OutputRouter (sender resistance, optional)
//! ```
//!
//! Key constraints:
//! - Single-threaded cooperative scheduling, nothing in a tick blocks
//! - Bounded tables (`heapless`), no allocation in the hot path
//! - A degraded reading is always preferred over halting the pipeline
//!
//! ```no_run
//! use senderline_core::curve::{CalibrationCurve, CurveKind};
//!
//! let mut level = CalibrationCurve::new(CurveKind::TankLevel);
//! level.bootstrap();
//! assert_eq!(level.interpolate(90.0), 0.5);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod alarm;
pub mod channel;
pub mod config;
pub mod constants;
pub mod curve;
pub mod errors;
pub mod router;
pub mod sampler;
pub mod scheduler;
pub mod sender;
pub mod sink;
pub mod time;
pub mod transform;

// Public API
pub use errors::{SenderError, SenderResult};
pub use curve::{CalibrationCurve, CurveKind, Sample};
pub use transform::LinearTransform;
pub use router::{OutputRouter, RouterBuilder};
pub use sink::{OutputSink, Sink};
pub use sender::{PipelineAssembler, SenderPipeline, SenderSpec};
pub use scheduler::{EventLoop, Periodic};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
