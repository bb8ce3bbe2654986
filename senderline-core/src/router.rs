//! Fan-out of one value stream to a fixed set of sinks
//!
//! The sink set is decided once, at assembly, from the persisted output
//! toggles. After [`RouterBuilder::build`] it never changes; enabling or
//! disabling an output takes effect on the next restart.
//!
//! ```text
//!            ┌─▶ DisplaySink
//! value ─────┼─▶ SignalKSink
//!            └─▶ BusFieldSink
//! ```
//!
//! Every enabled sink receives every value in insertion order. Sinks share
//! nothing with each other, so one sink's behaviour never changes what the
//! others receive.

use heapless::Vec;

use crate::{
    constants::MAX_SINKS,
    errors::{SenderError, SenderResult},
    sink::{OutputSink, Sink},
};

/// Immutable fan-out to every enabled sink
#[derive(Clone, Default)]
pub struct OutputRouter {
    sinks: Vec<OutputSink, MAX_SINKS>,
}

impl OutputRouter {
    /// Router with no sinks; values are dropped
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a router
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Deliver `value` to every sink, in insertion order
    pub fn push(&self, value: f32) {
        for sink in self.sinks.iter() {
            sink.accept(value);
        }
    }

    /// Number of enabled sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True when no sink is enabled
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Enabled sinks, in delivery order
    pub fn sinks(&self) -> &[OutputSink] {
        &self.sinks
    }
}

impl core::fmt::Debug for OutputRouter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut list = f.debug_list();
        for sink in self.sinks.iter() {
            list.entry(&sink.name());
        }
        list.finish()
    }
}

/// Builder for [`OutputRouter`]
#[derive(Default)]
pub struct RouterBuilder {
    sinks: Vec<OutputSink, MAX_SINKS>,
}

impl RouterBuilder {
    /// Start with no sinks
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sink
    pub fn with(mut self, sink: impl Into<OutputSink>) -> SenderResult<Self> {
        self.sinks
            .push(sink.into())
            .map_err(|_| SenderError::SinkCapacity { max: MAX_SINKS })?;
        Ok(self)
    }

    /// Append a sink if one was built
    pub fn with_opt<S: Into<OutputSink>>(self, sink: Option<S>) -> SenderResult<Self> {
        match sink {
            Some(sink) => self.with(sink),
            None => Ok(self),
        }
    }

    /// Append a sink only when its output is enabled
    ///
    /// `make` is not called for a disabled output, so nothing is built or
    /// registered for it.
    pub fn with_if<S, F>(self, enabled: bool, make: F) -> SenderResult<Self>
    where
        S: Into<OutputSink>,
        F: FnOnce() -> S,
    {
        if enabled {
            self.with(make())
        } else {
            Ok(self)
        }
    }

    /// Freeze the sink set
    pub fn build(self) -> OutputRouter {
        OutputRouter { sinks: self.sinks }
    }
}
