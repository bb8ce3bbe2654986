//! Digital alarm inputs and the shared alarm state
//!
//! A small set of boolean alarm signals is shared between the digital input
//! pollers that write them and the display task that renders them. Each slot
//! is an independent atomic; writers never coordinate with each other.
//!
//! ```text
//! D2 ──▶ AlarmInput ──┬─▶ AlarmStates[1] ──▶ AlarmIndicator ("_*__")
//!                     └─▶ FlagSlot (engine status: low oil pressure)
//! ```

use alloc::{string::String, sync::Arc};
use core::sync::atomic::{AtomicBool, Ordering};
use fugit::MillisDurationU32;
use heapless::Vec;

use crate::{
    channel::SharedDigitalInput,
    constants::{ALARM_POLL_PERIOD_MS, DISPLAY_REFRESH_PERIOD_MS, MAX_ALARM_FLAGS},
    errors::{SenderError, SenderResult},
    scheduler::Periodic,
    sink::{DisplayPort, DisplayValue, FlagSlot},
    time::Timestamp,
};

/// `N` shared alarm signals
#[derive(Debug, Clone)]
pub struct AlarmStates<const N: usize> {
    flags: Arc<[AtomicBool; N]>,
}

impl<const N: usize> AlarmStates<N> {
    /// All signals cleared
    pub fn new() -> Self {
        Self {
            flags: Arc::new(core::array::from_fn(|_| AtomicBool::new(false))),
        }
    }

    /// Number of signals
    pub const fn len(&self) -> usize {
        N
    }

    /// True when there are no signals
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Set one signal; returns `false` for an index out of range
    pub fn set(&self, index: usize, active: bool) -> bool {
        match self.flags.get(index) {
            Some(flag) => {
                flag.store(active, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Read one signal; out-of-range indices read as inactive
    pub fn get(&self, index: usize) -> bool {
        self.flags
            .get(index)
            .map(|flag| flag.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// True if any signal is active
    pub fn any(&self) -> bool {
        self.flags.iter().any(|flag| flag.load(Ordering::Acquire))
    }

    /// Render as `*` (active) / `_` (inactive), one character per signal
    pub fn indicator(&self) -> String {
        self.flags
            .iter()
            .map(|flag| if flag.load(Ordering::Acquire) { '*' } else { '_' })
            .collect()
    }
}

impl<const N: usize> Default for AlarmStates<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Polled digital alarm input
///
/// Reads one pin per period, applies the optional inversion and writes the
/// result to its alarm slot and every attached bus flag.
pub struct AlarmInput<const N: usize> {
    input: SharedDigitalInput,
    pin: u8,
    inverted: bool,
    states: AlarmStates<N>,
    slot: usize,
    flags: Vec<FlagSlot, MAX_ALARM_FLAGS>,
    period: MillisDurationU32,
}

impl<const N: usize> AlarmInput<N> {
    /// Poll `pin` into `states[slot]`
    pub fn new(
        input: SharedDigitalInput,
        pin: u8,
        states: AlarmStates<N>,
        slot: usize,
    ) -> SenderResult<Self> {
        if slot >= N {
            return Err(SenderError::InvalidConfig("alarm slot out of range"));
        }
        Ok(Self {
            input,
            pin,
            inverted: false,
            states,
            slot,
            flags: Vec::new(),
            period: MillisDurationU32::millis(ALARM_POLL_PERIOD_MS),
        })
    }

    /// Treat a low level as the active state
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// Also mirror the alarm into a bus flag
    pub fn with_flag(mut self, flag: FlagSlot) -> SenderResult<Self> {
        self.flags
            .push(flag)
            .map_err(|_| SenderError::InvalidConfig("too many flags on one alarm input"))?;
        Ok(self)
    }

    /// Read the pin once and publish the result
    pub fn poll(&self) -> bool {
        let active = self.input.is_high(self.pin) != self.inverted;
        self.states.set(self.slot, active);
        for flag in self.flags.iter() {
            flag.set(active);
        }
        active
    }
}

impl<const N: usize> Periodic for AlarmInput<N> {
    fn period(&self) -> MillisDurationU32 {
        self.period
    }

    fn run(&mut self, _now: Timestamp) {
        self.poll();
    }

    fn name(&self) -> &'static str {
        "alarm input"
    }
}

/// Display row showing the alarm indicator string
pub struct AlarmIndicator<const N: usize> {
    states: AlarmStates<N>,
    port: Arc<dyn DisplayPort>,
    row: u8,
}

impl<const N: usize> AlarmIndicator<N> {
    /// Render `states` on `row`
    pub fn new(states: AlarmStates<N>, port: Arc<dyn DisplayPort>, row: u8) -> Self {
        Self { states, port, row }
    }

    /// Write the current indicator
    pub fn refresh(&self) {
        let text = self.states.indicator();
        self.port.write_line(self.row, "Alarm", DisplayValue::Text(&text));
    }
}

impl<const N: usize> Periodic for AlarmIndicator<N> {
    fn period(&self) -> MillisDurationU32 {
        MillisDurationU32::millis(DISPLAY_REFRESH_PERIOD_MS)
    }

    fn run(&mut self, _now: Timestamp) {
        self.refresh();
    }

    fn name(&self) -> &'static str {
        "alarm indicator"
    }
}
