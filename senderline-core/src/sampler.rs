//! Periodic raw reading producer
//!
//! One sampler per physical input. Each call to [`Sampler::sample`] performs
//! exactly one device read and one fixed scaling step. Read failures are not
//! detected here: the driver reports them as implausible codes and the
//! resulting value propagates downstream unchanged. Non-finite values are
//! counted and logged so a disconnected sender shows up in the logs.

use alloc::boxed::Box;
use fugit::MillisDurationU32;

use crate::channel::{Channel, SharedAnalogInput};

/// Where a sampler gets its reading from
enum SampleSource {
    /// ADC channel scaled by the channel's front end
    Adc {
        input: SharedAnalogInput,
        channel: Channel,
    },
    /// Driver callback that already returns engineering units
    Callback(Box<dyn FnMut() -> f32 + Send>),
}

/// Fixed-period raw reading producer
pub struct Sampler {
    source: SampleSource,
    period: MillisDurationU32,
    last: Option<f32>,
    non_finite: u32,
}

impl Sampler {
    /// Sample an ADC channel at the channel's period
    pub fn adc(input: SharedAnalogInput, channel: Channel) -> Self {
        Self {
            period: channel.period(),
            source: SampleSource::Adc { input, channel },
            last: None,
            non_finite: 0,
        }
    }

    /// Sample a driver callback at a fixed period
    pub fn from_fn<F>(period_ms: u32, read: F) -> Self
    where
        F: FnMut() -> f32 + Send + 'static,
    {
        Self {
            source: SampleSource::Callback(Box::new(read)),
            period: MillisDurationU32::millis(period_ms),
            last: None,
            non_finite: 0,
        }
    }

    /// Sampling period
    pub fn period(&self) -> MillisDurationU32 {
        self.period
    }

    /// Take one reading
    pub fn sample(&mut self) -> f32 {
        let value = match &mut self.source {
            SampleSource::Adc { input, channel } => {
                let raw = input.read(channel.index());
                let volts = input.raw_code_to_volts(raw);
                channel.scale().apply(volts)
            }
            SampleSource::Callback(read) => read(),
        };

        if !value.is_finite() {
            self.non_finite = self.non_finite.saturating_add(1);
            log_warn!("Sampler produced non-finite reading ({} so far)", self.non_finite);
        }

        self.last = Some(value);
        value
    }

    /// Most recent reading
    pub fn last(&self) -> Option<f32> {
        self.last
    }

    /// Number of non-finite readings seen
    pub fn non_finite_count(&self) -> u32 {
        self.non_finite
    }
}

impl core::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let source = match &self.source {
            SampleSource::Adc { channel, .. } => channel.index() as i16,
            SampleSource::Callback(_) => -1,
        };
        f.debug_struct("Sampler")
            .field("channel", &source)
            .field("period_ms", &self.period.to_millis())
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{AdcGain, AnalogInput, ChannelScale};
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicI16, Ordering};

    struct FixedAdc {
        code: AtomicI16,
    }

    impl AnalogInput for FixedAdc {
        fn read(&self, _channel: u8) -> i16 {
            self.code.load(Ordering::Relaxed)
        }

        fn raw_code_to_volts(&self, raw: i16) -> f32 {
            AdcGain::One.raw_code_to_volts(raw)
        }
    }

    #[test]
    fn adc_reading_is_scaled() {
        let adc = Arc::new(FixedAdc { code: AtomicI16::new(8192) });
        let channel = Channel::new(
            0,
            MillisDurationU32::millis(500),
            ChannelScale::Resistive { divider: 10.0, excitation_current: 0.01 },
        );
        let mut sampler = Sampler::adc(adc, channel);

        // 8192 codes = 1.024 V at the pin → 10 × 1.024 / 0.01 = 1024 Ω
        let ohms = sampler.sample();
        assert!((ohms - 1024.0).abs() < 1e-2, "got {}", ohms);
        assert_eq!(sampler.last(), Some(ohms));
        assert_eq!(sampler.period().to_millis(), 500);
    }

    #[test]
    fn callback_source() {
        let mut n = 0.0;
        let mut sampler = Sampler::from_fn(5000, move || {
            n += 1.0;
            n
        });
        assert_eq!(sampler.sample(), 1.0);
        assert_eq!(sampler.sample(), 2.0);
        assert_eq!(sampler.period().to_millis(), 5000);
    }

    #[test]
    fn non_finite_readings_propagate() {
        let mut sampler = Sampler::from_fn(500, || f32::NAN);
        assert!(sampler.sample().is_nan());
        assert!(sampler.sample().is_nan());
        assert_eq!(sampler.non_finite_count(), 2);
    }
}
