//! Demodulator-configuring sample sink.
//!
//! [`DemodSink`] is the repository's concrete [`ChannelConsumer`]: on open
//! it programs the analyzer-side inspector for its demodulator (audio
//! rate, cutoff, demodulator code) and corrects the well-known SSB center
//! offset, then forwards every sample burst to a caller-supplied handler
//! while enabled. What happens to the samples downstream (a PUB socket, a
//! file, a soundcard) is the handler's business.

use num_complex::Complex32;

use chanfwd_core::analyzer::Analyzer;
use chanfwd_core::config::InspectorConfig;
use chanfwd_core::consumer::ChannelConsumer;
use chanfwd_core::error::Result;
use chanfwd_core::types::{ChannelInfo, DemodKind, Handle};

/// Audio inspector demodulator codes (`audio.demodulator` config values).
pub const AUDIO_DEMOD_DISABLED: u64 = 0;
/// Amplitude modulation.
pub const AUDIO_DEMOD_AM: u64 = 1;
/// Frequency modulation.
pub const AUDIO_DEMOD_FM: u64 = 2;
/// Upper sideband.
pub const AUDIO_DEMOD_USB: u64 = 3;
/// Lower sideband.
pub const AUDIO_DEMOD_LSB: u64 = 4;

fn demod_code(demod: DemodKind) -> u64 {
    match demod {
        DemodKind::Raw => AUDIO_DEMOD_DISABLED,
        DemodKind::AudioAm => AUDIO_DEMOD_AM,
        DemodKind::AudioFm => AUDIO_DEMOD_FM,
        DemodKind::AudioUsb => AUDIO_DEMOD_USB,
        DemodKind::AudioLsb => AUDIO_DEMOD_LSB,
    }
}

/// Callback invoked with every forwarded sample burst.
pub type SampleHandler = Box<dyn FnMut(&[Complex32])>;

/// A [`ChannelConsumer`] that configures the inspector for its demodulator
/// and forwards bursts to a handler.
pub struct DemodSink {
    demod: DemodKind,
    samp_rate: f64,
    enabled: bool,
    handler: Option<SampleHandler>,
}

impl DemodSink {
    /// Create a sink for the given demodulator.
    ///
    /// `audio_rate` is the requested audio output rate in samples per
    /// second; for raw channels it is replaced by the analyzer-reported
    /// equivalent rate at open time.
    pub fn new(demod: DemodKind, audio_rate: f64) -> Self {
        DemodSink {
            demod,
            samp_rate: audio_rate,
            enabled: true,
            handler: None,
        }
    }

    /// Attach a burst handler.
    pub fn with_handler(mut self, handler: SampleHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Effective output sample rate in samples per second.
    pub fn sample_rate(&self) -> f64 {
        self.samp_rate
    }
}

impl ChannelConsumer for DemodSink {
    fn opened(
        &mut self,
        analyzer: &dyn Analyzer,
        handle: Handle,
        channel: &ChannelInfo,
        config: &InspectorConfig,
    ) -> Result<()> {
        tracing::debug!(channel = %channel.name, %handle, rate = channel.samp_rate, "sink opened");

        if self.demod == DemodKind::Raw {
            self.samp_rate = channel.samp_rate;
            return Ok(());
        }

        let mut new_config = config.clone();
        new_config.set_uint("audio.sample-rate", self.samp_rate as u64);
        new_config.set_float("audio.cutoff", self.samp_rate);
        // Volume is handled downstream; keep the inspector at unity.
        new_config.set_float("audio.volume", 1.0);
        new_config.set_uint("audio.demodulator", demod_code(self.demod));

        // The center frequency of sideband inspectors is off by half the
        // filter width; correct it from the channel bandwidth.
        match self.demod {
            DemodKind::AudioUsb => {
                analyzer.set_inspector_freq(handle, channel.offset + 0.5 * channel.bandwidth)?;
            }
            DemodKind::AudioLsb => {
                analyzer.set_inspector_freq(handle, channel.offset - 0.5 * channel.bandwidth)?;
            }
            _ => {}
        }

        analyzer.set_inspector_config(handle, &new_config)?;
        Ok(())
    }

    fn samples(&mut self, samples: &[Complex32]) {
        if !self.enabled {
            return;
        }
        if let Some(handler) = &mut self.handler {
            handler(samples);
        }
    }

    fn closed(&mut self) {
        tracing::debug!(demod = %self.demod, "sink closed");
    }

    fn enable_state_changed(&mut self, _enabled: bool) {}

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.enable_state_changed(enabled);
        }
    }
}
