//! The per-channel sample sink contract.
//!
//! Every sub-channel owns exactly one [`ChannelConsumer`]: the sink that
//! receives its demodulated sample bursts and lifecycle callbacks. The
//! forwarder drives the whole lifecycle; consumers never call back into
//! the forwarder.
//!
//! # Ordering guarantees
//!
//! For a given channel, `opened` strictly precedes any `samples` call,
//! which strictly precedes `closed`. `closed` fires exactly once per
//! successful `opened` -- with one exception: when a channel is removed
//! while its open request is still in flight, the late completion is
//! silently discarded and neither callback fires.

use num_complex::Complex32;

use crate::analyzer::Analyzer;
use crate::config::InspectorConfig;
use crate::error::Result;
use crate::types::{ChannelInfo, Handle};

/// Sink for one sub-channel's samples and lifecycle events.
pub trait ChannelConsumer {
    /// The channel's inspector is live.
    ///
    /// Invoked once per successful open, before any samples arrive. The
    /// consumer may call back into the analyzer to refine the inspector
    /// configuration (select a demodulator, shift an SSB inspector off its
    /// edge frequency, and so on).
    fn opened(
        &mut self,
        analyzer: &dyn Analyzer,
        handle: Handle,
        channel: &ChannelInfo,
        config: &InspectorConfig,
    ) -> Result<()>;

    /// A burst of demodulated samples.
    ///
    /// The buffer is only valid for the duration of the call. Must not
    /// block indefinitely; consumers that cross threads make their own
    /// hand-off arrangements.
    fn samples(&mut self, samples: &[Complex32]);

    /// The channel was shut down. Fires exactly once per `opened`.
    fn closed(&mut self);

    /// The enabled flag changed state.
    fn enable_state_changed(&mut self, enabled: bool);

    /// Current enabled state. Consumers start out enabled.
    fn is_enabled(&self) -> bool;

    /// Flip the enabled flag.
    ///
    /// Implementations store the flag and fire [`enable_state_changed`]
    /// only on actual transitions; setting the current value again is a
    /// no-op.
    ///
    /// [`enable_state_changed`]: ChannelConsumer::enable_state_changed
    fn set_enabled(&mut self, enabled: bool);
}
