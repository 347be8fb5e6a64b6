//! Recording consumer for asserting on channel lifecycle callbacks.
//!
//! [`RecordingConsumer`] implements [`ChannelConsumer`] by appending every
//! callback to a shared log. The forwarder takes ownership of the consumer
//! itself, so [`RecordingConsumer::new`] hands the test a [`ConsumerLog`]
//! that keeps observing after the hand-off.

use std::cell::RefCell;
use std::rc::Rc;

use num_complex::Complex32;

use chanfwd_core::analyzer::Analyzer;
use chanfwd_core::config::InspectorConfig;
use chanfwd_core::consumer::ChannelConsumer;
use chanfwd_core::error::Result;
use chanfwd_core::types::{ChannelInfo, Handle};

/// One recorded consumer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerEvent {
    /// `opened` fired.
    Opened {
        /// The channel's new handle.
        handle: Handle,
        /// Equivalent sample rate reported at open time.
        samp_rate: f64,
    },
    /// `samples` fired with this many samples.
    Samples(usize),
    /// `closed` fired.
    Closed,
    /// `enable_state_changed` fired.
    EnableChanged(bool),
}

/// Shared view of a [`RecordingConsumer`]'s event log.
#[derive(Clone)]
pub struct ConsumerLog {
    events: Rc<RefCell<Vec<ConsumerEvent>>>,
}

impl ConsumerLog {
    /// Snapshot of all recorded events, in callback order.
    pub fn events(&self) -> Vec<ConsumerEvent> {
        self.events.borrow().clone()
    }

    /// Number of `opened` callbacks recorded.
    pub fn opened_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, ConsumerEvent::Opened { .. }))
            .count()
    }

    /// Number of `closed` callbacks recorded.
    pub fn closed_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, ConsumerEvent::Closed))
            .count()
    }

    /// Total sample count across all `samples` callbacks.
    pub fn total_samples(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .map(|e| match e {
                ConsumerEvent::Samples(n) => *n,
                _ => 0,
            })
            .sum()
    }
}

/// A [`ChannelConsumer`] that records every callback.
pub struct RecordingConsumer {
    events: Rc<RefCell<Vec<ConsumerEvent>>>,
    enabled: bool,
}

impl RecordingConsumer {
    /// Create a consumer plus the log the test keeps.
    pub fn new() -> (Self, ConsumerLog) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let log = ConsumerLog {
            events: Rc::clone(&events),
        };
        (
            RecordingConsumer {
                events,
                enabled: true,
            },
            log,
        )
    }
}

impl ChannelConsumer for RecordingConsumer {
    fn opened(
        &mut self,
        _analyzer: &dyn Analyzer,
        handle: Handle,
        channel: &ChannelInfo,
        _config: &InspectorConfig,
    ) -> Result<()> {
        self.events.borrow_mut().push(ConsumerEvent::Opened {
            handle,
            samp_rate: channel.samp_rate,
        });
        Ok(())
    }

    fn samples(&mut self, samples: &[Complex32]) {
        self.events
            .borrow_mut()
            .push(ConsumerEvent::Samples(samples.len()));
    }

    fn closed(&mut self) {
        self.events.borrow_mut().push(ConsumerEvent::Closed);
    }

    fn enable_state_changed(&mut self, enabled: bool) {
        self.events
            .borrow_mut()
            .push(ConsumerEvent::EnableChanged(enabled));
    }

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
