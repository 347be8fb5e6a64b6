//! Inbound analyzer messages.
//!
//! The analyzer answers open requests and delivers sample bursts
//! asynchronously. The event loop that owns the forwarder feeds
//! [`InspectorMessage`]s to `Forwarder::process_message` and
//! [`SamplesMessage`]s to `Forwarder::feed_samples`, in arrival order.

use num_complex::Complex32;

use crate::config::InspectorConfig;
use crate::types::{Handle, RequestId};

/// A response to an inspector open request.
#[derive(Debug, Clone)]
pub enum InspectorMessage {
    /// An open request completed; the inspector is live under `handle`.
    Opened {
        /// The request this message answers.
        request: RequestId,
        /// Analyzer-assigned handle for the new inspector.
        handle: Handle,
        /// Initial inspector configuration.
        config: InspectorConfig,
        /// Equivalent sample rate of the inspector output, in samples
        /// per second.
        equiv_sample_rate: f64,
    },

    /// An `open_ex` request named a parent handle the analyzer does not
    /// recognize.
    WrongHandle {
        /// The request this message answers.
        request: RequestId,
    },

    /// The requested channel limits are invalid for the current front-end.
    InvalidChannel {
        /// The request this message answers.
        request: RequestId,
    },
}

impl InspectorMessage {
    /// The request id this message answers.
    pub fn request(&self) -> RequestId {
        match self {
            InspectorMessage::Opened { request, .. }
            | InspectorMessage::WrongHandle { request }
            | InspectorMessage::InvalidChannel { request } => *request,
        }
    }
}

/// A burst of demodulated samples from one open inspector.
///
/// The inspector id matches the handle because the forwarder programs an
/// identity mapping on every promoted channel.
#[derive(Debug, Clone)]
pub struct SamplesMessage {
    /// Id of the inspector the burst belongs to.
    pub inspector_id: Handle,
    /// Complex sample burst. Ownership passes to the receiver; consumers
    /// only borrow it for the duration of the callback.
    pub samples: Vec<Complex32>,
}

impl SamplesMessage {
    /// Number of samples in the burst.
    pub fn count(&self) -> usize {
        self.samples.len()
    }
}
