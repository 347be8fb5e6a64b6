//! The `Analyzer` trait -- the contract the remote SDR analyzer must satisfy.
//!
//! The forwarder programs the analyzer exclusively through this trait:
//! request-id allocation, inspector opens and closes, per-inspector tuning,
//! and front-end retuning. Implementations wrap whatever transport actually
//! reaches the analyzer process.
//!
//! # Dispatch model
//!
//! Every method is a fire-and-forget request dispatch: it returns as soon
//! as the request has been handed to the transport, and the outcome (for
//! opens) arrives later as an [`InspectorMessage`] on the owning event
//! loop. Methods take `&self`; implementations that need mutable state use
//! interior mutability.
//!
//! [`InspectorMessage`]: crate::msg::InspectorMessage

use crate::config::InspectorConfig;
use crate::error::Result;
use crate::types::{ChannelSpec, Handle, InspectorClass, RequestId, SourceInfo};

/// Adapter over a remote SDR analyzer's inspector API.
pub trait Analyzer {
    /// Current tuner front-end state (frequency, sample rate, LNB).
    fn source_info(&self) -> SourceInfo;

    /// Allocate a fresh request id for an upcoming open.
    ///
    /// Ids are assumed unique for the lifetime of the analyzer session.
    fn allocate_request_id(&self) -> RequestId;

    /// Open a top-level inspector of the given class.
    ///
    /// The eventual outcome arrives as an `Opened` or `InvalidChannel`
    /// message carrying `request`.
    fn open(&self, class: InspectorClass, spec: &ChannelSpec, request: RequestId) -> Result<()>;

    /// Open a child inspector under an already-open parent.
    ///
    /// `precise` requests exact-frequency channelization. A stale or bogus
    /// `parent` handle is answered with a `WrongHandle` message.
    fn open_ex(
        &self,
        class: InspectorClass,
        spec: &ChannelSpec,
        precise: bool,
        parent: Handle,
        request: RequestId,
    ) -> Result<()>;

    /// Close an open inspector. Closing a multicarrier inspector cascades
    /// to all of its children on the analyzer side.
    fn close_inspector(&self, handle: Handle) -> Result<()>;

    /// Set the id that tags sample bursts from this inspector.
    fn set_inspector_id(&self, handle: Handle, id: u64) -> Result<()>;

    /// Set the inspector's filter bandwidth in hertz.
    fn set_inspector_bandwidth(&self, handle: Handle, bandwidth: f64) -> Result<()>;

    /// Set the inspector's center frequency offset in hertz.
    fn set_inspector_freq(&self, handle: Handle, frequency: f64) -> Result<()>;

    /// Replace the inspector's configuration blob.
    fn set_inspector_config(&self, handle: Handle, config: &InspectorConfig) -> Result<()>;

    /// Set the inspector's sample-delivery watermark, in samples.
    fn set_inspector_watermark(&self, handle: Handle, watermark: u64) -> Result<()>;

    /// Retune the front-end to a new center frequency in hertz.
    fn set_frequency(&self, frequency: f64) -> Result<()>;
}
