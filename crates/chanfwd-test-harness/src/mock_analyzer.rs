//! Mock analyzer for deterministic testing of the forwarder.
//!
//! [`MockAnalyzer`] implements the [`Analyzer`] trait without any radio:
//! every outbound call is recorded as an [`AnalyzerCall`], request ids are
//! allocated sequentially, and the source info is whatever the test set.
//! Tests drive the other direction themselves by synthesizing
//! `InspectorMessage`s for the recorded open requests.
//!
//! # Example
//!
//! ```
//! use chanfwd_test_harness::MockAnalyzer;
//! use chanfwd_core::SourceInfo;
//!
//! let mock = MockAnalyzer::new(SourceInfo {
//!     frequency: 100e6,
//!     sample_rate: 2e6,
//!     lnb_frequency: 0.0,
//! });
//! assert!(mock.calls().is_empty());
//! ```

use std::cell::RefCell;

use chanfwd_core::analyzer::Analyzer;
use chanfwd_core::config::InspectorConfig;
use chanfwd_core::error::Result;
use chanfwd_core::types::{ChannelSpec, Handle, InspectorClass, RequestId, SourceInfo};

/// One recorded outbound analyzer call.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerCall {
    /// Top-level inspector open.
    Open {
        /// Requested inspector class.
        class: InspectorClass,
        /// Channel descriptor.
        spec: ChannelSpec,
        /// Correlation id.
        request: RequestId,
    },
    /// Child inspector open.
    OpenEx {
        /// Requested inspector class.
        class: InspectorClass,
        /// Channel descriptor.
        spec: ChannelSpec,
        /// Exact-frequency channelization flag.
        precise: bool,
        /// Parent inspector handle.
        parent: Handle,
        /// Correlation id.
        request: RequestId,
    },
    /// Inspector close.
    CloseInspector {
        /// Handle being closed.
        handle: Handle,
    },
    /// Sample-tag id assignment.
    SetInspectorId {
        /// Target inspector.
        handle: Handle,
        /// Assigned id.
        id: u64,
    },
    /// Filter bandwidth change.
    SetInspectorBandwidth {
        /// Target inspector.
        handle: Handle,
        /// New bandwidth in hertz.
        bandwidth: f64,
    },
    /// Center frequency change.
    SetInspectorFreq {
        /// Target inspector.
        handle: Handle,
        /// New frequency offset in hertz.
        frequency: f64,
    },
    /// Configuration push.
    SetInspectorConfig {
        /// Target inspector.
        handle: Handle,
        /// Pushed configuration.
        config: InspectorConfig,
    },
    /// Watermark change.
    SetInspectorWatermark {
        /// Target inspector.
        handle: Handle,
        /// New watermark in samples.
        watermark: u64,
    },
    /// Front-end retune.
    SetFrequency {
        /// New tuner frequency in hertz.
        frequency: f64,
    },
}

/// A recorded open request with its correlation id, for synthesizing the
/// matching response message.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    /// Requested inspector class.
    pub class: InspectorClass,
    /// Channel descriptor.
    pub spec: ChannelSpec,
    /// Parent handle for child opens, `None` for top-level opens.
    pub parent: Option<Handle>,
    /// Correlation id.
    pub request: RequestId,
}

struct MockState {
    source: SourceInfo,
    next_request: u32,
    calls: Vec<AnalyzerCall>,
}

/// A mock [`Analyzer`] that records calls instead of talking to a radio.
pub struct MockAnalyzer {
    state: RefCell<MockState>,
}

impl MockAnalyzer {
    /// Create a mock reporting the given source info.
    pub fn new(source: SourceInfo) -> Self {
        MockAnalyzer {
            state: RefCell::new(MockState {
                source,
                next_request: 1,
                calls: Vec::new(),
            }),
        }
    }

    /// Replace the reported source info (simulates a front-end retune by
    /// the user or another client).
    pub fn set_source_info(&self, source: SourceInfo) {
        self.state.borrow_mut().source = source;
    }

    /// All calls recorded so far, in dispatch order.
    pub fn calls(&self) -> Vec<AnalyzerCall> {
        self.state.borrow().calls.clone()
    }

    /// Drain and return the recorded calls.
    pub fn take_calls(&self) -> Vec<AnalyzerCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    /// All open requests (top-level and child) recorded so far.
    pub fn open_requests(&self) -> Vec<OpenRequest> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                AnalyzerCall::Open {
                    class,
                    spec,
                    request,
                } => Some(OpenRequest {
                    class: *class,
                    spec: *spec,
                    parent: None,
                    request: *request,
                }),
                AnalyzerCall::OpenEx {
                    class,
                    spec,
                    parent,
                    request,
                    ..
                } => Some(OpenRequest {
                    class: *class,
                    spec: *spec,
                    parent: Some(*parent),
                    request: *request,
                }),
                _ => None,
            })
            .collect()
    }

    /// Handles passed to `close_inspector`, in dispatch order.
    pub fn closed_handles(&self) -> Vec<Handle> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                AnalyzerCall::CloseInspector { handle } => Some(*handle),
                _ => None,
            })
            .collect()
    }

    /// Frequencies passed to `set_frequency`, in dispatch order.
    pub fn retunes(&self) -> Vec<f64> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                AnalyzerCall::SetFrequency { frequency } => Some(*frequency),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: AnalyzerCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Analyzer for MockAnalyzer {
    fn source_info(&self) -> SourceInfo {
        self.state.borrow().source
    }

    fn allocate_request_id(&self) -> RequestId {
        let mut state = self.state.borrow_mut();
        let id = state.next_request;
        state.next_request += 1;
        RequestId::from_raw(id)
    }

    fn open(&self, class: InspectorClass, spec: &ChannelSpec, request: RequestId) -> Result<()> {
        self.record(AnalyzerCall::Open {
            class,
            spec: *spec,
            request,
        });
        Ok(())
    }

    fn open_ex(
        &self,
        class: InspectorClass,
        spec: &ChannelSpec,
        precise: bool,
        parent: Handle,
        request: RequestId,
    ) -> Result<()> {
        self.record(AnalyzerCall::OpenEx {
            class,
            spec: *spec,
            precise,
            parent,
            request,
        });
        Ok(())
    }

    fn close_inspector(&self, handle: Handle) -> Result<()> {
        self.record(AnalyzerCall::CloseInspector { handle });
        Ok(())
    }

    fn set_inspector_id(&self, handle: Handle, id: u64) -> Result<()> {
        self.record(AnalyzerCall::SetInspectorId { handle, id });
        Ok(())
    }

    fn set_inspector_bandwidth(&self, handle: Handle, bandwidth: f64) -> Result<()> {
        self.record(AnalyzerCall::SetInspectorBandwidth { handle, bandwidth });
        Ok(())
    }

    fn set_inspector_freq(&self, handle: Handle, frequency: f64) -> Result<()> {
        self.record(AnalyzerCall::SetInspectorFreq { handle, frequency });
        Ok(())
    }

    fn set_inspector_config(&self, handle: Handle, config: &InspectorConfig) -> Result<()> {
        self.record(AnalyzerCall::SetInspectorConfig {
            handle,
            config: config.clone(),
        });
        Ok(())
    }

    fn set_inspector_watermark(&self, handle: Handle, watermark: u64) -> Result<()> {
        self.record(AnalyzerCall::SetInspectorWatermark { handle, watermark });
        Ok(())
    }

    fn set_frequency(&self, frequency: f64) -> Result<()> {
        self.record(AnalyzerCall::SetFrequency { frequency });
        Ok(())
    }
}
