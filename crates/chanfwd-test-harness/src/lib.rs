//! chanfwd-test-harness: Mock analyzer and recording consumers for
//! deterministic testing of the forwarder.
//!
//! [`MockAnalyzer`] records every outbound dispatch so tests can assert on
//! the exact protocol traffic, and [`RecordingConsumer`] captures the
//! lifecycle callbacks a channel sink receives.

pub mod mock_analyzer;
pub mod recording_consumer;

pub use mock_analyzer::{AnalyzerCall, MockAnalyzer, OpenRequest};
pub use recording_consumer::{ConsumerEvent, ConsumerLog, RecordingConsumer};
