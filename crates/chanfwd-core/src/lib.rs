//! chanfwd-core: Core traits, types, and error definitions for chanfwd.
//!
//! This crate defines the analyzer-agnostic abstractions the forwarder is
//! built on. Applications and alternative analyzer adapters depend on
//! these types without pulling in the forwarder itself.
//!
//! # Key types
//!
//! - [`Analyzer`] -- the adapter contract over the remote SDR analyzer
//! - [`ChannelConsumer`] -- the per-channel sample sink contract
//! - [`InspectorMessage`] / [`SamplesMessage`] -- inbound protocol messages
//! - [`Error`] / [`Result`] -- error handling

pub mod analyzer;
pub mod config;
pub mod consumer;
pub mod error;
pub mod msg;
pub mod types;

// Re-export key types at crate root for ergonomic `use chanfwd_core::*`.
pub use analyzer::Analyzer;
pub use config::{ConfigValue, InspectorConfig};
pub use consumer::ChannelConsumer;
pub use error::{Error, Result};
pub use msg::{InspectorMessage, SamplesMessage};
pub use types::{
    ChannelInfo, ChannelSpec, DemodKind, Handle, InspectorClass, ParseClassError,
    ParseDemodError, RequestId, SourceInfo,
};

/// Complex sample type used for all demodulated bursts.
pub use num_complex::Complex32;
