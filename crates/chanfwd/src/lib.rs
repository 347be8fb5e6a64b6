//! # chanfwd -- Multi-Channel Inspector Forwarder
//!
//! `chanfwd` mediates a tree of logical radio channels -- *masters* and
//! their nested *sub-channels* -- over a remote SDR analyzer that exposes
//! an asynchronous, request/response inspector API. It owns the end-to-end
//! inspector lifecycle across a noisy backing protocol (opens are
//! acknowledged later, may fail, may be superseded by user edits, and may
//! be invalidated by retuning) and routes demodulated sample bursts from
//! every open sub-channel to its consumer.
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                  | Purpose                                        |
//! |------------------------|------------------------------------------------|
//! | `chanfwd-core`         | Traits ([`Analyzer`], [`ChannelConsumer`]), types, errors |
//! | **`chanfwd`**          | This crate: the forwarder, tree view-model, demod sink |
//! | `chanfwd-settings`     | Legacy ini persistence for channel lists       |
//! | `chanfwd-test-harness` | Mock analyzer and recording consumers          |
//!
//! ## Driving the forwarder
//!
//! The [`Forwarder`] is single-threaded and message-driven: exactly one
//! event loop delivers user commands, inspector responses
//! ([`process_message`](Forwarder::process_message)) and sample bursts
//! ([`feed_samples`](Forwarder::feed_samples)) in a totally ordered
//! sequence. It never blocks and never spawns threads; all outbound
//! analyzer calls are fire-and-forget dispatches.
//!
//! ```no_run
//! use std::rc::Rc;
//! use chanfwd::{DemodKind, Forwarder};
//! # fn attach(analyzer: Rc<dyn chanfwd::Analyzer>) -> chanfwd::Result<()> {
//! let mut forwarder = Forwarder::new();
//! forwarder.set_analyzer(Some(analyzer))?;
//!
//! forwarder.make_master("WEATHER", 137_500_000.0, 200_000.0)?;
//! forwarder.make_channel(
//!     "NOAA-19",
//!     137_450_000.0,
//!     40_000.0,
//!     DemodKind::AudioFm,
//!     48_000,
//!     Box::new(chanfwd::DemodSink::new(DemodKind::AudioFm, 48_000.0)),
//! )?;
//! forwarder.open_all()?;
//! // ... feed inspector and sample messages from the event loop ...
//! # Ok(())
//! # }
//! ```

pub mod forwarder;
pub mod sink;
pub mod tree;
pub mod tree_model;

pub use forwarder::{Forwarder, MULTICARRIER_ENABLED_KEY};
pub use sink::DemodSink;
pub use tree::{ChannelDescription, ChannelId, ChannelTree, MasterChannel, MasterId};
pub use tree_model::{Cell, NodeKind, TreeModel, TreeNode, COLUMN_COUNT};

// Re-export the core contracts so applications can depend on this crate
// alone.
pub use chanfwd_core::{
    Analyzer, ChannelConsumer, ChannelInfo, ChannelSpec, Complex32, ConfigValue, DemodKind,
    Error, Handle, InspectorClass, InspectorConfig, InspectorMessage, RequestId, Result,
    SamplesMessage, SourceInfo,
};
