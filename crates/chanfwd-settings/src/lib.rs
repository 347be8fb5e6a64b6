//! chanfwd-settings: Legacy ini persistence for channel lists.
//!
//! Serializes and deserializes a forwarder's channel tree to and from the
//! opinionated key layout of the legacy receiver tooling (QSettings ini
//! files with `main_vfos` / `vfos` arrays). The layer split:
//!
//! - [`ini`] -- a minimal QSettings-compatible ini document
//! - [`store`] -- the legacy key layout, with its 1.1 bandwidth factor,
//!   SSB edge-frequency convention, and misspelled-key compatibility
//!
//! Loading drives the forwarder through its ordinary `make_master` /
//! `make_channel` operations, so a reloaded tree passes exactly the same
//! admission checks as one built interactively. On any load failure the
//! caller is expected to follow with `Forwarder::remove_all`.

pub mod ini;
pub mod store;

pub use ini::{IniDocument, IniSection, GENERAL_SECTION};
pub use store::{
    read_channel_file, write_channel_file, ChannelFile, ChannelRecord, MasterRecord,
    EXTRA_BW_FACTOR,
};
