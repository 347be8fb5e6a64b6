//! The legacy channel-list layout over the ini document.
//!
//! Channel lists are stored as two QSettings arrays: `main_vfos` (masters)
//! and `vfos` (sub-channels), plus a handful of top-level keys. The layout
//! is a wire contract shared with the legacy receiver tooling, quirks
//! included:
//!
//! - A master's bandwidth is not stored directly: `out_rate` carries the
//!   output rate and the bandwidth is `out_rate * 1.1` (a 10% filter-skirt
//!   allowance), in both directions.
//! - The misspelled `fiter_bandwidth` key must still be honored on read;
//!   only `filter_bandwidth` is ever written.
//! - A zero `out_rate` on a channel is derived from the legacy `data_rate`
//!   key (600 -> 12000, 1200 -> 24000, anything else -> 48000).
//! - Sideband channels store an edge frequency: the lower edge for USB,
//!   the upper edge for LSB. Decoding shifts by half the filter bandwidth
//!   to recover the center; encoding applies the inverse.
//!
//! Decoding aborts on the first error; the caller is expected to follow a
//! failed load with `Forwarder::remove_all` to restore a clean tree.

use std::path::Path;
use std::str::FromStr;

use chanfwd::{ChannelConsumer, Forwarder};
use chanfwd_core::error::{Error, Result};
use chanfwd_core::types::DemodKind;

use crate::ini::{IniDocument, IniSection, GENERAL_SECTION};

/// Filter-skirt allowance between a master's output rate and its
/// bandwidth. Part of the on-disk contract.
pub const EXTRA_BW_FACTOR: f64 = 1.1;

const MAIN_VFOS_SECTION: &str = "main_vfos";
const VFOS_SECTION: &str = "vfos";

/// One stored master channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterRecord {
    /// Master name (the `zmq_topic` key).
    pub name: String,
    /// Center frequency in hertz.
    pub frequency: f64,
    /// Bandwidth in hertz (`out_rate * 1.1`).
    pub bandwidth: f64,
    /// Inverse of `SigDigger.disabled`.
    pub enabled: bool,
}

/// One stored sub-channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    /// Channel name (the `topic` key).
    pub name: String,
    /// Absolute center frequency in hertz, SSB correction applied.
    pub frequency: f64,
    /// Filter bandwidth in hertz.
    pub filter_bandwidth: f64,
    /// Demodulator.
    pub demod: DemodKind,
    /// Output sample rate in samples per second.
    pub output_rate: u32,
    /// Inverse of `SigDigger.disabled`.
    pub enabled: bool,
}

/// A decoded channel-list file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelFile {
    /// Address the downstream publisher binds to.
    pub zmq_address: String,
    /// Stored tuner center frequency in hertz.
    pub center_frequency: i64,
    /// Stored LNB mix offset in hertz.
    pub mix_offset: i64,
    /// Whether DC bias correction was enabled.
    pub correct_dc_bias: bool,
    /// Masters in file order.
    pub masters: Vec<MasterRecord>,
    /// Channels in file order.
    pub channels: Vec<ChannelRecord>,
}

fn arr_int(section: &IniSection, index: usize, field: &str) -> i64 {
    section
        .array_get(index, field)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn arr_str(section: &IniSection, index: usize, field: &str) -> String {
    section
        .array_get(index, field)
        .unwrap_or_default()
        .to_string()
}

fn arr_bool(section: &IniSection, index: usize, field: &str) -> bool {
    matches!(
        section.array_get(index, field).map(str::trim),
        Some("true") | Some("1")
    )
}

fn top_int(doc: &IniDocument, key: &str) -> i64 {
    doc.section(GENERAL_SECTION)
        .and_then(|s| s.get(key))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn top_str(doc: &IniDocument, key: &str) -> String {
    doc.section(GENERAL_SECTION)
        .and_then(|s| s.get(key))
        .unwrap_or_default()
        .to_string()
}

fn top_bool(doc: &IniDocument, key: &str) -> bool {
    matches!(
        doc.section(GENERAL_SECTION)
            .and_then(|s| s.get(key))
            .map(str::trim),
        Some("true") | Some("1")
    )
}

impl ChannelFile {
    /// Decode a channel list from an ini document.
    ///
    /// Stops at the first error, leaving the partially decoded content
    /// unreturned.
    pub fn decode(doc: &IniDocument) -> Result<Self> {
        let mut file = ChannelFile {
            zmq_address: top_str(doc, "zmq_address"),
            center_frequency: top_int(doc, "center_frequency"),
            mix_offset: top_int(doc, "mix_offset"),
            correct_dc_bias: top_bool(doc, "correct_dc_bias"),
            masters: Vec::new(),
            channels: Vec::new(),
        };

        if let Some(section) = doc.section(MAIN_VFOS_SECTION) {
            for i in 1..=section.array_len() {
                let out_rate = arr_int(section, i, "out_rate");
                let frequency = arr_int(section, i, "frequency");
                let topic = arr_str(section, i, "zmq_topic");
                let name = if topic.is_empty() {
                    format!("MASTER_{i}")
                } else {
                    topic
                };

                if out_rate == 0 {
                    return Err(Error::MissingBandwidth(name));
                }
                if frequency == 0 {
                    return Err(Error::MissingFrequency(name));
                }

                file.masters.push(MasterRecord {
                    name,
                    frequency: frequency as f64,
                    bandwidth: out_rate as f64 * EXTRA_BW_FACTOR,
                    enabled: !arr_bool(section, i, "SigDigger.disabled"),
                });
            }
        }

        if let Some(section) = doc.section(VFOS_SECTION) {
            for i in 1..=section.array_len() {
                let mut filter_bandwidth = arr_int(section, i, "filter_bandwidth");
                if filter_bandwidth == 0 {
                    // Honor the legacy misspelling on read.
                    filter_bandwidth = arr_int(section, i, "fiter_bandwidth");
                }
                let mut frequency = arr_int(section, i, "frequency") as f64;
                let name = arr_str(section, i, "topic");
                if name.is_empty() {
                    return Err(Error::AnonymousChannel);
                }

                let demod_str = arr_str(section, i, "SigDigger.demod");
                let demod = if demod_str.is_empty() {
                    DemodKind::default()
                } else {
                    DemodKind::from_str(&demod_str)
                        .map_err(|e| Error::Format(format!("channel `{name}': {e}")))?
                };

                let mut out_rate = arr_int(section, i, "out_rate");
                if out_rate == 0 {
                    out_rate = match arr_int(section, i, "data_rate") {
                        600 => 12_000,
                        1_200 => 24_000,
                        _ => 48_000,
                    };
                }
                if filter_bandwidth == 0 {
                    filter_bandwidth = out_rate;
                }

                // Sideband entries store an edge frequency; recover the
                // center.
                match demod {
                    DemodKind::AudioUsb => frequency += filter_bandwidth as f64 / 2.0,
                    DemodKind::AudioLsb => frequency -= filter_bandwidth as f64 / 2.0,
                    _ => {}
                }

                file.channels.push(ChannelRecord {
                    name,
                    frequency,
                    filter_bandwidth: filter_bandwidth as f64,
                    demod,
                    output_rate: out_rate as u32,
                    enabled: !arr_bool(section, i, "SigDigger.disabled"),
                });
            }
        }

        Ok(file)
    }

    /// Encode the channel list to an ini document.
    pub fn encode(&self) -> IniDocument {
        let mut doc = IniDocument::new();

        let general = doc.section_mut(GENERAL_SECTION);
        general.set("zmq_address", &self.zmq_address);
        general.set("center_frequency", &self.center_frequency.to_string());
        general.set("mix_offset", &self.mix_offset.to_string());
        general.set("correct_dc_bias", bool_str(self.correct_dc_bias));

        let masters = doc.section_mut(MAIN_VFOS_SECTION);
        masters.set_array_len(self.masters.len());
        for (i, master) in self.masters.iter().enumerate() {
            let i = i + 1;
            let out_rate = (master.bandwidth / EXTRA_BW_FACTOR).round() as i64;
            masters.array_set(i, "frequency", &(master.frequency.round() as i64).to_string());
            masters.array_set(i, "out_rate", &out_rate.to_string());
            masters.array_set(i, "zmq_topic", &master.name);
            masters.array_set(i, "SigDigger.disabled", bool_str(!master.enabled));
        }

        let channels = doc.section_mut(VFOS_SECTION);
        channels.set_array_len(self.channels.len());
        for (i, channel) in self.channels.iter().enumerate() {
            let i = i + 1;

            // Inverse of the decode-side SSB correction: store the lower
            // edge for USB, the upper edge for LSB.
            let mut stored_freq = channel.frequency;
            match channel.demod {
                DemodKind::AudioUsb => stored_freq -= channel.filter_bandwidth / 2.0,
                DemodKind::AudioLsb => stored_freq += channel.filter_bandwidth / 2.0,
                _ => {}
            }

            channels.array_set(i, "frequency", &(stored_freq.round() as i64).to_string());
            channels.array_set(
                i,
                "filter_bandwidth",
                &(channel.filter_bandwidth.round() as i64).to_string(),
            );
            channels.array_set(i, "topic", &channel.name);
            channels.array_set(i, "SigDigger.demod", channel.demod.as_str());
            channels.array_set(i, "out_rate", &i64::from(channel.output_rate).to_string());
            channels.array_set(i, "SigDigger.disabled", bool_str(!channel.enabled));
        }

        doc
    }

    /// Collect a channel list from a forwarder's live tree.
    ///
    /// Tombstoned entities are skipped. The top-level fields are left at
    /// their defaults for the caller to fill in.
    pub fn from_forwarder(forwarder: &Forwarder) -> Self {
        let mut file = ChannelFile::default();

        for (master_id, master) in forwarder.tree().masters() {
            if master.deleted {
                continue;
            }
            file.masters.push(MasterRecord {
                name: master.name.clone(),
                frequency: master.frequency,
                bandwidth: master.bandwidth,
                enabled: master.enabled,
            });

            for channel_id in forwarder.tree().channel_ids_of(master_id) {
                let Some(channel) = forwarder.channel(channel_id) else {
                    continue;
                };
                if channel.deleted {
                    continue;
                }
                file.channels.push(ChannelRecord {
                    name: channel.name.clone(),
                    frequency: master.frequency + channel.offset,
                    filter_bandwidth: channel.bandwidth,
                    demod: channel.demod,
                    output_rate: channel.output_rate,
                    enabled: channel.consumer.is_enabled(),
                });
            }
        }

        file
    }

    /// Drive a forwarder with this channel list.
    ///
    /// Masters first, then channels; `make_consumer` builds the sink for
    /// each channel record. Stops at the first failure, leaving whatever
    /// was created so far in the tree -- the caller is expected to follow
    /// with `remove_all` on error.
    pub fn apply(
        &self,
        forwarder: &mut Forwarder,
        make_consumer: &mut dyn FnMut(&ChannelRecord) -> Box<dyn ChannelConsumer>,
    ) -> Result<()> {
        for master in &self.masters {
            let id = forwarder.make_master(&master.name, master.frequency, master.bandwidth)?;
            if !master.enabled {
                forwarder.set_master_enabled(id, false)?;
            }
        }

        for channel in &self.channels {
            let id = forwarder.make_channel(
                &channel.name,
                channel.frequency,
                channel.filter_bandwidth,
                channel.demod,
                channel.output_rate,
                make_consumer(channel),
            )?;
            if !channel.enabled {
                forwarder.set_channel_enabled(id, false);
            }
        }

        tracing::debug!(
            masters = self.masters.len(),
            channels = self.channels.len(),
            "channel list applied"
        );
        Ok(())
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Read and decode a channel-list file.
pub fn read_channel_file(path: &Path) -> Result<ChannelFile> {
    ChannelFile::decode(&IniDocument::read_from(path)?)
}

/// Encode and write a channel-list file.
pub fn write_channel_file(path: &Path, file: &ChannelFile) -> Result<()> {
    file.encode().write_to(path)
}
