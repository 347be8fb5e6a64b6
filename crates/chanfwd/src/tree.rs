//! The two-level channel tree: masters and their sub-channels.
//!
//! Entities live in arena-style maps keyed by opaque ids, so removal never
//! invalidates other entities and back-references stay cheap. Masters keep
//! their sub-channels as an ordered id list; the tree keeps a name index
//! over both namespaces and a cached frequency span over the live masters.
//!
//! Tombstones: an entity the user removed while its open request was still
//! in flight stays in the tree with `deleted = true` until the forwarder
//! absorbs the late completion. All name lookups treat tombstones as
//! absent; the cached span ignores them.

use std::collections::HashMap;
use std::fmt;

use chanfwd_core::config::InspectorConfig;
use chanfwd_core::consumer::ChannelConsumer;
use chanfwd_core::error::{Error, Result};
use chanfwd_core::types::{DemodKind, Handle, RequestId};

/// Opaque id of a master channel in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MasterId(u64);

impl fmt::Display for MasterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "master-{}", self.0)
    }
}

/// Opaque id of a sub-channel in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel-{}", self.0)
    }
}

/// A contiguous band of spectrum, opened as one multicarrier inspector.
pub struct MasterChannel {
    /// Unique name, identity for lookup and persistence.
    pub name: String,
    /// Center frequency in hertz.
    pub frequency: f64,
    /// Bandwidth in hertz.
    pub bandwidth: f64,
    /// When false the master opens muted at the analyzer.
    pub enabled: bool,
    /// Sub-channels in insertion order.
    pub channels: Vec<ChannelId>,
    /// Live inspector handle, `None` while closed.
    pub handle: Option<Handle>,
    /// Outstanding open request, `None` when none is in flight.
    pub pending: Option<RequestId>,
    /// Number of sub-channels whose open has been acknowledged.
    pub open_count: usize,
    /// Tombstone flag for the deleted-while-pending race.
    pub deleted: bool,
    /// Last known analyzer configuration for this inspector.
    pub config: InspectorConfig,
}

impl MasterChannel {
    /// Whether the master's inspector is live.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether an open request is in flight.
    pub fn is_opening(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the master and every one of its sub-channels are open.
    pub fn is_fully_open(&self) -> bool {
        self.is_open() && self.open_count == self.channels.len()
    }

    /// Lower band edge in hertz.
    pub fn freq_min(&self) -> f64 {
        self.frequency - self.bandwidth / 2.0
    }

    /// Upper band edge in hertz.
    pub fn freq_max(&self) -> f64 {
        self.frequency + self.bandwidth / 2.0
    }

    /// Whether the band `[frequency - bandwidth/2, frequency + bandwidth/2]`
    /// lies entirely inside this master's band.
    pub fn contains_band(&self, frequency: f64, bandwidth: f64) -> bool {
        self.freq_min() <= frequency - bandwidth / 2.0
            && frequency + bandwidth / 2.0 <= self.freq_max()
    }
}

/// A demodulated sub-band inside a master.
pub struct ChannelDescription {
    /// Unique name across all channels of the tree.
    pub name: String,
    /// Owning master.
    pub parent: MasterId,
    /// Frequency offset relative to the parent's center, in hertz.
    pub offset: f64,
    /// Filter bandwidth in hertz.
    pub bandwidth: f64,
    /// Demodulator; also determines the inspector class.
    pub demod: DemodKind,
    /// Configured output sample rate in samples per second.
    pub output_rate: u32,
    /// Equivalent sample rate reported by the analyzer at open time;
    /// zero while closed.
    pub samp_rate: f64,
    /// The owning sample sink.
    pub consumer: Box<dyn ChannelConsumer>,
    /// Live inspector handle, `None` while closed.
    pub handle: Option<Handle>,
    /// Outstanding open request, `None` when none is in flight.
    pub pending: Option<RequestId>,
    /// Tombstone flag for the deleted-while-pending race.
    pub deleted: bool,
}

impl ChannelDescription {
    /// Whether the channel's inspector is live.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether an open request is in flight.
    pub fn is_opening(&self) -> bool {
        self.pending.is_some()
    }
}

/// The forwarder's channel tree.
#[derive(Default)]
pub struct ChannelTree {
    masters: HashMap<MasterId, MasterChannel>,
    channels: HashMap<ChannelId, ChannelDescription>,
    /// Masters in insertion order.
    order: Vec<MasterId>,
    master_names: HashMap<String, MasterId>,
    channel_names: HashMap<String, ChannelId>,
    next_id: u64,
    freq_min: f64,
    freq_max: f64,
}

impl ChannelTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        ChannelTree {
            masters: HashMap::new(),
            channels: HashMap::new(),
            order: Vec::new(),
            master_names: HashMap::new(),
            channel_names: HashMap::new(),
            next_id: 1,
            freq_min: f64::INFINITY,
            freq_max: f64::NEG_INFINITY,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Whether the tree holds no masters at all (tombstones included).
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Lower edge of the live master set, `+inf` when empty.
    pub fn freq_min(&self) -> f64 {
        self.freq_min
    }

    /// Upper edge of the live master set, `-inf` when empty.
    pub fn freq_max(&self) -> f64 {
        self.freq_max
    }

    /// Master ids in insertion order.
    pub fn master_ids(&self) -> Vec<MasterId> {
        self.order.clone()
    }

    /// Masters in insertion order.
    pub fn masters(&self) -> impl Iterator<Item = (MasterId, &MasterChannel)> {
        self.order
            .iter()
            .filter_map(move |id| self.masters.get(id).map(|m| (*id, m)))
    }

    /// Look up a master by id.
    pub fn master(&self, id: MasterId) -> Option<&MasterChannel> {
        self.masters.get(&id)
    }

    /// Look up a master by id, mutably.
    pub fn master_mut(&mut self, id: MasterId) -> Option<&mut MasterChannel> {
        self.masters.get_mut(&id)
    }

    /// Look up a channel by id.
    pub fn channel(&self, id: ChannelId) -> Option<&ChannelDescription> {
        self.channels.get(&id)
    }

    /// Look up a channel by id, mutably.
    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut ChannelDescription> {
        self.channels.get_mut(&id)
    }

    /// Channel ids of one master, in insertion order.
    pub fn channel_ids_of(&self, master: MasterId) -> Vec<ChannelId> {
        self.masters
            .get(&master)
            .map(|m| m.channels.clone())
            .unwrap_or_default()
    }

    /// All channel ids in the tree, grouped by master in insertion order.
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.order
            .iter()
            .filter_map(|id| self.masters.get(id))
            .flat_map(|m| m.channels.iter().copied())
            .collect()
    }

    /// Find a live master by name. Tombstones are treated as absent.
    pub fn find_master(&self, name: &str) -> Option<MasterId> {
        let id = *self.master_names.get(name)?;
        let master = self.masters.get(&id)?;
        if master.deleted { None } else { Some(id) }
    }

    /// Find a live channel by name. Tombstones are treated as absent.
    pub fn find_channel(&self, name: &str) -> Option<ChannelId> {
        let id = *self.channel_names.get(name)?;
        let channel = self.channels.get(&id)?;
        if channel.deleted { None } else { Some(id) }
    }

    /// First live master (in insertion order) whose band contains the
    /// requested interval.
    pub fn find_master_covering(&self, frequency: f64, bandwidth: f64) -> Option<MasterId> {
        self.masters()
            .find(|(_, m)| !m.deleted && m.contains_band(frequency, bandwidth))
            .map(|(id, _)| id)
    }

    /// Insert a new master. Fails with [`Error::DuplicateName`] when a live
    /// master of that name exists; the tree is left unchanged.
    pub fn insert_master(&mut self, name: &str, frequency: f64, bandwidth: f64) -> Result<MasterId> {
        if self.find_master(name).is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let id = MasterId(self.next_id());
        self.masters.insert(
            id,
            MasterChannel {
                name: name.to_string(),
                frequency,
                bandwidth,
                enabled: true,
                channels: Vec::new(),
                handle: None,
                pending: None,
                open_count: 0,
                deleted: false,
                config: InspectorConfig::new(),
            },
        );
        self.order.push(id);
        self.master_names.insert(name.to_string(), id);

        if frequency - bandwidth / 2.0 < self.freq_min {
            self.freq_min = frequency - bandwidth / 2.0;
        }
        if frequency + bandwidth / 2.0 > self.freq_max {
            self.freq_max = frequency + bandwidth / 2.0;
        }

        Ok(id)
    }

    /// Insert a new channel under `parent`. Fails with
    /// [`Error::DuplicateName`] when a live channel of that name exists
    /// anywhere in the tree; the tree is left unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_channel(
        &mut self,
        parent: MasterId,
        name: &str,
        offset: f64,
        bandwidth: f64,
        demod: DemodKind,
        output_rate: u32,
        consumer: Box<dyn ChannelConsumer>,
    ) -> Result<ChannelId> {
        if self.find_channel(name).is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let id = ChannelId(self.next_id());
        self.channels.insert(
            id,
            ChannelDescription {
                name: name.to_string(),
                parent,
                offset,
                bandwidth,
                demod,
                output_rate,
                samp_rate: 0.0,
                consumer,
                handle: None,
                pending: None,
                deleted: false,
            },
        );
        if let Some(master) = self.masters.get_mut(&parent) {
            master.channels.push(id);
        }
        self.channel_names.insert(name.to_string(), id);

        Ok(id)
    }

    /// Remove a channel outright, returning its entity.
    ///
    /// Detaches it from the parent's list, drops the name-index entry, and
    /// decrements the parent's open count when the channel held a handle.
    pub fn remove_channel(&mut self, id: ChannelId) -> Option<ChannelDescription> {
        let channel = self.channels.remove(&id)?;

        // Reinsertion over a tombstone may have repointed the name entry.
        if self.channel_names.get(&channel.name) == Some(&id) {
            self.channel_names.remove(&channel.name);
        }

        if let Some(master) = self.masters.get_mut(&channel.parent) {
            master.channels.retain(|c| *c != id);
            if channel.is_open() {
                master.open_count = master.open_count.saturating_sub(1);
            }
        }

        Some(channel)
    }

    /// Remove a master and all of its channels outright, returning them.
    ///
    /// Recomputes the frequency span over the remaining live masters.
    pub fn remove_master(&mut self, id: MasterId) -> Option<(MasterChannel, Vec<ChannelDescription>)> {
        let master = self.masters.remove(&id)?;
        self.order.retain(|m| *m != id);

        if self.master_names.get(&master.name) == Some(&id) {
            self.master_names.remove(&master.name);
        }

        let mut removed = Vec::with_capacity(master.channels.len());
        for cid in &master.channels {
            if let Some(channel) = self.channels.remove(cid) {
                if self.channel_names.get(&channel.name) == Some(cid) {
                    self.channel_names.remove(&channel.name);
                }
                removed.push(channel);
            }
        }

        self.recompute_freq_limits();

        Some((master, removed))
    }

    /// Recompute the cached span over the non-deleted masters.
    pub fn recompute_freq_limits(&mut self) {
        let mut freq_min = f64::INFINITY;
        let mut freq_max = f64::NEG_INFINITY;

        for id in &self.order {
            let Some(master) = self.masters.get(id) else {
                continue;
            };
            if master.deleted {
                continue;
            }
            if master.freq_min() < freq_min {
                freq_min = master.freq_min();
            }
            if master.freq_max() > freq_max {
                freq_max = master.freq_max();
            }
        }

        self.freq_min = freq_min;
        self.freq_max = freq_max;
    }
}
