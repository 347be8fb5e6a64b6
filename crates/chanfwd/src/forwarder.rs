//! The multi-channel forwarder: tree ownership, the open/close state
//! machine, and sample routing.
//!
//! The forwarder is the single mutable root. User commands (make/remove,
//! open-all, close-all) and inbound analyzer messages are the only writers,
//! delivered in one totally ordered sequence by the owning event loop, so
//! every method is an atomic transition. All outbound analyzer calls are
//! fire-and-forget dispatches; open outcomes come back later through
//! [`process_message`](Forwarder::process_message).
//!
//! # Opening
//!
//! `open_all` transitions Idle -> Opening and dispatches an open for every
//! master. Children are only dispatched once their parent's handle is
//! known, so the engine re-runs after every promotion until no request is
//! left pending, at which point the forwarder is Open.
//!
//! # Removal and the deleted-while-pending race
//!
//! An inspector open cannot be cancelled. Removing an entity that is part
//! of an in-flight open sequence therefore tombstones it (`deleted`) and
//! defers the actual removal to the late completion, which is absorbed by
//! closing the freshly assigned handle without ever touching the consumer.

use std::collections::HashMap;
use std::rc::Rc;

use chanfwd_core::analyzer::Analyzer;
use chanfwd_core::config::InspectorConfig;
use chanfwd_core::consumer::ChannelConsumer;
use chanfwd_core::error::{Error, Result};
use chanfwd_core::msg::{InspectorMessage, SamplesMessage};
use chanfwd_core::types::{ChannelInfo, ChannelSpec, DemodKind, Handle, InspectorClass, RequestId};

use crate::tree::{ChannelDescription, ChannelId, ChannelTree, MasterChannel, MasterId};

/// Sample-delivery watermark programmed on every promoted channel.
const SAMPLES_WATERMARK: u64 = 12_000;

/// Config key that mutes a multicarrier inspector at the analyzer.
pub const MULTICARRIER_ENABLED_KEY: &str = "multicarrier.enabled";

/// Global forwarder state.
///
/// `Opening` covers both outstanding open requests and children still to be
/// dispatched under an already-open master; `Open` means every request has
/// been answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenState {
    Idle,
    Opening,
    Open,
}

/// The multi-channel inspector forwarder.
pub struct Forwarder {
    analyzer: Option<Rc<dyn Analyzer>>,
    state: OpenState,
    tree: ChannelTree,

    pending_masters: HashMap<RequestId, MasterId>,
    pending_channels: HashMap<RequestId, ChannelId>,
    open_masters: HashMap<Handle, MasterId>,
    open_channels: HashMap<Handle, ChannelId>,

    max_bandwidth: f64,
    errors: Vec<Error>,
    failed: bool,
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl Forwarder {
    /// Create a forwarder with no analyzer attached and no bandwidth cap.
    pub fn new() -> Self {
        Forwarder {
            analyzer: None,
            state: OpenState::Idle,
            tree: ChannelTree::new(),
            pending_masters: HashMap::new(),
            pending_channels: HashMap::new(),
            open_masters: HashMap::new(),
            open_channels: HashMap::new(),
            max_bandwidth: f64::INFINITY,
            errors: Vec::new(),
            failed: false,
        }
    }

    // -- Tree access ------------------------------------------------------

    /// Read access to the channel tree.
    pub fn tree(&self) -> &ChannelTree {
        &self.tree
    }

    /// Whether the tree holds no masters.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Look up a master by id.
    pub fn master(&self, id: MasterId) -> Option<&MasterChannel> {
        self.tree.master(id)
    }

    /// Look up a channel by id.
    pub fn channel(&self, id: ChannelId) -> Option<&ChannelDescription> {
        self.tree.channel(id)
    }

    /// Find a live master by name.
    pub fn find_master(&self, name: &str) -> Option<MasterId> {
        self.tree.find_master(name)
    }

    /// Find a live channel by name.
    pub fn find_channel(&self, name: &str) -> Option<ChannelId> {
        self.tree.find_channel(name)
    }

    /// First live master whose band contains the requested interval.
    pub fn find_master_covering(&self, frequency: f64, bandwidth: f64) -> Option<MasterId> {
        self.tree.find_master_covering(frequency, bandwidth)
    }

    // -- Error accumulation -----------------------------------------------

    /// Whether any error has been recorded since the last clear.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Errors recorded since the last clear, in occurrence order.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Drop all recorded errors and reset the failure flag.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
        self.failed = false;
    }

    fn record_error(&mut self, error: Error) {
        tracing::debug!(%error, "forwarder error");
        self.errors.push(error);
        self.failed = true;
    }

    // -- Configuration ----------------------------------------------------

    /// Set the maximum admissible channel bandwidth in hertz.
    ///
    /// Also bounds the filter headroom allocated for child inspectors.
    pub fn set_max_bandwidth(&mut self, max: f64) {
        self.max_bandwidth = max;
    }

    /// Rebind the forwarder to a different analyzer (or detach it).
    ///
    /// Swapping away from a live analyzer closes everything first; swapping
    /// in from a detached state only resets bookkeeping. Rebinding the same
    /// analyzer is a no-op.
    pub fn set_analyzer(&mut self, analyzer: Option<Rc<dyn Analyzer>>) -> Result<()> {
        let same = match (&self.analyzer, &analyzer) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        if same {
            return Ok(());
        }

        let result = if self.analyzer.is_some() {
            self.close_all()
        } else {
            self.reset();
            Ok(())
        };

        self.analyzer = analyzer;
        result
    }

    // -- Span and LO control ----------------------------------------------

    /// Frequency extent of the live master set in hertz; 0 when empty.
    pub fn span(&self) -> f64 {
        if self.tree.freq_max() < self.tree.freq_min() {
            0.0
        } else {
            self.tree.freq_max() - self.tree.freq_min()
        }
    }

    /// Midpoint of the live master set in hertz; 0 when empty.
    pub fn get_center(&self) -> f64 {
        if self.tree.freq_max() < self.tree.freq_min() {
            0.0
        } else {
            0.5 * (self.tree.freq_max() + self.tree.freq_min())
        }
    }

    /// Whether the configured tree fits the analyzer's sample rate.
    pub fn can_center(&self) -> bool {
        match &self.analyzer {
            Some(analyzer) => self.span() <= analyzer.source_info().sample_rate,
            None => false,
        }
    }

    /// Whether the current tuner passband strictly contains the tree.
    pub fn can_open(&self) -> bool {
        let Some(analyzer) = &self.analyzer else {
            return false;
        };
        if !self.can_center() {
            return false;
        }

        let info = analyzer.source_info();
        info.passband_min() < self.tree.freq_min() && self.tree.freq_max() < info.passband_max()
    }

    /// Retune the front-end to the tree's midpoint. Returns `false` when
    /// the tree cannot fit the sample rate.
    pub fn center(&self) -> Result<bool> {
        if !self.can_center() {
            return Ok(false);
        }
        let Some(analyzer) = &self.analyzer else {
            return Ok(false);
        };

        let target = self.get_center();
        tracing::debug!(frequency = target, "recentering tuner on master span");
        analyzer.set_frequency(target)?;
        Ok(true)
    }

    /// Push a fresh LO offset to every open master after a tuner move.
    ///
    /// Idempotent and cheap; safe to call on every source-info update.
    pub fn adjust_lo(&self) -> Result<()> {
        let Some(analyzer) = &self.analyzer else {
            return Ok(());
        };

        let info = analyzer.source_info();
        for (_, master) in self.tree.masters() {
            if let Some(handle) = master.handle {
                analyzer.set_inspector_freq(handle, master.frequency - info.frequency)?;
            }
        }
        Ok(())
    }

    // -- State queries ----------------------------------------------------

    /// Whether every configured inspector is open.
    pub fn is_open(&self) -> bool {
        self.state == OpenState::Open
    }

    /// Whether an open sequence is in progress.
    pub fn is_opening(&self) -> bool {
        self.state == OpenState::Opening
    }

    /// Whether at least one master holds a live handle.
    pub fn is_partially_open(&self) -> bool {
        self.tree.masters().any(|(_, m)| m.is_open())
    }

    // -- Tree mutation ----------------------------------------------------

    /// Create a new master channel.
    ///
    /// Fails with [`Error::DuplicateName`] when a live master of that name
    /// exists; the tree is unchanged and the error is also accumulated. If
    /// the forwarder is Open, the new master immediately joins the open
    /// sequence.
    pub fn make_master(&mut self, name: &str, frequency: f64, bandwidth: f64) -> Result<MasterId> {
        let id = match self.tree.insert_master(name, frequency, bandwidth) {
            Ok(id) => id,
            Err(e) => {
                self.record_error(e.clone());
                return Err(e);
            }
        };
        tracing::debug!(master = name, frequency, bandwidth, "master created");

        if self.state == OpenState::Open {
            self.state = OpenState::Opening;
        }
        if self.state == OpenState::Opening {
            self.keep_opening()?;
        }

        Ok(id)
    }

    /// Create a new sub-channel at an absolute frequency.
    ///
    /// The owning master is the first (in insertion order) live master
    /// whose band contains the request; the stored offset is relative to
    /// it. Fails with [`Error::BandwidthExceedsMax`], [`Error::NoCoveringMaster`]
    /// or [`Error::DuplicateName`], leaving the tree unchanged. On failure
    /// the consumer is dropped, not retained.
    pub fn make_channel(
        &mut self,
        name: &str,
        frequency: f64,
        bandwidth: f64,
        demod: DemodKind,
        output_rate: u32,
        consumer: Box<dyn ChannelConsumer>,
    ) -> Result<ChannelId> {
        if bandwidth > self.max_bandwidth {
            let e = Error::BandwidthExceedsMax {
                bandwidth,
                max: self.max_bandwidth,
            };
            self.record_error(e.clone());
            return Err(e);
        }

        let Some(parent) = self.tree.find_master_covering(frequency, bandwidth) else {
            let e = Error::NoCoveringMaster {
                frequency,
                bandwidth,
            };
            self.record_error(e.clone());
            return Err(e);
        };

        let offset = match self.tree.master(parent) {
            Some(master) => frequency - master.frequency,
            None => return Err(Error::NoCoveringMaster { frequency, bandwidth }),
        };

        let id = match self.tree.insert_channel(
            parent,
            name,
            offset,
            bandwidth,
            demod,
            output_rate,
            consumer,
        ) {
            Ok(id) => id,
            Err(e) => {
                self.record_error(e.clone());
                return Err(e);
            }
        };
        tracing::debug!(channel = name, frequency, bandwidth, %demod, "channel created");

        if self.state == OpenState::Open {
            self.state = OpenState::Opening;
        }
        if self.state == OpenState::Opening {
            self.keep_opening()?;
        }

        Ok(id)
    }

    /// Remove a master (and its channels).
    ///
    /// Returns `true` when the removal completed synchronously. A master
    /// participating in an in-flight open sequence is tombstoned instead
    /// and reaped on the late completion (`false`). Closing an open
    /// master's inspector cascades to its children on the analyzer; the
    /// children are reaped locally without `closed()` callbacks.
    pub fn remove_master(&mut self, id: MasterId) -> bool {
        let (handle, participating) = match self.tree.master(id) {
            Some(master) => (master.handle, self.state != OpenState::Idle),
            None => return true,
        };

        match handle {
            Some(h) => {
                if let Some(analyzer) = &self.analyzer {
                    if let Err(error) = analyzer.close_inspector(h) {
                        tracing::warn!(%error, handle = %h, "master close dispatch failed");
                    }
                }
                self.delete_master(id);
                true
            }
            None if participating => {
                if let Some(master) = self.tree.master_mut(id) {
                    master.deleted = true;
                    tracing::debug!(master = %master.name, "master removal deferred");
                }
                false
            }
            None => {
                self.delete_master(id);
                true
            }
        }
    }

    /// Remove a sub-channel.
    ///
    /// Returns `true` when the removal completed synchronously; see
    /// [`remove_master`](Forwarder::remove_master) for the deferred case.
    pub fn remove_channel(&mut self, id: ChannelId) -> bool {
        let (handle, participating) = match self.tree.channel(id) {
            Some(channel) => (channel.handle, self.state != OpenState::Idle),
            None => return true,
        };

        match handle {
            Some(h) => {
                if let Some(analyzer) = &self.analyzer {
                    if let Err(error) = analyzer.close_inspector(h) {
                        tracing::warn!(%error, handle = %h, "channel close dispatch failed");
                    }
                }
                self.delete_channel(id);
                true
            }
            None if participating => {
                if let Some(channel) = self.tree.channel_mut(id) {
                    channel.deleted = true;
                    tracing::debug!(channel = %channel.name, "channel removal deferred");
                }
                false
            }
            None => {
                self.delete_channel(id);
                true
            }
        }
    }

    /// Remove every master. Returns `true` iff all removals were
    /// synchronous; a single deferred removal makes the whole operation
    /// deferred.
    pub fn remove_all(&mut self) -> bool {
        let mut all_synchronous = true;
        for id in self.tree.master_ids() {
            all_synchronous &= self.remove_master(id);
        }
        all_synchronous
    }

    // -- Open/close engine ------------------------------------------------

    /// Start opening every configured inspector. Legal only when Idle (a
    /// no-op otherwise) and with an analyzer attached.
    pub fn open_all(&mut self) -> Result<()> {
        if self.analyzer.is_some() && self.state == OpenState::Idle {
            self.state = OpenState::Opening;
            tracing::debug!("opening all masters");
            self.keep_opening()?;
        }
        Ok(())
    }

    /// Close every open inspector and return to Idle.
    ///
    /// Valid from any state and the only path back to Idle. Pending
    /// requests are not awaited: maps and tombstones are dropped outright.
    /// Every channel consumer that saw `opened` sees `closed` here.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_error = None;

        if let Some(analyzer) = self.analyzer.clone() {
            for id in self.tree.master_ids() {
                let handle = self.tree.master(id).and_then(|m| m.handle);
                if let Some(handle) = handle {
                    if let Err(e) = analyzer.close_inspector(handle) {
                        first_error.get_or_insert(e);
                    }
                    if let Some(master) = self.tree.master_mut(id) {
                        master.handle = None;
                        master.open_count = 0;
                    }
                }
            }

            for id in self.tree.channel_ids() {
                if let Some(channel) = self.tree.channel_mut(id) {
                    if channel.handle.take().is_some() {
                        channel.consumer.closed();
                    }
                }
            }
        }

        self.reset();
        tracing::debug!("all inspectors closed");

        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Drop all request bookkeeping, reap tombstones, and return to Idle.
    fn reset(&mut self) {
        for id in self.tree.master_ids() {
            let deleted = match self.tree.master(id) {
                Some(master) => master.deleted,
                None => continue,
            };
            if deleted {
                self.tree.remove_master(id);
                continue;
            }

            if let Some(master) = self.tree.master_mut(id) {
                master.handle = None;
                master.pending = None;
                master.open_count = 0;
            }
            for cid in self.tree.channel_ids_of(id) {
                let deleted = match self.tree.channel(cid) {
                    Some(channel) => channel.deleted,
                    None => continue,
                };
                if deleted {
                    self.tree.remove_channel(cid);
                } else if let Some(channel) = self.tree.channel_mut(cid) {
                    channel.handle = None;
                    channel.pending = None;
                }
            }
        }

        self.pending_masters.clear();
        self.pending_channels.clear();
        self.open_masters.clear();
        self.open_channels.clear();

        self.state = OpenState::Idle;
        self.clear_errors();
    }

    /// Drive the open sequence forward: dispatch an open for every master
    /// without one, and for every not-yet-open child under an open master.
    fn keep_opening(&mut self) -> Result<()> {
        if self.state == OpenState::Open {
            return Ok(());
        }
        let Some(analyzer) = self.analyzer.clone() else {
            return Ok(());
        };

        if self.tree.is_empty() {
            self.state = OpenState::Open;
            return Ok(());
        }

        for id in self.tree.master_ids() {
            let (open, opening, fully_open, frequency, bandwidth, handle) =
                match self.tree.master(id) {
                    Some(m) => (
                        m.is_open(),
                        m.is_opening(),
                        m.is_fully_open(),
                        m.frequency,
                        m.bandwidth,
                        m.handle,
                    ),
                    None => continue,
                };

            if !open && !opening {
                let info = analyzer.source_info();
                let request = analyzer.allocate_request_id();
                let spec = ChannelSpec {
                    fc: frequency - info.frequency,
                    f_low: -bandwidth / 2.0,
                    f_high: bandwidth / 2.0,
                    bandwidth,
                    ft: 0.0,
                };

                analyzer.open(InspectorClass::Multicarrier, &spec, request)?;
                self.pending_masters.insert(request, id);
                if let Some(master) = self.tree.master_mut(id) {
                    master.pending = Some(request);
                    tracing::debug!(master = %master.name, %request, "master open dispatched");
                }
            }

            if open && !fully_open {
                let parent_handle = match handle {
                    Some(h) => h,
                    None => continue,
                };

                for cid in self.tree.channel_ids_of(id) {
                    let (chan_open, chan_opening, offset, class) = match self.tree.channel(cid) {
                        Some(c) => (
                            c.is_open(),
                            c.is_opening(),
                            c.offset,
                            c.demod.inspector_class(),
                        ),
                        None => continue,
                    };
                    if chan_open || chan_opening {
                        continue;
                    }

                    // Allocate with headroom beyond the user's filter so
                    // the analyzer keeps room for the transition bands;
                    // the filter is tightened back on promotion.
                    let extra_room = self.max_bandwidth.min(bandwidth);
                    let request = analyzer.allocate_request_id();
                    let spec = ChannelSpec {
                        fc: offset,
                        f_low: -extra_room / 2.0,
                        f_high: extra_room / 2.0,
                        bandwidth: extra_room,
                        ft: 0.0,
                    };

                    analyzer.open_ex(class, &spec, true, parent_handle, request)?;
                    self.pending_channels.insert(request, cid);
                    if let Some(channel) = self.tree.channel_mut(cid) {
                        channel.pending = Some(request);
                        tracing::debug!(channel = %channel.name, %request, "channel open dispatched");
                    }
                }
            }
        }

        Ok(())
    }

    /// Consume one inspector protocol message. Returns whether anything
    /// observable changed. Only meaningful while Opening.
    pub fn process_message(&mut self, msg: &InspectorMessage) -> Result<bool> {
        if self.state != OpenState::Opening {
            return Ok(false);
        }

        let mut changes = false;

        match msg {
            InspectorMessage::Opened {
                request,
                handle,
                config,
                equiv_sample_rate,
            } => {
                if self.promote_master(*request, *handle, config)? {
                    changes = true;
                } else if self.pending_channels.contains_key(request) {
                    changes = self.promote_channel(*request, *handle, config, *equiv_sample_rate)?;
                }

                if changes {
                    self.keep_opening()?;
                }

                let opened = self.pending_masters.is_empty() && self.pending_channels.is_empty();
                self.state = if opened {
                    OpenState::Open
                } else {
                    OpenState::Opening
                };
            }

            InspectorMessage::WrongHandle { request } => {
                // A wrong handle on a master request would be an analyzer
                // bug; only child opens carry a parent handle.
                if self.pending_channels.contains_key(request) {
                    self.close_all()?;
                    self.record_error(Error::ProtocolFailure(
                        "failed to open subcarrier inspector (wrong handle)".into(),
                    ));
                    changes = true;
                }
            }

            InspectorMessage::InvalidChannel { request } => {
                if self.pending_channels.contains_key(request)
                    || self.pending_masters.contains_key(request)
                {
                    self.close_all()?;
                    self.record_error(Error::ProtocolFailure(
                        "failed to open a channel (invalid limits?)".into(),
                    ));
                    changes = true;
                }
            }
        }

        Ok(changes)
    }

    /// Route a sample burst to the owning channel's consumer. Returns
    /// `false` when the inspector id is unknown (never fatal).
    pub fn feed_samples(&mut self, msg: &SamplesMessage) -> bool {
        let Some(&id) = self.open_channels.get(&msg.inspector_id) else {
            return false;
        };
        let Some(channel) = self.tree.channel_mut(id) else {
            return false;
        };

        channel.consumer.samples(&msg.samples);
        true
    }

    fn promote_master(
        &mut self,
        request: RequestId,
        handle: Handle,
        config: &InspectorConfig,
    ) -> Result<bool> {
        let Some(id) = self.pending_masters.remove(&request) else {
            return Ok(false);
        };
        let Some(analyzer) = self.analyzer.clone() else {
            return Ok(false);
        };

        let deleted = match self.tree.master(id) {
            Some(master) => master.deleted,
            None => return Ok(false),
        };
        if deleted {
            // Removed while the open was in flight: close the fresh handle
            // silently and reap the whole master.
            tracing::debug!(%handle, "reaping tombstoned master on late open");
            analyzer.close_inspector(handle)?;
            self.delete_master(id);
            return Ok(false);
        }

        let mut disabled_config = None;
        if let Some(master) = self.tree.master_mut(id) {
            master.pending = None;
            master.handle = Some(handle);
            master.config = config.clone();
            if !master.enabled {
                master.config.set_bool(MULTICARRIER_ENABLED_KEY, false);
                disabled_config = Some(master.config.clone());
            }
            tracing::debug!(master = %master.name, %handle, "master inspector opened");
        }
        self.open_masters.insert(handle, id);

        if let Some(config) = disabled_config {
            analyzer.set_inspector_config(handle, &config)?;
        }

        Ok(true)
    }

    fn promote_channel(
        &mut self,
        request: RequestId,
        handle: Handle,
        config: &InspectorConfig,
        equiv_sample_rate: f64,
    ) -> Result<bool> {
        let Some(id) = self.pending_channels.remove(&request) else {
            return Ok(false);
        };
        let Some(analyzer) = self.analyzer.clone() else {
            return Ok(false);
        };

        let deleted = match self.tree.channel(id) {
            Some(channel) => channel.deleted,
            None => return Ok(false),
        };
        if deleted {
            tracing::debug!(%handle, "reaping tombstoned channel on late open");
            analyzer.close_inspector(handle)?;
            self.delete_channel(id);
            return Ok(false);
        }

        let (parent, info) = match self.tree.channel_mut(id) {
            Some(channel) => {
                channel.pending = None;
                channel.handle = Some(handle);
                channel.samp_rate = equiv_sample_rate;
                (
                    channel.parent,
                    ChannelInfo {
                        name: channel.name.clone(),
                        offset: channel.offset,
                        bandwidth: channel.bandwidth,
                        samp_rate: equiv_sample_rate,
                        demod: channel.demod,
                    },
                )
            }
            None => return Ok(false),
        };

        if let Some(master) = self.tree.master_mut(parent) {
            master.open_count += 1;
        }
        self.open_channels.insert(handle, id);

        // Samples arrive tagged with the handle itself; tighten the filter
        // from the allocation headroom back to the user's bandwidth.
        analyzer.set_inspector_id(handle, handle.raw())?;
        analyzer.set_inspector_bandwidth(handle, info.bandwidth)?;

        if let Some(channel) = self.tree.channel_mut(id) {
            channel
                .consumer
                .opened(analyzer.as_ref(), handle, &info, config)?;
        }
        analyzer.set_inspector_watermark(handle, SAMPLES_WATERMARK)?;
        tracing::debug!(channel = %info.name, %handle, "channel inspector opened");

        Ok(true)
    }

    /// Remove a channel entity and every map entry referring to it.
    fn delete_channel(&mut self, id: ChannelId) {
        if let Some(channel) = self.tree.channel(id) {
            if let Some(handle) = channel.handle {
                self.open_channels.remove(&handle);
            }
            if let Some(request) = channel.pending {
                self.pending_channels.remove(&request);
            }
        }
        self.tree.remove_channel(id);
    }

    /// Remove a master entity, its channels, and every map entry referring
    /// to any of them.
    fn delete_master(&mut self, id: MasterId) {
        for cid in self.tree.channel_ids_of(id) {
            if let Some(channel) = self.tree.channel(cid) {
                if let Some(handle) = channel.handle {
                    self.open_channels.remove(&handle);
                }
                if let Some(request) = channel.pending {
                    self.pending_channels.remove(&request);
                }
            }
        }
        if let Some(master) = self.tree.master(id) {
            if let Some(handle) = master.handle {
                self.open_masters.remove(&handle);
            }
            if let Some(request) = master.pending {
                self.pending_masters.remove(&request);
            }
        }
        self.tree.remove_master(id);
    }

    // -- Enable state and config push -------------------------------------

    /// Push a master's current config blob to its open inspector.
    pub fn update_master_config(&self, id: MasterId) -> Result<()> {
        let Some(analyzer) = &self.analyzer else {
            return Ok(());
        };
        if let Some(master) = self.tree.master(id) {
            if let Some(handle) = master.handle {
                analyzer.set_inspector_config(handle, &master.config)?;
            }
        }
        Ok(())
    }

    /// Toggle a master's enabled flag, muting or unmuting it at the
    /// analyzer when open.
    pub fn set_master_enabled(&mut self, id: MasterId, enabled: bool) -> Result<()> {
        let changed = match self.tree.master_mut(id) {
            Some(master) if master.enabled != enabled => {
                master.enabled = enabled;
                master.config.set_bool(MULTICARRIER_ENABLED_KEY, enabled);
                true
            }
            _ => false,
        };

        if changed {
            self.update_master_config(id)?;
        }
        Ok(())
    }

    /// Toggle a channel's enabled flag on its consumer.
    pub fn set_channel_enabled(&mut self, id: ChannelId, enabled: bool) {
        if let Some(channel) = self.tree.channel_mut(id) {
            channel.consumer.set_enabled(enabled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use chanfwd_core::types::SourceInfo;
    use chanfwd_test_harness::{AnalyzerCall, ConsumerEvent, MockAnalyzer, RecordingConsumer};
    use num_complex::Complex32;

    fn source() -> SourceInfo {
        SourceInfo {
            frequency: 100e6,
            sample_rate: 2e6,
            lnb_frequency: 0.0,
        }
    }

    fn mock() -> Rc<MockAnalyzer> {
        Rc::new(MockAnalyzer::new(source()))
    }

    fn forwarder_with(analyzer: &Rc<MockAnalyzer>) -> Forwarder {
        let mut fwd = Forwarder::new();
        fwd.set_analyzer(Some(analyzer.clone() as Rc<dyn Analyzer>))
            .unwrap();
        fwd
    }

    fn opened(request: RequestId, handle: Handle, rate: f64) -> InspectorMessage {
        InspectorMessage::Opened {
            request,
            handle,
            config: InspectorConfig::new(),
            equiv_sample_rate: rate,
        }
    }

    #[test]
    fn happy_open_path() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        let m = fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, log) = RecordingConsumer::new();
        let c = fwd
            .make_channel(
                "c",
                100_050_000.0,
                12_500.0,
                DemodKind::AudioFm,
                48_000,
                Box::new(sink),
            )
            .unwrap();

        fwd.open_all().unwrap();
        assert!(fwd.is_opening());

        // Only the master open goes out first; the child waits for its
        // parent's handle.
        let opens = analyzer.open_requests();
        assert_eq!(opens.len(), 1);
        assert_eq!(opens[0].class, InspectorClass::Multicarrier);
        assert_eq!(opens[0].spec.fc, 0.0);
        assert_eq!(opens[0].spec.f_low, -100e3);
        assert_eq!(opens[0].spec.f_high, 100e3);

        let h1 = Handle::from_raw(0x10);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();
        assert!(fwd.is_opening());

        let opens = analyzer.open_requests();
        assert_eq!(opens.len(), 2);
        let child = &opens[1];
        assert_eq!(child.class, InspectorClass::Audio);
        assert_eq!(child.parent, Some(h1));
        assert_eq!(child.spec.fc, 50_000.0);
        // No cap configured: headroom equals the parent's bandwidth.
        assert_eq!(child.spec.bandwidth, 200e3);

        let h2 = Handle::from_raw(0x11);
        let changed = fwd.process_message(&opened(child.request, h2, 48_000.0)).unwrap();
        assert!(changed);
        assert!(fwd.is_open());
        assert!(fwd.is_partially_open());

        assert_eq!(log.opened_count(), 1);
        assert_eq!(
            log.events()[0],
            ConsumerEvent::Opened {
                handle: h2,
                samp_rate: 48_000.0
            }
        );
        assert_eq!(fwd.channel(c).unwrap().samp_rate, 48_000.0);
        assert_eq!(fwd.master(m).unwrap().open_count, 1);

        let calls = analyzer.calls();
        assert!(calls.contains(&AnalyzerCall::SetInspectorId {
            handle: h2,
            id: h2.raw()
        }));
        assert!(calls.contains(&AnalyzerCall::SetInspectorBandwidth {
            handle: h2,
            bandwidth: 12_500.0
        }));
        assert!(calls.contains(&AnalyzerCall::SetInspectorWatermark {
            handle: h2,
            watermark: 12_000
        }));
    }

    #[test]
    fn channel_removed_while_pending_is_reaped_on_late_open() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        let m = fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, log) = RecordingConsumer::new();
        let c = fwd
            .make_channel(
                "c",
                100_050_000.0,
                12_500.0,
                DemodKind::AudioUsb,
                48_000,
                Box::new(sink),
            )
            .unwrap();

        fwd.open_all().unwrap();

        // Removal while the open sequence is in flight defers.
        assert!(!fwd.remove_channel(c));
        // Still in the tree as a tombstone, but absent from lookups.
        assert_eq!(fwd.find_channel("c"), None);

        let opens = analyzer.open_requests();
        let h1 = Handle::from_raw(0x20);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();

        // The tombstoned channel is still dispatched so its late
        // completion can be absorbed.
        let opens = analyzer.open_requests();
        assert_eq!(opens.len(), 2);

        let h2 = Handle::from_raw(0x21);
        fwd.process_message(&opened(opens[1].request, h2, 48_000.0)).unwrap();

        assert!(analyzer.closed_handles().contains(&h2));
        assert!(fwd.channel(c).is_none());
        assert_eq!(log.opened_count(), 0);
        assert_eq!(log.closed_count(), 0);
        assert!(fwd.is_open());
        assert_eq!(fwd.master(m).unwrap().open_count, 0);
        assert!(fwd.master(m).unwrap().channels.is_empty());
    }

    #[test]
    fn over_wide_channel_is_rejected() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);
        fwd.set_max_bandwidth(200e3);

        fwd.make_master("M", 100e6, 500e3).unwrap();

        let (sink, log) = RecordingConsumer::new();
        let err = fwd
            .make_channel(
                "c",
                100e6,
                300e3,
                DemodKind::AudioFm,
                48_000,
                Box::new(sink),
            )
            .unwrap_err();

        assert!(matches!(err, Error::BandwidthExceedsMax { .. }));
        assert!(fwd.failed());
        assert!(matches!(
            fwd.errors()[0],
            Error::BandwidthExceedsMax {
                bandwidth,
                max
            } if bandwidth == 300e3 && max == 200e3
        ));
        // Tree unchanged, consumer never invoked.
        assert_eq!(fwd.find_channel("c"), None);
        assert!(log.events().is_empty());
    }

    #[test]
    fn passband_boundary_and_recentering() {
        let analyzer = Rc::new(MockAnalyzer::new(SourceInfo {
            frequency: 100e6,
            sample_rate: 500e3,
            lnb_frequency: 0.0,
        }));
        let mut fwd = forwarder_with(&analyzer);

        // Band edges 99.85 and 100.15 MHz.
        fwd.make_master("A", 99_950_000.0, 200e3).unwrap();
        fwd.make_master("B", 100_050_000.0, 200e3).unwrap();

        assert_eq!(fwd.span(), 300e3);
        assert!(fwd.can_center());
        assert!(fwd.can_open());

        // Retune shifts the passband edge onto the span edge; strict
        // containment no longer holds.
        analyzer.set_source_info(SourceInfo {
            frequency: 100_100_000.0,
            sample_rate: 500e3,
            lnb_frequency: 0.0,
        });
        assert!(fwd.can_center());
        assert!(!fwd.can_open());

        assert!(fwd.center().unwrap());
        assert_eq!(analyzer.retunes(), vec![100e6]);
    }

    #[test]
    fn invalid_channel_failure_closes_all() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, log) = RecordingConsumer::new();
        fwd.make_channel(
            "c",
            100_050_000.0,
            12_500.0,
            DemodKind::AudioFm,
            48_000,
            Box::new(sink),
        )
        .unwrap();

        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        let h1 = Handle::from_raw(0x30);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();

        let opens = analyzer.open_requests();
        let changed = fwd
            .process_message(&InspectorMessage::InvalidChannel {
                request: opens[1].request,
            })
            .unwrap();
        assert!(changed);

        // Everything was torn down: the open master was closed on the
        // analyzer, the forwarder is Idle, and the tree is intact.
        assert!(analyzer.closed_handles().contains(&h1));
        assert!(fwd.failed());
        assert!(matches!(fwd.errors()[0], Error::ProtocolFailure(_)));
        assert!(!fwd.is_open());
        assert!(!fwd.is_opening());
        assert!(!fwd.is_partially_open());
        assert!(fwd.find_master("M").is_some());
        assert!(fwd.find_channel("c").is_some());
        // The channel never opened, so no closed() callback.
        assert_eq!(log.closed_count(), 0);
    }

    #[test]
    fn wrong_handle_on_channel_closes_all() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, _log) = RecordingConsumer::new();
        fwd.make_channel(
            "c",
            100_050_000.0,
            12_500.0,
            DemodKind::Raw,
            48_000,
            Box::new(sink),
        )
        .unwrap();

        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        fwd.process_message(&opened(opens[0].request, Handle::from_raw(1), 0.0))
            .unwrap();

        let opens = analyzer.open_requests();
        let changed = fwd
            .process_message(&InspectorMessage::WrongHandle {
                request: opens[1].request,
            })
            .unwrap();
        assert!(changed);
        assert!(fwd.failed());
        assert!(!fwd.is_opening());
    }

    #[test]
    fn wrong_handle_on_master_is_ignored() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        fwd.open_all().unwrap();

        let opens = analyzer.open_requests();
        let changed = fwd
            .process_message(&InspectorMessage::WrongHandle {
                request: opens[0].request,
            })
            .unwrap();

        assert!(!changed);
        assert!(!fwd.failed());
        assert!(fwd.is_opening());
    }

    #[test]
    fn messages_ignored_while_idle() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);
        fwd.make_master("M", 100e6, 200e3).unwrap();

        let changed = fwd
            .process_message(&opened(RequestId::from_raw(99), Handle::from_raw(1), 0.0))
            .unwrap();
        assert!(!changed);
        assert!(!fwd.is_open());
    }

    #[test]
    fn duplicate_master_rejected_and_recorded() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        let err = fwd.make_master("M", 101e6, 200e3).unwrap_err();

        assert!(matches!(err, Error::DuplicateName(_)));
        assert!(fwd.failed());
        assert_eq!(fwd.tree().master_ids().len(), 1);
    }

    #[test]
    fn channel_outside_masters_rejected() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);
        fwd.make_master("M", 100e6, 200e3).unwrap();

        let (sink, _log) = RecordingConsumer::new();
        let err = fwd
            .make_channel(
                "c",
                101e6,
                10e3,
                DemodKind::AudioFm,
                48_000,
                Box::new(sink),
            )
            .unwrap_err();

        assert!(matches!(err, Error::NoCoveringMaster { .. }));
        assert!(fwd.failed());
        assert_eq!(fwd.find_channel("c"), None);
    }

    #[test]
    fn open_all_on_empty_tree_is_open() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.open_all().unwrap();
        assert!(fwd.is_open());
        assert!(analyzer.open_requests().is_empty());
    }

    #[test]
    fn open_all_is_noop_while_opening() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);
        fwd.make_master("M", 100e6, 200e3).unwrap();

        fwd.open_all().unwrap();
        fwd.open_all().unwrap();
        assert_eq!(analyzer.open_requests().len(), 1);
    }

    #[test]
    fn make_master_while_open_joins_sequence() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M1", 100e6, 200e3).unwrap();
        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        fwd.process_message(&opened(opens[0].request, Handle::from_raw(1), 0.0))
            .unwrap();
        assert!(fwd.is_open());

        // A new master flips the forwarder back to Opening and dispatches
        // immediately.
        fwd.make_master("M2", 100_500_000.0, 200e3).unwrap();
        assert!(fwd.is_opening());
        let opens = analyzer.open_requests();
        assert_eq!(opens.len(), 2);

        fwd.process_message(&opened(opens[1].request, Handle::from_raw(2), 0.0))
            .unwrap();
        assert!(fwd.is_open());
    }

    #[test]
    fn master_removed_while_pending_is_reaped_on_late_open() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        let m = fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, log) = RecordingConsumer::new();
        fwd.make_channel(
            "c",
            100_050_000.0,
            12_500.0,
            DemodKind::AudioFm,
            48_000,
            Box::new(sink),
        )
        .unwrap();

        fwd.open_all().unwrap();
        assert!(!fwd.remove_master(m));
        assert_eq!(fwd.find_master("M"), None);

        let opens = analyzer.open_requests();
        let h1 = Handle::from_raw(0x40);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();

        // The fresh handle was closed and the master is gone, children
        // included; with nothing pending the forwarder is Open.
        assert!(analyzer.closed_handles().contains(&h1));
        assert!(fwd.master(m).is_none());
        assert_eq!(fwd.find_channel("c"), None);
        assert_eq!(log.opened_count(), 0);
        assert!(fwd.is_open());
    }

    #[test]
    fn remove_open_master_cascades() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        let m = fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, log) = RecordingConsumer::new();
        fwd.make_channel(
            "c",
            100_050_000.0,
            12_500.0,
            DemodKind::AudioFm,
            48_000,
            Box::new(sink),
        )
        .unwrap();

        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        let h1 = Handle::from_raw(0x50);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();
        let opens = analyzer.open_requests();
        let h2 = Handle::from_raw(0x51);
        fwd.process_message(&opened(opens[1].request, h2, 48_000.0)).unwrap();
        assert!(fwd.is_open());

        // Synchronous: only the master's handle is closed (the analyzer
        // cascades); children are reaped locally without closed().
        assert!(fwd.remove_master(m));
        assert_eq!(analyzer.closed_handles(), vec![h1]);
        assert!(fwd.is_empty());
        assert!(!fwd.is_partially_open());
        assert_eq!(log.closed_count(), 0);

        // The reaped channel's handle no longer routes samples.
        assert!(!fwd.feed_samples(&SamplesMessage {
            inspector_id: h2,
            samples: vec![Complex32::new(0.0, 0.0); 4],
        }));
    }

    #[test]
    fn remove_all_reports_deferred_removals() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M1", 100e6, 200e3).unwrap();
        fwd.make_master("M2", 100_500_000.0, 200e3).unwrap();

        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        // Only M1 promotes; M2 stays pending.
        fwd.process_message(&opened(opens[0].request, Handle::from_raw(1), 0.0))
            .unwrap();

        assert!(!fwd.remove_all());
        // M1 went synchronously, M2 is a tombstone.
        assert_eq!(fwd.find_master("M1"), None);
        assert_eq!(fwd.find_master("M2"), None);
        assert!(!fwd.is_empty());

        let opens = analyzer.open_requests();
        fwd.process_message(&opened(opens[1].request, Handle::from_raw(2), 0.0))
            .unwrap();
        assert!(fwd.is_empty());
    }

    #[test]
    fn remove_all_synchronous_when_idle() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M1", 100e6, 200e3).unwrap();
        let (sink, _log) = RecordingConsumer::new();
        fwd.make_channel(
            "c",
            100_050_000.0,
            12_500.0,
            DemodKind::Raw,
            48_000,
            Box::new(sink),
        )
        .unwrap();

        assert!(fwd.remove_all());
        assert!(fwd.is_empty());
        assert_eq!(fwd.span(), 0.0);
    }

    #[test]
    fn feed_samples_routes_to_consumer() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, log) = RecordingConsumer::new();
        fwd.make_channel(
            "c",
            100_050_000.0,
            12_500.0,
            DemodKind::Raw,
            48_000,
            Box::new(sink),
        )
        .unwrap();

        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        let h1 = Handle::from_raw(0x60);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();
        let opens = analyzer.open_requests();
        let h2 = Handle::from_raw(0x61);
        fwd.process_message(&opened(opens[1].request, h2, 250e3)).unwrap();

        assert!(fwd.feed_samples(&SamplesMessage {
            inspector_id: h2,
            samples: vec![Complex32::new(1.0, -1.0); 1024],
        }));
        assert_eq!(log.total_samples(), 1024);

        // Unknown inspector ids are non-fatal.
        assert!(!fwd.feed_samples(&SamplesMessage {
            inspector_id: Handle::from_raw(0x999),
            samples: vec![Complex32::new(0.0, 0.0); 8],
        }));
    }

    #[test]
    fn close_all_fires_closed_and_returns_to_idle() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, log) = RecordingConsumer::new();
        fwd.make_channel(
            "c",
            100_050_000.0,
            12_500.0,
            DemodKind::AudioFm,
            48_000,
            Box::new(sink),
        )
        .unwrap();

        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        let h1 = Handle::from_raw(0x70);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();
        let opens = analyzer.open_requests();
        let h2 = Handle::from_raw(0x71);
        fwd.process_message(&opened(opens[1].request, h2, 48e3)).unwrap();

        fwd.close_all().unwrap();

        assert!(analyzer.closed_handles().contains(&h1));
        assert_eq!(log.closed_count(), 1);
        assert!(!fwd.is_open());
        assert!(!fwd.is_opening());
        // The tree itself survives a close.
        assert!(fwd.find_master("M").is_some());
        assert!(fwd.find_channel("c").is_some());
        assert_eq!(fwd.master(fwd.find_master("M").unwrap()).unwrap().open_count, 0);
    }

    #[test]
    fn request_and_handle_maps_stay_exclusive() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, _log) = RecordingConsumer::new();
        fwd.make_channel(
            "c",
            100_050_000.0,
            12_500.0,
            DemodKind::AudioFm,
            48_000,
            Box::new(sink),
        )
        .unwrap();

        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        for open in &opens {
            let in_masters = fwd.pending_masters.contains_key(&open.request);
            let in_channels = fwd.pending_channels.contains_key(&open.request);
            assert!(in_masters != in_channels);
        }

        let h1 = Handle::from_raw(0x80);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();
        assert!(!fwd.pending_masters.contains_key(&opens[0].request));
        assert!(fwd.open_masters.contains_key(&h1));
        assert!(!fwd.open_channels.contains_key(&h1));

        let opens = analyzer.open_requests();
        let h2 = Handle::from_raw(0x81);
        fwd.process_message(&opened(opens[1].request, h2, 48e3)).unwrap();

        // Global-state law: Open implies no pending requests.
        assert!(fwd.is_open());
        assert!(fwd.pending_masters.is_empty());
        assert!(fwd.pending_channels.is_empty());
    }

    #[test]
    fn adjust_lo_pushes_new_offsets() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        let h1 = Handle::from_raw(0x90);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();

        analyzer.set_source_info(SourceInfo {
            frequency: 100_020_000.0,
            sample_rate: 2e6,
            lnb_frequency: 0.0,
        });
        fwd.adjust_lo().unwrap();

        assert!(analyzer.calls().contains(&AnalyzerCall::SetInspectorFreq {
            handle: h1,
            frequency: -20_000.0
        }));
    }

    #[test]
    fn disabled_master_is_muted_on_promote() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        let m = fwd.make_master("M", 100e6, 200e3).unwrap();
        fwd.set_master_enabled(m, false).unwrap();

        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        let h1 = Handle::from_raw(0xa0);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();

        let pushed = analyzer.calls().into_iter().find_map(|call| match call {
            AnalyzerCall::SetInspectorConfig { handle, config } if handle == h1 => Some(config),
            _ => None,
        });
        let pushed = pushed.expect("disable setting should be pushed");
        assert_eq!(pushed.get_bool(MULTICARRIER_ENABLED_KEY), Some(false));
    }

    #[test]
    fn set_master_enabled_pushes_config_when_open() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        let m = fwd.make_master("M", 100e6, 200e3).unwrap();
        fwd.open_all().unwrap();
        let opens = analyzer.open_requests();
        let h1 = Handle::from_raw(0xb0);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();
        analyzer.take_calls();

        fwd.set_master_enabled(m, false).unwrap();
        let calls = analyzer.calls();
        assert!(matches!(
            &calls[..],
            [AnalyzerCall::SetInspectorConfig { handle, .. }] if *handle == h1
        ));

        // No transition, no push.
        analyzer.take_calls();
        fwd.set_master_enabled(m, false).unwrap();
        assert!(analyzer.calls().is_empty());
    }

    #[test]
    fn set_channel_enabled_reaches_consumer() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        let (sink, log) = RecordingConsumer::new();
        let c = fwd
            .make_channel(
                "c",
                100_050_000.0,
                12_500.0,
                DemodKind::Raw,
                48_000,
                Box::new(sink),
            )
            .unwrap();

        fwd.set_channel_enabled(c, false);
        fwd.set_channel_enabled(c, false);
        fwd.set_channel_enabled(c, true);

        assert_eq!(
            log.events(),
            vec![
                ConsumerEvent::EnableChanged(false),
                ConsumerEvent::EnableChanged(true),
            ]
        );
    }

    #[test]
    fn set_analyzer_swap_closes_everything_on_the_old_one() {
        let first = mock();
        let mut fwd = forwarder_with(&first);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        fwd.open_all().unwrap();
        let opens = first.open_requests();
        let h1 = Handle::from_raw(0xc0);
        fwd.process_message(&opened(opens[0].request, h1, 0.0)).unwrap();
        assert!(fwd.is_open());

        let second = mock();
        fwd.set_analyzer(Some(second.clone() as Rc<dyn Analyzer>))
            .unwrap();

        assert!(first.closed_handles().contains(&h1));
        assert!(!fwd.is_open());
        assert!(second.calls().is_empty());

        // Rebinding the same analyzer is a no-op.
        fwd.set_analyzer(Some(second.clone() as Rc<dyn Analyzer>))
            .unwrap();
        assert!(second.calls().is_empty());
    }

    #[test]
    fn errors_can_be_cleared() {
        let analyzer = mock();
        let mut fwd = forwarder_with(&analyzer);

        fwd.make_master("M", 100e6, 200e3).unwrap();
        let _ = fwd.make_master("M", 100e6, 200e3);
        assert!(fwd.failed());
        assert_eq!(fwd.errors().len(), 1);

        fwd.clear_errors();
        assert!(!fwd.failed());
        assert!(fwd.errors().is_empty());
    }

    #[test]
    fn can_open_requires_analyzer() {
        let fwd = Forwarder::new();
        assert!(!fwd.can_center());
        assert!(!fwd.can_open());
    }
}
