//! Core types used throughout chanfwd.
//!
//! These types provide an analyzer-agnostic abstraction over the inspector
//! protocol: opaque handles and request ids, inspector classes, demodulator
//! selection, and the channel descriptors exchanged with the analyzer.

use std::fmt;
use std::str::FromStr;

/// Opaque inspector handle.
///
/// Assigned by the analyzer on a successful open and used to route all
/// subsequent control calls and sample bursts. A closed entity holds no
/// handle (`Option<Handle>` on the tree side), so there is no sentinel
/// value to compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    /// Create a handle from the raw analyzer-assigned id.
    pub fn from_raw(raw: u64) -> Self {
        Handle(raw)
    }

    /// Return the raw analyzer-assigned id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Opaque request correlation id.
///
/// Allocated by the analyzer adapter before an open is dispatched, and
/// echoed back in the eventual `Opened` / `WrongHandle` / `InvalidChannel`
/// response. Ids are assumed unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u32);

impl RequestId {
    /// Create a request id from a raw value.
    pub fn from_raw(raw: u32) -> Self {
        RequestId(raw)
    }

    /// Return the raw value.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Inspector class requested on open.
///
/// Master channels open as `Multicarrier`; sub-channels open as `Raw` or
/// `Audio` depending on their demodulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InspectorClass {
    /// Wideband multicarrier inspector hosting child inspectors.
    Multicarrier,
    /// Raw IQ pass-through.
    Raw,
    /// Audio demodulator (AM/FM/SSB selected via the inspector config).
    Audio,
}

impl InspectorClass {
    /// Wire string sent to the analyzer.
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectorClass::Multicarrier => "multicarrier",
            InspectorClass::Raw => "raw",
            InspectorClass::Audio => "audio",
        }
    }
}

impl fmt::Display for InspectorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string cannot be parsed into an [`InspectorClass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseClassError(String);

impl fmt::Display for ParseClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown inspector class: {}", self.0)
    }
}

impl std::error::Error for ParseClassError {}

impl FromStr for InspectorClass {
    type Err = ParseClassError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "multicarrier" => Ok(InspectorClass::Multicarrier),
            "raw" => Ok(InspectorClass::Raw),
            "audio" => Ok(InspectorClass::Audio),
            _ => Err(ParseClassError(s.to_string())),
        }
    }
}

/// Demodulator selection for a sub-channel.
///
/// Matches the legacy settings vocabulary: `raw` for IQ pass-through and
/// `audio:<mode>` for the audio inspector's demodulators. The inspector
/// class is derived from it via [`DemodKind::inspector_class`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DemodKind {
    /// Raw IQ samples, no demodulation.
    Raw,
    /// Frequency modulation.
    AudioFm,
    /// Amplitude modulation.
    AudioAm,
    /// Upper sideband.
    #[default]
    AudioUsb,
    /// Lower sideband.
    AudioLsb,
}

impl DemodKind {
    /// The inspector class a channel with this demodulator opens as.
    pub fn inspector_class(&self) -> InspectorClass {
        match self {
            DemodKind::Raw => InspectorClass::Raw,
            _ => InspectorClass::Audio,
        }
    }

    /// Settings-file string for this demodulator.
    pub fn as_str(&self) -> &'static str {
        match self {
            DemodKind::Raw => "raw",
            DemodKind::AudioFm => "audio:fm",
            DemodKind::AudioAm => "audio:am",
            DemodKind::AudioUsb => "audio:usb",
            DemodKind::AudioLsb => "audio:lsb",
        }
    }

    /// Whether this is one of the single-sideband demodulators.
    ///
    /// SSB channels store an edge frequency on disk instead of the center
    /// frequency, and shift their inspector frequency after open.
    pub fn is_sideband(&self) -> bool {
        matches!(self, DemodKind::AudioUsb | DemodKind::AudioLsb)
    }
}

impl fmt::Display for DemodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string cannot be parsed into a [`DemodKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDemodError(String);

impl fmt::Display for ParseDemodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown demodulator: {}", self.0)
    }
}

impl std::error::Error for ParseDemodError {}

impl FromStr for DemodKind {
    type Err = ParseDemodError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "raw" => Ok(DemodKind::Raw),
            "audio:fm" => Ok(DemodKind::AudioFm),
            "audio:am" => Ok(DemodKind::AudioAm),
            "audio:usb" => Ok(DemodKind::AudioUsb),
            "audio:lsb" => Ok(DemodKind::AudioLsb),
            _ => Err(ParseDemodError(s.to_string())),
        }
    }
}

/// Channel descriptor passed to the analyzer on open.
///
/// Frequencies are in hertz. `fc` is relative to the tuner frequency for
/// top-level opens and relative to the parent inspector for child opens;
/// `f_low`/`f_high` are the filter edges relative to `fc`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelSpec {
    /// Center frequency offset in hertz.
    pub fc: f64,
    /// Lower filter edge relative to `fc`, in hertz (negative).
    pub f_low: f64,
    /// Upper filter edge relative to `fc`, in hertz (positive).
    pub f_high: f64,
    /// Allocated bandwidth in hertz.
    pub bandwidth: f64,
    /// Tuner offset in hertz (0 for child inspectors).
    pub ft: f64,
}

/// Tuner front-end state reported by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SourceInfo {
    /// Current tuner frequency in hertz.
    pub frequency: f64,
    /// Equivalent sample rate in samples per second.
    pub sample_rate: f64,
    /// LNB downconversion frequency in hertz (0 when none).
    pub lnb_frequency: f64,
}

impl SourceInfo {
    /// Lower edge of the currently accessible passband in hertz.
    pub fn passband_min(&self) -> f64 {
        self.frequency - self.sample_rate / 2.0
    }

    /// Upper edge of the currently accessible passband in hertz.
    pub fn passband_max(&self) -> f64 {
        self.frequency + self.sample_rate / 2.0
    }
}

/// Snapshot of a sub-channel handed to [`ChannelConsumer::opened`].
///
/// Borrowing the live tree entry across the consumer call would alias the
/// consumer with its own containing channel, so the forwarder copies the
/// fields the consumer needs into this descriptor instead.
///
/// [`ChannelConsumer::opened`]: crate::consumer::ChannelConsumer::opened
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    /// Channel name.
    pub name: String,
    /// Frequency offset relative to the parent master, in hertz.
    pub offset: f64,
    /// Filter bandwidth in hertz.
    pub bandwidth: f64,
    /// Equivalent sample rate reported by the analyzer at open time.
    pub samp_rate: f64,
    /// Demodulator the channel was created with.
    pub demod: DemodKind,
}
