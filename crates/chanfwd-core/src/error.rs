//! Error types for chanfwd.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Admission failures, asynchronous
//! protocol failures, and settings-file failures are all captured here.
//! Every variant leaves the channel tree in a consistent state.

/// The error type for all chanfwd operations.
///
/// Variants cover tree admission (duplicate names, uncovered or over-wide
/// channels), failures reported asynchronously by the analyzer, and the
/// legacy settings codec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A master or channel with this name already exists in the tree.
    #[error("`{0}' already exists")]
    DuplicateName(String),

    /// No live master's band contains the requested channel interval.
    #[error("channel at {frequency} Hz ({bandwidth} Hz wide) is outside any master channel")]
    NoCoveringMaster {
        /// Requested absolute center frequency in hertz.
        frequency: f64,
        /// Requested filter bandwidth in hertz.
        bandwidth: f64,
    },

    /// The requested channel bandwidth exceeds the configured maximum.
    #[error("channel bandwidth {bandwidth} Hz exceeds the maximum of {max} Hz")]
    BandwidthExceedsMax {
        /// Requested filter bandwidth in hertz.
        bandwidth: f64,
        /// Configured maximum in hertz.
        max: f64,
    },

    /// The analyzer rejected an open request (wrong handle or invalid
    /// channel limits). Always escalates to a full close.
    #[error("protocol failure: {0}")]
    ProtocolFailure(String),

    /// A settings-file channel entry has no name.
    #[error("anonymous channels are not supported")]
    AnonymousChannel,

    /// A settings-file master entry has no frequency (or zero).
    #[error("central frequency of master channel `{0}' cannot be undefined (or zero)")]
    MissingFrequency(String),

    /// A settings-file master entry has no output rate (or zero).
    #[error("bandwidth of master channel `{0}' cannot be undefined (or zero)")]
    MissingBandwidth(String),

    /// The settings file is syntactically malformed.
    #[error("format error: {0}")]
    Format(String),

    /// An underlying I/O error while reading or writing a settings file.
    #[error("access error: {0}")]
    Access(#[from] std::io::Error),
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::DuplicateName(name) => Error::DuplicateName(name.clone()),
            Error::NoCoveringMaster {
                frequency,
                bandwidth,
            } => Error::NoCoveringMaster {
                frequency: *frequency,
                bandwidth: *bandwidth,
            },
            Error::BandwidthExceedsMax { bandwidth, max } => Error::BandwidthExceedsMax {
                bandwidth: *bandwidth,
                max: *max,
            },
            Error::ProtocolFailure(msg) => Error::ProtocolFailure(msg.clone()),
            Error::AnonymousChannel => Error::AnonymousChannel,
            Error::MissingFrequency(name) => Error::MissingFrequency(name.clone()),
            Error::MissingBandwidth(name) => Error::MissingBandwidth(name.clone()),
            Error::Format(msg) => Error::Format(msg.clone()),
            // io::Error is not Clone; preserve the kind and message.
            Error::Access(e) => Error::Access(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_duplicate_name() {
        let e = Error::DuplicateName("MASTER_1".into());
        assert_eq!(e.to_string(), "`MASTER_1' already exists");
    }

    #[test]
    fn error_display_no_covering_master() {
        let e = Error::NoCoveringMaster {
            frequency: 100e6,
            bandwidth: 12500.0,
        };
        assert!(e.to_string().contains("outside any master channel"));
    }

    #[test]
    fn error_display_bandwidth_exceeds_max() {
        let e = Error::BandwidthExceedsMax {
            bandwidth: 300_000.0,
            max: 200_000.0,
        };
        assert_eq!(
            e.to_string(),
            "channel bandwidth 300000 Hz exceeds the maximum of 200000 Hz"
        );
    }

    #[test]
    fn error_display_protocol_failure() {
        let e = Error::ProtocolFailure("wrong handle".into());
        assert_eq!(e.to_string(), "protocol failure: wrong handle");
    }

    #[test]
    fn error_display_settings_failures() {
        assert_eq!(
            Error::AnonymousChannel.to_string(),
            "anonymous channels are not supported"
        );
        assert!(Error::MissingFrequency("M".into())
            .to_string()
            .contains("cannot be undefined"));
        assert!(Error::MissingBandwidth("M".into())
            .to_string()
            .contains("cannot be undefined"));
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Access(_)));
        assert!(e.to_string().contains("denied"));
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }

    #[test]
    fn error_clone_preserves_io_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: Error = io_err.into();
        let cloned = e.clone();
        match cloned {
            Error::Access(inner) => {
                assert_eq!(inner.kind(), std::io::ErrorKind::NotFound);
                assert!(inner.to_string().contains("missing"));
            }
            other => panic!("unexpected clone: {other:?}"),
        }
    }
}
