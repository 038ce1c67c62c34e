//! Error types for Hornet

use crate::capability::Capability;
use thiserror::Error;

/// Result type alias for Hornet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Hornet
///
/// Codec and crypto errors are always returned as values: every byte this
/// framework dissects arrived over the air and is untrusted by construction.
/// Lifecycle and capability errors are caller bugs, but they are reported as
/// `Result`s too so the driver contract stays testable.
#[derive(Error, Debug)]
pub enum Error {
    /// Frame shorter than the minimum the codec can dissect
    #[error("Frame too short to dissect ({len} bytes)")]
    TooShort { len: usize },

    /// Secured payload shorter than the auxiliary header and MIC demand
    #[error("Secured payload too short ({len} bytes)")]
    BadPayloadLength { len: usize },

    /// Decrypt invoked for a security level the transform does not implement
    #[error("Unsupported security level 0x{0:02x}")]
    UnsupportedSecurityLevel(u8),

    /// Key material is not 16 bytes
    #[error("Bad key length: {0} bytes (expected 16)")]
    BadKeyLength(usize),

    /// Well-formed secured frame, but the computed MIC did not match
    #[error("Message integrity check failed")]
    AuthenticationFailure,

    /// Operation requires a capability the bound hardware does not have
    #[error("Device is missing the {0:?} capability")]
    MissingCapability(Capability),

    /// Channel/page pair outside the bands the device supports
    #[error("Invalid channel {channel} on page {page}")]
    InvalidChannel { channel: u8, page: u8 },

    /// Frame rejected before transmission (empty, oversized, malformed)
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Backend probe handshake did not converge within the retry bound
    #[error("Device handshake timed out after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },

    /// Operation on a session that has been closed
    #[error("Radio session is closed")]
    SessionClosed,

    /// No registered backend acknowledged the device
    #[error("No backend supports device '{0}'")]
    UnsupportedDevice(String),

    /// Backend-specific hardware failure
    #[error("Device error: {0}")]
    Device(String),

    /// Malformed or truncated capture file
    #[error("Capture format error: {0}")]
    Capture(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a device error with a custom message
    pub fn device<S: Into<String>>(msg: S) -> Self {
        Error::Device(msg.into())
    }

    /// Create a capture format error with a custom message
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    /// Create an invalid-frame error with a custom message
    pub fn invalid_frame<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFrame(msg.into())
    }
}
