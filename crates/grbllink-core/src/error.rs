//! Error handling for GrblLink
//!
//! Provides the error types used inside the library:
//! - Controller errors (session and protocol exchange)
//! - Connection errors (serial transport)
//! - Configuration errors (loading and validating [`ControllerConfig`](crate::ControllerConfig))
//!
//! The public controller surface never returns these across its boundary; they
//! are collapsed into `bool`/`String` results and logged. They are still the
//! currency of every internal step so that `?` can be used throughout.

use thiserror::Error;

/// Controller error type
///
/// Represents failures of a protocol exchange with the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// Controller is not connected
    #[error("Controller not connected")]
    NotConnected,

    /// No terminal token arrived before the deadline
    #[error("Controller operation timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The controller answered with `error:<n>`
    #[error("Command rejected: error:{code} - {message}")]
    CommandRejected {
        /// The firmware error code.
        code: u8,
        /// Decoded description of the code.
        message: String,
    },

    /// The controller answered with `ALARM:<n>`
    #[error("Alarm: {code} - {message}")]
    Alarm {
        /// The alarm code.
        code: u8,
        /// Decoded description of the code.
        message: String,
    },

    /// The device answered, but without the firmware banner
    #[error("No GRBL banner received from {port}")]
    HandshakeFailed {
        /// The port that was probed.
        port: String,
    },

    /// Auto-detection exhausted every candidate port
    #[error("No GRBL device found on {candidates} candidate port(s)")]
    NoDeviceFound {
        /// How many ports were probed.
        candidates: usize,
    },

    /// Jog requested on an axis the firmware does not know
    #[error("Invalid axis '{axis}'")]
    InvalidAxis {
        /// The rejected axis letter.
        axis: char,
    },
}

/// Connection error type
///
/// Represents failures of the byte-level serial transport.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Operation attempted on a transport that is not open
    #[error("Port is not open")]
    NotOpen,

    /// Failed to open or configure the port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Fewer bytes were accepted than requested
    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes accepted by the device.
        written: usize,
        /// Bytes that should have been written.
        expected: usize,
    },

    /// I/O error
    #[error("I/O error: {reason}")]
    IoError {
        /// The reason for the I/O error.
        reason: String,
    },
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        ConnectionError::IoError {
            reason: err.to_string(),
        }
    }
}

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A value failed validation
    #[error("Invalid setting '{key}': {reason}")]
    InvalidValue {
        /// The offending field.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Main error type for GrblLink
#[derive(Error, Debug)]
pub enum Error {
    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Controller(ControllerError::Timeout { .. }))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
