//! # Error Types
//!
//! Custom error types for Mecanum Teleop using `thiserror`.
//!
//! Mapping errors ([`TeleopError::UnmappedDevice`], [`TeleopError::UnmappedControl`])
//! never leave the input mapper; they are turned into neutral readings there.
//! Transport errors are recovered by the control loop's reconnect policy.
//! Only configuration and address resolution failures stop the program, and
//! only at startup.

use std::io;

use thiserror::Error;

use crate::controller::profile::LogicalControl;

/// Main error type for Mecanum Teleop
#[derive(Debug, Error)]
pub enum TeleopError {
    /// Configuration errors (parse and validation)
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed wire frame
    #[error("Wire protocol error: {0}")]
    Protocol(String),

    /// Input device errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// Device name has no profile in the registry
    #[error("No controller profile for device '{0}'")]
    UnmappedDevice(String),

    /// Profile exists but lacks the requested control
    #[error("Profile '{device}' has no mapping for {control}")]
    UnmappedControl {
        device: String,
        control: LogicalControl,
    },

    /// Remote end refused the connection
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// Remote end reset the connection
    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    /// Write to a closed connection
    #[error("Broken pipe: {0}")]
    BrokenPipe(String),

    /// Connection attempt did not finish in time
    #[error("Connection attempt timed out: {0}")]
    ConnectTimeout(String),

    /// Any other transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Send attempted without an established connection
    #[error("Link is not connected")]
    NotConnected,

    /// Target address could not be determined
    #[error("Address resolution failed: {0}")]
    ResolutionFailure(String),
}

impl TeleopError {
    /// Classifies a socket error into the transport variants.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io;
    /// use mecanum_teleop::error::TeleopError;
    ///
    /// let err = io::Error::new(io::ErrorKind::ConnectionReset, "peer reset");
    /// let classified = TeleopError::from_transport(err, "send");
    /// assert!(matches!(classified, TeleopError::ConnectionReset(_)));
    /// ```
    pub fn from_transport(err: io::Error, context: &str) -> Self {
        let message = format!("{}: {}", context, err);
        match err.kind() {
            io::ErrorKind::ConnectionRefused => TeleopError::ConnectionRefused(message),
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                TeleopError::ConnectionReset(message)
            }
            io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected => {
                TeleopError::BrokenPipe(message)
            }
            io::ErrorKind::TimedOut => TeleopError::ConnectTimeout(message),
            _ => TeleopError::Transport(message),
        }
    }

    /// Returns true for errors the reconnect policy recovers from.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TeleopError::ConnectionRefused(_)
                | TeleopError::ConnectionReset(_)
                | TeleopError::BrokenPipe(_)
                | TeleopError::ConnectTimeout(_)
                | TeleopError::Transport(_)
                | TeleopError::NotConnected
        )
    }
}

/// Result type alias for Mecanum Teleop
pub type Result<T> = std::result::Result<T, TeleopError>;
