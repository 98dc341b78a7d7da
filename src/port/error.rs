//! Transport-level error types.
//!
//! Everything a Transport Handle or Connector can report. The guarded port
//! wraps these in [`crate::SerioError::Transport`] without reinterpreting them.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur inside a transport or connector.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested mode could not be applied.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The transport's own read timeout expired.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The transport has already been closed.
    #[error("Port is not open")]
    NotOpen,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Whether this error is the transport's own timeout firing.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}
