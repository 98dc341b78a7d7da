//! Errors surfaced by the guarded port.

use crate::context::CancelCause;
use crate::port::PortError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for guarded port operations.
pub type SerioResult<T> = Result<T, SerioError>;

/// Every way a guarded port operation can fail.
///
/// None of these are retried internally. When a write horizon elapses the
/// number of bytes that reached the device is unknown.
#[derive(Debug, Error)]
pub enum SerioError {
    /// The open context was cancelled or ran out of time first.
    #[error("open cancelled: {0}")]
    Cancelled(CancelCause),

    /// The port deadline has passed.
    #[error("port deadline exceeded")]
    DeadlineExceeded,

    /// The write timeout elapsed before the device accepted the payload.
    #[error("write timed out after {0:?}; bytes written are indeterminate")]
    WriteTimeout(Duration),

    /// The port has been closed.
    #[error("port is closed")]
    Closed,

    /// The transport reported an error.
    #[error(transparent)]
    Transport(#[from] PortError),
}

impl SerioError {
    /// Whether the error means "ran out of time", from any source.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Cancelled(CancelCause::DeadlineElapsed)
            | Self::DeadlineExceeded
            | Self::WriteTimeout(_) => true,
            Self::Transport(e) => e.is_timeout(),
            Self::Cancelled(CancelCause::Cancelled) | Self::Closed => false,
        }
    }
}

impl From<SerioError> for io::Error {
    fn from(err: SerioError) -> Self {
        match err {
            SerioError::Transport(PortError::Io(e)) => e,
            SerioError::Closed | SerioError::Transport(PortError::NotOpen) => {
                io::Error::new(io::ErrorKind::NotConnected, err)
            }
            SerioError::Transport(PortError::NotFound(_)) => {
                io::Error::new(io::ErrorKind::NotFound, err)
            }
            e @ SerioError::Cancelled(_) => io::Error::new(io::ErrorKind::TimedOut, e),
            e if e.is_timeout() => io::Error::new(io::ErrorKind::TimedOut, e),
            e => io::Error::other(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(SerioError::DeadlineExceeded.to_string(), "port deadline exceeded");
        assert_eq!(SerioError::Closed.to_string(), "port is closed");
        assert!(SerioError::WriteTimeout(Duration::from_millis(250))
            .to_string()
            .contains("250ms"));
        assert_eq!(
            SerioError::Transport(PortError::not_found("COM9")).to_string(),
            "Serial port not found: COM9"
        );
    }

    #[test]
    fn test_timeout_classification() {
        assert!(SerioError::DeadlineExceeded.is_timeout());
        assert!(SerioError::WriteTimeout(Duration::from_secs(1)).is_timeout());
        assert!(SerioError::Cancelled(CancelCause::DeadlineElapsed).is_timeout());
        assert!(SerioError::Transport(PortError::timeout(Duration::from_secs(1))).is_timeout());
        assert!(!SerioError::Cancelled(CancelCause::Cancelled).is_timeout());
        assert!(!SerioError::Closed.is_timeout());
    }

    #[test]
    fn test_io_error_kinds() {
        let kind = |e: SerioError| io::Error::from(e).kind();

        assert_eq!(kind(SerioError::DeadlineExceeded), io::ErrorKind::TimedOut);
        assert_eq!(kind(SerioError::WriteTimeout(Duration::from_millis(5))), io::ErrorKind::TimedOut);
        assert_eq!(kind(SerioError::Closed), io::ErrorKind::NotConnected);
        assert_eq!(
            kind(SerioError::Cancelled(CancelCause::Cancelled)),
            io::ErrorKind::TimedOut
        );
        assert_eq!(
            kind(SerioError::Transport(PortError::Io(io::ErrorKind::BrokenPipe.into()))),
            io::ErrorKind::BrokenPipe
        );
        assert_eq!(
            kind(SerioError::Transport(PortError::timeout(Duration::from_millis(5)))),
            io::ErrorKind::TimedOut
        );
    }
}
