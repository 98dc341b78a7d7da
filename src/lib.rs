//! serio: cancellable, deadline-aware serial port I/O.
//!
//! Serial drivers block and cannot be interrupted. This library wraps one in
//! a [`GuardedPort`] that still keeps the caller inside its time budget:
//! open is raced against a [`Context`], writes are raced against the port
//! deadline or write timeout, and reads shrink the driver's own read timeout
//! as the deadline approaches.
//!
//! # Modules
//!
//! - `port`: the blocking transport contract, the `serialport` backend and an
//!   in-memory mock
//! - `context`: cancellation signal plus optional deadline
//! - `error`: guarded port errors
//! - `config`: TOML configuration for the `serio` command-line tool

pub mod config;
pub mod context;
pub mod error;
pub mod port;

mod guarded;
mod race;

pub use context::{CancelCause, CancelHandle, Context};
pub use error::{SerioError, SerioResult};
pub use guarded::GuardedPort;
pub use port::{
    list_ports, Connector, DataBits, Mode, MockConnector, MockTransport, Parity,
    PortConfiguration, PortError, SerialConnector, SerialTransport, StopBits, Transport,
};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
