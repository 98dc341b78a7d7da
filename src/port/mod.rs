//! Transport layer: the blocking device contract and its implementations.
//!
//! Nothing in here knows about deadlines or cancellation; that lives in
//! [`crate::GuardedPort`].

pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

pub use error::PortError;
pub use mock::{MockConnector, MockTransport};
pub use serial::{list_ports, SerialConnector, SerialTransport};
pub use traits::*;
