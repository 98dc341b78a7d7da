//! Shared helpers for guarded port integration tests.

#![allow(dead_code)]

use serio::{Context, GuardedPort, MockConnector, MockTransport, PortConfiguration};
use std::time::Duration;

/// Scheduling slack allowed on top of any configured timeout.
pub const SLACK: Duration = Duration::from_millis(150);

pub fn mock_config() -> PortConfiguration {
    PortConfiguration::new("MOCK0", 9600)
}

/// Open `config` through `connector` with no context bound, returning the
/// port and a handle on the transport it wraps.
pub fn open_with(
    connector: &MockConnector,
    config: PortConfiguration,
) -> (GuardedPort<MockTransport>, MockTransport) {
    let port = GuardedPort::open_with(&Context::background(), connector.clone(), config)
        .expect("mock open should succeed");
    let transport = connector
        .last_opened()
        .expect("connector should record the transport");
    (port, transport)
}

pub fn open_mock(connector: &MockConnector) -> (GuardedPort<MockTransport>, MockTransport) {
    open_with(connector, mock_config())
}

/// A port whose writes come back on the next read.
pub fn loopback_port() -> (GuardedPort<MockTransport>, MockTransport) {
    open_mock(&MockConnector::new().loopback(true))
}
