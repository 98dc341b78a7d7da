//! Transport backed by the `serialport` crate.
//!
//! The device is opened once and cloned, so reads and writes go through
//! separate handles. A write that the guarded port gave up on can keep the
//! writer locked without stalling the next read.

use super::error::PortError;
use super::traits::{Connector, Mode, Transport};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Read timeout used when the caller asks for none.
///
/// The driver has no "block forever" setting; a day stays inside every
/// platform's poll range.
const UNBOUNDED_READ_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

type RawPort = Box<dyn serialport::SerialPort>;

/// Names of the serial devices present on this machine.
pub fn list_ports() -> Result<Vec<String>, PortError> {
    SerialConnector.available_ports()
}

/// Opens OS serial devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    fn open(&self, name: &str, mode: &Mode) -> Result<SerialTransport, PortError> {
        let parity = serialport::Parity::try_from(mode.parity)?;

        let reader = serialport::new(name, mode.baud_rate)
            .data_bits(mode.data_bits.into())
            .stop_bits(mode.stop_bits.into())
            .parity(parity)
            .flow_control(serialport::FlowControl::None)
            .timeout(UNBOUNDED_READ_TIMEOUT)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(name),
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;
        let writer = reader.try_clone()?;

        Ok(SerialTransport::from_handles(name, reader, writer))
    }

    fn available_ports(&self) -> Result<Vec<String>, PortError> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}

/// An open OS serial device.
pub struct SerialTransport {
    name: String,
    reader: Mutex<Option<RawPort>>,
    writer: Mutex<Option<RawPort>>,
    closed: AtomicBool,
}

impl SerialTransport {
    fn from_handles(name: &str, reader: RawPort, writer: RawPort) -> Self {
        Self {
            name: name.to_string(),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
        }
    }

    /// The system path this transport was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut guard = self.reader.lock();
        let port = guard.as_mut().ok_or(PortError::NotOpen)?;

        match port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                Err(PortError::timeout(port.timeout()))
            }
            Err(e) => Err(PortError::Io(e)),
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut guard = self.writer.lock();
        // close() could not take the writer while someone else held it
        if self.closed.load(Ordering::Acquire) {
            guard.take();
            return Err(PortError::NotOpen);
        }
        let result = match guard.as_mut() {
            Some(port) => port.write(data).map_err(PortError::Io),
            None => return Err(PortError::NotOpen),
        };

        if self.closed.load(Ordering::Acquire) {
            guard.take();
        }
        result
    }

    fn set_read_timeout(&self, timeout: Duration) -> Result<(), PortError> {
        let timeout = if timeout.is_zero() {
            UNBOUNDED_READ_TIMEOUT
        } else {
            timeout
        };

        let mut guard = self.reader.lock();
        let port = guard.as_mut().ok_or(PortError::NotOpen)?;
        port.set_timeout(timeout).map_err(PortError::Serial)
    }

    fn close(&self) -> Result<(), PortError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(PortError::NotOpen);
        }

        self.reader.lock().take();
        match self.writer.try_lock() {
            Some(mut writer) => {
                writer.take();
            }
            None => debug!(port = %self.name, "write in flight, writer released when it returns"),
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
