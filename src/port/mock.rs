//! In-memory transport for tests and demos.
//!
//! [`MockConnector`] hands out [`MockTransport`]s that behave like a blocking
//! device: reads wait on a condition variable until data arrives or the
//! programmed read timeout expires, writes can be slowed down, and loopback
//! mode echoes every write back into the read queue. Every handle is a cheap
//! clone over shared state, so a test can keep one and inspect what the
//! guarded port did with the other.

use super::error::PortError;
use super::traits::{Connector, Mode, Transport};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct MockPortState {
    /// Bytes returned by subsequent reads.
    read_queue: VecDeque<u8>,
    /// Every payload that reached the device.
    write_log: Vec<Vec<u8>>,
    /// Current read timeout; `None` blocks until data or close.
    read_timeout: Option<Duration>,
    /// History of every `set_read_timeout` call.
    read_timeouts: Vec<Duration>,
    loopback: bool,
    write_delay: Duration,
    next_write_error: Option<std::io::ErrorKind>,
    reject_read_timeouts: bool,
    read_calls: usize,
    write_calls: usize,
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<MockPortState>,
    data_ready: Condvar,
}

/// A fake open device.
#[derive(Clone)]
pub struct MockTransport {
    name: String,
    mode: Mode,
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a standalone transport, as if `name` had been opened with `mode`.
    pub fn new(name: impl Into<String>, mode: Mode) -> Self {
        Self {
            name: name.into(),
            mode,
            shared: Arc::new(Shared {
                state: Mutex::new(MockPortState {
                    read_queue: VecDeque::new(),
                    write_log: Vec::new(),
                    read_timeout: None,
                    read_timeouts: Vec::new(),
                    loopback: false,
                    write_delay: Duration::ZERO,
                    next_write_error: None,
                    reject_read_timeouts: false,
                    read_calls: 0,
                    write_calls: 0,
                    closed: false,
                }),
                data_ready: Condvar::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Line settings the device was opened with.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Echo every write back into the read queue.
    pub fn set_loopback(&self, loopback: bool) {
        self.shared.state.lock().loopback = loopback;
    }

    /// Make each write block for `delay` before it lands.
    pub fn set_write_delay(&self, delay: Duration) {
        self.shared.state.lock().write_delay = delay;
    }

    /// Fail the next write with an I/O error of this kind.
    pub fn fail_next_write(&self, kind: std::io::ErrorKind) {
        self.shared.state.lock().next_write_error = Some(kind);
    }

    /// Make every `set_read_timeout` fail with a configuration error.
    pub fn set_reject_read_timeouts(&self, reject: bool) {
        self.shared.state.lock().reject_read_timeouts = reject;
    }

    /// Append bytes for subsequent reads and wake any blocked reader.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.shared.state.lock();
        state.read_queue.extend(data);
        self.shared.data_ready.notify_all();
    }

    /// Copy of every payload written so far.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// Every read timeout programmed, oldest first.
    pub fn read_timeouts(&self) -> Vec<Duration> {
        self.shared.state.lock().read_timeouts.clone()
    }

    /// Number of reads that reached the device.
    pub fn read_calls(&self) -> usize {
        self.shared.state.lock().read_calls
    }

    /// Number of writes that reached the device.
    pub fn write_calls(&self) -> usize {
        self.shared.state.lock().write_calls
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Bytes waiting in the read queue.
    pub fn available_bytes(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }
}

impl Transport for MockTransport {
    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(PortError::NotOpen);
        }
        state.read_calls += 1;

        let timeout = state.read_timeout;
        let give_up_at = timeout.map(|t| Instant::now() + t);
        while state.read_queue.is_empty() {
            match give_up_at {
                Some(at) => {
                    let result = self.shared.data_ready.wait_until(&mut state, at);
                    if result.timed_out() && state.read_queue.is_empty() {
                        return Err(PortError::timeout(timeout.unwrap_or_default()));
                    }
                }
                None => self.shared.data_ready.wait(&mut state),
            }
            if state.closed {
                return Err(PortError::NotOpen);
            }
        }

        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        let delay = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(PortError::NotOpen);
            }
            state.write_calls += 1;
            if let Some(kind) = state.next_write_error.take() {
                return Err(PortError::Io(std::io::Error::new(kind, "injected write failure")));
            }
            state.write_delay
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.shared.state.lock();
        state.write_log.push(data.to_vec());
        if state.loopback {
            state.read_queue.extend(data);
            self.shared.data_ready.notify_all();
        }
        Ok(data.len())
    }

    fn set_read_timeout(&self, timeout: Duration) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(PortError::NotOpen);
        }
        if state.reject_read_timeouts {
            return Err(PortError::config(format!("read timeout {timeout:?} rejected")));
        }
        state.read_timeout = (!timeout.is_zero()).then_some(timeout);
        state.read_timeouts.push(timeout);
        Ok(())
    }

    fn close(&self) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(PortError::NotOpen);
        }
        state.closed = true;
        self.shared.data_ready.notify_all();
        Ok(())
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[derive(Debug, Default)]
struct ConnectorState {
    /// Known device names; empty means every name opens.
    ports: Vec<String>,
    open_delay: Duration,
    loopback: bool,
    write_delay: Duration,
    reject_read_timeouts: bool,
    open_calls: usize,
    opened: Vec<MockTransport>,
}

/// Opens [`MockTransport`]s and remembers every one it produced.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict opens to these names; anything else is `NotFound`.
    pub fn with_ports<I, S>(self, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().ports = ports.into_iter().map(Into::into).collect();
        self
    }

    /// Make each open block for `delay`.
    pub fn open_delay(self, delay: Duration) -> Self {
        self.state.lock().open_delay = delay;
        self
    }

    /// Transports opened from now on echo writes back to reads.
    pub fn loopback(self, loopback: bool) -> Self {
        self.state.lock().loopback = loopback;
        self
    }

    /// Transports opened from now on take `delay` per write.
    pub fn write_delay(self, delay: Duration) -> Self {
        self.state.lock().write_delay = delay;
        self
    }

    /// Transports opened from now on refuse every read timeout.
    pub fn reject_read_timeouts(self, reject: bool) -> Self {
        self.state.lock().reject_read_timeouts = reject;
        self
    }

    /// Number of opens attempted, including failed ones.
    pub fn open_calls(&self) -> usize {
        self.state.lock().open_calls
    }

    /// Every transport successfully opened, oldest first.
    pub fn opened(&self) -> Vec<MockTransport> {
        self.state.lock().opened.clone()
    }

    pub fn last_opened(&self) -> Option<MockTransport> {
        self.state.lock().opened.last().cloned()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn open(&self, name: &str, mode: &Mode) -> Result<MockTransport, PortError> {
        let (delay, loopback, write_delay, reject_read_timeouts) = {
            let mut state = self.state.lock();
            state.open_calls += 1;
            if !state.ports.is_empty() && !state.ports.iter().any(|p| p == name) {
                return Err(PortError::not_found(name));
            }
            (
                state.open_delay,
                state.loopback,
                state.write_delay,
                state.reject_read_timeouts,
            )
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let transport = MockTransport::new(name, *mode);
        transport.set_loopback(loopback);
        transport.set_write_delay(write_delay);
        transport.set_reject_read_timeouts(reject_read_timeouts);
        self.state.lock().opened.push(transport.clone());
        Ok(transport)
    }

    fn available_ports(&self) -> Result<Vec<String>, PortError> {
        Ok(self.state.lock().ports.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{DataBits, Parity, StopBits};

    fn mode() -> Mode {
        Mode {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }

    #[test]
    fn test_enqueue_and_read() {
        let port = MockTransport::new("MOCK0", mode());
        port.enqueue_read(b"Hello");

        let mut buffer = [0u8; 10];
        let n = port.read(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");
    }

    #[test]
    fn test_partial_read() {
        let port = MockTransport::new("MOCK0", mode());
        port.enqueue_read(b"Hello, World!");

        let mut buffer = [0u8; 5];
        let n = port.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"Hello");
        assert_eq!(port.available_bytes(), 8);
    }

    #[test]
    fn test_read_times_out_with_programmed_timeout() {
        let port = MockTransport::new("MOCK0", mode());
        port.set_read_timeout(Duration::from_millis(30)).unwrap();

        let started = Instant::now();
        let mut buffer = [0u8; 4];
        let result = port.read(&mut buffer);

        assert!(matches!(result, Err(PortError::Timeout(d)) if d == Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_blocked_read_wakes_on_data() {
        let port = MockTransport::new("MOCK0", mode());
        port.set_read_timeout(Duration::from_secs(5)).unwrap();

        let feeder = port.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            feeder.enqueue_read(b"late");
        });

        let mut buffer = [0u8; 8];
        let n = port.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"late");
        handle.join().unwrap();
    }

    #[test]
    fn test_loopback_echoes_writes() {
        let port = MockTransport::new("MOCK0", mode());
        port.set_loopback(true);

        assert_eq!(port.write(b"ping").unwrap(), 4);
        let mut buffer = [0u8; 8];
        let n = port.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"ping");
        assert_eq!(port.write_log(), vec![b"ping".to_vec()]);
    }

    #[test]
    fn test_injected_write_failure() {
        let port = MockTransport::new("MOCK0", mode());
        port.fail_next_write(std::io::ErrorKind::BrokenPipe);

        let err = port.write(b"x").unwrap_err();
        assert!(matches!(err, PortError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
        assert!(port.write_log().is_empty());
        assert_eq!(port.write(b"x").unwrap(), 1);
    }

    #[test]
    fn test_close_rejects_further_io() {
        let port = MockTransport::new("MOCK0", mode());
        port.close().unwrap();

        assert!(port.is_closed());
        assert!(matches!(port.write(b"x"), Err(PortError::NotOpen)));
        assert!(matches!(port.read(&mut [0u8; 1]), Err(PortError::NotOpen)));
        assert!(matches!(port.close(), Err(PortError::NotOpen)));
    }

    #[test]
    fn test_connector_records_opens() {
        let connector = MockConnector::new().with_ports(["MOCK0", "MOCK1"]).loopback(true);

        let transport = connector.open("MOCK1", &mode()).unwrap();
        assert_eq!(transport.name(), "MOCK1");
        assert!(matches!(
            connector.open("MOCK9", &mode()),
            Err(PortError::NotFound(_))
        ));

        assert_eq!(connector.open_calls(), 2);
        assert_eq!(connector.opened().len(), 1);
        assert_eq!(connector.available_ports().unwrap(), vec!["MOCK0", "MOCK1"]);
    }
}
