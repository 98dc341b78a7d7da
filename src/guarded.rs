//! Deadline-aware serial port.
//!
//! [`GuardedPort`] owns one [`Transport`] and bounds every blocking call on
//! it, even though the transport itself cannot be interrupted:
//!
//! - `open` runs on a worker thread raced against a [`Context`].
//! - `write` runs on a worker thread raced against the port deadline, or
//!   failing that the write timeout. Without either it runs inline.
//! - `read` never spawns. With a deadline set it reprograms the transport's
//!   read timeout to the time remaining before each call; otherwise it relies
//!   on whatever read timeout the transport already has.
//!
//! # Abandoned calls
//!
//! Losing a race stops the waiting, not the call. A write reported as
//! [`SerioError::WriteTimeout`] or [`SerioError::DeadlineExceeded`] may still
//! reach the wire, partially or completely, after the error is returned. A
//! device opened after its context gave up is closed by the worker that
//! opened it.
//!
//! # Example
//! ```no_run
//! use serio::{Context, GuardedPort, PortConfiguration};
//! use std::time::{Duration, Instant};
//!
//! let ctx = Context::with_timeout(Duration::from_secs(10));
//! let config = PortConfiguration::new("/dev/ttyUSB0", 115200).timeout(Duration::from_secs(3));
//! let mut port = GuardedPort::open(&ctx, config)?;
//!
//! port.set_write_timeout(Duration::from_secs(2))?;
//! port.set_deadline(Instant::now() + Duration::from_secs(5))?;
//!
//! port.write(b"hello serial")?;
//! let mut buf = [0u8; 128];
//! let n = port.read(&mut buf)?;
//! println!("Received: {}", String::from_utf8_lossy(&buf[..n]));
//! port.close()?;
//! # Ok::<(), serio::SerioError>(())
//! ```

use crate::context::{CancelCause, Context};
use crate::error::{SerioError, SerioResult};
use crate::port::{
    Connector, PortConfiguration, PortError, SerialConnector, SerialTransport, Transport,
};
use crate::race::{race, Outcome};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// When a bounded write stops waiting, and what it reports if it does.
#[derive(Debug, Clone, Copy)]
enum Horizon {
    Deadline(Instant),
    WriteTimeout { at: Instant, timeout: Duration },
}

impl Horizon {
    fn at(self) -> Instant {
        match self {
            Horizon::Deadline(at) | Horizon::WriteTimeout { at, .. } => at,
        }
    }

    fn error(self) -> SerioError {
        match self {
            Horizon::Deadline(_) => SerioError::DeadlineExceeded,
            Horizon::WriteTimeout { timeout, .. } => SerioError::WriteTimeout(timeout),
        }
    }
}

/// A transport with cancellable open and deadline-aware I/O.
///
/// Methods take `&mut self`; sharing one port between threads needs the
/// caller's own lock.
#[derive(Debug)]
pub struct GuardedPort<T: Transport> {
    /// Shared only with a write worker that may outlive its caller.
    handle: Option<Arc<T>>,
    name: String,
    write_timeout: Duration,
    deadline: Option<Instant>,
}

impl GuardedPort<SerialTransport> {
    /// Open an OS serial device, giving up when `ctx` is done.
    pub fn open(ctx: &Context, config: PortConfiguration) -> SerioResult<Self> {
        Self::open_with(ctx, SerialConnector, config)
    }
}

impl<T: Transport> GuardedPort<T> {
    /// Open `config.name` through `connector`, giving up when `ctx` is done.
    ///
    /// A context that is already done fails without attempting the open. A
    /// positive `config.timeout` becomes the transport's baseline read
    /// timeout. The port starts with no write timeout and no deadline.
    pub fn open_with<C>(ctx: &Context, connector: C, config: PortConfiguration) -> SerioResult<Self>
    where
        C: Connector<Transport = T>,
    {
        config.validate()?;
        if let Some(cause) = ctx.err() {
            return Err(SerioError::Cancelled(cause));
        }

        let mode = config.mode();
        let name = config.name.clone();
        debug!(port = %name, deadline = ?ctx.deadline_at(), "opening port");

        let outcome = race(
            "serio-open",
            ctx.done(),
            ctx.deadline_at(),
            move || connector.open(&name, &mode),
            |opened: Result<T, PortError>| {
                if let Ok(transport) = opened {
                    match transport.close() {
                        Ok(()) => debug!("released port opened after its context gave up"),
                        Err(e) => warn!(error = %e, "failed to release port opened after its context gave up"),
                    }
                }
            },
        )?;

        let transport = match outcome {
            Outcome::Completed(opened) => opened?,
            Outcome::Cancelled => return Err(SerioError::Cancelled(CancelCause::Cancelled)),
            Outcome::Elapsed => return Err(SerioError::Cancelled(CancelCause::DeadlineElapsed)),
        };

        if !config.timeout.is_zero() {
            if let Err(e) = transport.set_read_timeout(config.timeout) {
                if let Err(close_err) = transport.close() {
                    warn!(port = %config.name, error = %close_err, "failed to close port after timeout setup failed");
                }
                return Err(e.into());
            }
        }

        info!(
            port = %config.name,
            baud = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = %config.parity,
            "port opened"
        );
        Ok(Self {
            handle: Some(Arc::new(transport)),
            name: config.name,
            write_timeout: Duration::ZERO,
            deadline: None,
        })
    }

    /// Read into `buffer`.
    ///
    /// With a deadline set, the transport's read timeout is first shrunk to
    /// the time left. A transport timeout comes back as
    /// [`SerioError::Transport`], distinct from
    /// [`SerioError::DeadlineExceeded`].
    pub fn read(&mut self, buffer: &mut [u8]) -> SerioResult<usize> {
        let handle = self.handle()?;

        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SerioError::DeadlineExceeded);
            }
            debug!(port = %self.name, ?remaining, "read bounded by deadline");
            handle.set_read_timeout(remaining)?;
        }

        Ok(handle.read(buffer)?)
    }

    /// Write `data`, bounded by the deadline if set, else by the write
    /// timeout if positive, else not at all.
    ///
    /// On a bounded write the payload is copied to the worker thread. If the
    /// bound elapses first the error says so and the bytes actually written
    /// are unknown.
    pub fn write(&mut self, data: &[u8]) -> SerioResult<usize> {
        let handle = Arc::clone(self.handle()?);

        let now = Instant::now();
        let horizon = match self.deadline {
            Some(deadline) if deadline <= now => return Err(SerioError::DeadlineExceeded),
            Some(deadline) => Horizon::Deadline(deadline),
            // A timeout too large to represent as an instant is no bound at all.
            None => match now.checked_add(self.write_timeout) {
                Some(at) if !self.write_timeout.is_zero() => Horizon::WriteTimeout {
                    at,
                    timeout: self.write_timeout,
                },
                _ => return Ok(handle.write(data)?),
            },
        };
        debug!(port = %self.name, ?horizon, len = data.len(), "bounded write");

        let payload = data.to_vec();
        let port = self.name.clone();
        let outcome = race(
            "serio-write",
            &crossbeam_channel::never(),
            Some(horizon.at()),
            move || handle.write(&payload),
            move |result: Result<usize, PortError>| debug!(%port, ?result, "abandoned write finished"),
        )?;

        match outcome {
            Outcome::Completed(written) => Ok(written?),
            Outcome::Elapsed | Outcome::Cancelled => Err(horizon.error()),
        }
    }

    /// Close the transport. Every later operation, including another
    /// `close`, fails with [`SerioError::Closed`].
    pub fn close(&mut self) -> SerioResult<()> {
        let handle = self.handle.take().ok_or(SerioError::Closed)?;
        handle.close()?;
        info!(port = %self.name, "port closed");
        Ok(())
    }

    /// Bound subsequent writes to `timeout`. Zero removes the bound. Ignored
    /// while a deadline is set.
    pub fn set_write_timeout(&mut self, timeout: Duration) -> SerioResult<()> {
        self.write_timeout = timeout;
        Ok(())
    }

    /// Fail reads and writes from `deadline` on. `None` clears it.
    pub fn set_deadline(&mut self, deadline: impl Into<Option<Instant>>) -> SerioResult<()> {
        self.deadline = deadline.into();
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    fn handle(&self) -> SerioResult<&Arc<T>> {
        self.handle.as_ref().ok_or(SerioError::Closed)
    }
}

impl<T: Transport> Drop for GuardedPort<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.close() {
                warn!(port = %self.name, error = %e, "failed to close port on drop");
            }
        }
    }
}

impl<T: Transport> io::Read for GuardedPort<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        GuardedPort::read(self, buf).map_err(Into::into)
    }
}

impl<T: Transport> io::Write for GuardedPort<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        GuardedPort::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.is_closed() {
            return Err(SerioError::Closed.into());
        }
        Ok(())
    }
}
