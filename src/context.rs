//! Cancellation contexts bounding how long a caller will wait.
//!
//! A [`Context`] pairs a cancellation signal with an optional deadline. The
//! signal is a channel nobody ever sends on: cancelling drops the sender, and
//! every receiver observes the disconnect at once. That makes the context
//! usable directly inside a `crossbeam_channel::select!`.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// A [`CancelHandle`] cancelled it.
    Cancelled,
    /// Its deadline passed.
    DeadlineElapsed,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("context cancelled"),
            Self::DeadlineElapsed => f.write_str("context deadline elapsed"),
        }
    }
}

/// Cancellation signal plus optional deadline.
#[derive(Clone)]
pub struct Context {
    done: Receiver<()>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never done.
    pub fn background() -> Self {
        Self {
            done: crossbeam_channel::never(),
            deadline: None,
        }
    }

    /// Done once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// Done at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().deadline(deadline)
    }

    /// A context done when the returned handle cancels it.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = crossbeam_channel::bounded(0);
        let ctx = Self {
            done: rx,
            deadline: None,
        };
        (ctx, CancelHandle::new(tx))
    }

    /// Derive a context that is also done after `timeout`. A timeout too
    /// large to represent leaves the current deadline as it is.
    pub fn timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.deadline(deadline),
            None => self.clone(),
        }
    }

    /// Derive a context that is also done at `deadline`. The earlier of the
    /// two deadlines wins.
    pub fn deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            done: self.done.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline_at(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<CancelCause> {
        if self.is_cancelled() {
            return Some(CancelCause::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(CancelCause::DeadlineElapsed),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    fn is_cancelled(&self) -> bool {
        matches!(
            self.done.try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        )
    }

    /// Receiver that becomes ready on cancellation.
    pub(crate) fn done(&self) -> &Receiver<()> {
        &self.done
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Cancels the [`Context`] it was created with.
///
/// Clones share the signal. Dropping the last clone also cancels, so a
/// context never outlives every way of cancelling it.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl CancelHandle {
    fn new(tx: Sender<()>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Cancel the context. Idempotent.
    pub fn cancel(&self) {
        self.tx.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
