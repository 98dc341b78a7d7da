//! Bounding a blocking call that cannot be interrupted.
//!
//! The call runs on a named worker thread which parks its result in a
//! single-slot cell; the caller waits on the first of completion, the cancel
//! signal and the horizon timer. Losing the race only stops the waiting. The
//! worker still runs to completion and its result goes to the `abandon`
//! callback instead of the caller.

use crate::port::PortError;
use crossbeam_channel::{select, Receiver};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::debug;

/// How a race ended.
#[derive(Debug)]
pub(crate) enum Outcome<T> {
    Completed(T),
    Cancelled,
    Elapsed,
}

struct Slot<T> {
    value: Option<T>,
    abandoned: bool,
}

/// Run `work` on a thread named `thread_name` and wait until it finishes,
/// `cancel` disconnects, or `horizon` passes, whichever comes first.
///
/// A result that is already parked when the wait is interrupted still wins.
pub(crate) fn race<T, F, A>(
    thread_name: &str,
    cancel: &Receiver<()>,
    horizon: Option<Instant>,
    work: F,
    abandon: A,
) -> Result<Outcome<T>, PortError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
    A: FnOnce(T) + Send + 'static,
{
    let slot = Arc::new(Mutex::new(Slot {
        value: None,
        abandoned: false,
    }));
    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);

    let worker_slot = Arc::clone(&slot);
    thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            let value = work();
            let mut slot = worker_slot.lock();
            if slot.abandoned {
                drop(slot);
                debug!("caller gave up, discarding worker result");
                abandon(value);
                return;
            }
            slot.value = Some(value);
            drop(slot);
            let _ = done_tx.send(());
        })?;

    let timer = horizon.map_or_else(crossbeam_channel::never, crossbeam_channel::at);
    let interrupted = select! {
        recv(done_rx) -> _ => None,
        recv(cancel) -> _ => Some(Outcome::Cancelled),
        recv(timer) -> _ => Some(Outcome::Elapsed),
    };

    let mut slot = slot.lock();
    if let Some(value) = slot.value.take() {
        return Ok(Outcome::Completed(value));
    }
    match interrupted {
        Some(outcome) => {
            slot.abandoned = true;
            Ok(outcome)
        }
        None => Err(PortError::Io(std::io::Error::other(format!(
            "{thread_name} worker exited without a result"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_completes_before_horizon() {
        let never = crossbeam_channel::never();
        let horizon = Some(Instant::now() + Duration::from_secs(5));

        let outcome = race("race-test", &never, horizon, || 42, |_| {}).unwrap();
        assert!(matches!(outcome, Outcome::Completed(42)));
    }

    #[test]
    fn test_horizon_elapses_and_result_is_abandoned() {
        let never = crossbeam_channel::never();
        let horizon = Some(Instant::now() + Duration::from_millis(20));
        let abandoned = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&abandoned);

        let started = Instant::now();
        let outcome = race(
            "race-test",
            &never,
            horizon,
            || thread::sleep(Duration::from_millis(200)),
            move |_| flag.store(true, Ordering::SeqCst),
        )
        .unwrap();

        assert!(matches!(outcome, Outcome::Elapsed));
        assert!(started.elapsed() < Duration::from_millis(150));

        thread::sleep(Duration::from_millis(300));
        assert!(abandoned.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cancel_interrupts_unbounded_wait() {
        let (tx, rx) = crossbeam_channel::bounded::<()>(0);
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            drop(tx);
        });

        let outcome = race(
            "race-test",
            &rx,
            None,
            || thread::sleep(Duration::from_millis(300)),
            |_| {},
        )
        .unwrap();
        assert!(matches!(outcome, Outcome::Cancelled));
        canceller.join().unwrap();
    }

    #[test]
    fn test_panicking_worker_is_an_error() {
        let never = crossbeam_channel::never();
        let result = race::<(), _, _>("race-test", &never, None, || panic!("boom"), |_| {});
        assert!(matches!(result, Err(PortError::Io(_))));
    }
}
