//! Named background worker that runs a tick, then waits a shared interval.
//!
//! The wait is a `recv_timeout` on a stop channel, so stopping interrupts the
//! sleep instead of waiting it out. The interval is re-read before every wait.

#![allow(missing_docs)]

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};

use crate::core::errors::{LgmError, Result};

pub struct Ticker {
    name: String,
    interval_ms: Arc<AtomicU64>,
    stop_tx: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a thread named `name` running `tick` immediately and then once per interval.
    ///
    /// A panicking tick is reported on stderr and the loop keeps going.
    pub fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let interval_ms = Arc::new(AtomicU64::new(duration_ms(interval)));
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let shared = Arc::clone(&interval_ms);
        let label = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    if catch_unwind(AssertUnwindSafe(&mut tick)).is_err() {
                        eprintln!("[LGM-SCHED] {label}: tick panicked, continuing");
                    }
                    let wait = Duration::from_millis(shared.load(Ordering::Acquire));
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|source| LgmError::Runtime {
                details: format!("failed to spawn {name} thread: {source}"),
            })?;

        Ok(Self {
            name: name.to_string(),
            interval_ms,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Takes effect from the next wait.
    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(duration_ms(interval), Ordering::Release);
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop and join it. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            // Joining ourselves would deadlock; a tick that stops its own ticker just detaches.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1)
}
