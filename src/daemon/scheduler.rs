//! Reload scheduler: at most one background loop running the reload check.

#![allow(missing_docs)]

use std::time::Duration;

use crate::core::errors::Result;
use crate::daemon::ticker::Ticker;

/// Interval used when a caller asks for zero.
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
pub struct ReloadScheduler {
    ticker: Option<Ticker>,
}

impl ReloadScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the loop, or only update the interval when already running.
    ///
    /// A zero interval means [`DEFAULT_RELOAD_INTERVAL`]. Returns whether a new
    /// loop was spawned; when it was not, `tick` is dropped unused.
    pub fn start<F>(&mut self, interval: Duration, tick: F) -> Result<bool>
    where
        F: FnMut() + Send + 'static,
    {
        let interval = if interval.is_zero() {
            DEFAULT_RELOAD_INTERVAL
        } else {
            interval
        };

        if let Some(ticker) = &self.ticker
            && ticker.is_running()
        {
            ticker.set_interval(interval);
            return Ok(false);
        }

        self.ticker = Some(Ticker::spawn("lgm-reload", interval, tick)?);
        Ok(true)
    }

    /// Signal the loop and wait for it to exit. No-op when stopped.
    pub fn stop(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_running)
    }

    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.ticker.as_ref().map(Ticker::interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        (count, move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn wait_for(count: &AtomicUsize, at_least: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) < at_least && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn second_start_only_updates_interval() {
        let mut scheduler = ReloadScheduler::new();
        let (first, tick_a) = counter();
        let (second, tick_b) = counter();

        assert!(scheduler.start(Duration::from_secs(3600), tick_a).unwrap());
        wait_for(&first, 1);
        assert!(!scheduler.start(Duration::from_secs(5), tick_b).unwrap());
        assert_eq!(scheduler.interval(), Some(Duration::from_secs(5)));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(second.load(Ordering::SeqCst), 0);
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn zero_interval_means_default() {
        let mut scheduler = ReloadScheduler::new();
        scheduler.start(Duration::ZERO, || {}).unwrap();
        assert_eq!(scheduler.interval(), Some(DEFAULT_RELOAD_INTERVAL));
        scheduler.stop();
    }

    #[test]
    fn stop_then_start_runs_exactly_one_loop() {
        let mut scheduler = ReloadScheduler::new();
        let (first, tick_a) = counter();
        scheduler.start(Duration::from_millis(5), tick_a).unwrap();
        wait_for(&first, 1);
        scheduler.stop();
        let frozen = first.load(Ordering::SeqCst);

        let (second, tick_b) = counter();
        assert!(scheduler.start(Duration::from_millis(5), tick_b).unwrap());
        wait_for(&second, 2);
        scheduler.stop();

        assert_eq!(first.load(Ordering::SeqCst), frozen);
        assert!(second.load(Ordering::SeqCst) >= 2);
        scheduler.stop();
    }
}
