//! Periodic flush of every attached sink.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use crate::core::errors::Result;
use crate::daemon::ticker::Ticker;
use crate::logger::handle::Logger;

/// Background worker flushing a logger every `interval_secs`.
pub struct PeriodicFlusher {
    ticker: Ticker,
}

impl PeriodicFlusher {
    /// `interval_secs` must be non-zero; callers skip starting otherwise.
    pub fn start(logger: Arc<Logger>, interval_secs: u64) -> Result<Self> {
        let ticker = Ticker::spawn(
            "lgm-flush",
            Duration::from_secs(interval_secs.max(1)),
            move || logger.flush(),
        )?;
        Ok(Self { ticker })
    }

    /// Zero is ignored: a running flusher cannot be switched off in place.
    /// Returns whether the interval changed.
    pub fn set_interval_secs(&self, interval_secs: u64) -> bool {
        if interval_secs == 0 {
            return false;
        }
        self.ticker.set_interval(Duration::from_secs(interval_secs));
        true
    }

    #[must_use]
    pub fn interval_secs(&self) -> u64 {
        self.ticker.interval().as_secs()
    }

    pub fn stop(&mut self) {
        self.ticker.stop();
    }
}
