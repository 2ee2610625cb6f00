//! Synchronizer configuration.

use std::time::Duration;

/// Timing knobs for the synchronizer. Not part of any wire protocol.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Head page re-fetch interval while the live channel is down.
    pub poll_interval: Duration,
    /// How long a fetched head page counts as fresh.
    pub stale_after: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1500),
            stale_after: Duration::from_secs(60),
        }
    }
}

impl SyncConfig {
    /// Override the polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the staleness window.
    pub fn with_stale_after(mut self, window: Duration) -> Self {
        self.stale_after = window;
        self
    }
}
