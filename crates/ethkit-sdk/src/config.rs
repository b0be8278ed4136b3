//! Pipeline and subscription tuning

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and buffering knobs shared by the pipeline, subscriptions and the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delay between receipt polls
    pub poll_interval_ms: u64,
    /// Default deadline for `send_and_confirm`
    pub confirmation_timeout_secs: u64,
    /// Capacity of the subscription log buffer
    pub log_buffer: usize,
    /// Delay between polls of the HTTP log feed
    pub feed_poll_interval_ms: u64,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            confirmation_timeout_secs: 120,
            log_buffer: 256,
            feed_poll_interval_ms: 2000,
            request_timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn feed_poll_interval(&self) -> Duration {
        Duration::from_millis(self.feed_poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
