use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Parameters of the bounded readiness gate polled against the cluster.
///
/// No backoff is used: the wait is bounded and short-lived, and a fixed short
/// interval keeps total wall time predictable without busy-spinning.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReadinessConfig {
    #[serde(default = "default_deadline_in_ms")]
    pub deadline_in_ms: u64,

    #[serde(default = "default_poll_interval_in_ms")]
    pub poll_interval_in_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            deadline_in_ms: default_deadline_in_ms(),
            poll_interval_in_ms: default_poll_interval_in_ms(),
        }
    }
}

impl ReadinessConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_in_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_in_ms)
    }
}

fn default_deadline_in_ms() -> u64 {
    30_000
}
fn default_poll_interval_in_ms() -> u64 {
    10
}
