use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff between reconnect attempts of a failed feed.
///
/// Attempts are unbounded; the delay grows from `initial_delay` by
/// `multiplier` per attempt and is capped at `max_delay`. With jitter
/// enabled each delay is spread by ±10%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// Fixed delay without growth or jitter (useful for testing).
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter: false,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let base_ms = self.initial_delay.as_millis() as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let millis = if self.jitter {
            let jitter = (rand::random::<f64>() - 0.5) * 0.2;
            capped_ms * (1.0 + jitter)
        } else {
            capped_ms
        };
        Duration::from_millis(millis.max(0.0) as u64)
    }
}
