//! # Global engine configuration.
//!
//! [`EngineConfig`] centralizes the timing constants the engine runs on. The
//! defaults match the limits the upstream service was profiled against; embed
//! code overrides individual fields rather than rebuilding the whole struct.

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Configuration for the dispatch engine.
///
/// ## Field semantics
/// - `delay_floor`/`delay_ceiling`: submitted per-destination delays are
///   clamped into this range
/// - `stagger`: launch offset between a session's channel loops
/// - `stop_wait`/`stop_poll`: how long (and how often) `start` waits for a
///   mid-shutdown run to drain before reporting `AlreadyRunning`
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
/// - `live_ttl`: freshness window for observer-pushed live snapshots
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Minimum accepted per-destination delay.
    pub delay_floor: Duration,
    /// Maximum accepted per-destination delay.
    pub delay_ceiling: Duration,
    /// Launch offset between successive channel loops of one session.
    pub stagger: Duration,
    /// Maximum wait for a draining run before `start` gives up.
    pub stop_wait: Duration,
    /// Poll granularity for the drain wait.
    pub stop_poll: Duration,
    /// Event bus capacity.
    pub bus_capacity: usize,
    /// Time-to-live for live-state snapshots.
    pub live_ttl: Duration,
    /// Backoff/retry policy shared by channel loops and the restart supervisor.
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    /// Defaults:
    /// - delay clamp `[10s, 250s]`, stagger `2s`
    /// - drain wait `5s` polled every `300ms`
    /// - bus capacity `1024`, live-state TTL `15s`
    /// - [`RetryPolicy::default`] for backoff
    fn default() -> Self {
        Self {
            delay_floor: Duration::from_secs(10),
            delay_ceiling: Duration::from_secs(250),
            stagger: Duration::from_secs(2),
            stop_wait: Duration::from_secs(5),
            stop_poll: Duration::from_millis(300),
            bus_capacity: 1024,
            live_ttl: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Clamps a submitted delay (seconds) into the accepted range.
    pub fn clamp_delay(&self, delay_secs: u64) -> Duration {
        Duration::from_secs(delay_secs)
            .max(self.delay_floor)
            .min(self.delay_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_clamped_into_range() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.clamp_delay(5), Duration::from_secs(10));
        assert_eq!(cfg.clamp_delay(10), Duration::from_secs(10));
        assert_eq!(cfg.clamp_delay(90), Duration::from_secs(90));
        assert_eq!(cfg.clamp_delay(250), Duration::from_secs(250));
        assert_eq!(cfg.clamp_delay(9999), Duration::from_secs(250));
    }
}
