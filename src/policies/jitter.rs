//! # Jittered pacing for the inter-send interval.
//!
//! Channel loops sleep `uniform(0.9, 1.1) × interval` between accepted
//! deliveries so that loops configured with the same delay drift apart instead
//! of hammering the upstream service in lockstep.

use rand::Rng;
use std::time::Duration;

/// Lower bound of the jitter window.
const SPREAD_LOW: f64 = 0.9;
/// Upper bound of the jitter window.
const SPREAD_HIGH: f64 = 1.1;

/// Returns `uniform(0.9, 1.1) × interval`.
pub fn pace(interval: Duration) -> Duration {
    if interval.is_zero() {
        return Duration::ZERO;
    }
    let mut rng = rand::rng();
    interval.mul_f64(rng.random_range(SPREAD_LOW..=SPREAD_HIGH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pace_stays_within_spread() {
        let interval = Duration::from_secs(10);
        for _ in 0..200 {
            let d = pace(interval);
            assert!(d >= Duration::from_secs_f64(9.0), "{d:?} below spread");
            assert!(d <= Duration::from_secs_f64(11.0), "{d:?} above spread");
        }
    }

    #[test]
    fn pace_of_zero_is_zero() {
        assert_eq!(pace(Duration::ZERO), Duration::ZERO);
    }
}
