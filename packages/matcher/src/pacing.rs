//! Outbound pacing policy.
//!
//! Bounded random delays, no state, no backoff. The dispatch delay is
//! applied before each issuance, so it throttles issue *rate* independent
//! of response latency; the cycle delay spaces whole fetch-dispatch cycles.

use std::time::Duration;

/// Issuance delay bounds, milliseconds.
const DISPATCH_DELAY_MS: (u64, u64) = (50, 200);

/// Cycle delay bounds, milliseconds.
const CYCLE_DELAY_MS: (u64, u64) = (1_000, 2_000);

/// Delay inserted before each accept-action is issued.
pub fn dispatch_delay() -> Duration {
    Duration::from_millis(fastrand::u64(DISPATCH_DELAY_MS.0..DISPATCH_DELAY_MS.1))
}

/// Delay between completed cycles.
pub fn cycle_delay() -> Duration {
    Duration::from_millis(fastrand::u64(CYCLE_DELAY_MS.0..CYCLE_DELAY_MS.1))
}

/// Fixed delay after an empty poll before re-polling.
pub fn empty_poll_delay() -> Duration {
    Duration::from_secs(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_delay_stays_in_bounds() {
        for _ in 0..1_000 {
            let d = dispatch_delay();
            assert!(d >= Duration::from_millis(50), "{d:?}");
            assert!(d < Duration::from_millis(200), "{d:?}");
        }
    }

    #[test]
    fn cycle_delay_stays_in_bounds() {
        for _ in 0..1_000 {
            let d = cycle_delay();
            assert!(d >= Duration::from_millis(1_000), "{d:?}");
            assert!(d < Duration::from_millis(2_000), "{d:?}");
        }
    }

    #[test]
    fn empty_poll_delay_is_fixed() {
        assert_eq!(empty_poll_delay(), Duration::from_secs(1));
    }
}
